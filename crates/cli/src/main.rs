//! `neuroprep` CLI entry-point.
//!
//! Wires the per-subject preprocessing graphs together and hands them to the
//! execution engine: parse options, prepare output directories, resolve the
//! scheduling plugin, discover subjects, build the enumerator workflow, run.

mod discovery;
mod plugin;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use engine::{ExecutorConfig, WorkflowExecutor};
use pipelines::{workflow_enumerator, Settings};

use discovery::{discover_subjects, prepare_directories};
use plugin::resolve_plugin;

#[derive(Parser)]
#[command(name = "neuroprep", about = "fMRI preprocessing workflow", version)]
struct Cli {
    /// Root of the dataset (contains `sub-*` directories).
    dataset_dir: PathBuf,
    /// Where derivatives and logs are written.
    output_dir: PathBuf,

    /// Process only these subject labels (default: every `sub-*` directory).
    #[arg(long = "participant-label", num_args = 1..)]
    participant_label: Vec<String>,

    /// Number of worker tasks (0 = host CPU count).
    #[arg(long, default_value_t = 0)]
    nthreads: usize,

    /// Try to limit requested memory to this many megabytes.
    #[arg(long = "mem-mb", default_value_t = 0)]
    mem_mb: usize,

    /// Write a Graphviz rendering of the workflow graph.
    #[arg(long = "write-graph")]
    write_graph: bool,

    /// Engine plugin configuration file (YAML).
    #[arg(long = "use-plugin")]
    use_plugin: Option<PathBuf>,

    /// Working directory for intermediate results.
    #[arg(short = 'w', long = "work-dir")]
    work_dir: Option<PathBuf>,

    /// Number of threads set in ANTs processes (0 = host CPU count).
    #[arg(long = "ants-nthreads", default_value_t = 0)]
    ants_nthreads: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let mut settings = Settings {
        dataset_root: absolutize(&cwd, &cli.dataset_dir),
        output_dir: absolutize(&cwd, &cli.output_dir),
        work_dir: absolutize(&cwd, &cli.work_dir.unwrap_or_else(|| cwd.join("work"))),
        nthreads: cli.nthreads,
        mem_mb: cli.mem_mb,
        ants_nthreads: cli.ants_nthreads,
        write_graph: cli.write_graph,
    };
    settings.resolve_defaults();

    prepare_directories(&settings)?;
    init_logging(&settings.log_dir())?;

    let plugin = resolve_plugin(cli.use_plugin.as_deref(), &settings)?;

    let subjects = if cli.participant_label.is_empty() {
        discover_subjects(&settings.dataset_root)?
    } else {
        cli.participant_label
    };
    info!(subjects = %subjects.join(", "), "subject list");

    let workflow = workflow_enumerator(&subjects, &settings);

    if settings.write_graph {
        let dot_path = settings.work_dir.join("workflow_enumerator.dot");
        engine::write_graph(&workflow, &dot_path)?;
        info!(path = %dot_path.display(), "workflow graph written");
    }

    let executor = WorkflowExecutor::new(ExecutorConfig {
        plugin,
        crashdump_dir: Some(settings.log_dir()),
    });

    match executor.run(&workflow, &settings.work_dir).await {
        Ok(report) => {
            info!(
                executed = report.executed.len(),
                cached = report.cached.len(),
                "preprocessing finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "preprocessing failed");
            std::process::exit(1);
        }
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Log to stderr and append to `<log_dir>/neuroprep.log`.
fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("neuroprep.log"))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();
    Ok(())
}
