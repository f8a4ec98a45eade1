//! Execution-plugin resolution.
//!
//! Order of precedence: an explicit YAML plugin-configuration file, then the
//! thread/memory options, then Linear.

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use engine::Plugin;
use pipelines::Settings;

/// Shape of the `--use-plugin` YAML file.
#[derive(Debug, Deserialize)]
pub struct PluginFile {
    pub plugin: String,
    #[serde(default)]
    pub plugin_args: PluginArgs,
}

#[derive(Debug, Default, Deserialize)]
pub struct PluginArgs {
    #[serde(default)]
    pub n_procs: Option<usize>,
    #[serde(default)]
    pub memory_gb: Option<f64>,
}

/// Pick the scheduling plugin for this run. `settings` must already have
/// its thread defaults resolved.
pub fn resolve_plugin(path: Option<&Path>, settings: &Settings) -> anyhow::Result<Plugin> {
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read plugin file {}", path.display()))?;
        let parsed: PluginFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid plugin file {}", path.display()))?;
        return from_file(parsed, settings);
    }

    if settings.nthreads > 1 {
        Ok(Plugin::MultiProc {
            n_procs: settings.nthreads,
            memory_gb: mem_gb(settings.mem_mb),
        })
    } else {
        Ok(Plugin::Linear)
    }
}

fn from_file(file: PluginFile, settings: &Settings) -> anyhow::Result<Plugin> {
    match file.plugin.as_str() {
        "Linear" => Ok(Plugin::Linear),
        "MultiProc" => Ok(Plugin::MultiProc {
            n_procs: file.plugin_args.n_procs.unwrap_or(settings.nthreads).max(1),
            memory_gb: file.plugin_args.memory_gb,
        }),
        other => bail!("unsupported plugin '{other}'"),
    }
}

fn mem_gb(mem_mb: usize) -> Option<f64> {
    (mem_mb > 0).then(|| mem_mb as f64 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(nthreads: usize, mem_mb: usize) -> Settings {
        Settings {
            dataset_root: PathBuf::from("/data"),
            output_dir: PathBuf::from("/out"),
            work_dir: PathBuf::from("/work"),
            nthreads,
            mem_mb,
            ants_nthreads: 1,
            write_graph: false,
        }
    }

    #[test]
    fn single_thread_defaults_to_linear() {
        let plugin = resolve_plugin(None, &settings(1, 0)).unwrap();
        assert_eq!(plugin, Plugin::Linear);
    }

    #[test]
    fn many_threads_default_to_multiproc_with_mem_in_gb() {
        let plugin = resolve_plugin(None, &settings(8, 4096)).unwrap();
        assert_eq!(
            plugin,
            Plugin::MultiProc {
                n_procs: 8,
                memory_gb: Some(4.0),
            }
        );
    }

    #[test]
    fn zero_mem_means_no_ceiling() {
        let plugin = resolve_plugin(None, &settings(8, 0)).unwrap();
        assert!(matches!(plugin, Plugin::MultiProc { memory_gb: None, .. }));
    }

    #[test]
    fn yaml_file_wins_over_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.yml");
        std::fs::write(
            &path,
            "plugin: MultiProc\nplugin_args:\n  n_procs: 2\n  memory_gb: 1.5\n",
        )
        .unwrap();

        let plugin = resolve_plugin(Some(&path), &settings(8, 0)).unwrap();
        assert_eq!(
            plugin,
            Plugin::MultiProc {
                n_procs: 2,
                memory_gb: Some(1.5),
            }
        );
    }

    #[test]
    fn linear_yaml_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.yml");
        std::fs::write(&path, "plugin: Linear\n").unwrap();
        assert_eq!(
            resolve_plugin(Some(&path), &settings(8, 0)).unwrap(),
            Plugin::Linear
        );
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.yml");
        std::fs::write(&path, "plugin: SGE\n").unwrap();
        assert!(resolve_plugin(Some(&path), &settings(1, 0)).is_err());
    }
}
