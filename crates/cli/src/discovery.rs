//! Subject discovery and output-directory preparation.

use std::path::Path;

use anyhow::Context;

use pipelines::Settings;

/// Subject labels derived from `sub-*` directories under the dataset root,
/// sorted, with the fixed 4-character `sub-` prefix stripped.
pub fn discover_subjects(dataset_root: &Path) -> anyhow::Result<Vec<String>> {
    let pattern = dataset_root.join("sub-*");
    let pattern = pattern.to_string_lossy();

    let mut subjects: Vec<String> = glob::glob(&pattern)
        .with_context(|| format!("bad dataset glob '{pattern}'"))?
        .filter_map(Result::ok)
        .filter(|p| p.is_dir())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| name[4..].to_owned())
        .collect();
    subjects.sort();
    Ok(subjects)
}

/// Create the output, derivatives, log, and working directories. Safe to
/// call on every invocation; existing directories are left alone.
pub fn prepare_directories(settings: &Settings) -> std::io::Result<()> {
    std::fs::create_dir_all(&settings.output_dir)?;
    std::fs::create_dir_all(settings.derivatives_dir())?;
    std::fs::create_dir_all(settings.log_dir())?;
    std::fs::create_dir_all(&settings.work_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn strips_prefix_and_sorts() {
        let root = tempfile::tempdir().unwrap();
        for d in ["sub-02", "sub-01", "sub-ctrl"] {
            std::fs::create_dir(root.path().join(d)).unwrap();
        }
        // Non-matching entries are ignored.
        std::fs::create_dir(root.path().join("derivatives")).unwrap();
        std::fs::write(root.path().join("sub-03"), b"a file, not a dir").unwrap();

        let subjects = discover_subjects(root.path()).unwrap();
        assert_eq!(subjects, vec!["01", "02", "ctrl"]);
    }

    #[test]
    fn empty_dataset_yields_no_subjects() {
        let root = tempfile::tempdir().unwrap();
        assert!(discover_subjects(root.path()).unwrap().is_empty());
    }

    #[test]
    fn directory_creation_is_idempotent() {
        let out = tempfile::tempdir().unwrap();
        let settings = Settings {
            dataset_root: PathBuf::from("/data"),
            output_dir: out.path().join("out"),
            work_dir: out.path().join("work"),
            nthreads: 1,
            mem_mb: 0,
            ants_nthreads: 1,
            write_graph: false,
        };

        prepare_directories(&settings).unwrap();
        prepare_directories(&settings).unwrap();

        assert!(settings.log_dir().is_dir());
        assert!(settings.derivatives_dir().is_dir());
        assert!(settings.work_dir.is_dir());
    }
}
