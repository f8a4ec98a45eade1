//! Run-wide settings shared by the pipeline builders and the CLI.

use std::path::PathBuf;

/// Everything the pipeline builders need to know about this run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dataset_root: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    /// Worker-task count; 0 means "resolve to host CPU count".
    pub nthreads: usize,
    /// Memory ceiling in megabytes; 0 means no ceiling.
    pub mem_mb: usize,
    /// Thread count exported to ANTs processes; 0 means host CPU count.
    pub ants_nthreads: usize,
    pub write_graph: bool,
}

impl Settings {
    pub fn log_dir(&self) -> PathBuf {
        self.output_dir.join("log")
    }

    pub fn derivatives_dir(&self) -> PathBuf {
        self.output_dir.join("derivatives")
    }

    /// Replace zero-valued thread counts with the host CPU count.
    pub fn resolve_defaults(&mut self) {
        if self.nthreads == 0 {
            self.nthreads = host_cpus();
        }
        if self.ants_nthreads == 0 {
            self.ants_nthreads = host_cpus();
        }
    }
}

/// Host CPU count, with a floor of one.
pub fn host_cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            dataset_root: PathBuf::from("/data"),
            output_dir: PathBuf::from("/out"),
            work_dir: PathBuf::from("/work"),
            nthreads: 0,
            mem_mb: 0,
            ants_nthreads: 0,
            write_graph: false,
        }
    }

    #[test]
    fn zero_thread_counts_fall_back_to_host_cpus() {
        let mut s = settings();
        s.resolve_defaults();
        assert_eq!(s.nthreads, host_cpus());
        assert_eq!(s.ants_nthreads, host_cpus());
        assert!(s.nthreads >= 1);
    }

    #[test]
    fn explicit_thread_counts_are_kept() {
        let mut s = settings();
        s.nthreads = 3;
        s.resolve_defaults();
        assert_eq!(s.nthreads, 3);
    }

    #[test]
    fn derived_directories_hang_off_output_dir() {
        let s = settings();
        assert_eq!(s.log_dir(), PathBuf::from("/out/log"));
        assert_eq!(s.derivatives_dir(), PathBuf::from("/out/derivatives"));
    }
}
