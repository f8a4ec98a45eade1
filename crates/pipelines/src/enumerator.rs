//! Per-subject enumeration: one correction graph per subject, flattened into
//! a single master workflow.

use chrono::Local;
use tracing::info;

use engine::Workflow;

use crate::fieldmap::sbref_correct_wf;
use crate::settings::Settings;

/// Build the master workflow containing one `sbref_correct` graph per
/// subject. Each subject's crash dumps are routed to a timestamped directory
/// under `<output_dir>/log/<subject>/`.
pub fn workflow_enumerator(subjects: &[String], settings: &Settings) -> Workflow {
    let mut master = Workflow::new("workflow_enumerator");
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();

    for subject in subjects {
        let mut wf = sbref_correct_wf(&settings.dataset_root, subject);
        wf.crashdump_dir = Some(settings.log_dir().join(subject).join(&stamp));
        master.merge(&format!("sub-{subject}"), wf);
    }

    info!(subjects = subjects.len(), "enumerator workflow built");
    master
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::validate_dag;
    use std::path::PathBuf;

    fn settings() -> Settings {
        Settings {
            dataset_root: PathBuf::from("/data"),
            output_dir: PathBuf::from("/out"),
            work_dir: PathBuf::from("/work"),
            nthreads: 1,
            mem_mb: 0,
            ants_nthreads: 1,
            write_graph: false,
        }
    }

    #[test]
    fn one_subgraph_per_subject() {
        let subjects = vec!["01".to_owned(), "02".to_owned()];
        let wf = workflow_enumerator(&subjects, &settings());

        validate_dag(&wf).expect("valid DAG");
        assert!(wf.node("sub-01.grabber").is_some());
        assert!(wf.node("sub-02.grabber").is_some());
        assert!(wf.node("sub-01.sdc.fugue").is_some());
    }

    #[test]
    fn crashdumps_are_routed_per_subject() {
        let subjects = vec!["01".to_owned()];
        let wf = workflow_enumerator(&subjects, &settings());

        let node = wf.node("sub-01.grabber").unwrap();
        let crash = node.crashdump_dir.as_ref().unwrap();
        assert!(crash.starts_with("/out/log/01"));
    }

    #[test]
    fn empty_subject_list_yields_empty_workflow() {
        let wf = workflow_enumerator(&[], &settings());
        assert!(wf.nodes.is_empty());
        validate_dag(&wf).expect("empty graph is trivially valid");
    }
}
