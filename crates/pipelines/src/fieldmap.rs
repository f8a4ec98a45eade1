//! Field-map estimation and susceptibility-distortion correction (SDC) for
//! a subject's single-band reference images.

use std::path::Path;
use std::sync::Arc;

use engine::{Node, Workflow};
use interfaces::fsl::{Bet, Fugue, Prelude, PrepareFieldmap};
use interfaces::utility::{DatasetGrabber, IdentityInterface, IntraModalMerge, ReadSidecarJson};

/// Estimate a field map from a phase-difference acquisition.
///
/// Inputs: `inputnode.magnitude`, `inputnode.phasediff`. Outputs:
/// `outputnode.fmap`, `outputnode.fmap_ref`, `outputnode.fmap_mask`.
pub fn fmap_estimator_wf(name: &str) -> Workflow {
    let mut wf = Workflow::new(name);

    wf.add_node(Node::new(
        "inputnode",
        Arc::new(IdentityInterface::new(["magnitude", "phasediff"])),
    ));
    wf.add_node(Node::new(
        "outputnode",
        Arc::new(IdentityInterface::new(["fmap", "fmap_ref", "fmap_mask"])),
    ));
    wf.add_node(Node::new(
        "mag_bet",
        Arc::new(Bet {
            frac: 0.4,
            mask: true,
        }),
    ));
    wf.add_node(Node::new("prelude", Arc::new(Prelude)));
    wf.add_node(Node::new(
        "prepare_fieldmap",
        Arc::new(PrepareFieldmap::default()),
    ));

    wf.connect("inputnode", "magnitude", "mag_bet", "in_file");
    wf.connect("inputnode", "phasediff", "prelude", "phase_file");
    wf.connect("mag_bet", "out_file", "prelude", "magnitude_file");
    wf.connect("mag_bet", "mask_file", "prelude", "mask_file");
    wf.connect("prelude", "unwrapped_phase_file", "prepare_fieldmap", "in_phase");
    wf.connect("mag_bet", "out_file", "prepare_fieldmap", "in_magnitude");
    wf.connect("prepare_fieldmap", "out_fieldmap", "outputnode", "fmap");
    wf.connect("mag_bet", "out_file", "outputnode", "fmap_ref");
    wf.connect("mag_bet", "mask_file", "outputnode", "fmap_mask");

    wf
}

/// Apply an estimated field map to unwarp a distorted reference image.
///
/// Inputs: `inputnode.{in_files, in_reference, in_mask, in_meta, fmap,
/// fmap_ref, fmap_mask}`. Output: `outputnode.out_file`.
pub fn sdc_unwarp_wf(name: &str) -> Workflow {
    let mut wf = Workflow::new(name);

    wf.add_node(Node::new(
        "inputnode",
        Arc::new(IdentityInterface::new([
            "in_files",
            "in_reference",
            "in_mask",
            "in_meta",
            "fmap",
            "fmap_ref",
            "fmap_mask",
        ])),
    ));
    wf.add_node(Node::new(
        "outputnode",
        Arc::new(IdentityInterface::new(["out_file"])),
    ));
    wf.add_node(Node::new("fugue", Arc::new(Fugue::default())));

    wf.connect("inputnode", "in_reference", "fugue", "in_file");
    wf.connect("inputnode", "fmap", "fugue", "fmap_file");
    wf.connect("inputnode", "in_mask", "fugue", "mask_file");
    wf.connect("inputnode", "in_meta", "fugue", "metadata");
    wf.connect("fugue", "out_file", "outputnode", "out_file");

    wf
}

/// Per-subject correction graph: grab the subject's inputs, conform the
/// single-band references, estimate the field map, and unwarp.
pub fn sbref_correct_wf(dataset_root: &Path, subject: &str) -> Workflow {
    let mut wf = Workflow::new("sbref_correct");

    wf.add_node(Node::new(
        "grabber",
        Arc::new(DatasetGrabber {
            dataset_root: dataset_root.to_path_buf(),
            subject: subject.to_owned(),
        }),
    ));
    wf.add_node(Node::new("meta", Arc::new(ReadSidecarJson)));
    wf.add_node(Node::new("conform", Arc::new(IntraModalMerge)));
    wf.add_node(Node::new(
        "mask",
        Arc::new(Bet {
            frac: 0.4,
            mask: true,
        }),
    ));

    wf.merge("estimator", fmap_estimator_wf("fmap_estimator"));
    wf.merge("sdc", sdc_unwarp_wf("sdc_unwarp"));

    wf.connect_first("grabber", "sbref", "meta", "in_file");
    wf.connect("grabber", "sbref", "conform", "in_files");
    wf.connect_first("grabber", "magnitude", "estimator.inputnode", "magnitude");
    wf.connect_first("grabber", "phasediff", "estimator.inputnode", "phasediff");

    wf.connect_first("estimator.outputnode", "fmap", "sdc.inputnode", "fmap");
    wf.connect_first("estimator.outputnode", "fmap_ref", "sdc.inputnode", "fmap_ref");
    wf.connect_first("estimator.outputnode", "fmap_mask", "sdc.inputnode", "fmap_mask");

    wf.connect("meta", "out_dict", "sdc.inputnode", "in_meta");
    wf.connect("grabber", "sbref", "sdc.inputnode", "in_files");
    wf.connect("conform", "out_file", "sdc.inputnode", "in_reference");
    wf.connect("conform", "out_file", "mask", "in_file");
    wf.connect("mask", "mask_file", "sdc.inputnode", "in_mask");

    wf
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::validate_dag;
    use std::path::PathBuf;

    #[test]
    fn estimator_graph_is_valid() {
        let wf = fmap_estimator_wf("fmap_estimator");
        let order = validate_dag(&wf).expect("valid DAG");
        assert_eq!(order.first().unwrap(), "inputnode");
        assert_eq!(order.last().unwrap(), "outputnode");
        assert_eq!(wf.nodes.len(), 5);
    }

    #[test]
    fn sdc_graph_is_valid() {
        let wf = sdc_unwarp_wf("sdc_unwarp");
        let order = validate_dag(&wf).expect("valid DAG");
        assert_eq!(order.last().unwrap(), "outputnode");
    }

    #[test]
    fn subject_graph_flattens_subworkflows() {
        let wf = sbref_correct_wf(&PathBuf::from("/data"), "01");
        validate_dag(&wf).expect("valid DAG");

        assert!(wf.node("grabber").is_some());
        assert!(wf.node("estimator.prepare_fieldmap").is_some());
        assert!(wf.node("sdc.fugue").is_some());

        // grabber feeds meta, conform, estimator, and sdc.
        let fanout = wf.edges.iter().filter(|e| e.from == "grabber").count();
        assert_eq!(fanout, 5);
    }

    #[test]
    fn list_valued_grabber_ports_use_first_selector() {
        let wf = sbref_correct_wf(&PathBuf::from("/data"), "01");
        let edge = wf
            .edges
            .iter()
            .find(|e| e.from == "grabber" && e.to == "meta")
            .unwrap();
        assert_eq!(edge.selector, engine::Selector::First);
    }
}
