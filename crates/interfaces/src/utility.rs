//! Dataset and plumbing interfaces that do not wrap an external binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::command::run_tool;
use crate::traits::{out_path, path_input, path_list_input, Interface, PortMap, RunContext};
use crate::InterfaceError;

// ---------------------------------------------------------------------------
// IdentityInterface
// ---------------------------------------------------------------------------

/// Pass-through node used as the input/output boundary of a workflow.
///
/// Forwards whichever of its declared fields arrived on the input side.
#[derive(Debug, Clone)]
pub struct IdentityInterface {
    pub fields: Vec<String>,
}

impl IdentityInterface {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Interface for IdentityInterface {
    async fn run(&self, inputs: &PortMap, _ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let outputs = self
            .fields
            .iter()
            .filter_map(|f| inputs.get(f).map(|v| (f.clone(), v.clone())))
            .collect();
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// DatasetGrabber
// ---------------------------------------------------------------------------

/// Collects a subject's input files from the dataset layout.
///
/// Scans `sub-<label>/func/` for single-band references and `sub-<label>/fmap/`
/// for the field-map acquisition. Outputs: `sbref` (list), `magnitude` (list),
/// `phasediff` (list), all sorted for determinism.
#[derive(Debug, Clone)]
pub struct DatasetGrabber {
    pub dataset_root: PathBuf,
    pub subject: String,
}

impl DatasetGrabber {
    fn collect(&self, subdir: &str, pattern: &str) -> Result<Vec<String>, InterfaceError> {
        let full = self
            .dataset_root
            .join(format!("sub-{}", self.subject))
            .join(subdir)
            .join(pattern);
        let pattern_str = full.to_string_lossy().into_owned();

        let mut hits: Vec<String> = glob::glob(&pattern_str)
            .map_err(|e| InterfaceError::Parse {
                path: pattern_str.clone(),
                message: e.to_string(),
            })?
            .filter_map(Result::ok)
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        hits.sort();
        Ok(hits)
    }

    fn grab(&self, port: &str, subdir: &str, pattern: &str) -> Result<Value, InterfaceError> {
        let hits = self.collect(subdir, pattern)?;
        if hits.is_empty() {
            return Err(InterfaceError::MissingInput(port.to_owned()));
        }
        Ok(Value::from(hits))
    }
}

#[async_trait]
impl Interface for DatasetGrabber {
    async fn run(&self, _inputs: &PortMap, _ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let mut outputs = PortMap::new();
        outputs.insert("sbref".to_owned(), self.grab("sbref", "func", "*_sbref.nii*")?);
        outputs.insert(
            "magnitude".to_owned(),
            self.grab("magnitude", "fmap", "*magnitude*.nii*")?,
        );
        outputs.insert(
            "phasediff".to_owned(),
            self.grab("phasediff", "fmap", "*phasediff*.nii*")?,
        );
        debug!(subject = %self.subject, "collected subject inputs");
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// ReadSidecarJson
// ---------------------------------------------------------------------------

/// Reads the JSON sidecar paired with an image file.
///
/// Inputs: `in_file`. Outputs: `out_dict` (the parsed sidecar).
#[derive(Debug, Clone, Default)]
pub struct ReadSidecarJson;

/// `/d/sub-01_sbref.nii.gz` → `/d/sub-01_sbref.json`
pub fn sidecar_path(image: &str) -> String {
    let stem = image
        .strip_suffix(".nii.gz")
        .or_else(|| image.strip_suffix(".nii"))
        .unwrap_or(image);
    format!("{stem}.json")
}

#[async_trait]
impl Interface for ReadSidecarJson {
    async fn run(&self, inputs: &PortMap, _ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let sidecar = sidecar_path(in_file);

        let raw = tokio::fs::read_to_string(&sidecar).await?;
        let out_dict: Value = serde_json::from_str(&raw).map_err(|e| InterfaceError::Parse {
            path: sidecar.clone(),
            message: e.to_string(),
        })?;

        Ok(PortMap::from([("out_dict".to_owned(), out_dict)]))
    }
}

// ---------------------------------------------------------------------------
// IntraModalMerge
// ---------------------------------------------------------------------------

/// Conforms a list of same-modality images into one reference.
///
/// A single input passes through untouched; multiple inputs are concatenated
/// with `fslmerge -t` and averaged with `fslmaths -Tmean`. Outputs:
/// `out_file` (merged series) and `out_avg` (temporal mean).
#[derive(Debug, Clone, Default)]
pub struct IntraModalMerge;

impl IntraModalMerge {
    fn plan(
        &self,
        in_files: &[String],
        node_dir: &Path,
    ) -> (Vec<Vec<String>>, PortMap) {
        if in_files.len() == 1 {
            let only = in_files[0].clone();
            let outputs = PortMap::from([
                ("out_file".to_owned(), only.clone().into()),
                ("out_avg".to_owned(), only.into()),
            ]);
            return (Vec::new(), outputs);
        }

        let merged = out_path(node_dir, "merged.nii.gz");
        let avg = out_path(node_dir, "avg.nii.gz");

        let mut merge_argv = vec!["fslmerge".to_owned(), "-t".to_owned(), merged.clone()];
        merge_argv.extend(in_files.iter().cloned());
        let mean_argv = vec![
            "fslmaths".to_owned(),
            merged.clone(),
            "-Tmean".to_owned(),
            avg.clone(),
        ];

        let outputs = PortMap::from([
            ("out_file".to_owned(), merged.into()),
            ("out_avg".to_owned(), avg.into()),
        ]);
        (vec![merge_argv, mean_argv], outputs)
    }
}

#[async_trait]
impl Interface for IntraModalMerge {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let in_files = path_list_input(inputs, "in_files")?;
        if in_files.is_empty() {
            return Err(InterfaceError::MissingInput("in_files".to_owned()));
        }

        let (commands, outputs) = self.plan(&in_files, &ctx.node_dir);
        for argv in &commands {
            run_tool(argv, &[]).await?;
        }
        Ok(outputs)
    }
}
