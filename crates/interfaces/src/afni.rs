//! Wrappers for AFNI command-line tools.

use std::path::Path;

use async_trait::async_trait;

use crate::command::run_tool;
use crate::traits::{out_path, path_input, Interface, PortMap, RunContext};
use crate::InterfaceError;

/// `3dUnifize` — intensity normalization (uniformizes the white-matter
/// intensity across the volume).
///
/// Inputs: `in_file`. Outputs: `out_file`.
#[derive(Debug, Clone)]
pub struct Unifize {
    /// Treat the input as T2-weighted contrast.
    pub t2: bool,
    /// `-clfrac` — size of the clip level fraction.
    pub clfrac: Option<f64>,
    pub out_file: &'static str,
}

impl Default for Unifize {
    fn default() -> Self {
        Self {
            t2: false,
            clfrac: None,
            out_file: "uni.nii.gz",
        }
    }
}

impl Unifize {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let out_file = out_path(node_dir, self.out_file);

        let mut argv = vec!["3dUnifize".to_owned()];
        if self.t2 {
            argv.push("-T2".to_owned());
        }
        if let Some(clfrac) = self.clfrac {
            argv.push("-clfrac".to_owned());
            argv.push(format!("{clfrac}"));
        }
        argv.push("-prefix".to_owned());
        argv.push(out_file.clone());
        argv.push("-input".to_owned());
        argv.push(in_file.to_owned());

        Ok((argv, PortMap::from([("out_file".to_owned(), out_file.into())])))
    }
}

#[async_trait]
impl Interface for Unifize {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

/// `3dAutomask` — generates a brain mask from an EPI volume.
///
/// Inputs: `in_file`. Outputs: `out_file` (the mask).
#[derive(Debug, Clone, Default)]
pub struct Automask {
    pub dilate: u32,
}

impl Automask {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let out_file = out_path(node_dir, "automask.nii.gz");

        let mut argv = vec!["3dAutomask".to_owned()];
        if self.dilate > 0 {
            argv.push("-dilate".to_owned());
            argv.push(self.dilate.to_string());
        }
        argv.push("-prefix".to_owned());
        argv.push(out_file.clone());
        argv.push(in_file.to_owned());

        Ok((argv, PortMap::from([("out_file".to_owned(), out_file.into())])))
    }
}

#[async_trait]
impl Interface for Automask {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn unifize_t2_with_clfrac() {
        let uni = Unifize {
            t2: true,
            clfrac: Some(0.4),
            out_file: "uni.nii.gz",
        };
        let inputs = PortMap::from([("in_file".to_owned(), json!("/d/brain.nii.gz"))]);
        let (argv, outputs) = uni.plan(&inputs, &PathBuf::from("/work/uni")).unwrap();

        assert_eq!(
            argv,
            [
                "3dUnifize",
                "-T2",
                "-clfrac",
                "0.4",
                "-prefix",
                "/work/uni/uni.nii.gz",
                "-input",
                "/d/brain.nii.gz"
            ]
        );
        assert_eq!(outputs["out_file"], "/work/uni/uni.nii.gz");
    }

    #[test]
    fn automask_dilate_flag_only_when_nonzero() {
        let inputs = PortMap::from([("in_file".to_owned(), json!("/d/uni.nii.gz"))]);

        let (argv, _) = Automask { dilate: 1 }
            .plan(&inputs, &PathBuf::from("/w"))
            .unwrap();
        assert_eq!(&argv[1..3], ["-dilate", "1"]);

        let (argv, _) = Automask { dilate: 0 }
            .plan(&inputs, &PathBuf::from("/w"))
            .unwrap();
        assert!(!argv.contains(&"-dilate".to_owned()));
    }
}
