//! Wrappers for ANTs command-line tools.

use std::path::Path;

use async_trait::async_trait;

use crate::command::run_tool;
use crate::traits::{out_path, path_input, Interface, PortMap, RunContext};
use crate::InterfaceError;

/// `N4BiasFieldCorrection` — removes smooth intensity inhomogeneity.
///
/// Inputs: `input_image`. Outputs: `output_image`.
#[derive(Debug, Clone)]
pub struct N4BiasFieldCorrection {
    pub dimension: u8,
    /// Exported as `ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS` for the process.
    pub num_threads: Option<usize>,
}

impl Default for N4BiasFieldCorrection {
    fn default() -> Self {
        Self {
            dimension: 3,
            num_threads: None,
        }
    }
}

impl N4BiasFieldCorrection {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let input_image = path_input(inputs, "input_image")?;
        let output_image = out_path(node_dir, "corrected.nii.gz");

        let argv = vec![
            "N4BiasFieldCorrection".to_owned(),
            "-d".to_owned(),
            self.dimension.to_string(),
            "--input-image".to_owned(),
            input_image.to_owned(),
            "--output".to_owned(),
            output_image.clone(),
        ];

        let outputs = PortMap::from([("output_image".to_owned(), output_image.into())]);
        Ok((argv, outputs))
    }

    fn envs(&self) -> Vec<(String, String)> {
        match self.num_threads {
            Some(n) => vec![(
                "ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS".to_owned(),
                n.to_string(),
            )],
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl Interface for N4BiasFieldCorrection {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &self.envs()).await?;
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn n4_builds_expected_argv() {
        let n4 = N4BiasFieldCorrection {
            dimension: 3,
            num_threads: Some(4),
        };
        let inputs = PortMap::from([("input_image".to_owned(), json!("/data/epi.nii.gz"))]);

        let (argv, outputs) = n4.plan(&inputs, &PathBuf::from("/work/n4")).unwrap();
        assert_eq!(argv[0], "N4BiasFieldCorrection");
        assert_eq!(&argv[1..3], ["-d", "3"]);
        assert_eq!(&argv[3..5], ["--input-image", "/data/epi.nii.gz"]);
        assert_eq!(outputs["output_image"], "/work/n4/corrected.nii.gz");

        let envs = n4.envs();
        assert_eq!(envs[0].0, "ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS");
        assert_eq!(envs[0].1, "4");
    }

    #[test]
    fn n4_rejects_missing_input() {
        let n4 = N4BiasFieldCorrection::default();
        let err = n4.plan(&PortMap::new(), &PathBuf::from("/work")).unwrap_err();
        assert!(matches!(err, InterfaceError::MissingInput(p) if p == "input_image"));
    }
}
