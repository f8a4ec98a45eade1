//! Wrappers for FSL command-line tools.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::run_tool;
use crate::traits::{out_path, path_input, Interface, PortMap, RunContext};
use crate::InterfaceError;

// ---------------------------------------------------------------------------
// BET
// ---------------------------------------------------------------------------

/// `bet` — brain extraction (skull-stripping).
///
/// Inputs: `in_file`. Outputs: `out_file` and, when `mask` is set,
/// `mask_file` (FSL appends the `_mask` suffix to the output stem).
#[derive(Debug, Clone)]
pub struct Bet {
    pub frac: f32,
    pub mask: bool,
}

impl Bet {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let out_file = out_path(node_dir, "brain.nii.gz");

        let mut argv = vec![
            "bet".to_owned(),
            in_file.to_owned(),
            out_file.clone(),
            "-f".to_owned(),
            format!("{}", self.frac),
        ];

        let mut outputs = PortMap::from([("out_file".to_owned(), out_file.into())]);
        if self.mask {
            argv.push("-m".to_owned());
            outputs.insert(
                "mask_file".to_owned(),
                out_path(node_dir, "brain_mask.nii.gz").into(),
            );
        }
        Ok((argv, outputs))
    }
}

#[async_trait]
impl Interface for Bet {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// fslmaths wrappers
// ---------------------------------------------------------------------------

/// `fslmaths <in> -<op> <operand> <out>` — voxelwise binary arithmetic.
///
/// Inputs: `in_file`, `operand_file`. Outputs: `out_file`.
#[derive(Debug, Clone)]
pub struct BinaryMaths {
    /// Operation name as fslmaths spells it (`mul`, `add`, `sub`, `div`).
    pub operation: &'static str,
}

impl BinaryMaths {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let operand_file = path_input(inputs, "operand_file")?;
        let out_file = out_path(node_dir, "maths.nii.gz");

        let argv = vec![
            "fslmaths".to_owned(),
            in_file.to_owned(),
            format!("-{}", self.operation),
            operand_file.to_owned(),
            out_file.clone(),
        ];
        Ok((argv, PortMap::from([("out_file".to_owned(), out_file.into())])))
    }
}

#[async_trait]
impl Interface for BinaryMaths {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

/// `fslmaths <in> -mas <mask> <out>` — zero everything outside the mask.
///
/// Inputs: `in_file`, `mask_file`. Outputs: `out_file`.
#[derive(Debug, Clone, Default)]
pub struct ApplyMask;

impl ApplyMask {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let mask_file = path_input(inputs, "mask_file")?;
        let out_file = out_path(node_dir, "masked.nii.gz");

        let argv = vec![
            "fslmaths".to_owned(),
            in_file.to_owned(),
            "-mas".to_owned(),
            mask_file.to_owned(),
            out_file.clone(),
        ];
        Ok((argv, PortMap::from([("out_file".to_owned(), out_file.into())])))
    }
}

#[async_trait]
impl Interface for ApplyMask {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// Field-map estimation tools
// ---------------------------------------------------------------------------

/// `prelude` — phase unwrapping.
///
/// Inputs: `phase_file`, `magnitude_file`, optional `mask_file`.
/// Outputs: `unwrapped_phase_file`.
#[derive(Debug, Clone, Default)]
pub struct Prelude;

impl Prelude {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let phase = path_input(inputs, "phase_file")?;
        let magnitude = path_input(inputs, "magnitude_file")?;
        let out_file = out_path(node_dir, "unwrapped.nii.gz");

        let mut argv = vec![
            "prelude".to_owned(),
            "-p".to_owned(),
            phase.to_owned(),
            "-a".to_owned(),
            magnitude.to_owned(),
            "-o".to_owned(),
            out_file.clone(),
        ];
        if let Ok(mask) = path_input(inputs, "mask_file") {
            argv.push("-m".to_owned());
            argv.push(mask.to_owned());
        }
        Ok((
            argv,
            PortMap::from([("unwrapped_phase_file".to_owned(), out_file.into())]),
        ))
    }
}

#[async_trait]
impl Interface for Prelude {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

/// `fsl_prepare_fieldmap` — converts an unwrapped phase-difference image into
/// a field map in rad/s.
///
/// Inputs: `in_phase`, `in_magnitude`. Outputs: `out_fieldmap`.
#[derive(Debug, Clone)]
pub struct PrepareFieldmap {
    pub scanner: &'static str,
    /// Echo-time difference of the field-map acquisition, in milliseconds.
    pub delta_te: f64,
}

impl Default for PrepareFieldmap {
    fn default() -> Self {
        Self {
            scanner: "SIEMENS",
            delta_te: 2.46,
        }
    }
}

impl PrepareFieldmap {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let phase = path_input(inputs, "in_phase")?;
        let magnitude = path_input(inputs, "in_magnitude")?;
        let out_file = out_path(node_dir, "fieldmap.nii.gz");

        let argv = vec![
            "fsl_prepare_fieldmap".to_owned(),
            self.scanner.to_owned(),
            phase.to_owned(),
            magnitude.to_owned(),
            out_file.clone(),
            format!("{}", self.delta_te),
        ];
        Ok((
            argv,
            PortMap::from([("out_fieldmap".to_owned(), out_file.into())]),
        ))
    }
}

#[async_trait]
impl Interface for PrepareFieldmap {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}

/// `fugue` — applies a field map to unwarp susceptibility distortion.
///
/// Inputs: `in_file`, `fmap_file`, optional `mask_file`, optional `metadata`
/// (sidecar dictionary; `EffectiveEchoSpacing` becomes `--dwell`).
/// Outputs: `out_file`.
#[derive(Debug, Clone)]
pub struct Fugue {
    /// Phase-encoding axis the unwarp shifts along (`y`, `y-`, ...).
    pub unwarp_direction: &'static str,
}

impl Default for Fugue {
    fn default() -> Self {
        Self {
            unwarp_direction: "y-",
        }
    }
}

impl Fugue {
    fn plan(
        &self,
        inputs: &PortMap,
        node_dir: &Path,
    ) -> Result<(Vec<String>, PortMap), InterfaceError> {
        let in_file = path_input(inputs, "in_file")?;
        let fmap_file = path_input(inputs, "fmap_file")?;
        let out_file = out_path(node_dir, "unwarped.nii.gz");

        let mut argv = vec![
            "fugue".to_owned(),
            "-i".to_owned(),
            in_file.to_owned(),
            format!("--loadfmap={fmap_file}"),
            format!("--unwarpdir={}", self.unwarp_direction),
            "-u".to_owned(),
            out_file.clone(),
        ];
        if let Ok(mask) = path_input(inputs, "mask_file") {
            argv.push(format!("--mask={mask}"));
        }
        if let Some(dwell) = inputs
            .get("metadata")
            .and_then(|m| m.get("EffectiveEchoSpacing"))
            .and_then(Value::as_f64)
        {
            argv.push(format!("--dwell={dwell}"));
        }
        Ok((argv, PortMap::from([("out_file".to_owned(), out_file.into())])))
    }
}

#[async_trait]
impl Interface for Fugue {
    async fn run(&self, inputs: &PortMap, ctx: &RunContext) -> Result<PortMap, InterfaceError> {
        let (argv, outputs) = self.plan(inputs, &ctx.node_dir)?;
        run_tool(&argv, &[]).await?;
        Ok(outputs)
    }
}
