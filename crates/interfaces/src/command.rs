//! Shared plumbing for spawning the external image-processing binaries.

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::InterfaceError;

/// Run an external tool to completion, capturing stderr for diagnostics.
///
/// `argv[0]` is the program name; the rest are its arguments. `envs` are
/// extra environment variables (e.g. per-tool thread limits).
#[instrument(skip(argv, envs), fields(program = %argv[0]))]
pub async fn run_tool(argv: &[String], envs: &[(String, String)]) -> Result<(), InterfaceError> {
    debug!("exec: {}", argv.join(" "));

    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .output()
        .await
        .map_err(|source| InterfaceError::Spawn {
            program: argv[0].clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(InterfaceError::CommandFailed {
            program: argv[0].clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}
