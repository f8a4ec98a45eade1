//! `interfaces` crate — the `Interface` trait and the command-wrapping
//! implementations for the external image-processing tools.
//!
//! Every node in a workflow — real tool wrappers and test doubles alike —
//! implements [`Interface`]. The engine crate dispatches execution through
//! this trait object; an interface only knows how to turn its input ports
//! into an argument vector plus the output paths it promises to produce.

pub mod afni;
pub mod ants;
pub mod command;
pub mod error;
pub mod fsl;
pub mod mock;
pub mod traits;
pub mod utility;

pub use error::InterfaceError;
pub use traits::{Interface, PortMap, RunContext};
