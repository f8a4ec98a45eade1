//! `pipelines` crate — the fixed preprocessing workflow shapes and the
//! per-subject enumerator that composes them.

pub mod enhance;
pub mod enumerator;
pub mod fieldmap;
pub mod settings;

pub use enhance::enhance_and_skullstrip_wf;
pub use enumerator::workflow_enumerator;
pub use fieldmap::{fmap_estimator_wf, sbref_correct_wf, sdc_unwarp_wf};
pub use settings::Settings;
