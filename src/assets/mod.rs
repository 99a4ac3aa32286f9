//! Asset naming
//!
//! Maps asset handles to stable names so scenes can be saved in one run and
//! loaded in another.

mod registry;

pub use registry::{ResourceKind, ResourceRegistry, ResourceTag};
