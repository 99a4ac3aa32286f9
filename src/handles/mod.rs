//! Handle-based resource indirection
//!
//! Every resource that lives inside an engine (renderables, rigid bodies,
//! crowds, script objects, ...) is referred to through a typed
//! generational [`Handle`], backed by a [`HandleVector`] owned by that
//! engine.

mod handle;
mod vector;

pub use handle::Handle;
pub use vector::HandleVector;
