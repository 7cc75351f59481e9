//! Contracts between the transformation engine and the pull-reader adapter.
//!
//! [`EventWrite`] is the push-style sink an engine emits its output into;
//! [`Transform`] is the engine itself, consumed as an opaque collaborator.

pub mod transform;
pub mod write;

pub use transform::{Param, Transform, TransformArgs, TransformError, XmlInput};
pub use write::{EventWrite, WriteError};
