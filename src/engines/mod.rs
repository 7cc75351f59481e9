//! Bundled [`Transform`](xslpull_traits::Transform) implementations.
//!
//! Real deployments plug in an actual XSLT engine; the identity engine here
//! exists so the pipeline can be exercised end-to-end without one, and as
//! the reference for how an engine is expected to drive the writer sink.

pub mod identity;

pub use identity::IdentityTransform;
