use thiserror::Error;
use xslpull_traits::TransformError;

#[derive(Error, Debug)]
pub enum ReaderError {
    /// The transformation engine failed while producing output. In the
    /// multi-threaded configuration the failure happened on the worker
    /// thread and is re-raised here, at the pull boundary.
    #[error("error during transformation execution: {0}")]
    Transform(#[from] TransformError),

    /// An attribute index outside the current element's attribute run, or an
    /// attribute operation while not positioned on an element.
    #[error("attribute index {index} out of range for a run of {count} attributes")]
    AttributeOutOfRange { index: usize, count: usize },

    /// `xml:space` only admits "default" and "preserve".
    #[error("invalid xml:space value `{0}`")]
    InvalidXmlSpace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
