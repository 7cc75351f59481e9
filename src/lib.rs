//! Pull-style reading of push-based XSLT transformation output.
//!
//! Transformation engines push their result into a streaming writer sink;
//! many consumers want the opposite: a reader they drive node by node. This
//! crate bridges the two. The engine (any [`Transform`] implementation)
//! writes into a [`BufferWriter`], whose tokens flow through a pipe to the
//! [`XslReader`] pull facade: either fully buffered in one thread, or
//! streamed on demand from a dedicated worker thread throttled by a bounded
//! ring.
//!
//! ```no_run
//! use xslpull::{IdentityTransform, TransformArgs, XslReader};
//!
//! let mut reader = XslReader::new(IdentityTransform::new());
//! reader.start_transform("<doc>hello</doc>", TransformArgs::new())?;
//! while reader.read()? {
//!     println!("{:?} {}", reader.node_type(), reader.local_name());
//! }
//! # Ok::<(), xslpull::ReaderError>(())
//! ```

pub mod engines;
pub mod error;
pub mod reader;
pub mod redirect;
pub mod scope;
pub mod serialize;
pub mod writer;

pub use engines::IdentityTransform;
pub use error::ReaderError;
pub use reader::{ReadState, ReaderSettings, XmlNodeType, XslReader};
pub use redirect::{FileSinkFactory, RedirectWriter, SinkFactory};
pub use scope::{ScopeManager, XmlSpace};
pub use serialize::{XmlEventSerializer, copy_to, serialize_to_string};
pub use writer::BufferWriter;

pub use xslpull_pipe::{BufferedPipe, NodeKind, ThreadedPipe, TokenPipe, XmlToken};
pub use xslpull_qname::{NS_XML, NS_XMLNS, NameTable, QName, QNameTable};
pub use xslpull_traits::{
    EventWrite, Param, Transform, TransformArgs, TransformError, WriteError, XmlInput,
};
