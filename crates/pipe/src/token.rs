use std::sync::Arc;

use xslpull_qname::QName;

/// The kind of one buffered XML event.
///
/// `None` is the end-of-stream sentinel written by `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    EndElement,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    None,
}

/// One buffered XML event, passed from the producer to the consumer.
///
/// Attribute tokens form a run immediately following their owning Element
/// token; the run is terminated by the next non-Attribute token. Text,
/// comment and PI tokens carry no name.
#[derive(Debug, Clone)]
pub struct XmlToken {
    pub kind: NodeKind,
    pub name: Option<Arc<QName>>,
    pub value: Arc<str>,
}

impl XmlToken {
    pub fn new(kind: NodeKind, name: Option<Arc<QName>>, value: Arc<str>) -> Self {
        Self { kind, name, value }
    }

    /// The end-of-stream sentinel.
    pub fn sentinel() -> Self {
        Self {
            kind: NodeKind::None,
            name: None,
            value: Arc::from(""),
        }
    }
}
