//! Serialization of transformation output back to XML text.
//!
//! [`XmlEventSerializer`] is a push-side sink: an `EventWrite` whose calls
//! land in a [`quick_xml::Writer`]. [`copy_to`] replays a started reader
//! into any sink, and [`serialize_to_string`] combines the two for the
//! common transform-to-text case.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};

use xslpull_traits::{EventWrite, TransformError, WriteError};

use crate::error::ReaderError;
use crate::reader::{XmlNodeType, XslReader};

/// An element start tag that is still collecting attributes.
struct PendingStart {
    name: String,
    attrs: Vec<(String, String)>,
}

/// Writes push events out as XML text.
///
/// Attributes arrive after `start_element`, so the start tag is held back
/// until the first non-attribute event and emitted with its collected
/// attributes then.
pub struct XmlEventSerializer<W: io::Write> {
    writer: Writer<W>,
    open_elements: Vec<String>,
    pending: Option<PendingStart>,
    current_attr: Option<String>,
    attr_value: String,
}

impl<W: io::Write> XmlEventSerializer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: Writer::new(sink),
            open_elements: Vec::new(),
            pending: None,
            current_attr: None,
            attr_value: String::new(),
        }
    }

    /// Recovers the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn flush_pending(&mut self) -> Result<(), WriteError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let mut start = BytesStart::new(pending.name.as_str());
        for (name, value) in &pending.attrs {
            start.push_attribute((name.as_str(), value.as_str()));
        }
        self.writer
            .write_event(Event::Start(start))
            .map_err(emit_error)
    }
}

fn emit_error(error: impl std::fmt::Display) -> WriteError {
    WriteError::Emit(error.to_string())
}

fn prefixed(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

impl<W: io::Write> EventWrite for XmlEventSerializer<W> {
    fn start_element(&mut self, prefix: &str, local: &str, _ns_uri: &str) -> Result<(), WriteError> {
        self.flush_pending()?;
        let name = prefixed(prefix, local);
        self.open_elements.push(name.clone());
        self.pending = Some(PendingStart {
            name,
            attrs: Vec::new(),
        });
        Ok(())
    }

    fn end_element(&mut self) -> Result<(), WriteError> {
        self.flush_pending()?;
        let name = self
            .open_elements
            .pop()
            .ok_or(WriteError::Protocol("end_element without open element"))?;
        self.writer
            .write_event(Event::End(BytesEnd::new(name.as_str())))
            .map_err(emit_error)
    }

    fn start_attribute(
        &mut self,
        prefix: &str,
        local: &str,
        _ns_uri: &str,
    ) -> Result<(), WriteError> {
        if self.pending.is_none() {
            return Err(WriteError::Protocol(
                "start_attribute outside an element start tag",
            ));
        }
        self.current_attr = Some(prefixed(prefix, local));
        self.attr_value.clear();
        Ok(())
    }

    fn end_attribute(&mut self) -> Result<(), WriteError> {
        let name = self
            .current_attr
            .take()
            .ok_or(WriteError::Protocol("end_attribute without start_attribute"))?;
        let value = std::mem::take(&mut self.attr_value);
        match &mut self.pending {
            Some(pending) => {
                pending.attrs.push((name, value));
                Ok(())
            }
            None => Err(WriteError::Protocol(
                "attribute finished after its start tag was closed",
            )),
        }
    }

    fn write_string(&mut self, text: &str) -> Result<(), WriteError> {
        if self.current_attr.is_some() {
            self.attr_value.push_str(text);
            return Ok(());
        }
        self.flush_pending()?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(emit_error)
    }

    fn write_comment(&mut self, text: &str) -> Result<(), WriteError> {
        self.flush_pending()?;
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(text)))
            .map_err(emit_error)
    }

    fn write_processing_instruction(
        &mut self,
        target: &str,
        data: &str,
    ) -> Result<(), WriteError> {
        self.flush_pending()?;
        let content = if data.is_empty() {
            target.to_string()
        } else {
            format!("{target} {data}")
        };
        self.writer
            .write_event(Event::PI(BytesPI::new(content.as_str())))
            .map_err(emit_error)
    }

    fn close(&mut self) -> Result<(), WriteError> {
        self.flush_pending()?;
        if !self.open_elements.is_empty() {
            return Err(WriteError::Protocol("output closed with open elements"));
        }
        self.writer.get_mut().flush().map_err(emit_error)
    }
}

/// Replays the remaining nodes of a started reader into a push sink and
/// closes the sink.
pub fn copy_to(reader: &mut XslReader, sink: &mut dyn EventWrite) -> Result<(), ReaderError> {
    fn forward(result: Result<(), WriteError>) -> Result<(), ReaderError> {
        result.map_err(|e| ReaderError::Transform(TransformError::Write(e)))
    }

    while reader.read()? {
        match reader.node_type() {
            XmlNodeType::Element => {
                forward(sink.start_element(
                    reader.prefix(),
                    reader.local_name(),
                    reader.namespace_uri(),
                ))?;
                if reader.move_to_first_attribute() {
                    loop {
                        forward(sink.start_attribute(
                            reader.prefix(),
                            reader.local_name(),
                            reader.namespace_uri(),
                        ))?;
                        forward(sink.write_string(reader.value()))?;
                        forward(sink.end_attribute())?;
                        if !reader.move_to_next_attribute() {
                            break;
                        }
                    }
                    reader.move_to_element();
                }
            }
            XmlNodeType::EndElement => forward(sink.end_element())?,
            XmlNodeType::Text
            | XmlNodeType::Whitespace
            | XmlNodeType::SignificantWhitespace => {
                forward(sink.write_string(reader.value()))?;
            }
            XmlNodeType::Comment => forward(sink.write_comment(reader.value()))?,
            XmlNodeType::ProcessingInstruction => {
                forward(sink.write_processing_instruction(reader.local_name(), reader.value()))?;
            }
            XmlNodeType::None | XmlNodeType::Attribute => {}
        }
    }
    forward(sink.close())
}

/// Drains a started reader into a string of XML text.
pub fn serialize_to_string(reader: &mut XslReader) -> Result<String, ReaderError> {
    let mut serializer = XmlEventSerializer::new(Vec::new());
    copy_to(reader, &mut serializer)?;
    Ok(String::from_utf8_lossy(&serializer.into_inner()).into_owned())
}
