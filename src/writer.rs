//! The push-to-buffer writer: the sink handed to the transformation engine.
//!
//! Every writer call becomes a token in the pipe. Two pieces of buffering
//! happen here rather than in the pipe: adjacent text fragments are
//! coalesced into one Text token, and an attribute's name is held from
//! `start_attribute` until `end_attribute` delivers its accumulated value,
//! which is what establishes the element-then-attribute-run token layout
//! the reader relies on.

use std::sync::Arc;

use xslpull_pipe::{NodeKind, TokenPipe};
use xslpull_qname::{QName, QNameTable};
use xslpull_traits::{EventWrite, WriteError};

pub struct BufferWriter {
    pipe: Arc<dyn TokenPipe>,
    names: Arc<QNameTable>,
    // Coalesced text: the first fragment stays a bare string; the growable
    // buffer is only touched once a second fragment arrives.
    first_text: Option<String>,
    builder: String,
    current_attribute: Option<Arc<QName>>,
}

impl BufferWriter {
    pub fn new(pipe: Arc<dyn TokenPipe>, names: Arc<QNameTable>) -> Self {
        Self {
            pipe,
            names,
            first_text: None,
            builder: String::new(),
            current_attribute: None,
        }
    }

    pub fn reset(&mut self) {
        self.first_text = None;
        self.builder.clear();
        self.current_attribute = None;
    }

    fn append_text(&mut self, text: &str) {
        match &mut self.first_text {
            None => {
                debug_assert!(self.builder.is_empty());
                self.first_text = Some(text.to_string());
            }
            Some(first) => {
                if self.builder.is_empty() {
                    self.builder.push_str(first);
                }
                self.builder.push_str(text);
            }
        }
    }

    fn merge_text(&mut self) -> Arc<str> {
        let Some(first) = self.first_text.take() else {
            return self.names.empty_str();
        };
        if self.builder.is_empty() {
            Arc::from(first)
        } else {
            let merged: Arc<str> = Arc::from(self.builder.as_str());
            self.builder.clear();
            merged
        }
    }

    /// Flushes pending coalesced text as one Text token, preserving document
    /// order ahead of the next structural token.
    fn finish_text_node(&mut self) -> Result<(), WriteError> {
        let text = self.merge_text();
        if !text.is_empty() {
            self.pipe.write(NodeKind::Text, None, text)?;
        }
        Ok(())
    }
}

impl EventWrite for BufferWriter {
    fn start_element(&mut self, prefix: &str, local: &str, ns_uri: &str) -> Result<(), WriteError> {
        self.finish_text_node()?;
        let name = self.names.qname(local, ns_uri, prefix);
        self.pipe
            .write(NodeKind::Element, Some(name), self.names.empty_str())
    }

    fn end_element(&mut self) -> Result<(), WriteError> {
        self.finish_text_node()?;
        self.pipe
            .write(NodeKind::EndElement, None, self.names.empty_str())
    }

    fn start_attribute(
        &mut self,
        prefix: &str,
        local: &str,
        ns_uri: &str,
    ) -> Result<(), WriteError> {
        if self.current_attribute.is_some() {
            return Err(WriteError::Protocol(
                "start_attribute while another attribute is open",
            ));
        }
        self.current_attribute = Some(self.names.qname(local, ns_uri, prefix));
        Ok(())
    }

    fn end_attribute(&mut self) -> Result<(), WriteError> {
        let name = self
            .current_attribute
            .take()
            .ok_or(WriteError::Protocol("end_attribute without start_attribute"))?;
        let value = self.merge_text();
        self.pipe.write(NodeKind::Attribute, Some(name), value)
    }

    fn write_string(&mut self, text: &str) -> Result<(), WriteError> {
        self.append_text(text);
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<(), WriteError> {
        self.finish_text_node()?;
        self.pipe.write(NodeKind::Comment, None, Arc::from(text))
    }

    fn write_processing_instruction(
        &mut self,
        target: &str,
        data: &str,
    ) -> Result<(), WriteError> {
        self.finish_text_node()?;
        let name = self.names.qname(target, "", "");
        self.pipe
            .write(NodeKind::ProcessingInstruction, Some(name), Arc::from(data))
    }

    fn close(&mut self) -> Result<(), WriteError> {
        self.finish_text_node()?;
        self.pipe.close()
    }
}
