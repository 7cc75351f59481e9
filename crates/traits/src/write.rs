use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    /// The operation is not part of the transformation output contract.
    /// Engines are never expected to call these on this sink; reaching one
    /// is a programming error on the engine side.
    #[error("writer operation `{0}` is not part of the transformation output contract")]
    Unsupported(&'static str),

    /// Writer calls arrived in an order the contract forbids.
    #[error("writer protocol violation: {0}")]
    Protocol(&'static str),

    /// The consumer abandoned the transformation; the producer should stop.
    #[error("transformation was cancelled")]
    Cancelled,

    /// The underlying output could not be produced.
    #[error("failed to emit output: {0}")]
    Emit(String),
}

/// The streaming-writer contract a transformation engine pushes into.
///
/// Call ordering follows the usual XML writer discipline: an element's
/// attributes are written (via `start_attribute` / `write_string` /
/// `end_attribute`) immediately after `start_element`, before any child
/// content. `write_string` outside an attribute produces text content;
/// adjacent calls may be coalesced by the sink.
///
/// Operations a transformation engine never emits (document prolog, DOCTYPE,
/// CDATA, entity references, raw bytes) fail with
/// [`WriteError::Unsupported`] by default.
pub trait EventWrite {
    fn start_element(&mut self, prefix: &str, local: &str, ns_uri: &str) -> Result<(), WriteError>;

    fn end_element(&mut self) -> Result<(), WriteError>;

    /// Writes a full end tag even where a self-closing tag would do.
    fn full_end_element(&mut self) -> Result<(), WriteError> {
        self.end_element()
    }

    fn start_attribute(
        &mut self,
        prefix: &str,
        local: &str,
        ns_uri: &str,
    ) -> Result<(), WriteError>;

    fn end_attribute(&mut self) -> Result<(), WriteError>;

    fn write_string(&mut self, text: &str) -> Result<(), WriteError>;

    /// Escaping hints are not honored at this boundary; raw text is treated
    /// as plain text.
    fn write_raw(&mut self, text: &str) -> Result<(), WriteError> {
        self.write_string(text)
    }

    fn write_comment(&mut self, text: &str) -> Result<(), WriteError>;

    fn write_processing_instruction(&mut self, target: &str, data: &str)
    -> Result<(), WriteError>;

    /// Signals end of output. No further calls are permitted afterwards.
    fn close(&mut self) -> Result<(), WriteError>;

    fn start_document(&mut self) -> Result<(), WriteError> {
        Err(WriteError::Unsupported("start_document"))
    }

    fn end_document(&mut self) -> Result<(), WriteError> {
        Err(WriteError::Unsupported("end_document"))
    }

    fn write_doctype(
        &mut self,
        _name: &str,
        _public_id: Option<&str>,
        _system_id: Option<&str>,
    ) -> Result<(), WriteError> {
        Err(WriteError::Unsupported("write_doctype"))
    }

    fn write_cdata(&mut self, _text: &str) -> Result<(), WriteError> {
        Err(WriteError::Unsupported("write_cdata"))
    }

    fn write_entity_ref(&mut self, _name: &str) -> Result<(), WriteError> {
        Err(WriteError::Unsupported("write_entity_ref"))
    }

    fn write_raw_bytes(&mut self, _bytes: &[u8]) -> Result<(), WriteError> {
        Err(WriteError::Unsupported("write_raw_bytes"))
    }
}
