//! The pull-reader facade over a running transformation.
//!
//! [`XslReader`] starts the engine against a buffer-writer sink and exposes
//! the recorded output through a pull API: `read()` advances node by node,
//! attribute accessors navigate the current element's buffered attribute
//! run, and the scope stack supplies end-tag names, namespace lookups and
//! the effective `xml:lang`/`xml:space`.
//!
//! Two scheduling modes, picked at construction. In multi-threaded mode the
//! engine runs on a dedicated worker thread and is throttled by the ring
//! buffer, so output is produced on demand as the consumer reads. In
//! single-threaded mode the whole transformation runs inside
//! `start_transform` and is fully buffered before the first `read()`; on
//! small outputs that beats the thread hand-off overhead.

use std::sync::Arc;
use std::thread;

use log::{debug, warn};

use xslpull_pipe::{BufferedPipe, NodeKind, ThreadedPipe, TokenPipe, XmlToken};
use xslpull_qname::{QName, QNameTable};
use xslpull_traits::{EventWrite, Transform, TransformArgs, TransformError, XmlInput};

use crate::error::ReaderError;
use crate::scope::{ScopeManager, XmlSpace};
use crate::writer::BufferWriter;

/// The node kind the reader is currently positioned on.
///
/// `Whitespace` and `SignificantWhitespace` are derived from Text nodes
/// whose content is all control/space characters, split on the effective
/// `xml:space` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlNodeType {
    None,
    Element,
    Attribute,
    Text,
    EndElement,
    Comment,
    ProcessingInstruction,
    Whitespace,
    SignificantWhitespace,
}

/// Coarse reader lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Initial,
    Interactive,
    EndOfFile,
    Closed,
}

/// Construction-time configuration.
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// Run the engine on a dedicated worker thread (default) or inline.
    pub multi_thread: bool,
    /// Initial token-buffer size in nodes, not bytes. Rounded up to the next
    /// power of two for the threaded ring; the buffer always grows enough to
    /// hold any single element start tag with all its attributes.
    pub initial_buffer_size: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            multi_thread: true,
            initial_buffer_size: 256,
        }
    }
}

pub struct XslReader {
    engine: Arc<dyn Transform>,
    settings: ReaderSettings,
    names: Arc<QNameTable>,
    pipe: Arc<dyn TokenPipe>,
    scope: ScopeManager,
    worker: Option<thread::JoinHandle<()>>,
    started: bool,

    // Position state. `att_offset` is 0 when positioned on the element
    // itself, i + 1 when positioned on attribute i.
    att_offset: usize,
    att_count: usize,
    depth: usize,
    node_type: XmlNodeType,
    read_state: ReadState,
    qname: Arc<QName>,
    value: Arc<str>,
}

impl XslReader {
    pub fn new(engine: impl Transform + 'static) -> Self {
        Self::with_settings(engine, ReaderSettings::default())
    }

    pub fn with_settings(engine: impl Transform + 'static, settings: ReaderSettings) -> Self {
        let names = Arc::new(QNameTable::new());
        let pipe: Arc<dyn TokenPipe> = if settings.multi_thread {
            Arc::new(ThreadedPipe::new(settings.initial_buffer_size))
        } else {
            Arc::new(BufferedPipe::new(settings.initial_buffer_size))
        };
        let scope = ScopeManager::new(Arc::clone(&names));
        let qname = names.empty();
        let value = names.empty_str();
        Self {
            engine: Arc::new(engine),
            settings,
            names,
            pipe,
            scope,
            worker: None,
            started: false,
            att_offset: 0,
            att_count: 0,
            depth: 0,
            node_type: XmlNodeType::None,
            read_state: ReadState::Initial,
            qname,
            value,
        }
    }

    /// Starts a transformation of `input` with `args`. Any still-running
    /// previous transformation is cancelled and joined first, then writer,
    /// scope and buffer state are reset, so at most one transformation is
    /// ever active per reader.
    ///
    /// In single-threaded mode the whole transformation runs inside this
    /// call and engine failures surface here; in multi-threaded mode they
    /// surface from the `read()` that first observes them.
    pub fn start_transform(
        &mut self,
        input: impl Into<XmlInput>,
        args: TransformArgs,
    ) -> Result<(), ReaderError> {
        self.abort_worker();
        self.pipe.reset();
        self.scope.reset();
        self.depth = 0;
        self.att_offset = 0;
        self.set_undefined(ReadState::Initial);
        self.started = true;

        let input = input.into();
        let mut writer = BufferWriter::new(Arc::clone(&self.pipe), Arc::clone(&self.names));
        if self.settings.multi_thread {
            let engine = Arc::clone(&self.engine);
            let pipe = Arc::clone(&self.pipe);
            debug!("starting transformation worker");
            let handle = thread::Builder::new()
                .name("xslpull-transform".to_string())
                .spawn(move || {
                    if let Err(error) = run_transform(engine.as_ref(), input, &args, &mut writer) {
                        pipe.write_error(error);
                    }
                })?;
            self.worker = Some(handle);
        } else {
            run_transform(self.engine.as_ref(), input, &args, &mut writer)
                .map_err(ReaderError::Transform)?;
        }
        Ok(())
    }

    /// Advances to the next node. `Ok(false)` is normal end of stream.
    pub fn read(&mut self) -> Result<bool, ReaderError> {
        if !self.started {
            return Ok(false);
        }
        // Leave the current node.
        match self.node_type {
            XmlNodeType::None => {
                if self.read_state == ReadState::EndOfFile || self.read_state == ReadState::Closed {
                    return Ok(false);
                }
                self.read_state = ReadState::Interactive;
            }
            XmlNodeType::Attribute => {
                self.att_offset = 0;
                self.depth = self.depth.saturating_sub(1);
                self.leave_element();
            }
            XmlNodeType::Element => {
                self.leave_element();
            }
            XmlNodeType::EndElement => {
                self.scope.pop_scope();
                self.pipe.free_tokens(1);
            }
            XmlNodeType::Text if self.att_offset != 0 => {
                // Positioned on the text inside an attribute.
                self.att_offset = 0;
                self.depth = self.depth.saturating_sub(2);
                self.leave_element();
            }
            XmlNodeType::Text
            | XmlNodeType::Comment
            | XmlNodeType::ProcessingInstruction
            | XmlNodeType::Whitespace
            | XmlNodeType::SignificantWhitespace => {
                self.pipe.free_tokens(1);
            }
        }
        debug_assert_eq!(self.att_offset, 0);
        debug_assert_eq!(self.read_state, ReadState::Interactive);
        self.att_count = 0;

        // Step onto the next node.
        let token = self.next_token()?;
        if token.kind == NodeKind::None {
            self.set_undefined(ReadState::EndOfFile);
            return Ok(false);
        }
        self.qname = token.name.unwrap_or_else(|| self.names.empty());
        self.value = token.value;
        match token.kind {
            NodeKind::Element => {
                self.node_type = XmlNodeType::Element;
                self.drain_attribute_run()?;
                self.scope.push_scope(Arc::clone(&self.qname));
            }
            NodeKind::EndElement => {
                self.node_type = XmlNodeType::EndElement;
                self.qname = match self.scope.name() {
                    Some(name) => name,
                    None => self.names.empty(),
                };
                self.depth = self.depth.saturating_sub(1);
            }
            NodeKind::Text => {
                self.node_type = if is_whitespace(&self.value) {
                    if self.scope.space() == XmlSpace::Preserve {
                        XmlNodeType::SignificantWhitespace
                    } else {
                        XmlNodeType::Whitespace
                    }
                } else {
                    XmlNodeType::Text
                };
            }
            NodeKind::Comment => {
                self.node_type = XmlNodeType::Comment;
            }
            NodeKind::ProcessingInstruction => {
                self.node_type = XmlNodeType::ProcessingInstruction;
            }
            NodeKind::Attribute | NodeKind::None => {
                return Err(ReaderError::Transform(TransformError::Engine(
                    "attribute token outside an element start tag".to_string(),
                )));
            }
        }
        Ok(true)
    }

    fn leave_element(&mut self) {
        self.pipe.free_tokens(1 + self.att_count);
        self.depth += 1;
    }

    fn next_token(&mut self) -> Result<XmlToken, ReaderError> {
        match self.pipe.read() {
            Ok(token) => Ok(token),
            Err(error) => {
                // Surface the failure exactly once; afterwards the reader
                // reports plain end of stream.
                self.set_undefined(ReadState::EndOfFile);
                Err(ReaderError::Transform(error))
            }
        }
    }

    /// Reads the element's whole attribute run out of the pipe so that
    /// `attribute_count` and attribute access work before any child content
    /// is visible, registering namespace / lang / space bindings as they go
    /// by. The terminating non-attribute token stays consumed-but-unfreed;
    /// freeing the run rewinds the cursor back onto it.
    fn drain_attribute_run(&mut self) -> Result<(), ReaderError> {
        loop {
            let token = self.next_token()?;
            if token.kind != NodeKind::Attribute {
                return Ok(());
            }
            let name = match token.name {
                Some(name) => name,
                None => {
                    return Err(ReaderError::Transform(TransformError::Engine(
                        "attribute token without a name".to_string(),
                    )));
                }
            };
            if &*name.prefix == "xmlns" {
                // xmlns:foo="uri"
                self.scope
                    .add_namespace(Arc::clone(&name.local), &token.value);
            } else if Arc::ptr_eq(&name, &self.names.xmlns()) {
                // xmlns="uri": the atomized empty prefix is the key.
                self.scope
                    .add_namespace(Arc::clone(&name.prefix), &token.value);
            } else if Arc::ptr_eq(&name, &self.names.xml_lang()) {
                self.scope.add_lang(&token.value);
            } else if Arc::ptr_eq(&name, &self.names.xml_space()) {
                self.scope.add_space(&token.value)?;
            }
            self.att_count += 1;
        }
    }

    fn set_undefined(&mut self, read_state: ReadState) {
        self.qname = self.names.empty();
        self.value = self.names.empty_str();
        self.node_type = XmlNodeType::None;
        self.att_count = 0;
        self.att_offset = 0;
        self.read_state = read_state;
    }

    fn abort_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if !handle.is_finished() {
                warn!("aborting still-running transformation worker");
            }
            self.pipe.cancel();
            if handle.join().is_err() {
                warn!("transformation worker panicked");
            }
        }
    }

    // ------------------------------------------------------------------
    // Position accessors
    // ------------------------------------------------------------------

    pub fn node_type(&self) -> XmlNodeType {
        self.node_type
    }

    pub fn read_state(&self) -> ReadState {
        self.read_state
    }

    pub fn eof(&self) -> bool {
        self.read_state == ReadState::EndOfFile
    }

    pub fn local_name(&self) -> &str {
        &self.qname.local
    }

    pub fn namespace_uri(&self) -> &str {
        &self.qname.ns_uri
    }

    pub fn prefix(&self) -> &str {
        &self.qname.prefix
    }

    pub fn qname(&self) -> &Arc<QName> {
        &self.qname
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn attribute_count(&self) -> usize {
        self.att_count
    }

    /// Always empty: the transformation output has no retrievable base URI.
    pub fn base_uri(&self) -> &str {
        ""
    }

    /// Always false: no lookahead distinguishes `<e/>` from `<e></e>`.
    pub fn is_empty_element(&self) -> bool {
        false
    }

    pub fn xml_lang(&self) -> &str {
        self.scope.lang()
    }

    pub fn xml_space(&self) -> XmlSpace {
        self.scope.space()
    }

    pub fn lookup_namespace(&self, prefix: &str) -> Option<Arc<str>> {
        self.scope.lookup_namespace(prefix)
    }

    /// The shared name table; interned names compare by pointer identity.
    pub fn name_table(&self) -> &Arc<QNameTable> {
        &self.names
    }

    /// Discards reader state immediately, without draining remaining output.
    pub fn close(&mut self) {
        self.set_undefined(ReadState::Closed);
    }

    // ------------------------------------------------------------------
    // Attribute access and navigation
    // ------------------------------------------------------------------

    fn is_inside_element(&self) -> bool {
        matches!(
            self.node_type,
            XmlNodeType::Element | XmlNodeType::Attribute
        ) || (self.node_type == XmlNodeType::Text && self.att_offset != 0)
    }

    fn out_of_range(&self, index: usize) -> ReaderError {
        ReaderError::AttributeOutOfRange {
            index,
            count: self.att_count,
        }
    }

    /// The value of attribute `index` of the current element.
    pub fn get_attribute(&self, index: usize) -> Result<Arc<str>, ReaderError> {
        if !self.is_inside_element() || index >= self.att_count {
            return Err(self.out_of_range(index));
        }
        match self.pipe.get_token(index + 1) {
            Some(token) => Ok(token.value),
            None => Err(self.out_of_range(index)),
        }
    }

    /// Looks an attribute up by its possibly prefixed name, e.g. `xml:lang`.
    pub fn get_attribute_by_name(&self, name: &str) -> Option<Arc<str>> {
        let index = self.find_attribute(name)?;
        self.get_attribute(index).ok()
    }

    /// Looks an attribute up by local name and namespace URI.
    pub fn get_attribute_ns(&self, local: &str, ns_uri: &str) -> Option<Arc<str>> {
        if !self.is_inside_element() {
            return None;
        }
        for offset in 1..=self.att_count {
            let token = self.pipe.get_token(offset)?;
            if let Some(name) = &token.name {
                if &*name.local == local && &*name.ns_uri == ns_uri {
                    return Some(token.value);
                }
            }
        }
        None
    }

    fn find_attribute(&self, name: &str) -> Option<usize> {
        if !self.is_inside_element() {
            return None;
        }
        let (prefix, local) = match name.split_once(':') {
            None => ("", name),
            Some(("", _)) => return None,
            Some((prefix, local)) => (prefix, local),
        };
        for offset in 1..=self.att_count {
            let token = self.pipe.get_token(offset)?;
            if let Some(qname) = &token.name {
                if &*qname.local == local && &*qname.prefix == prefix {
                    return Some(offset - 1);
                }
            }
        }
        None
    }

    /// Positions the reader on attribute `index` of the current element.
    pub fn move_to_attribute(&mut self, index: usize) -> Result<(), ReaderError> {
        if !self.is_inside_element() || index >= self.att_count {
            return Err(self.out_of_range(index));
        }
        let token = self
            .pipe
            .get_token(index + 1)
            .ok_or_else(|| self.out_of_range(index))?;
        self.change_depth_to_element();
        self.att_offset = index + 1;
        self.depth += 1;
        self.apply_token_position(token, XmlNodeType::Attribute);
        Ok(())
    }

    pub fn move_to_attribute_by_name(&mut self, name: &str) -> bool {
        match self.find_attribute(name) {
            Some(index) => self.move_to_attribute(index).is_ok(),
            None => false,
        }
    }

    pub fn move_to_attribute_ns(&mut self, local: &str, ns_uri: &str) -> bool {
        if !self.is_inside_element() {
            return false;
        }
        for offset in 1..=self.att_count {
            let Some(token) = self.pipe.get_token(offset) else {
                return false;
            };
            let matches = token
                .name
                .as_ref()
                .is_some_and(|n| &*n.local == local && &*n.ns_uri == ns_uri);
            if matches {
                self.change_depth_to_element();
                self.att_offset = offset;
                self.depth += 1;
                self.apply_token_position(token, XmlNodeType::Attribute);
                return true;
            }
        }
        false
    }

    pub fn move_to_first_attribute(&mut self) -> bool {
        if !self.is_inside_element() {
            return false;
        }
        // Normalize onto the element so the step below starts from a known
        // depth, wherever in the attribute run we are now.
        self.change_depth_to_element();
        self.att_offset = 0;
        self.node_type = XmlNodeType::Element;
        self.move_to_next_attribute()
    }

    pub fn move_to_next_attribute(&mut self) -> bool {
        if !self.is_inside_element() || self.att_offset >= self.att_count {
            return false;
        }
        self.change_depth_to_element();
        self.depth += 1;
        self.att_offset += 1;
        match self.pipe.get_token(self.att_offset) {
            Some(token) => {
                self.apply_token_position(token, XmlNodeType::Attribute);
                true
            }
            None => false,
        }
    }

    /// Moves back from an attribute (or attribute text) to its element.
    pub fn move_to_element(&mut self) -> bool {
        if self.node_type != XmlNodeType::Attribute
            && !(self.node_type == XmlNodeType::Text && self.att_offset != 0)
        {
            return false;
        }
        self.change_depth_to_element();
        self.att_offset = 0;
        match self.pipe.get_token(0) {
            Some(token) => {
                self.apply_token_position(token, XmlNodeType::Element);
                true
            }
            None => false,
        }
    }

    /// Steps from an attribute onto its value as a text node, one level
    /// deeper, as pull-reader depth semantics require.
    pub fn read_attribute_value(&mut self) -> bool {
        if self.node_type != XmlNodeType::Attribute {
            return false;
        }
        self.node_type = XmlNodeType::Text;
        self.depth += 1;
        true
    }

    fn apply_token_position(&mut self, token: XmlToken, node_type: XmlNodeType) {
        self.qname = token.name.unwrap_or_else(|| self.names.empty());
        self.value = token.value;
        self.node_type = node_type;
    }

    fn change_depth_to_element(&mut self) {
        match self.node_type {
            XmlNodeType::Attribute => {
                self.depth = self.depth.saturating_sub(1);
            }
            XmlNodeType::Text if self.att_offset != 0 => {
                self.depth = self.depth.saturating_sub(2);
            }
            _ => {}
        }
    }
}

impl Drop for XslReader {
    fn drop(&mut self) {
        self.abort_worker();
    }
}

fn run_transform(
    engine: &dyn Transform,
    input: XmlInput,
    args: &TransformArgs,
    writer: &mut BufferWriter,
) -> Result<(), TransformError> {
    engine.transform(input, args, writer)?;
    writer.close()?;
    Ok(())
}

/// The output is presumed well-formed, so every whitespace character is
/// at or below U+0020.
fn is_whitespace(text: &str) -> bool {
    text.chars().all(|c| c <= ' ')
}
