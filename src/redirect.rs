//! Multi-output redirection.
//!
//! A transformation can split its result into several documents by wrapping
//! content in `<exsl:document href="...">` elements
//! (`http://exslt.org/common` namespace). [`RedirectWriter`] sits between
//! the engine and the primary sink, relays ordinary output, and routes the
//! content of each redirect element to a fresh sink obtained from a
//! [`SinkFactory`], filesystem outputs by default. Redirect elements nest;
//! each one maintains its own output until its end tag.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use log::{debug, warn};

use xslpull_traits::{EventWrite, WriteError};

use crate::serialize::XmlEventSerializer;

/// The namespace a redirect instruction element must be in.
pub const REDIRECT_NAMESPACE: &str = "http://exslt.org/common";
/// The redirect instruction element's local name.
pub const REDIRECT_ELEMENT: &str = "document";

/// Opens one output per redirect instruction.
pub trait SinkFactory {
    fn open(&mut self, href: &str) -> Result<Box<dyn EventWrite>, WriteError>;
}

/// Creates files relative to a base directory, building intermediate
/// directories as needed.
pub struct FileSinkFactory {
    base_dir: PathBuf,
}

impl FileSinkFactory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl SinkFactory for FileSinkFactory {
    fn open(&mut self, href: &str) -> Result<Box<dyn EventWrite>, WriteError> {
        let path = self.base_dir.join(href);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| WriteError::Emit(e.to_string()))?;
        }
        let file = File::create(&path).map_err(|e| WriteError::Emit(e.to_string()))?;
        debug!("redirecting output to {}", path.display());
        Ok(Box::new(XmlEventSerializer::new(BufWriter::new(file))))
    }
}

/// A redirect element whose attributes are still being collected.
#[derive(Default)]
struct PendingRedirect {
    href: Option<String>,
    current_attr: Option<String>,
    text: String,
}

/// One open redirected output. `depth` counts forwarded element nesting so
/// the redirect element's own end tag can be recognized.
struct OutputState {
    sink: Box<dyn EventWrite>,
    depth: usize,
    href: String,
}

pub struct RedirectWriter<'a, F: SinkFactory> {
    primary: &'a mut dyn EventWrite,
    factory: F,
    states: Vec<OutputState>,
    pending: Option<PendingRedirect>,
}

impl<'a, F: SinkFactory> RedirectWriter<'a, F> {
    pub fn new(primary: &'a mut dyn EventWrite, factory: F) -> Self {
        Self {
            primary,
            factory,
            states: Vec::new(),
            pending: None,
        }
    }

    fn current(&mut self) -> &mut dyn EventWrite {
        match self.states.last_mut() {
            Some(state) => state.sink.as_mut(),
            None => &mut *self.primary,
        }
    }

    /// A non-attribute event arrived for a pending redirect element: its
    /// attributes are complete, so the redirected output can be opened.
    fn open_pending(&mut self) -> Result<(), WriteError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let href = pending.href.ok_or(WriteError::Protocol(
            "redirect instruction is missing its href attribute",
        ))?;
        let sink = self.factory.open(&href)?;
        self.states.push(OutputState {
            sink,
            depth: 0,
            href,
        });
        Ok(())
    }

    fn close_top(&mut self) -> Result<(), WriteError> {
        if let Some(mut state) = self.states.pop() {
            state.sink.close()?;
            debug!("redirected output {} complete", state.href);
        }
        Ok(())
    }
}

impl<F: SinkFactory> EventWrite for RedirectWriter<'_, F> {
    fn start_element(&mut self, prefix: &str, local: &str, ns_uri: &str) -> Result<(), WriteError> {
        self.open_pending()?;
        if ns_uri == REDIRECT_NAMESPACE && local == REDIRECT_ELEMENT {
            self.pending = Some(PendingRedirect::default());
            return Ok(());
        }
        if let Some(state) = self.states.last_mut() {
            state.depth += 1;
        }
        self.current().start_element(prefix, local, ns_uri)
    }

    fn end_element(&mut self) -> Result<(), WriteError> {
        // An empty redirect element still produces (an empty) document.
        self.open_pending()?;
        let Some(depth) = self.states.last().map(|state| state.depth) else {
            return self.primary.end_element();
        };
        if depth == 0 {
            // The redirect element's own end tag.
            self.close_top()
        } else {
            if let Some(state) = self.states.last_mut() {
                state.depth = depth - 1;
            }
            self.current().end_element()
        }
    }

    fn start_attribute(&mut self, prefix: &str, local: &str, ns_uri: &str) -> Result<(), WriteError> {
        if let Some(pending) = &mut self.pending {
            pending.current_attr = Some(local.to_string());
            pending.text.clear();
            return Ok(());
        }
        self.current().start_attribute(prefix, local, ns_uri)
    }

    fn end_attribute(&mut self) -> Result<(), WriteError> {
        if let Some(pending) = &mut self.pending {
            let attr = pending.current_attr.take().ok_or(WriteError::Protocol(
                "end_attribute without start_attribute",
            ))?;
            match attr.as_str() {
                "href" => pending.href = Some(std::mem::take(&mut pending.text)),
                // method, encoding, indent and friends configure byte-level
                // serialization, which event sinks decide for themselves.
                other => {
                    warn!("ignoring redirect attribute `{other}`");
                    pending.text.clear();
                }
            }
            return Ok(());
        }
        self.current().end_attribute()
    }

    fn write_string(&mut self, text: &str) -> Result<(), WriteError> {
        if let Some(pending) = &mut self.pending {
            if pending.current_attr.is_some() {
                pending.text.push_str(text);
                return Ok(());
            }
            self.open_pending()?;
        }
        self.current().write_string(text)
    }

    fn write_comment(&mut self, text: &str) -> Result<(), WriteError> {
        self.open_pending()?;
        self.current().write_comment(text)
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<(), WriteError> {
        self.open_pending()?;
        self.current().write_processing_instruction(target, data)
    }

    fn close(&mut self) -> Result<(), WriteError> {
        self.open_pending()?;
        while !self.states.is_empty() {
            warn!("transformation ended with an unterminated redirect element");
            self.close_top()?;
        }
        self.primary.close()
    }
}
