use std::sync::{Arc, Mutex, MutexGuard};

use xslpull_qname::QName;
use xslpull_traits::{TransformError, WriteError};

use crate::token::{NodeKind, XmlToken};
use crate::TokenPipe;

/// Single-threaded pipe: production runs to completion before consumption
/// starts, so writes only ever append and reads index directly. The buffer
/// grows without bound; this is the intended trade-off of the fully
/// buffering mode.
pub struct BufferedPipe {
    state: Mutex<State>,
}

struct State {
    tokens: Vec<XmlToken>,
    read_start: usize,
    read_end: usize,
    error: Option<TransformError>,
    failed: bool,
    cancelled: bool,
}

impl BufferedPipe {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                tokens: Vec::with_capacity(initial_capacity.max(2)),
                read_start: 0,
                read_end: 0,
                error: None,
                failed: false,
                cancelled: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenPipe for BufferedPipe {
    fn write(
        &self,
        kind: NodeKind,
        name: Option<Arc<QName>>,
        value: Arc<str>,
    ) -> Result<(), WriteError> {
        let mut state = self.lock();
        if state.cancelled {
            return Err(WriteError::Cancelled);
        }
        state.tokens.push(XmlToken::new(kind, name, value));
        Ok(())
    }

    fn read(&self) -> Result<XmlToken, TransformError> {
        let mut state = self.lock();
        if let Some(error) = state.error.take() {
            state.failed = true;
            return Err(error);
        }
        if state.failed {
            return Err(TransformError::Engine(
                "transformation already failed".to_string(),
            ));
        }
        if state.read_end >= state.tokens.len() {
            // Production is over in this mode; running past the sentinel
            // means the producer never closed the stream.
            return Err(TransformError::Engine(
                "token pipe exhausted before end-of-stream sentinel".to_string(),
            ));
        }
        let token = state.tokens[state.read_end].clone();
        state.read_end += 1;
        Ok(token)
    }

    fn free_tokens(&self, count: usize) {
        let mut state = self.lock();
        state.read_start += count;
        state.read_end = state.read_start;
    }

    fn get_token(&self, offset: usize) -> Option<XmlToken> {
        let state = self.lock();
        let index = state.read_start + offset;
        if index < state.read_end {
            state.tokens.get(index).cloned()
        } else {
            None
        }
    }

    fn close(&self) -> Result<(), WriteError> {
        let mut state = self.lock();
        if state.cancelled {
            return Err(WriteError::Cancelled);
        }
        state.tokens.push(XmlToken::sentinel());
        Ok(())
    }

    fn write_error(&self, error: TransformError) {
        let mut state = self.lock();
        state.error = Some(error);
    }

    fn reset(&self) {
        let mut state = self.lock();
        state.tokens.clear();
        state.read_start = 0;
        state.read_end = 0;
        state.error = None;
        state.failed = false;
        state.cancelled = false;
    }

    fn cancel(&self) {
        self.lock().cancelled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xslpull_qname::QNameTable;

    fn write_text(pipe: &BufferedPipe, value: &str) {
        pipe.write(NodeKind::Text, None, Arc::from(value)).unwrap();
    }

    #[test]
    fn reads_tokens_in_write_order() {
        let pipe = BufferedPipe::new(4);
        for value in ["a", "b", "c"] {
            write_text(&pipe, value);
        }
        pipe.close().unwrap();
        for value in ["a", "b", "c"] {
            let token = pipe.read().unwrap();
            assert_eq!(token.kind, NodeKind::Text);
            assert_eq!(&*token.value, value);
        }
        assert_eq!(pipe.read().unwrap().kind, NodeKind::None);
    }

    #[test]
    fn growth_past_initial_capacity_preserves_content() {
        let pipe = BufferedPipe::new(2);
        for i in 0..100 {
            write_text(&pipe, &i.to_string());
        }
        pipe.close().unwrap();
        for i in 0..100 {
            assert_eq!(&*pipe.read().unwrap().value, &i.to_string());
        }
    }

    #[test]
    fn free_tokens_rewinds_read_cursor() {
        let names = QNameTable::new();
        let pipe = BufferedPipe::new(8);
        pipe.write(NodeKind::Element, Some(names.qname("a", "", "")), names.empty_str())
            .unwrap();
        write_text(&pipe, "one");
        write_text(&pipe, "two");
        pipe.close().unwrap();

        assert_eq!(pipe.read().unwrap().kind, NodeKind::Element);
        assert_eq!(&*pipe.read().unwrap().value, "one");
        // Free only the element; "one" must come back on the next read.
        pipe.free_tokens(1);
        assert_eq!(&*pipe.read().unwrap().value, "one");
        assert_eq!(&*pipe.read().unwrap().value, "two");
    }

    #[test]
    fn get_token_reads_live_window_without_consuming() {
        let names = QNameTable::new();
        let pipe = BufferedPipe::new(8);
        pipe.write(NodeKind::Element, Some(names.qname("e", "", "")), names.empty_str())
            .unwrap();
        pipe.write(NodeKind::Attribute, Some(names.qname("id", "", "")), Arc::from("1"))
            .unwrap();
        pipe.close().unwrap();

        pipe.read().unwrap();
        pipe.read().unwrap();
        let attr = pipe.get_token(1).unwrap();
        assert_eq!(attr.kind, NodeKind::Attribute);
        assert_eq!(&*attr.value, "1");
        // Outside the live window.
        assert!(pipe.get_token(5).is_none());
    }

    #[test]
    fn transported_error_surfaces_on_read() {
        let pipe = BufferedPipe::new(4);
        write_text(&pipe, "before");
        pipe.write_error(TransformError::Engine("boom".to_string()));
        let err = pipe.read().unwrap_err();
        assert!(matches!(err, TransformError::Engine(msg) if msg == "boom"));
    }

    #[test]
    fn cancelled_pipe_rejects_writes() {
        let pipe = BufferedPipe::new(4);
        pipe.cancel();
        assert!(matches!(
            pipe.write(NodeKind::Text, None, Arc::from("x")),
            Err(WriteError::Cancelled)
        ));
        pipe.reset();
        assert!(pipe.write(NodeKind::Text, None, Arc::from("x")).is_ok());
    }
}
