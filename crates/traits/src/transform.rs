use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::write::{EventWrite, WriteError};

#[derive(Error, Debug)]
pub enum TransformError {
    /// The output sink rejected a writer call.
    #[error("writer rejected transformation output: {0}")]
    Write(#[from] WriteError),

    /// The input document could not be read.
    #[error("failed to read transformation input: {0}")]
    Input(#[from] std::io::Error),

    /// The input document is not well-formed.
    #[error("malformed input document: {0}")]
    Parse(String),

    /// The engine failed while executing the transformation.
    #[error("transformation engine error: {0}")]
    Engine(String),
}

/// An input-document handle, consumed opaquely by the engine.
///
/// The adapter never parses or validates the document itself; it only hands
/// the source to the engine in whatever form the caller provided it.
pub enum XmlInput {
    Text(String),
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
}

impl XmlInput {
    /// Materializes the input as a string, whatever its source form.
    pub fn read_to_string(self) -> std::io::Result<String> {
        match self {
            XmlInput::Text(text) => Ok(text),
            XmlInput::Path(path) => fs::read_to_string(path),
            XmlInput::Reader(mut reader) => {
                let mut text = String::new();
                reader.read_to_string(&mut text)?;
                Ok(text)
            }
        }
    }
}

impl fmt::Debug for XmlInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlInput::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            XmlInput::Path(path) => f.debug_tuple("Path").field(path).finish(),
            XmlInput::Reader(_) => f.debug_tuple("Reader").finish(),
        }
    }
}

impl From<&str> for XmlInput {
    fn from(text: &str) -> Self {
        XmlInput::Text(text.to_string())
    }
}

impl From<String> for XmlInput {
    fn from(text: String) -> Self {
        XmlInput::Text(text)
    }
}

impl From<PathBuf> for XmlInput {
    fn from(path: PathBuf) -> Self {
        XmlInput::Path(path)
    }
}

impl From<&Path> for XmlInput {
    fn from(path: &Path) -> Self {
        XmlInput::Path(path.to_path_buf())
    }
}

/// A global stylesheet parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ns_uri: String,
    pub value: String,
}

/// Parameters forwarded to the engine, opaque to the adapter.
#[derive(Debug, Clone, Default)]
pub struct TransformArgs {
    params: Vec<Param>,
}

impl TransformArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_param(
        &mut self,
        name: impl Into<String>,
        ns_uri: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.params.push(Param {
            name: name.into(),
            ns_uri: ns_uri.into(),
            value: value.into(),
        });
        self
    }

    pub fn param(&self, name: &str, ns_uri: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name && p.ns_uri == ns_uri)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// An opaque transformation engine.
///
/// The engine receives an input document, the argument list and a streaming
/// writer sink; it emits its entire output through the sink in push order.
/// The adapter treats it as a black box and never inspects the input.
pub trait Transform: Send + Sync {
    fn transform(
        &self,
        input: XmlInput,
        args: &TransformArgs,
        output: &mut dyn EventWrite,
    ) -> Result<(), TransformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_from_text_reads_back() {
        let input: XmlInput = "<root/>".into();
        assert_eq!(input.read_to_string().unwrap(), "<root/>");
    }

    #[test]
    fn input_from_reader_reads_back() {
        let input = XmlInput::Reader(Box::new(std::io::Cursor::new(b"<root/>".to_vec())));
        assert_eq!(input.read_to_string().unwrap(), "<root/>");
    }

    #[test]
    fn args_lookup_matches_name_and_namespace() {
        let mut args = TransformArgs::new();
        args.add_param("color", "", "red").add_param("color", "urn:x", "blue");
        assert_eq!(args.param("color", ""), Some("red"));
        assert_eq!(args.param("color", "urn:x"), Some("blue"));
        assert_eq!(args.param("color", "urn:y"), None);
    }
}
