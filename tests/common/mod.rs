#![allow(dead_code)]

use xslpull::{
    EventWrite, ReaderError, Transform, TransformArgs, TransformError, XmlInput, XmlNodeType,
    XslReader,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One recorded writer call for [`ScriptedTransform`].
#[derive(Debug, Clone)]
pub enum Call {
    Start(&'static str, &'static str, &'static str),
    End,
    Attr(&'static str, &'static str, &'static str, &'static str),
    Text(&'static str),
    Comment(&'static str),
    Pi(&'static str, &'static str),
    Fail(&'static str),
}

/// An engine that replays a fixed sequence of writer calls. `Fail` aborts
/// the transformation with an engine error at that point.
pub struct ScriptedTransform {
    calls: Vec<Call>,
}

impl ScriptedTransform {
    pub fn new(calls: Vec<Call>) -> Self {
        Self { calls }
    }
}

impl Transform for ScriptedTransform {
    fn transform(
        &self,
        _input: XmlInput,
        _args: &TransformArgs,
        output: &mut dyn EventWrite,
    ) -> Result<(), TransformError> {
        for call in &self.calls {
            match call {
                Call::Start(prefix, local, ns) => output.start_element(prefix, local, ns)?,
                Call::End => output.end_element()?,
                Call::Attr(prefix, local, ns, value) => {
                    output.start_attribute(prefix, local, ns)?;
                    output.write_string(value)?;
                    output.end_attribute()?;
                }
                Call::Text(text) => output.write_string(text)?,
                Call::Comment(text) => output.write_comment(text)?,
                Call::Pi(target, data) => output.write_processing_instruction(target, data)?,
                Call::Fail(message) => {
                    return Err(TransformError::Engine(message.to_string()));
                }
            }
        }
        Ok(())
    }
}

/// An engine that emits elements until the sink refuses more; used to
/// exercise cancellation of a still-running worker.
pub struct FloodTransform;

impl Transform for FloodTransform {
    fn transform(
        &self,
        _input: XmlInput,
        _args: &TransformArgs,
        output: &mut dyn EventWrite,
    ) -> Result<(), TransformError> {
        loop {
            output.start_element("", "item", "")?;
            output.write_string("flood")?;
            output.end_element()?;
        }
    }
}

/// Drains the reader, recording (node type, display name, value, depth) for
/// every node observed.
pub fn collect_nodes(
    reader: &mut XslReader,
) -> Result<Vec<(XmlNodeType, String, String, usize)>, ReaderError> {
    let mut nodes = Vec::new();
    while reader.read()? {
        nodes.push((
            reader.node_type(),
            reader.qname().to_string(),
            reader.value().to_string(),
            reader.depth(),
        ));
    }
    Ok(nodes)
}
