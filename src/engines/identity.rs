//! A transformation engine that replays its input document unchanged.

use quick_xml::NsReader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};

use xslpull_qname::NS_XMLNS;
use xslpull_traits::{EventWrite, Transform, TransformArgs, TransformError, XmlInput};

/// Streams the input document into the sink event by event: elements with
/// resolved (prefix, local, namespace) names, attributes (namespace
/// declarations included, so a consuming scope stack sees them), text,
/// comments and processing instructions. CDATA sections are flattened into
/// plain text; the document prolog and DOCTYPE are not part of the sink
/// contract and are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl IdentityTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for IdentityTransform {
    fn transform(
        &self,
        input: XmlInput,
        _args: &TransformArgs,
        output: &mut dyn EventWrite,
    ) -> Result<(), TransformError> {
        let text = input.read_to_string()?;
        let mut reader = NsReader::from_str(&text);
        let mut buf = Vec::new();

        loop {
            match reader.read_resolved_event_into(&mut buf) {
                Ok((ns, Event::Start(e))) => {
                    let uri = resolved_uri(&ns);
                    emit_element_start(&reader, &e, &uri, output)?;
                }
                Ok((ns, Event::Empty(e))) => {
                    let uri = resolved_uri(&ns);
                    emit_element_start(&reader, &e, &uri, output)?;
                    output.end_element()?;
                }
                Ok((_, Event::End(_))) => {
                    output.end_element()?;
                }
                Ok((_, Event::Text(e))) => {
                    let raw = String::from_utf8_lossy(&e);
                    let unescaped = unescape(&raw)
                        .map_err(|err| TransformError::Parse(err.to_string()))?;
                    output.write_string(&unescaped)?;
                }
                Ok((_, Event::CData(e))) => {
                    output.write_string(&String::from_utf8_lossy(&e))?;
                }
                Ok((_, Event::Comment(e))) => {
                    output.write_comment(&String::from_utf8_lossy(&e))?;
                }
                Ok((_, Event::PI(e))) => {
                    let content = String::from_utf8_lossy(&e).to_string();
                    let (target, data) = content
                        .split_once(' ')
                        .map(|(t, d)| (t.to_string(), d.to_string()))
                        .unwrap_or((content, String::new()));
                    output.write_processing_instruction(&target, &data)?;
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(TransformError::Parse(format!(
                        "error parsing XML at position {}: {:?}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
            buf.clear();
        }
        Ok(())
    }
}

fn emit_element_start(
    reader: &NsReader<&[u8]>,
    element: &BytesStart<'_>,
    ns_uri: &str,
    output: &mut dyn EventWrite,
) -> Result<(), TransformError> {
    let prefix = element
        .name()
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).to_string())
        .unwrap_or_default();
    let local = String::from_utf8_lossy(element.local_name().as_ref()).to_string();
    output.start_element(&prefix, &local, ns_uri)?;

    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|err| TransformError::Parse(err.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|err| TransformError::Parse(err.to_string()))?;
        match attribute.key.as_namespace_binding() {
            Some(PrefixDeclaration::Default) => {
                output.start_attribute("", "xmlns", NS_XMLNS)?;
            }
            Some(PrefixDeclaration::Named(prefix)) => {
                let local = String::from_utf8_lossy(prefix).to_string();
                output.start_attribute("xmlns", &local, NS_XMLNS)?;
            }
            None => {
                let (attr_ns, attr_local) = reader.resolve_attribute(attribute.key);
                let attr_prefix = attribute
                    .key
                    .prefix()
                    .map(|p| String::from_utf8_lossy(p.as_ref()).to_string())
                    .unwrap_or_default();
                let attr_local = String::from_utf8_lossy(attr_local.as_ref()).to_string();
                output.start_attribute(&attr_prefix, &attr_local, &resolved_uri(&attr_ns))?;
            }
        }
        output.write_string(&value)?;
        output.end_attribute()?;
    }
    Ok(())
}

fn resolved_uri(resolution: &ResolveResult<'_>) -> String {
    match resolution {
        ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).to_string(),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => String::new(),
    }
}
