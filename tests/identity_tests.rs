mod common;

use common::init_logging;
use xslpull::{
    IdentityTransform, ReaderSettings, TransformArgs, TransformError, XmlNodeType, XslReader,
    serialize_to_string,
};

const CATALOG: &str = r#"<catalog xmlns:c="urn:catalog" version="1.0"><c:book id="b1">Systems &amp; Tools</c:book><!--end--><?render toc?></catalog>"#;

#[test]
fn identity_engine_replays_a_document() {
    init_logging();
    let mut reader = XslReader::new(IdentityTransform::new());
    reader.start_transform(CATALOG, TransformArgs::new()).unwrap();

    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::Element);
    assert_eq!(reader.local_name(), "catalog");
    // The namespace declaration and version are both plain attributes.
    assert_eq!(reader.attribute_count(), 2);
    assert_eq!(reader.get_attribute_by_name("version").as_deref(), Some("1.0"));
    assert_eq!(reader.lookup_namespace("c").as_deref(), Some("urn:catalog"));

    assert!(reader.read().unwrap());
    assert_eq!(reader.local_name(), "book");
    assert_eq!(reader.prefix(), "c");
    assert_eq!(reader.namespace_uri(), "urn:catalog");
    assert_eq!(reader.get_attribute_by_name("id").as_deref(), Some("b1"));

    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::Text);
    assert_eq!(reader.value(), "Systems & Tools");
    assert_eq!(reader.depth(), 2);

    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::EndElement);
    assert_eq!(reader.local_name(), "book");

    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::Comment);
    assert_eq!(reader.value(), "end");

    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::ProcessingInstruction);
    assert_eq!(reader.local_name(), "render");
    assert_eq!(reader.value(), "toc");

    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::EndElement);
    assert!(!reader.read().unwrap());
}

#[test]
fn serialization_round_trips_through_the_reader() {
    let mut reader = XslReader::new(IdentityTransform::new());
    reader.start_transform(CATALOG, TransformArgs::new()).unwrap();
    let output = serialize_to_string(&mut reader).unwrap();
    assert_eq!(
        output,
        r#"<catalog xmlns:c="urn:catalog" version="1.0"><c:book id="b1">Systems &amp; Tools</c:book><!--end--><?render toc?></catalog>"#
    );
}

#[test]
fn empty_elements_read_as_start_end_pairs() {
    let mut reader = XslReader::new(IdentityTransform::new());
    reader
        .start_transform("<root><leaf flag=\"y\"/></root>", TransformArgs::new())
        .unwrap();

    assert!(reader.read().unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.local_name(), "leaf");
    assert!(!reader.is_empty_element());
    assert_eq!(reader.get_attribute_by_name("flag").as_deref(), Some("y"));
    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::EndElement);
    assert_eq!(reader.local_name(), "leaf");
}

#[test]
fn malformed_input_is_reported_as_a_parse_error() {
    let mut reader = XslReader::with_settings(
        IdentityTransform::new(),
        ReaderSettings {
            multi_thread: false,
            ..ReaderSettings::default()
        },
    );
    let err = reader
        .start_transform("<root><unclosed></root>", TransformArgs::new())
        .unwrap_err();
    assert!(matches!(
        err,
        xslpull::ReaderError::Transform(TransformError::Parse(_))
    ));
}

#[test]
fn cdata_is_flattened_into_text() {
    let mut reader = XslReader::new(IdentityTransform::new());
    reader
        .start_transform("<root><![CDATA[a < b]]></root>", TransformArgs::new())
        .unwrap();
    assert!(reader.read().unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.node_type(), XmlNodeType::Text);
    assert_eq!(reader.value(), "a < b");
}
