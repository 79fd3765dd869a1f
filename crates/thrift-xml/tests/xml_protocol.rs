//! End-to-end tests: documents written by the protocol read back through
//! the same instance over an in-memory transport.

mod common;

use common::{loopback, read_i32_struct, write_point, written};
use thrift_xml::{
    skip, FieldIdent, InputProtocol, ListIdent, MapIdent, MessageIdent, MessageType,
    OutputProtocol, SetIdent, StructIdent, TType,
};

#[test]
fn point_example_wire_format() {
    let mut protocol = loopback();
    write_point(&mut protocol, 3, 4).unwrap();

    assert_eq!(
        written(&protocol),
        r#"<Point><x type="int" field="1">3</x><y type="int" field="2">4</y></Point>"#
    );
    assert_eq!(protocol.depth(), 0);

    let (name, fields) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(name, "Point");
    assert_eq!(
        fields,
        vec![
            ("x".to_string(), TType::I32, 1, 3),
            ("y".to_string(), TType::I32, 2, 4),
        ]
    );
    assert_eq!(protocol.depth(), 0);
    assert!(protocol.transport().unread().is_empty());
}

#[test]
fn point_example_survives_resets() {
    let mut protocol = loopback();

    // Leave the instance mid-document, then reset it a few times.
    write_point(&mut protocol, 9, 9).unwrap();
    protocol.read_struct_begin().unwrap();
    protocol.read_field_begin().unwrap();
    assert!(protocol.depth() > 0);

    for _ in 0..3 {
        protocol.reset();
    }
    protocol.transport_mut().clear();
    assert_eq!(protocol.depth(), 0);

    write_point(&mut protocol, 3, 4).unwrap();
    let (_, fields) = read_i32_struct(&mut protocol).unwrap();
    let values: Vec<i32> = fields.iter().map(|f| f.3).collect();
    assert_eq!(values, [3, 4]);
}

#[test]
fn empty_struct() {
    let mut protocol = loopback();
    protocol
        .write_struct_begin(&StructIdent::new("Empty"))
        .unwrap();
    protocol.write_field_stop().unwrap();
    protocol.write_struct_end().unwrap();
    assert_eq!(written(&protocol), "<Empty></Empty>");

    let (name, fields) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(name, "Empty");
    assert!(fields.is_empty());
}

#[test]
fn integer_boundaries_roundtrip() {
    let mut protocol = loopback();
    let i8s = [i8::MIN, -1, 0, 1, i8::MAX];
    let i16s = [i16::MIN, -1, 0, 1, i16::MAX];
    let i32s = [i32::MIN, -1, 0, 1, i32::MAX];
    let i64s = [i64::MIN, -1, 0, 1, i64::MAX];

    protocol
        .write_list_begin(&ListIdent::new(TType::Byte, 5))
        .unwrap();
    for v in i8s {
        protocol.write_i8(v).unwrap();
    }
    protocol.write_list_end().unwrap();
    protocol
        .write_list_begin(&ListIdent::new(TType::I16, 5))
        .unwrap();
    for v in i16s {
        protocol.write_i16(v).unwrap();
    }
    protocol.write_list_end().unwrap();
    protocol
        .write_list_begin(&ListIdent::new(TType::I32, 5))
        .unwrap();
    for v in i32s {
        protocol.write_i32(v).unwrap();
    }
    protocol.write_list_end().unwrap();
    protocol
        .write_list_begin(&ListIdent::new(TType::I64, 5))
        .unwrap();
    for v in i64s {
        protocol.write_i64(v).unwrap();
    }
    protocol.write_list_end().unwrap();

    let list = protocol.read_list_begin().unwrap();
    assert_eq!(list, ListIdent::new(TType::Byte, 5));
    let decoded: Vec<i8> = (0..5).map(|_| protocol.read_i8().unwrap()).collect();
    assert_eq!(decoded, i8s);
    protocol.read_list_end().unwrap();

    protocol.read_list_begin().unwrap();
    let decoded: Vec<i16> = (0..5).map(|_| protocol.read_i16().unwrap()).collect();
    assert_eq!(decoded, i16s);
    protocol.read_list_end().unwrap();

    protocol.read_list_begin().unwrap();
    let decoded: Vec<i32> = (0..5).map(|_| protocol.read_i32().unwrap()).collect();
    assert_eq!(decoded, i32s);
    protocol.read_list_end().unwrap();

    protocol.read_list_begin().unwrap();
    let decoded: Vec<i64> = (0..5).map(|_| protocol.read_i64().unwrap()).collect();
    assert_eq!(decoded, i64s);
    protocol.read_list_end().unwrap();

    assert_eq!(protocol.depth(), 0);
}

#[test]
fn list_wire_format() {
    let mut protocol = loopback();
    protocol
        .write_list_begin(&ListIdent::new(TType::I64, 2))
        .unwrap();
    protocol.write_i64(0).unwrap();
    protocol.write_i64(-1).unwrap();
    protocol.write_list_end().unwrap();

    assert_eq!(
        written(&protocol),
        "<val_type>long</val_type><entry_count>2</entry_count><val>0</val><val>-1</val>"
    );
}

#[test]
fn bools_and_doubles_roundtrip() {
    let mut protocol = loopback();
    let doubles = [
        0.0,
        -0.0,
        1.5,
        -1e-300,
        f64::MAX,
        f64::INFINITY,
        f64::NEG_INFINITY,
    ];

    protocol
        .write_set_begin(&SetIdent::new(TType::Bool, 2))
        .unwrap();
    protocol.write_bool(true).unwrap();
    protocol.write_bool(false).unwrap();
    protocol.write_set_end().unwrap();

    protocol
        .write_list_begin(&ListIdent::new(TType::Double, doubles.len() as i32 + 1))
        .unwrap();
    for v in doubles {
        protocol.write_double(v).unwrap();
    }
    protocol.write_double(f64::NAN).unwrap();
    protocol.write_list_end().unwrap();

    assert_eq!(
        protocol.read_set_begin().unwrap(),
        SetIdent::new(TType::Bool, 2)
    );
    assert!(protocol.read_bool().unwrap());
    assert!(!protocol.read_bool().unwrap());
    protocol.read_set_end().unwrap();

    protocol.read_list_begin().unwrap();
    for v in doubles {
        assert_eq!(protocol.read_double().unwrap().to_bits(), v.to_bits());
    }
    assert!(protocol.read_double().unwrap().is_nan());
    protocol.read_list_end().unwrap();
}

#[test]
fn strings_escape_and_roundtrip() {
    let strings = [
        "",
        "plain",
        "&",
        "<",
        "a < b && c > d",
        "&&<<&<",
        "&amp; already escaped",
        "quote \" and gt >",
        "unicode: héllo wörld ✓",
    ];

    let mut protocol = loopback();
    protocol
        .write_list_begin(&ListIdent::new(TType::String, strings.len() as i32))
        .unwrap();
    for s in strings {
        protocol.write_string(s).unwrap();
    }
    protocol.write_list_end().unwrap();

    // Markup aside, no raw '<' survives inside any element body.
    let text = written(&protocol);
    let bodies = text.split("<val>").skip(1).map(|s| s.split("</val>").next().unwrap());
    for body in bodies {
        assert!(!body.contains('<'), "raw '<' in {body:?}");
    }

    protocol.read_list_begin().unwrap();
    for s in strings {
        assert_eq!(protocol.read_string().unwrap(), s);
    }
    protocol.read_list_end().unwrap();
}

#[test]
fn binary_roundtrip_all_tail_lengths() {
    let blobs: Vec<Vec<u8>> = (0..8)
        .map(|len| (0..len).map(|i| (255 - i * 31) as u8).collect())
        .collect();

    let mut protocol = loopback();
    protocol
        .write_list_begin(&ListIdent::new(TType::String, blobs.len() as i32))
        .unwrap();
    for blob in &blobs {
        protocol.write_binary(blob).unwrap();
    }
    protocol.write_list_end().unwrap();

    protocol.read_list_begin().unwrap();
    for blob in &blobs {
        assert_eq!(&protocol.read_binary().unwrap(), blob);
    }
    protocol.read_list_end().unwrap();
}

#[test]
fn map_cardinality() {
    for size in [0usize, 1, 3] {
        let mut protocol = loopback();
        let map = MapIdent::new(TType::String, TType::I32, size as i32);
        protocol.write_map_begin(&map).unwrap();
        for i in 0..size {
            protocol.write_string(&format!("key{i}")).unwrap();
            protocol.write_i32(i as i32 * 10).unwrap();
        }
        protocol.write_map_end().unwrap();

        assert!(written(&protocol).starts_with(&format!(
            "<key_type>string</key_type><val_type>int</val_type><entry_count>{size}</entry_count>"
        )));

        let decoded = protocol.read_map_begin().unwrap();
        assert_eq!(decoded, map);
        for i in 0..size {
            assert_eq!(protocol.read_string().unwrap(), format!("key{i}"));
            assert_eq!(protocol.read_i32().unwrap(), i as i32 * 10);
        }
        protocol.read_map_end().unwrap();
        assert_eq!(protocol.depth(), 0);
        assert!(protocol.transport().unread().is_empty());
    }
}

#[test]
fn map_field_wire_format() {
    let mut protocol = loopback();
    protocol.write_struct_begin(&StructIdent::new("S")).unwrap();
    protocol
        .write_field_begin(&FieldIdent::new("m", TType::Map, 1))
        .unwrap();
    protocol
        .write_map_begin(&MapIdent::new(TType::String, TType::I32, 1))
        .unwrap();
    protocol.write_string("k").unwrap();
    protocol.write_i32(1).unwrap();
    protocol.write_map_end().unwrap();
    protocol.write_field_end().unwrap();
    protocol.write_field_stop().unwrap();
    protocol.write_struct_end().unwrap();

    assert_eq!(
        written(&protocol),
        concat!(
            r#"<S><m type="map" field="1">"#,
            "<key_type>string</key_type><val_type>int</val_type><entry_count>1</entry_count>",
            "<key>k</key><val>1</val></m></S>"
        )
    );
}

#[test]
fn empty_containers_keep_their_headers() {
    let mut protocol = loopback();
    protocol
        .write_list_begin(&ListIdent::new(TType::I32, 0))
        .unwrap();
    protocol.write_list_end().unwrap();
    protocol
        .write_set_begin(&SetIdent::new(TType::String, 0))
        .unwrap();
    protocol.write_set_end().unwrap();

    assert_eq!(
        written(&protocol),
        "<val_type>int</val_type><entry_count>0</entry_count>\
         <val_type>string</val_type><entry_count>0</entry_count>"
    );

    assert_eq!(protocol.read_list_begin().unwrap().size, 0);
    protocol.read_list_end().unwrap();
    assert_eq!(
        protocol.read_set_begin().unwrap(),
        SetIdent::new(TType::String, 0)
    );
    protocol.read_set_end().unwrap();
}

fn write_order<P: OutputProtocol>(protocol: &mut P) -> thrift_xml::Result<()> {
    protocol.write_struct_begin(&StructIdent::new("Order"))?;

    protocol.write_field_begin(&FieldIdent::new("id", TType::I64, 1))?;
    protocol.write_i64(42)?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("tags", TType::List, 2))?;
    protocol.write_list_begin(&ListIdent::new(TType::String, 2))?;
    protocol.write_string("a&b")?;
    protocol.write_string("<c>")?;
    protocol.write_list_end()?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("points", TType::Map, 3))?;
    protocol.write_map_begin(&MapIdent::new(TType::String, TType::Struct, 2))?;
    protocol.write_string("origin")?;
    write_point(protocol, 0, 0)?;
    protocol.write_string("corner")?;
    write_point(protocol, -5, 7)?;
    protocol.write_map_end()?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("blob", TType::String, 4))?;
    protocol.write_binary(&[0, 1, 2, 255])?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("ratio", TType::Double, 5))?;
    protocol.write_double(0.5)?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("flags", TType::Set, 6))?;
    protocol.write_set_begin(&SetIdent::new(TType::Bool, 2))?;
    protocol.write_bool(true)?;
    protocol.write_bool(false)?;
    protocol.write_set_end()?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("empty", TType::List, 7))?;
    protocol.write_list_begin(&ListIdent::new(TType::I32, 0))?;
    protocol.write_list_end()?;
    protocol.write_field_end()?;

    protocol.write_field_begin(&FieldIdent::new("home", TType::Struct, 8))?;
    write_point(protocol, 1, 2)?;
    protocol.write_field_end()?;

    protocol.write_field_stop()?;
    protocol.write_struct_end()
}

fn expect_field<P: InputProtocol>(protocol: &mut P, name: &str, field_type: TType, id: i16) {
    let field = protocol.read_field_begin().unwrap();
    assert_eq!(field, FieldIdent::new(name, field_type, id));
}

#[test]
fn nested_document_roundtrip() {
    let mut protocol = loopback();
    write_order(&mut protocol).unwrap();
    assert_eq!(protocol.depth(), 0);
    assert!(written(&protocol).contains(
        r#"<home type="rec" field="8"><Point><x type="int" field="1">1</x>"#
    ));

    assert_eq!(protocol.read_struct_begin().unwrap().name, "Order");

    expect_field(&mut protocol, "id", TType::I64, 1);
    assert_eq!(protocol.read_i64().unwrap(), 42);
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "tags", TType::List, 2);
    assert_eq!(
        protocol.read_list_begin().unwrap(),
        ListIdent::new(TType::String, 2)
    );
    assert_eq!(protocol.read_string().unwrap(), "a&b");
    assert_eq!(protocol.read_string().unwrap(), "<c>");
    protocol.read_list_end().unwrap();
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "points", TType::Map, 3);
    assert_eq!(
        protocol.read_map_begin().unwrap(),
        MapIdent::new(TType::String, TType::Struct, 2)
    );
    assert_eq!(protocol.read_string().unwrap(), "origin");
    let (_, origin) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(origin.iter().map(|f| f.3).collect::<Vec<_>>(), [0, 0]);
    assert_eq!(protocol.read_string().unwrap(), "corner");
    let (_, corner) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(corner.iter().map(|f| f.3).collect::<Vec<_>>(), [-5, 7]);
    protocol.read_map_end().unwrap();
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "blob", TType::String, 4);
    assert_eq!(protocol.read_binary().unwrap(), [0, 1, 2, 255]);
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "ratio", TType::Double, 5);
    assert_eq!(protocol.read_double().unwrap(), 0.5);
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "flags", TType::Set, 6);
    assert_eq!(protocol.read_set_begin().unwrap().size, 2);
    assert!(protocol.read_bool().unwrap());
    assert!(!protocol.read_bool().unwrap());
    protocol.read_set_end().unwrap();
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "empty", TType::List, 7);
    assert_eq!(protocol.read_list_begin().unwrap().size, 0);
    protocol.read_list_end().unwrap();
    protocol.read_field_end().unwrap();

    expect_field(&mut protocol, "home", TType::Struct, 8);
    let (name, home) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(name, "Point");
    assert_eq!(home.iter().map(|f| f.3).collect::<Vec<_>>(), [1, 2]);
    protocol.read_field_end().unwrap();

    assert!(protocol.read_field_begin().unwrap().is_stop());
    protocol.read_struct_end().unwrap();

    assert_eq!(protocol.depth(), 0);
    assert!(protocol.transport().unread().is_empty());
}

#[test]
fn skip_discards_whole_document() {
    let mut protocol = loopback();
    write_order(&mut protocol).unwrap();
    write_point(&mut protocol, 11, 12).unwrap();

    skip(&mut protocol, TType::Struct).unwrap();
    assert_eq!(protocol.depth(), 0);

    // The stream is positioned right after the skipped value.
    let (name, fields) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(name, "Point");
    assert_eq!(fields.iter().map(|f| f.3).collect::<Vec<_>>(), [11, 12]);
}

#[test]
fn skip_unknown_fields() {
    let mut protocol = loopback();
    write_order(&mut protocol).unwrap();

    protocol.read_struct_begin().unwrap();
    let mut seen = Vec::new();
    loop {
        let field = protocol.read_field_begin().unwrap();
        if field.is_stop() {
            break;
        }
        if field.id == 1 {
            assert_eq!(protocol.read_i64().unwrap(), 42);
        } else {
            skip(&mut protocol, field.field_type).unwrap();
        }
        protocol.read_field_end().unwrap();
        seen.push(field.id);
    }
    protocol.read_struct_end().unwrap();

    assert_eq!(seen, [1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(protocol.transport().unread().is_empty());
}

#[test]
fn message_envelope_roundtrip() {
    let mut protocol = loopback();
    let message = MessageIdent::new("getPoint", MessageType::Call, 7);

    protocol.write_message_begin(&message).unwrap();
    write_point(&mut protocol, 3, 4).unwrap();
    protocol.write_message_end().unwrap();
    protocol.flush().unwrap();

    assert!(written(&protocol)
        .starts_with("1<name>getPoint</name><type>1</type><seqid>7</seqid><Point>"));

    assert_eq!(protocol.read_message_begin().unwrap(), message);
    let (name, _) = read_i32_struct(&mut protocol).unwrap();
    assert_eq!(name, "Point");
    protocol.read_message_end().unwrap();
}

#[test]
fn message_names_are_escaped() {
    let mut protocol = loopback();
    let message = MessageIdent::new("a<b&c", MessageType::Oneway, -1);
    protocol.write_message_begin(&message).unwrap();
    assert!(written(&protocol).contains("<name>a&lt;b&amp;c</name>"));
    assert_eq!(protocol.read_message_begin().unwrap(), message);
}

#[test]
fn every_message_type_roundtrips() {
    for (seq, message_type) in [
        MessageType::Call,
        MessageType::Reply,
        MessageType::Exception,
        MessageType::Oneway,
    ]
    .into_iter()
    .enumerate()
    {
        let mut protocol = loopback();
        let message = MessageIdent::new("m", message_type, seq as i32);
        protocol.write_message_begin(&message).unwrap();
        assert_eq!(protocol.read_message_begin().unwrap(), message);
    }
}

#[test]
fn factory_shares_configuration() {
    let config = thrift_xml::ProtocolConfig::default().with_string_limit(4);
    let factory = thrift_xml::XmlProtocolFactory::new(config.clone());
    let protocol = factory.create(thrift_xml::MemoryBuffer::new());
    assert_eq!(protocol.config(), &config);
}
