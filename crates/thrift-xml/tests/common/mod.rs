//! Shared helpers for integration tests.

#![allow(dead_code)]

use thrift_xml::{
    FieldIdent, InputProtocol, MemoryBuffer, OutputProtocol, Result, StructIdent, TType,
    XmlProtocol,
};

/// Installs a test subscriber once so protocol trace output shows up with
/// `RUST_LOG=trace cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A protocol whose reads consume what its writes produced.
pub fn loopback() -> XmlProtocol<MemoryBuffer> {
    init_tracing();
    XmlProtocol::new(MemoryBuffer::new())
}

/// A protocol reading the given document.
pub fn reading(document: &[u8]) -> XmlProtocol<MemoryBuffer> {
    init_tracing();
    XmlProtocol::new(MemoryBuffer::from_bytes(document.to_vec()))
}

/// Returns everything written to the protocol's transport as text.
pub fn written(protocol: &XmlProtocol<MemoryBuffer>) -> String {
    String::from_utf8(protocol.transport().as_bytes().to_vec()).unwrap()
}

/// A decoded `(name, type, id, value)` field tuple.
pub type PointField = (String, TType, i16, i32);

/// Writes `Point { x, y }` as two i32 fields with ids 1 and 2.
pub fn write_point<P: OutputProtocol>(protocol: &mut P, x: i32, y: i32) -> Result<()> {
    protocol.write_struct_begin(&StructIdent::new("Point"))?;
    for (name, id, value) in [("x", 1, x), ("y", 2, y)] {
        protocol.write_field_begin(&FieldIdent::new(name, TType::I32, id))?;
        protocol.write_i32(value)?;
        protocol.write_field_end()?;
    }
    protocol.write_field_stop()?;
    protocol.write_struct_end()
}

/// Reads a struct of i32 fields until the stop marker.
pub fn read_i32_struct<P: InputProtocol>(protocol: &mut P) -> Result<(String, Vec<PointField>)> {
    let ident = protocol.read_struct_begin()?;
    let mut fields = Vec::new();
    loop {
        let field = protocol.read_field_begin()?;
        if field.is_stop() {
            break;
        }
        let value = protocol.read_i32()?;
        protocol.read_field_end()?;
        fields.push((field.name, field.field_type, field.id, value));
    }
    protocol.read_struct_end()?;
    Ok((ident.name, fields))
}
