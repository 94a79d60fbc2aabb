// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire marshalling bridge: the encode/decode primitive behind the value
//! container.
//!
//! The container never touches payload bytes itself; it hands values and
//! descriptors to a [`WireBridge`] and gets opaque payloads back. The
//! default [`NativeBridge`] implements an aligned little-endian layout;
//! alternative bridges (pooled buffers, FFI marshallers) plug in behind the
//! same trait.

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::{BusError, Result};
use crate::signature::{self, Signature};
use crate::value::Value;
use crate::variant::Variant;

/// An encoded value, owned by whichever bridge minted it.
///
/// The embedded signature is what travels alongside the bytes on the wire;
/// it is the only part of a payload the rest of the crate ever reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePayload {
    signature: Signature,
    bytes: Vec<u8>,
}

impl WirePayload {
    /// Assemble a payload from its signature and encoded bytes.
    pub fn new(signature: Signature, bytes: Vec<u8>) -> Self {
        Self { signature, bytes }
    }

    /// The payload's embedded signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// External encode/decode primitive.
///
/// Implementations must be synchronous and bounded by payload size; no
/// network waits happen here.
pub trait WireBridge: Send + Sync {
    /// Encode a value against a descriptor into a payload.
    fn encode(&self, value: &Value, descriptor: &TypeDescriptor) -> Result<WirePayload>;

    /// Decode a payload against a descriptor into a value.
    fn decode(&self, payload: &WirePayload, descriptor: &TypeDescriptor) -> Result<Value>;

    /// The signature embedded in a payload.
    fn signature_of(&self, payload: &WirePayload) -> Result<Signature> {
        Ok(payload.signature().clone())
    }

    /// Return a payload to the bridge. The default just drops it; pooled
    /// bridges reclaim the buffer.
    fn release(&self, payload: WirePayload) {
        drop(payload);
    }
}

/// Default bridge: aligned little-endian wire layout.
///
/// Scalars align to their own size (bool travels as u32). Strings and
/// object paths carry an aligned u32 byte length, their bytes and a nul
/// terminator; signatures carry a single-byte length instead. Arrays and
/// dictionaries carry an aligned u32 element count; dictionary entries and
/// structs align to 8. A variant embeds its signature followed by the
/// value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBridge;

impl NativeBridge {
    /// Create the default bridge.
    pub fn new() -> Self {
        Self
    }
}

impl WireBridge for NativeBridge {
    fn encode(&self, value: &Value, descriptor: &TypeDescriptor) -> Result<WirePayload> {
        let mut encoder = WireEncoder::new();
        encoder.encode_value(value, descriptor)?;
        Ok(WirePayload::new(
            descriptor.signature(),
            encoder.into_bytes(),
        ))
    }

    fn decode(&self, payload: &WirePayload, descriptor: &TypeDescriptor) -> Result<Value> {
        let mut decoder = WireDecoder::new(payload.bytes());
        let value = decoder.decode_value(descriptor)?;
        if decoder.remaining() != 0 {
            return Err(BusError::InvalidPayload(format!(
                "{} trailing bytes after value",
                decoder.remaining()
            )));
        }
        Ok(value)
    }
}

fn mismatch(descriptor: &TypeDescriptor, value: &Value) -> BusError {
    BusError::UnmarshalTypeMismatch {
        expected: descriptor.signature().as_str().to_string(),
        found: value.kind_name().to_string(),
    }
}

/// Encoder over a growable buffer.
struct WireEncoder {
    buffer: Vec<u8>,
}

impl WireEncoder {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn align(&mut self, alignment: usize) {
        let padding = (alignment - (self.buffer.len() % alignment)) % alignment;
        self.buffer.extend(std::iter::repeat(0).take(padding));
    }

    fn encode_value(&mut self, value: &Value, descriptor: &TypeDescriptor) -> Result<()> {
        match descriptor {
            TypeDescriptor::Primitive(kind) | TypeDescriptor::EnumOf(kind) => {
                self.encode_primitive(value, *kind, descriptor)
            }
            TypeDescriptor::ArrayOf(element) => {
                let Value::Array(items) = value else {
                    return Err(mismatch(descriptor, value));
                };
                self.align(4);
                self.buffer.extend(&(items.len() as u32).to_le_bytes());
                for item in items {
                    self.encode_value(item, element)?;
                }
                Ok(())
            }
            TypeDescriptor::DictOf(key_desc, value_desc) => {
                let Value::Dict(entries) = value else {
                    return Err(mismatch(descriptor, value));
                };
                self.align(4);
                self.buffer.extend(&(entries.len() as u32).to_le_bytes());
                for (key, val) in entries {
                    self.align(8);
                    self.encode_value(key, key_desc)?;
                    self.encode_value(val, value_desc)?;
                }
                Ok(())
            }
            TypeDescriptor::StructOf(field_descs) => {
                let Value::Struct(fields) = value else {
                    return Err(mismatch(descriptor, value));
                };
                if fields.len() != field_descs.len() {
                    return Err(mismatch(descriptor, value));
                }
                self.align(8);
                for (field, desc) in fields.iter().zip(field_descs) {
                    self.encode_value(field, desc)?;
                }
                Ok(())
            }
            TypeDescriptor::Variant => {
                let Value::Variant(nested) = value else {
                    return Err(mismatch(descriptor, value));
                };
                let nested_sig = nested.signature()?;
                let nested_desc = signature::parse_single(nested_sig.as_str())?;
                let nested_value = nested.get()?;
                self.write_signature(&nested_sig);
                self.encode_value(nested_value, &nested_desc)
            }
        }
    }

    fn encode_primitive(
        &mut self,
        value: &Value,
        kind: PrimitiveKind,
        descriptor: &TypeDescriptor,
    ) -> Result<()> {
        match (value, kind) {
            (Value::Bool(v), PrimitiveKind::Bool) => {
                self.align(4);
                self.buffer.extend(&u32::from(*v).to_le_bytes());
            }
            (Value::U8(v), PrimitiveKind::U8) => {
                self.buffer.push(*v);
            }
            (Value::I16(v), PrimitiveKind::I16) => {
                self.align(2);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::U16(v), PrimitiveKind::U16) => {
                self.align(2);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::I32(v), PrimitiveKind::I32) => {
                self.align(4);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::U32(v), PrimitiveKind::U32) => {
                self.align(4);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::I64(v), PrimitiveKind::I64) => {
                self.align(8);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::U64(v), PrimitiveKind::U64) => {
                self.align(8);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::F64(v), PrimitiveKind::F64) => {
                self.align(8);
                self.buffer.extend(&v.to_le_bytes());
            }
            (Value::Str(s), PrimitiveKind::Str)
            | (Value::ObjectPath(s), PrimitiveKind::ObjectPath) => {
                self.align(4);
                self.buffer.extend(&(s.len() as u32).to_le_bytes());
                self.buffer.extend(s.as_bytes());
                self.buffer.push(0);
            }
            (Value::Signature(sig), PrimitiveKind::Signature) => {
                self.write_signature(sig);
            }
            _ => return Err(mismatch(descriptor, value)),
        }
        Ok(())
    }

    fn write_signature(&mut self, sig: &Signature) {
        self.buffer.push(sig.len() as u8);
        self.buffer.extend(sig.as_str().as_bytes());
        self.buffer.push(0);
    }
}

/// Bounds-checked decoder over a byte slice.
struct WireDecoder<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> WireDecoder<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    fn align(&mut self, alignment: usize) {
        self.offset = (self.offset + alignment - 1) & !(alignment - 1);
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.offset + count > self.buffer.len() {
            return Err(BusError::TruncatedPayload {
                need: count,
                have: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.align(4);
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn decode_value(&mut self, descriptor: &TypeDescriptor) -> Result<Value> {
        match descriptor {
            TypeDescriptor::Primitive(kind) | TypeDescriptor::EnumOf(kind) => {
                self.decode_primitive(*kind)
            }
            TypeDescriptor::ArrayOf(element) => {
                let count = self.read_u32()? as usize;
                // Cap pre-allocation by what the payload could possibly hold.
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.decode_value(element)?);
                }
                Ok(Value::Array(items))
            }
            TypeDescriptor::DictOf(key_desc, value_desc) => {
                let count = self.read_u32()? as usize;
                let mut entries = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    self.align(8);
                    let key = self.decode_value(key_desc)?;
                    let value = self.decode_value(value_desc)?;
                    entries.push((key, value));
                }
                Ok(Value::Dict(entries))
            }
            TypeDescriptor::StructOf(field_descs) => {
                self.align(8);
                let mut fields = Vec::with_capacity(field_descs.len());
                for desc in field_descs {
                    fields.push(self.decode_value(desc)?);
                }
                Ok(Value::Struct(fields))
            }
            TypeDescriptor::Variant => {
                let sig = self.read_signature()?;
                let nested_desc = signature::parse_single(sig.as_str())?;
                let nested_value = self.decode_value(&nested_desc)?;
                Ok(Value::Variant(Box::new(Variant::with_signature(
                    nested_value,
                    sig,
                ))))
            }
        }
    }

    fn decode_primitive(&mut self, kind: PrimitiveKind) -> Result<Value> {
        match kind {
            PrimitiveKind::Bool => {
                let raw = self.read_u32()?;
                match raw {
                    0 => Ok(Value::Bool(false)),
                    1 => Ok(Value::Bool(true)),
                    other => Err(BusError::InvalidPayload(format!(
                        "boolean must be 0 or 1, got {}",
                        other
                    ))),
                }
            }
            PrimitiveKind::U8 => Ok(Value::U8(self.read_bytes(1)?[0])),
            PrimitiveKind::I16 => {
                self.align(2);
                let bytes = self.read_bytes(2)?;
                Ok(Value::I16(i16::from_le_bytes([bytes[0], bytes[1]])))
            }
            PrimitiveKind::U16 => {
                self.align(2);
                let bytes = self.read_bytes(2)?;
                Ok(Value::U16(u16::from_le_bytes([bytes[0], bytes[1]])))
            }
            PrimitiveKind::I32 => {
                self.align(4);
                let bytes = self.read_bytes(4)?;
                Ok(Value::I32(i32::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])))
            }
            PrimitiveKind::U32 => Ok(Value::U32(self.read_u32()?)),
            PrimitiveKind::I64 => {
                self.align(8);
                let bytes = self.read_bytes(8)?;
                Ok(Value::I64(i64::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ])))
            }
            PrimitiveKind::U64 => {
                self.align(8);
                let bytes = self.read_bytes(8)?;
                Ok(Value::U64(u64::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ])))
            }
            PrimitiveKind::F64 => {
                self.align(8);
                let bytes = self.read_bytes(8)?;
                Ok(Value::F64(f64::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ])))
            }
            PrimitiveKind::Str => Ok(Value::Str(self.read_string()?)),
            PrimitiveKind::ObjectPath => Ok(Value::ObjectPath(self.read_string()?)),
            PrimitiveKind::Signature => Ok(Value::Signature(self.read_signature()?)),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?.to_vec();
        let terminator = self.read_bytes(1)?[0];
        if terminator != 0 {
            return Err(BusError::InvalidPayload(
                "string missing nul terminator".to_string(),
            ));
        }
        String::from_utf8(bytes)
            .map_err(|e| BusError::InvalidPayload(format!("string is not UTF-8: {}", e)))
    }

    fn read_signature(&mut self) -> Result<Signature> {
        let len = self.read_bytes(1)?[0] as usize;
        let bytes = self.read_bytes(len)?.to_vec();
        let terminator = self.read_bytes(1)?[0];
        if terminator != 0 {
            return Err(BusError::InvalidPayload(
                "signature missing nul terminator".to_string(),
            ));
        }
        let text = String::from_utf8(bytes)
            .map_err(|e| BusError::InvalidPayload(format!("signature is not UTF-8: {}", e)))?;
        Ok(Signature::from(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::parse_single;

    fn roundtrip(value: Value, sig: &str) -> Value {
        let bridge = NativeBridge::new();
        let descriptor = parse_single(sig).expect("signature");
        let payload = bridge.encode(&value, &descriptor).expect("encode");
        assert_eq!(payload.signature().as_str(), sig);
        bridge.decode(&payload, &descriptor).expect("decode")
    }

    #[test]
    fn roundtrip_primitives() {
        assert_eq!(roundtrip(Value::from(true), "b"), Value::Bool(true));
        assert_eq!(roundtrip(Value::from(0xa5u8), "y"), Value::U8(0xa5));
        assert_eq!(roundtrip(Value::from(-7i16), "n"), Value::I16(-7));
        assert_eq!(roundtrip(Value::from(123_456u32), "u"), Value::U32(123_456));
        assert_eq!(
            roundtrip(Value::from(-1_234_567_890_123i64), "x"),
            Value::I64(-1_234_567_890_123)
        );
        assert_eq!(roundtrip(Value::from(2.5f64), "d"), Value::F64(2.5));
        assert_eq!(
            roundtrip(Value::from("hello"), "s"),
            Value::Str("hello".into())
        );
        assert_eq!(roundtrip(Value::from(""), "s"), Value::Str(String::new()));
    }

    #[test]
    fn roundtrip_unicode_string() {
        let text = "Hello 世界!";
        assert_eq!(roundtrip(Value::from(text), "s"), Value::Str(text.into()));
    }

    #[test]
    fn roundtrip_struct_with_mixed_alignment() {
        let value = Value::Struct(vec![
            Value::from(1u8),
            Value::from(2.0f64),
            Value::from("x"),
        ]);
        let decoded = roundtrip(value, "(yds)");
        let fields = decoded.as_slice().unwrap();
        assert_eq!(fields[0].as_u8(), Some(1));
        assert_eq!(fields[1].as_f64(), Some(2.0));
        assert_eq!(fields[2].as_str(), Some("x"));
    }

    #[test]
    fn roundtrip_dict() {
        let value: Value = vec![("one", 1i32), ("two", 2i32)].into_iter().collect();
        let decoded = roundtrip(value, "a{si}");
        assert_eq!(decoded.entry("one").and_then(Value::as_i32), Some(1));
        assert_eq!(decoded.entry("two").and_then(Value::as_i32), Some(2));
    }

    #[test]
    fn roundtrip_empty_array() {
        // An empty array can't derive a signature, but it can be encoded
        // against an explicit one.
        let decoded = roundtrip(Value::Array(Vec::new()), "ai");
        assert_eq!(decoded, Value::Array(Vec::new()));
    }

    #[test]
    fn roundtrip_nested_variant() {
        let value = Value::from(Variant::new("inner"));
        let decoded = roundtrip(value, "v");
        let nested = decoded.as_variant().expect("variant");
        assert_eq!(nested.get().unwrap().as_str(), Some("inner"));
    }

    #[test]
    fn encode_rejects_shape_mismatch() {
        let bridge = NativeBridge::new();
        let descriptor = parse_single("i").unwrap();
        let err = bridge.encode(&Value::from("nope"), &descriptor).unwrap_err();
        assert!(matches!(err, BusError::UnmarshalTypeMismatch { .. }));
    }

    #[test]
    fn encode_rejects_struct_arity_mismatch() {
        let bridge = NativeBridge::new();
        let descriptor = parse_single("(ii)").unwrap();
        let err = bridge
            .encode(&Value::Struct(vec![Value::from(1i32)]), &descriptor)
            .unwrap_err();
        assert!(matches!(err, BusError::UnmarshalTypeMismatch { .. }));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let bridge = NativeBridge::new();
        let descriptor = parse_single("x").unwrap();
        let payload = WirePayload::new(Signature::from("x"), vec![1, 2, 3]);
        assert!(matches!(
            bridge.decode(&payload, &descriptor),
            Err(BusError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let bridge = NativeBridge::new();
        let descriptor = parse_single("y").unwrap();
        let payload = WirePayload::new(Signature::from("y"), vec![1, 2]);
        assert!(matches!(
            bridge.decode(&payload, &descriptor),
            Err(BusError::InvalidPayload(_))
        ));
    }

    #[test]
    fn decode_rejects_non_canonical_bool() {
        let bridge = NativeBridge::new();
        let descriptor = parse_single("b").unwrap();
        let payload = WirePayload::new(Signature::from("b"), vec![2, 0, 0, 0]);
        assert!(matches!(
            bridge.decode(&payload, &descriptor),
            Err(BusError::InvalidPayload(_))
        ));
    }

    #[test]
    fn enum_encodes_as_underlying_primitive() {
        let bridge = NativeBridge::new();
        let descriptor = TypeDescriptor::EnumOf(PrimitiveKind::U32);
        let payload = bridge.encode(&Value::from(3u32), &descriptor).expect("encode");
        // Wire-visible signature carries no enum notion.
        assert_eq!(payload.signature().as_str(), "u");
        assert_eq!(
            bridge.decode(&payload, &descriptor).unwrap(),
            Value::U32(3)
        );
    }
}
