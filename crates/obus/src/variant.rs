// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The dynamic value container used at call and return boundaries.
//!
//! A [`Variant`] holds a materialized value, an undecoded wire payload, or
//! (after materialization) both. Senders wrap values, optionally with an
//! explicit signature; receivers construct from a wire handle and decode on
//! first access. Decoding happens at most once per container and the result
//! is cached.
//!
//! A container is a single-owner resource. The materialization cache is a
//! write-once cell with no internal lock; serializing concurrent calls to
//! [`Variant::materialize`] on the same container is the caller's
//! obligation (decode each received message once, fan out afterwards).

use crate::bridge::{WireBridge, WirePayload};
use crate::descriptor::TypeDescriptor;
use crate::error::{BusError, Result};
use crate::resolver::{derive_signature, ensure_compatible};
use crate::signature::{self, Signature};
use crate::value::Value;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Exclusively-owned handle to a native-encoded value.
///
/// Pairs the payload with the bridge that minted it, so the handle can
/// always decode and release itself. Release is deterministic and happens
/// exactly once: on drop, or earlier through [`release`](Self::release);
/// releasing an already-released handle is a no-op.
pub struct WireHandle {
    payload: Option<WirePayload>,
    bridge: Arc<dyn WireBridge>,
}

impl WireHandle {
    /// Take ownership of a payload minted by `bridge`.
    pub fn new(payload: WirePayload, bridge: Arc<dyn WireBridge>) -> Self {
        Self {
            payload: Some(payload),
            bridge,
        }
    }

    /// The signature embedded in the payload.
    pub fn signature(&self) -> Result<Signature> {
        let payload = self.payload.as_ref().ok_or(BusError::NoValueAvailable)?;
        self.bridge.signature_of(payload)
    }

    /// Decode the payload against a descriptor.
    pub(crate) fn decode(&self, descriptor: &TypeDescriptor) -> Result<Value> {
        let payload = self.payload.as_ref().ok_or(BusError::NoValueAvailable)?;
        self.bridge.decode(payload, descriptor)
    }

    /// Return the payload to its bridge. Idempotent.
    pub fn release(&mut self) {
        if let Some(payload) = self.payload.take() {
            self.bridge.release(payload);
        }
    }

    /// True once the payload has been released.
    pub fn is_released(&self) -> bool {
        self.payload.is_none()
    }
}

impl Drop for WireHandle {
    fn drop(&mut self) {
        self.release();
    }
}

// dyn WireBridge carries no Debug bound; render the handle by its state.
impl fmt::Debug for WireHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireHandle")
            .field("released", &self.is_released())
            .field(
                "signature",
                &self.payload.as_ref().map(|p| p.signature().as_str()),
            )
            .finish()
    }
}

/// Dynamic value container with deferred decode.
#[derive(Debug)]
pub struct Variant {
    /// Materialized value; written at most once.
    value: OnceCell<Value>,
    /// Explicit signature supplied by the sender, if any. Consistency with
    /// the wrapped value's derived signature is the constructor caller's
    /// responsibility and is not re-validated.
    signature: Option<Signature>,
    /// Undecoded wire payload, present on containers built by receivers.
    wire: Option<WireHandle>,
}

impl Variant {
    /// Wrap an application value.
    pub fn new(value: impl Into<Value>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value.into());
        Self {
            value: cell,
            signature: None,
            wire: None,
        }
    }

    /// Wrap an application value together with its explicit signature.
    pub fn with_signature(value: impl Into<Value>, signature: impl Into<Signature>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value.into());
        Self {
            value: cell,
            signature: Some(signature.into()),
            wire: None,
        }
    }

    /// Wrap an undecoded wire handle.
    pub fn from_wire(handle: WireHandle) -> Self {
        Self {
            value: OnceCell::new(),
            signature: None,
            wire: Some(handle),
        }
    }

    /// The explicit signature, if one was supplied.
    pub fn explicit_signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// The materialized value, without triggering a decode.
    pub fn value(&self) -> Option<&Value> {
        self.value.get()
    }

    /// True once a value is available without decoding.
    pub fn is_materialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// The container's signature: derived from the materialized value (an
    /// explicit signature takes precedence), or read from the wire payload
    /// when nothing is materialized yet.
    pub fn signature(&self) -> Result<Signature> {
        if let Some(value) = self.value.get() {
            return derive_signature(value, self.signature.as_ref());
        }
        if let Some(wire) = &self.wire {
            return wire.signature();
        }
        Err(BusError::NoValueAvailable)
    }

    /// Materialize without a target type; decodes into built-in container
    /// shapes per the wire signature.
    pub fn get(&self) -> Result<&Value> {
        self.materialize(None)
    }

    /// Materialize the value, decoding the wire payload on first call.
    ///
    /// Idempotent: once a value is cached it is returned as-is and the
    /// bridge is not consulted again. When `target` is supplied it becomes
    /// the decode descriptor after a structural compatibility check against
    /// the wire signature ([`BusError::UnmarshalTypeMismatch`] on struct
    /// arity, dictionary key or scalar kind disagreement).
    pub fn materialize(&self, target: Option<&TypeDescriptor>) -> Result<&Value> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let wire = self.wire.as_ref().ok_or(BusError::NoValueAvailable)?;
        let wire_sig = wire.signature()?;
        let wire_desc = signature::parse_single(wire_sig.as_str())?;
        let descriptor = match target {
            Some(target) => {
                ensure_compatible(&wire_desc, target)?;
                target
            }
            None => &wire_desc,
        };
        let decoded = wire.decode(descriptor)?;
        Ok(self.value.get_or_init(|| decoded))
    }

    /// Encode this container's value into a fresh wire handle.
    ///
    /// Materializes first when only a payload is held.
    pub fn to_wire(&self, bridge: &Arc<dyn WireBridge>) -> Result<WireHandle> {
        let value = self.get()?;
        let sig = derive_signature(value, self.signature.as_ref())?;
        let descriptor = signature::parse_single(sig.as_str())?;
        let payload = bridge.encode(value, &descriptor)?;
        Ok(WireHandle::new(payload, Arc::clone(bridge)))
    }

    /// Release the wire payload now instead of at drop. Idempotent; the
    /// materialized value, if any, stays available.
    pub fn dispose(&mut self) {
        if let Some(wire) = &mut self.wire {
            wire.release();
        }
    }
}

/// Containers are equal iff both materialize successfully and the
/// materialized values are equal. Any decode failure is inequality, never
/// an error: equality must be total.
impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::NativeBridge;
    use crate::descriptor::PrimitiveKind;
    use crate::signature::parse_single;

    fn bridge() -> Arc<dyn WireBridge> {
        Arc::new(NativeBridge::new())
    }

    fn wire_variant(value: Value, sig: &str) -> Variant {
        let b = bridge();
        let descriptor = parse_single(sig).unwrap();
        let payload = b.encode(&value, &descriptor).unwrap();
        Variant::from_wire(WireHandle::new(payload, b))
    }

    #[test]
    fn wrapped_value_signature_is_derived() {
        let v = Variant::new(42i32);
        assert_eq!(v.signature().unwrap().as_str(), "i");
        assert!(v.is_materialized());
    }

    #[test]
    fn explicit_signature_takes_precedence() {
        let v = Variant::with_signature(Value::Array(Vec::new()), "ai");
        assert_eq!(v.signature().unwrap().as_str(), "ai");
    }

    #[test]
    fn wire_signature_read_through_bridge() {
        let v = wire_variant(Value::from("hello"), "s");
        assert!(!v.is_materialized());
        assert_eq!(v.signature().unwrap().as_str(), "s");
        assert!(!v.is_materialized(), "signature() must not decode");
    }

    #[test]
    fn materialize_decodes_and_caches() {
        let v = wire_variant(Value::from(7u32), "u");
        let first = v.get().unwrap() as *const Value;
        let second = v.get().unwrap() as *const Value;
        assert_eq!(first, second, "cached value must be returned");
        assert_eq!(v.get().unwrap().as_u32(), Some(7));
    }

    #[test]
    fn materialize_against_compatible_target() {
        let v = wire_variant(Value::from(2u32), "u");
        let target = TypeDescriptor::EnumOf(PrimitiveKind::U32);
        let value = v.materialize(Some(&target)).unwrap();
        assert_eq!(value.as_u32(), Some(2));
    }

    #[test]
    fn materialize_against_incompatible_target() {
        let v = wire_variant(
            Value::Struct(vec![Value::from(1i32), Value::from("x")]),
            "(is)",
        );
        let target = parse_single("(isi)").unwrap();
        assert!(matches!(
            v.materialize(Some(&target)),
            Err(BusError::UnmarshalTypeMismatch { .. })
        ));
    }

    #[test]
    fn struct_materializes_from_wire() {
        // Wire bytes for (42, "ok") against "(is)" come back as the same
        // two-field aggregate.
        let v = wire_variant(
            Value::Struct(vec![Value::from(42i32), Value::from("ok")]),
            "(is)",
        );
        let value = v.get().unwrap();
        assert_eq!(
            *value,
            Value::Struct(vec![Value::from(42i32), Value::from("ok")])
        );
    }

    #[test]
    fn equality_across_construction_paths() {
        let wrapped = Variant::new("hello");
        let from_wire = wire_variant(Value::from("hello"), "s");
        assert_eq!(wrapped, from_wire);

        let different = Variant::new("goodbye");
        assert_ne!(wrapped, different);
    }

    #[test]
    fn equality_swallows_decode_failures() {
        let b = bridge();
        let broken = Variant::from_wire(WireHandle::new(
            WirePayload::new(Signature::from("x"), vec![1, 2]),
            b,
        ));
        let fine = Variant::new(0i64);
        assert_ne!(broken, fine);
        assert_ne!(fine, broken);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut v = wire_variant(Value::from(1u8), "y");
        v.dispose();
        v.dispose();
        assert!(matches!(v.get(), Err(BusError::NoValueAvailable)));
    }

    #[test]
    fn dispose_after_materialize_keeps_value() {
        let mut v = wire_variant(Value::from(9i64), "x");
        assert_eq!(v.get().unwrap().as_i64(), Some(9));
        v.dispose();
        assert_eq!(v.get().unwrap().as_i64(), Some(9));
    }

    #[test]
    fn to_wire_roundtrip() {
        let b = bridge();
        let outbound = Variant::new(Value::Struct(vec![
            Value::from(3u32),
            Value::from("three"),
        ]));
        let handle = outbound.to_wire(&b).unwrap();
        assert_eq!(handle.signature().unwrap().as_str(), "(us)");

        let inbound = Variant::from_wire(handle);
        assert_eq!(outbound, inbound);
    }
}
