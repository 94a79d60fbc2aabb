// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bidirectional mapping between value shapes, declared types and
//! signatures.
//!
//! Two derivation tiers: an explicit hint always wins verbatim (the caller
//! asserts its correctness), shape inference runs only when no hint is
//! given. This resolves ambiguities inference cannot, e.g. a subclassed
//! collection or an aggregate with a single field.

use crate::descriptor::TypeDescriptor;
use crate::error::{BusError, Result};
use crate::registry::{NamedType, TypeRef, TypeRegistry};
use crate::signature::{self, Signature};
use crate::value::Value;
use std::sync::Arc;

/// Derive the signature of a runtime value.
///
/// A present, non-empty `hint` is returned verbatim. Otherwise the value's
/// shape is inspected recursively: primitives map to their fixed code,
/// arrays to `a` + the first element's signature, dictionaries to
/// `a{`key value`}`, positional structs to `(`fields`)` and nested variants
/// to `v`.
///
/// Empty arrays and dictionaries fail with
/// [`BusError::AmbiguousEmptyArraySignature`]: with no element present
/// there is no type evidence to infer from.
pub fn derive_signature(value: &Value, hint: Option<&Signature>) -> Result<Signature> {
    if let Some(hint) = hint {
        if !hint.is_empty() {
            return Ok(hint.clone());
        }
    }
    let mut out = String::new();
    derive_into(value, &mut out)?;
    Ok(Signature::from(out))
}

fn derive_into(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Bool(_) => out.push('b'),
        Value::U8(_) => out.push('y'),
        Value::I16(_) => out.push('n'),
        Value::U16(_) => out.push('q'),
        Value::I32(_) => out.push('i'),
        Value::U32(_) => out.push('u'),
        Value::I64(_) => out.push('x'),
        Value::U64(_) => out.push('t'),
        Value::F64(_) => out.push('d'),
        Value::Str(_) => out.push('s'),
        Value::ObjectPath(_) => out.push('o'),
        Value::Signature(_) => out.push('g'),
        Value::Array(elements) => {
            let first = elements
                .first()
                .ok_or(BusError::AmbiguousEmptyArraySignature)?;
            out.push(signature::ARRAY);
            derive_into(first, out)?;
        }
        Value::Dict(entries) => {
            let (key, val) = entries
                .first()
                .ok_or(BusError::AmbiguousEmptyArraySignature)?;
            if let Some(bad) = entries.iter().find(|(k, _)| !k.is_basic()) {
                return Err(BusError::UnsupportedValueType(format!(
                    "dictionary key must be a basic type, got {}",
                    bad.0.kind_name()
                )));
            }
            out.push(signature::ARRAY);
            out.push(signature::DICT_OPEN);
            derive_into(key, out)?;
            derive_into(val, out)?;
            out.push(signature::DICT_CLOSE);
        }
        Value::Struct(fields) => {
            if fields.is_empty() {
                return Err(BusError::UnsupportedValueType(
                    "struct with no fields".to_string(),
                ));
            }
            out.push(signature::STRUCT_OPEN);
            for field in fields {
                derive_into(field, out)?;
            }
            out.push(signature::STRUCT_CLOSE);
        }
        Value::Variant(_) => out.push(signature::VARIANT),
    }
    Ok(())
}

/// Resolver binding signatures to declared types through a shared registry.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    registry: Arc<TypeRegistry>,
}

impl TypeResolver {
    /// Create a resolver over a shared registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Derive a value's signature; see [`derive_signature`].
    pub fn derive_signature(&self, value: &Value, hint: Option<&Signature>) -> Result<Signature> {
        derive_signature(value, hint)
    }

    /// Signature of a declared type. Static-type-only derivation: no
    /// runtime value is involved.
    ///
    /// Registered aggregates serialize their fields in ascending explicit
    /// position order ([`BusError::MissingFieldIndexAnnotation`] when a
    /// multi-field aggregate leaves one out); registered enumerations
    /// serialize as their declared underlying code
    /// ([`BusError::MissingEnumTypeAnnotation`] when undeclared).
    pub fn signature_of(&self, ty: &TypeRef) -> Result<Signature> {
        let mut out = String::new();
        self.signature_of_into(ty, &mut out)?;
        Ok(Signature::from(out))
    }

    fn signature_of_into(&self, ty: &TypeRef, out: &mut String) -> Result<()> {
        match ty {
            TypeRef::Primitive(kind) => out.push(kind.code()),
            TypeRef::Array(element) => {
                out.push(signature::ARRAY);
                self.signature_of_into(element, out)?;
            }
            TypeRef::Dict(key, value) => {
                let key_sig = self.signature_of(key)?;
                if key_sig.len() != 1 || !signature::parse_single(key_sig.as_str())?.is_basic() {
                    return Err(BusError::UnsupportedValueType(format!(
                        "dictionary key must be a basic type, got '{}'",
                        key_sig
                    )));
                }
                out.push(signature::ARRAY);
                out.push(signature::DICT_OPEN);
                out.push_str(key_sig.as_str());
                self.signature_of_into(value, out)?;
                out.push(signature::DICT_CLOSE);
            }
            TypeRef::Named(name) => match self.registry.get(name)?.as_ref() {
                NamedType::Struct(def) => {
                    out.push(signature::STRUCT_OPEN);
                    for field in def.ordered_fields()? {
                        self.signature_of_into(&field.ty, out)?;
                    }
                    out.push(signature::STRUCT_CLOSE);
                }
                NamedType::Enum(def) => {
                    let underlying = def
                        .underlying
                        .ok_or_else(|| BusError::MissingEnumTypeAnnotation(def.name.clone()))?;
                    out.push(underlying.code());
                }
            },
            TypeRef::Variant => out.push(signature::VARIANT),
        }
        Ok(())
    }

    /// Bound descriptor of a declared type: named aggregates expand to
    /// `StructOf` in position order, named enumerations to `EnumOf`.
    pub fn descriptor_of(&self, ty: &TypeRef) -> Result<TypeDescriptor> {
        match ty {
            TypeRef::Primitive(kind) => Ok(TypeDescriptor::Primitive(*kind)),
            TypeRef::Array(element) => Ok(TypeDescriptor::array_of(self.descriptor_of(element)?)),
            TypeRef::Dict(key, value) => {
                let key_desc = self.descriptor_of(key)?;
                if !key_desc.is_basic() {
                    return Err(BusError::UnsupportedValueType(format!(
                        "dictionary key must be a basic type, got '{}'",
                        key_desc.signature()
                    )));
                }
                Ok(TypeDescriptor::dict_of(key_desc, self.descriptor_of(value)?))
            }
            TypeRef::Named(name) => match self.registry.get(name)?.as_ref() {
                NamedType::Struct(def) => {
                    let mut fields = Vec::with_capacity(def.fields.len());
                    for field in def.ordered_fields()? {
                        fields.push(self.descriptor_of(&field.ty)?);
                    }
                    Ok(TypeDescriptor::StructOf(fields))
                }
                NamedType::Enum(def) => {
                    let underlying = def
                        .underlying
                        .ok_or_else(|| BusError::MissingEnumTypeAnnotation(def.name.clone()))?;
                    Ok(TypeDescriptor::EnumOf(underlying))
                }
            },
            TypeRef::Variant => Ok(TypeDescriptor::Variant),
        }
    }

    /// Resolve a signature to a descriptor usable for decoding.
    ///
    /// Without a hint the result is the generic descriptor tree: wire bytes
    /// decode into built-in container shapes only. When `preferred` names a
    /// registered aggregate or enumeration, struct/enum terms bind to that
    /// type's field order and underlying kind; the parsed signature must
    /// agree structurally ([`BusError::UnmarshalTypeMismatch`] otherwise).
    pub fn resolve_type(
        &self,
        signature: &Signature,
        preferred: Option<&str>,
    ) -> Result<TypeDescriptor> {
        let parsed = signature::parse_single(signature.as_str())?;
        match preferred {
            None => Ok(parsed),
            Some(name) => {
                let bound = self.descriptor_of(&TypeRef::named(name))?;
                ensure_compatible(&parsed, &bound)?;
                Ok(bound)
            }
        }
    }
}

/// Structural compatibility between a wire-derived descriptor and a decode
/// target. `EnumOf(k)` is compatible with a wire `Primitive(k)`.
pub(crate) fn ensure_compatible(wire: &TypeDescriptor, target: &TypeDescriptor) -> Result<()> {
    let compatible = match (wire, target) {
        (TypeDescriptor::Primitive(a), TypeDescriptor::Primitive(b)) => a == b,
        (TypeDescriptor::Primitive(a), TypeDescriptor::EnumOf(b)) => a == b,
        (TypeDescriptor::EnumOf(a), TypeDescriptor::EnumOf(b)) => a == b,
        (TypeDescriptor::Variant, TypeDescriptor::Variant) => true,
        (TypeDescriptor::ArrayOf(a), TypeDescriptor::ArrayOf(b)) => {
            return ensure_compatible(a, b);
        }
        (TypeDescriptor::DictOf(ka, va), TypeDescriptor::DictOf(kb, vb)) => {
            ensure_compatible(ka, kb)?;
            return ensure_compatible(va, vb);
        }
        (TypeDescriptor::StructOf(xs), TypeDescriptor::StructOf(ys)) => {
            if xs.len() != ys.len() {
                false
            } else {
                for (x, y) in xs.iter().zip(ys) {
                    ensure_compatible(x, y)?;
                }
                true
            }
        }
        _ => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(BusError::UnmarshalTypeMismatch {
            expected: target.signature().as_str().to_string(),
            found: wire.signature().as_str().to_string(),
        })
    }
}
