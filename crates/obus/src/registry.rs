// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registration-time declarations of user-defined wire types.
//!
//! There is no runtime reflection here: aggregate and enumeration types are
//! declared once, up front, and the resolver consults the registry whenever
//! a declared interface member or a preferred decode target names one.

use crate::descriptor::PrimitiveKind;
use crate::error::{BusError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A declared (static) type, used where no runtime value is available:
/// method parameters, return types, property types and aggregate fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// Basic scalar type.
    Primitive(PrimitiveKind),
    /// Array of a declared element type.
    Array(Box<TypeRef>),
    /// Dictionary with declared key and value types.
    Dict(Box<TypeRef>, Box<TypeRef>),
    /// Reference to a registered aggregate or enumeration, by name.
    Named(String),
    /// Dynamically-typed slot.
    Variant,
}

impl TypeRef {
    /// Array-of constructor.
    pub fn array(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Dictionary constructor.
    pub fn dict(key: TypeRef, value: TypeRef) -> Self {
        Self::Dict(Box::new(key), Box::new(value))
    }

    /// Named-type reference constructor.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<PrimitiveKind> for TypeRef {
    fn from(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }
}

/// One field of a registered aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Field name.
    pub name: String,
    /// Declared field type.
    pub ty: TypeRef,
    /// Explicit wire position. Required whenever the aggregate has more
    /// than one field; a single-field aggregate needs none.
    pub position: Option<u32>,
}

/// A registered user-defined aggregate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    /// Type name, as referenced by [`TypeRef::Named`].
    pub name: String,
    /// Fields in source declaration order.
    pub fields: Vec<StructField>,
}

impl StructType {
    /// Fields sorted by ascending explicit position.
    ///
    /// Fails with [`BusError::MissingFieldIndexAnnotation`] when the type
    /// has more than one field and any of them lacks a position.
    pub fn ordered_fields(&self) -> Result<Vec<&StructField>> {
        if self.fields.len() > 1 {
            if let Some(unpositioned) = self.fields.iter().find(|f| f.position.is_none()) {
                return Err(BusError::MissingFieldIndexAnnotation {
                    aggregate: self.name.clone(),
                    field: unpositioned.name.clone(),
                });
            }
        }
        let mut ordered: Vec<&StructField> = self.fields.iter().collect();
        ordered.sort_by_key(|f| f.position.unwrap_or(0));
        Ok(ordered)
    }
}

/// Builder for registered aggregate types.
#[derive(Debug)]
pub struct StructTypeBuilder {
    name: String,
    fields: Vec<StructField>,
}

impl StructTypeBuilder {
    /// Create a new builder for an aggregate type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field with an explicit wire position.
    pub fn field_at(
        mut self,
        position: u32,
        name: impl Into<String>,
        ty: impl Into<TypeRef>,
    ) -> Self {
        self.fields.push(StructField {
            name: name.into(),
            ty: ty.into(),
            position: Some(position),
        });
        self
    }

    /// Add a field without a position annotation.
    ///
    /// Legal only while the type ends up with a single field; multi-field
    /// aggregates fail signature derivation otherwise.
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.fields.push(StructField {
            name: name.into(),
            ty: ty.into(),
            position: None,
        });
        self
    }

    /// Build the aggregate declaration.
    pub fn build(self) -> StructType {
        StructType {
            name: self.name,
            fields: self.fields,
        }
    }
}

/// A registered enumeration type.
///
/// Only the underlying wire kind matters for marshalling; enumeration
/// values travel as that primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    /// Type name, as referenced by [`TypeRef::Named`].
    pub name: String,
    /// Declared underlying wire type, if any.
    pub underlying: Option<PrimitiveKind>,
}

impl EnumType {
    /// Create an enumeration declaration without an underlying type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            underlying: None,
        }
    }

    /// Declare the underlying wire type.
    pub fn with_underlying(mut self, kind: PrimitiveKind) -> Self {
        self.underlying = Some(kind);
        self
    }
}

/// A registered named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedType {
    Struct(StructType),
    Enum(EnumType),
}

impl NamedType {
    /// Name of the registered type.
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(s) => &s.name,
            Self::Enum(e) => &e.name,
        }
    }
}

/// Thread-safe store of registered named types.
///
/// Registration is expected at startup; lookups happen on every resolution
/// of a `Named` reference. Re-registering a name replaces the previous
/// definition.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<NamedType>>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an aggregate type.
    pub fn register_struct(&self, def: StructType) {
        self.register(NamedType::Struct(def));
    }

    /// Register an enumeration type.
    pub fn register_enum(&self, def: EnumType) {
        self.register(NamedType::Enum(def));
    }

    /// Register a named type, replacing any previous definition.
    pub fn register(&self, def: NamedType) {
        let name = def.name().to_string();
        log::debug!("type registry: registered '{}'", name);
        self.types.write().insert(name, Arc::new(def));
    }

    /// Look up a registered type by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<NamedType>> {
        self.types.read().get(name).cloned()
    }

    /// Look up a registered type or fail with [`BusError::UnknownType`].
    pub fn get(&self, name: &str) -> Result<Arc<NamedType>> {
        self.lookup(name)
            .ok_or_else(|| BusError::UnknownType(name.to_string()))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}
