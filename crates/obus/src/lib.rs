// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # obus - dynamic type signatures and marshalling for object remoting
//!
//! Values exchanged between peers of an object-remoting bus carry a compact
//! textual type signature (`"a{sv}"`, `"(is)"`, ...) alongside their
//! payload, so a receiver with no compile-time knowledge of a method's
//! types can still decode correctly. This crate is the type-interchange
//! layer of such a bus: signature grammar, runtime type resolution,
//! interface member tables and the deferred-decode value container.
//! Transport framing, session establishment and authentication live
//! elsewhere and consume this crate through the [`WireBridge`] boundary.
//!
//! ## Quick Start
//!
//! ```rust
//! use obus::{
//!     InterfaceBuilder, MethodSpec, NativeBridge, PrimitiveKind, Result,
//!     StructTypeBuilder, TypeRef, TypeRegistry, TypeResolver, Value, Variant, WireBridge,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     // Declare wire types once, at startup.
//!     let registry = Arc::new(TypeRegistry::new());
//!     registry.register_struct(
//!         StructTypeBuilder::new("Point")
//!             .field_at(0, "x", PrimitiveKind::I32)
//!             .field_at(1, "y", PrimitiveKind::I32)
//!             .build(),
//!     );
//!     let resolver = TypeResolver::new(registry);
//!
//!     // Extract an interface's member table.
//!     let iface = InterfaceBuilder::new("org.example.Plotter")
//!         .method(
//!             MethodSpec::new("Plot")
//!                 .arg(TypeRef::named("Point"))
//!                 .returns(PrimitiveKind::Bool),
//!         )
//!         .build()
//!         .extract(&resolver)?;
//!     assert_eq!(iface.member("Plot").unwrap().args[0].as_str(), "(ii)");
//!
//!     // Wrap a call argument and push it through the wire.
//!     let bridge: Arc<dyn WireBridge> = Arc::new(NativeBridge::new());
//!     let argument = Variant::new(Value::Struct(vec![Value::from(3i32), Value::from(4i32)]));
//!     let handle = argument.to_wire(&bridge)?;
//!
//!     // The receiver decodes on first access.
//!     let received = Variant::from_wire(handle);
//!     assert_eq!(received.signature()?.as_str(), "(ii)");
//!     assert_eq!(argument, received);
//!     Ok(())
//! }
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Signature`] | Compact string encoding of a value's wire type |
//! | [`TypeDescriptor`] | Resolved, structured form of one signature term |
//! | [`Value`] | Closed union of everything the wire can carry |
//! | [`Variant`] | Dynamic value container with deferred decode |
//! | [`TypeResolver`] | Value shape / declared type <-> signature mapping |
//! | [`InterfaceBuilder`] | Declarative interface member declaration |
//! | [`WireBridge`] | External encode/decode primitive behind the container |
//!
//! ## Modules Overview
//!
//! - [`signature`] - grammar, parser and serializer (start here)
//! - [`resolver`] - signature derivation and type resolution
//! - [`interface`] - interface declarations and member extraction
//! - [`variant`] - the value container
//! - [`bridge`] - the marshalling boundary and default codec

/// Wire marshalling boundary and the default aligned-LE codec.
pub mod bridge;
/// Type descriptors: the resolved form of signature terms.
pub mod descriptor;
/// Error taxonomy and crate-wide `Result`.
pub mod error;
/// Interface declarations and descriptor extraction.
pub mod interface;
/// Registration-time declarations of user-defined wire types.
pub mod registry;
/// Signature derivation and type resolution.
pub mod resolver;
/// Signature grammar: parse and format.
pub mod signature;
/// Dynamic values.
pub mod value;
/// The dynamic value container.
pub mod variant;

pub use bridge::{NativeBridge, WireBridge, WirePayload};
pub use descriptor::{PrimitiveKind, TypeDescriptor};
pub use error::{BusError, Result};
pub use interface::{
    AccessorSpec, InterfaceBuilder, InterfaceDecl, InterfaceDescriptor, MemberDescriptor,
    MemberKind, MethodSpec, PropertyAccess, SignalSpec,
};
pub use registry::{
    EnumType, NamedType, StructField, StructType, StructTypeBuilder, TypeRef, TypeRegistry,
};
pub use resolver::{derive_signature, TypeResolver};
pub use signature::{format, parse, parse_single, Signature};
pub use value::Value;
pub use variant::{Variant, WireHandle};

/// obus version string.
pub const VERSION: &str = "0.4.2";
