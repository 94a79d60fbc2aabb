// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for signature derivation and marshalling.
//!
//! Every failure is local and synchronous: marshalling is deterministic, so
//! nothing here is retryable. Callers decide whether a failure aborts a
//! single call or the whole connection.

use thiserror::Error;

/// Errors reported by the signature, resolver, interface and marshalling
/// layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Signature string violates the grammar (unknown code, unbalanced
    /// nesting, malformed dictionary entry, non-basic dictionary key).
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Value shape has no mapping onto the wire type system.
    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// An empty array or dictionary carries no element type evidence, so no
    /// signature can be inferred without an explicit hint.
    #[error("cannot derive a signature for an empty container without a type hint")]
    AmbiguousEmptyArraySignature,

    /// A registered aggregate with more than one field has a field without
    /// an explicit position, so the wire field order is undefined.
    #[error("field '{field}' of aggregate '{aggregate}' has no position annotation")]
    MissingFieldIndexAnnotation { aggregate: String, field: String },

    /// A registered enumeration does not declare its underlying wire type.
    #[error("enum '{0}' does not declare an underlying wire type")]
    MissingEnumTypeAnnotation(String),

    /// The wire signature is structurally incompatible with the requested
    /// target type (struct arity, dictionary key kind, scalar kind).
    #[error("wire value does not match requested type: expected '{expected}', found '{found}'")]
    UnmarshalTypeMismatch { expected: String, found: String },

    /// Paired property accessors disagree on the derived value signature.
    #[error("property '{property}' accessors disagree on signature: '{first}' vs '{second}'")]
    PropertyAccessorMismatch {
        property: String,
        first: String,
        second: String,
    },

    /// Two interface members resolve to the same wire name with different
    /// signatures.
    #[error("duplicate member '{0}' with conflicting signatures")]
    DuplicateMemberName(String),

    /// Container holds neither a materialized value nor a wire payload.
    /// Unreachable through the public constructors; defensive check.
    #[error("variant holds neither a value nor a wire payload")]
    NoValueAvailable,

    /// A named type reference was never registered.
    #[error("type '{0}' is not registered")]
    UnknownType(String),

    /// Wire payload ended before the value it claims to contain.
    #[error("payload truncated: need {need} more bytes, have {have}")]
    TruncatedPayload { need: usize, have: usize },

    /// Wire payload bytes are corrupt (bad UTF-8, missing terminator, ...).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BusError>;
