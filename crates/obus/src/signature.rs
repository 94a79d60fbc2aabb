// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signature grammar: the compact textual encoding of wire types.
//!
//! A signature is a string over a closed alphabet of type codes: basic
//! scalar codes, `a` + element for arrays, `(...)` for fixed-arity structs,
//! `a{kv}` for dictionaries and `v` for variants. Every valid signature is a
//! concatenation of zero or more complete type terms. Signatures compare and
//! hash as opaque strings; the string form is the wire-visible artifact and
//! must match byte-for-byte across peers.

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::{BusError, Result};
use std::fmt;

/// Struct open punctuation.
pub const STRUCT_OPEN: char = '(';
/// Struct close punctuation.
pub const STRUCT_CLOSE: char = ')';
/// Dictionary entry open punctuation (only valid directly after `a`).
pub const DICT_OPEN: char = '{';
/// Dictionary entry close punctuation.
pub const DICT_CLOSE: char = '}';
/// Array prefix code.
pub const ARRAY: char = 'a';
/// Variant code.
pub const VARIANT: char = 'v';

/// An immutable wire type signature.
///
/// Construction is unvalidated: explicit signatures are taken verbatim and
/// the caller asserts their correctness. Validation happens where a
/// signature is actually consumed, via [`parse`] or [`parse_single`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature(String);

impl Signature {
    /// The empty signature (a zero-argument member).
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Signature string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this signature contains no type terms.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the signature string in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Signature {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Signature {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Parse a signature into its sequence of complete type terms.
///
/// The empty signature parses to an empty sequence. Fails with
/// [`BusError::MalformedSignature`] on an unknown code, unbalanced nesting,
/// a dictionary entry that is not exactly a key/value pair, a non-basic
/// dictionary key, or a dictionary entry outside an array position.
pub fn parse(signature: &str) -> Result<Vec<TypeDescriptor>> {
    let mut parser = Parser::new(signature);
    let mut terms = Vec::new();
    while !parser.at_end() {
        terms.push(parser.term()?);
    }
    Ok(terms)
}

/// Parse a signature that must contain exactly one complete type term.
pub fn parse_single(signature: &str) -> Result<TypeDescriptor> {
    let mut terms = parse(signature)?;
    if terms.len() != 1 {
        return Err(BusError::MalformedSignature(format!(
            "expected exactly one complete type, got {} in '{}'",
            terms.len(),
            signature
        )));
    }
    Ok(terms.remove(0))
}

/// Serialize a descriptor back to its signature. Total function; round-trips
/// with [`parse`] for any descriptor [`parse`] can produce. Enumerations
/// serialize as their underlying primitive code.
pub fn format(descriptor: &TypeDescriptor) -> Signature {
    let mut out = String::new();
    format_into(descriptor, &mut out);
    Signature(out)
}

fn format_into(descriptor: &TypeDescriptor, out: &mut String) {
    match descriptor {
        TypeDescriptor::Primitive(p) | TypeDescriptor::EnumOf(p) => out.push(p.code()),
        TypeDescriptor::ArrayOf(element) => {
            out.push(ARRAY);
            format_into(element, out);
        }
        TypeDescriptor::StructOf(fields) => {
            out.push(STRUCT_OPEN);
            for field in fields {
                format_into(field, out);
            }
            out.push(STRUCT_CLOSE);
        }
        TypeDescriptor::DictOf(key, value) => {
            out.push(ARRAY);
            out.push(DICT_OPEN);
            format_into(key, out);
            format_into(value, out);
            out.push(DICT_CLOSE);
        }
        TypeDescriptor::Variant => out.push(VARIANT),
    }
}

impl TypeDescriptor {
    /// Signature of this descriptor; shorthand for [`format`].
    pub fn signature(&self) -> Signature {
        format(self)
    }
}

/// Recursive-descent parser over the signature alphabet.
struct Parser<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    peeked: Option<char>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars(),
            peeked: None,
        }
    }

    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn bump(&mut self) -> Option<char> {
        self.peek();
        self.peeked.take()
    }

    fn malformed(&self, what: &str) -> BusError {
        BusError::MalformedSignature(format!("{} in '{}'", what, self.src))
    }

    fn term(&mut self) -> Result<TypeDescriptor> {
        let code = self
            .bump()
            .ok_or_else(|| self.malformed("unexpected end of signature"))?;

        if let Some(kind) = PrimitiveKind::from_code(code) {
            return Ok(TypeDescriptor::Primitive(kind));
        }

        match code {
            VARIANT => Ok(TypeDescriptor::Variant),
            ARRAY => {
                if self.peek() == Some(DICT_OPEN) {
                    self.bump();
                    self.dict_entry()
                } else {
                    if self.at_end() {
                        return Err(self.malformed("array without element type"));
                    }
                    let element = self.term()?;
                    Ok(TypeDescriptor::array_of(element))
                }
            }
            STRUCT_OPEN => {
                let mut fields = Vec::new();
                loop {
                    match self.peek() {
                        Some(STRUCT_CLOSE) => {
                            self.bump();
                            break;
                        }
                        Some(_) => fields.push(self.term()?),
                        None => return Err(self.malformed("unbalanced struct")),
                    }
                }
                if fields.is_empty() {
                    return Err(self.malformed("empty struct"));
                }
                Ok(TypeDescriptor::StructOf(fields))
            }
            DICT_OPEN => Err(self.malformed("dictionary entry outside array")),
            STRUCT_CLOSE | DICT_CLOSE => Err(self.malformed("unbalanced closing punctuation")),
            other => Err(self.malformed(&format!("unknown type code '{}'", other))),
        }
    }

    /// Parses the `kv}` remainder of `a{`.
    fn dict_entry(&mut self) -> Result<TypeDescriptor> {
        if self.at_end() {
            return Err(self.malformed("unterminated dictionary entry"));
        }
        let key = self.term()?;
        if !key.is_basic() {
            return Err(self.malformed("dictionary key must be a basic type"));
        }
        if self.at_end() {
            return Err(self.malformed("dictionary entry missing value type"));
        }
        let value = self.term()?;
        match self.bump() {
            Some(DICT_CLOSE) => Ok(TypeDescriptor::DictOf(Box::new(key), Box::new(value))),
            _ => Err(self.malformed(
                "dictionary entry must contain exactly one key and one value",
            )),
        }
    }
}
