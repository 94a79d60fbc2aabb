// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface declarations and descriptor extraction.
//!
//! Interfaces are declared once, at registration time, through
//! [`InterfaceBuilder`]: one spec per exported method, signal or property
//! accessor, in declaration order. [`extract`] resolves every declared type
//! to its wire signature and produces the normalized member table a proxy
//! or skeleton works from.
//!
//! Property accessors pair up by logical property name: a recognized
//! `get`/`set` prefix is stripped from the accessor's method name, or an
//! explicit override supplies the name directly. A read and a write
//! accessor for the same property must agree on the derived value
//! signature.

use crate::error::{BusError, Result};
use crate::registry::TypeRef;
use crate::resolver::TypeResolver;
use crate::signature::{self, Signature};

/// Kind of an extracted interface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Property,
    Signal,
}

/// Property access mode, determined by which accessors were declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    Read,
    Write,
    ReadWrite,
}

/// One entry of an interface's normalized member table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    /// Member kind.
    pub kind: MemberKind,
    /// Wire name.
    pub name: String,
    /// Argument signatures, in declaration order. Empty for properties.
    pub args: Vec<Signature>,
    /// Return signature for methods, value signature for properties,
    /// `None` for signals and void methods.
    pub returns: Option<Signature>,
    /// Access mode; present for properties only.
    pub access: Option<PropertyAccess>,
    /// Declaration-order position within the interface.
    pub position: u32,
    /// Reply-timeout hint in milliseconds, if declared.
    pub timeout_ms: Option<u32>,
}

/// Extracted interface: metadata plus the ordered member table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    /// Interface wire name.
    pub name: String,
    /// Whether the interface is announced to peers.
    pub announced: bool,
    /// Human-readable description.
    pub description: Option<String>,
    /// Language tag of the description.
    pub description_language: Option<String>,
    /// Members in declaration order.
    pub members: Vec<MemberDescriptor>,
}

impl InterfaceDescriptor {
    /// Look up a member by wire name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Members of one kind, in declaration order.
    pub fn members_of(&self, kind: MemberKind) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.iter().filter(move |m| m.kind == kind)
    }
}

/// Declaration of an exported method.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    name_override: Option<String>,
    args: Vec<TypeRef>,
    returns: Option<TypeRef>,
    args_signature: Option<Signature>,
    reply_signature: Option<Signature>,
    timeout_ms: Option<u32>,
}

impl MethodSpec {
    /// Declare a method.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_override: None,
            args: Vec::new(),
            returns: None,
            args_signature: None,
            reply_signature: None,
            timeout_ms: None,
        }
    }

    /// Append a declared argument type.
    pub fn arg(mut self, ty: impl Into<TypeRef>) -> Self {
        self.args.push(ty.into());
        self
    }

    /// Declare the return type.
    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.returns = Some(ty.into());
        self
    }

    /// Override the wire name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// Override the input signature verbatim; it is split into per-argument
    /// terms instead of being derived from declared types.
    pub fn args_signature(mut self, sig: impl Into<Signature>) -> Self {
        self.args_signature = Some(sig.into());
        self
    }

    /// Override the reply signature verbatim.
    pub fn reply_signature(mut self, sig: impl Into<Signature>) -> Self {
        self.reply_signature = Some(sig.into());
        self
    }

    /// Reply-timeout hint in milliseconds.
    pub fn timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// Declaration of an exported signal.
#[derive(Debug, Clone)]
pub struct SignalSpec {
    name: String,
    name_override: Option<String>,
    args: Vec<TypeRef>,
    args_signature: Option<Signature>,
}

impl SignalSpec {
    /// Declare a signal.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_override: None,
            args: Vec::new(),
            args_signature: None,
        }
    }

    /// Append a declared argument type.
    pub fn arg(mut self, ty: impl Into<TypeRef>) -> Self {
        self.args.push(ty.into());
        self
    }

    /// Override the wire name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// Override the argument signature verbatim.
    pub fn args_signature(mut self, sig: impl Into<Signature>) -> Self {
        self.args_signature = Some(sig.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessorRole {
    Get,
    Set,
}

/// Declaration of one property accessor.
///
/// The logical property name is the accessor's method name with its
/// `get`/`set` prefix stripped, unless overridden with
/// [`rename`](Self::rename).
#[derive(Debug, Clone)]
pub struct AccessorSpec {
    method: String,
    role: AccessorRole,
    value: TypeRef,
    name_override: Option<String>,
    value_signature: Option<Signature>,
    timeout_ms: Option<u32>,
}

impl AccessorSpec {
    /// Declare a read accessor; `value` is its return type.
    pub fn get(method: impl Into<String>, value: impl Into<TypeRef>) -> Self {
        Self {
            method: method.into(),
            role: AccessorRole::Get,
            value: value.into(),
            name_override: None,
            value_signature: None,
            timeout_ms: None,
        }
    }

    /// Declare a write accessor; `value` is its single parameter type.
    pub fn set(method: impl Into<String>, value: impl Into<TypeRef>) -> Self {
        Self {
            method: method.into(),
            role: AccessorRole::Set,
            value: value.into(),
            name_override: None,
            value_signature: None,
            timeout_ms: None,
        }
    }

    /// Override the logical property name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// Override the value signature verbatim.
    pub fn value_signature(mut self, sig: impl Into<Signature>) -> Self {
        self.value_signature = Some(sig.into());
        self
    }

    /// Reply-timeout hint in milliseconds.
    pub fn timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone)]
enum MemberSpec {
    Method(MethodSpec),
    Signal(SignalSpec),
    Accessor(AccessorSpec),
}

/// Builder for interface declarations.
#[derive(Debug)]
pub struct InterfaceBuilder {
    name: String,
    announced: bool,
    description: Option<String>,
    description_language: Option<String>,
    members: Vec<MemberSpec>,
}

impl InterfaceBuilder {
    /// Start declaring an interface with the given wire name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            announced: false,
            description: None,
            description_language: None,
            members: Vec::new(),
        }
    }

    /// Mark the interface as announced to peers.
    pub fn announced(mut self, announced: bool) -> Self {
        self.announced = announced;
        self
    }

    /// Attach a description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Language tag for the description.
    pub fn description_language(mut self, lang: impl Into<String>) -> Self {
        self.description_language = Some(lang.into());
        self
    }

    /// Declare a method.
    pub fn method(mut self, spec: MethodSpec) -> Self {
        self.members.push(MemberSpec::Method(spec));
        self
    }

    /// Declare a signal.
    pub fn signal(mut self, spec: SignalSpec) -> Self {
        self.members.push(MemberSpec::Signal(spec));
        self
    }

    /// Declare a property accessor.
    pub fn accessor(mut self, spec: AccessorSpec) -> Self {
        self.members.push(MemberSpec::Accessor(spec));
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> InterfaceDecl {
        InterfaceDecl {
            name: self.name,
            announced: self.announced,
            description: self.description,
            description_language: self.description_language,
            members: self.members,
        }
    }
}

/// A declared interface, ready for extraction.
#[derive(Debug)]
pub struct InterfaceDecl {
    /// Interface wire name.
    pub name: String,
    /// Whether the interface is announced to peers.
    pub announced: bool,
    /// Human-readable description.
    pub description: Option<String>,
    /// Language tag of the description.
    pub description_language: Option<String>,
    members: Vec<MemberSpec>,
}

impl InterfaceDecl {
    /// Extract this declaration's member table; see [`extract`].
    pub fn extract(&self, resolver: &TypeResolver) -> Result<InterfaceDescriptor> {
        extract(self, resolver)
    }
}

/// Working entry during extraction, before positions are assigned.
struct Entry {
    kind: MemberKind,
    name: String,
    args: Vec<Signature>,
    returns: Option<Signature>,
    access: Option<PropertyAccess>,
    timeout_ms: Option<u32>,
}

/// Produce the ordered member table of a declared interface.
///
/// Members are processed in declaration order; a property takes the
/// position of its first accessor. Fails with
/// [`BusError::PropertyAccessorMismatch`] when paired accessors disagree on
/// the derived value signature and with [`BusError::DuplicateMemberName`]
/// when two members resolve to the same wire name with different
/// signatures; an identical redeclaration collapses to a single entry.
pub fn extract(decl: &InterfaceDecl, resolver: &TypeResolver) -> Result<InterfaceDescriptor> {
    let mut entries: Vec<Entry> = Vec::new();

    for spec in &decl.members {
        match spec {
            MemberSpec::Method(m) => {
                let name = m.name_override.clone().unwrap_or_else(|| m.name.clone());
                let args = match &m.args_signature {
                    Some(sig) => split_terms(sig)?,
                    None => m
                        .args
                        .iter()
                        .map(|ty| resolver.signature_of(ty))
                        .collect::<Result<Vec<_>>>()?,
                };
                let returns = match &m.reply_signature {
                    Some(sig) => Some(sig.clone()),
                    None => m
                        .returns
                        .as_ref()
                        .map(|ty| resolver.signature_of(ty))
                        .transpose()?,
                };
                push_entry(
                    &mut entries,
                    Entry {
                        kind: MemberKind::Method,
                        name,
                        args,
                        returns,
                        access: None,
                        timeout_ms: m.timeout_ms,
                    },
                )?;
            }
            MemberSpec::Signal(s) => {
                let name = s.name_override.clone().unwrap_or_else(|| s.name.clone());
                let args = match &s.args_signature {
                    Some(sig) => split_terms(sig)?,
                    None => s
                        .args
                        .iter()
                        .map(|ty| resolver.signature_of(ty))
                        .collect::<Result<Vec<_>>>()?,
                };
                push_entry(
                    &mut entries,
                    Entry {
                        kind: MemberKind::Signal,
                        name,
                        args,
                        returns: None,
                        access: None,
                        timeout_ms: None,
                    },
                )?;
            }
            MemberSpec::Accessor(a) => {
                let property = a
                    .name_override
                    .clone()
                    .unwrap_or_else(|| property_name(&a.method).to_string());
                let sig = match &a.value_signature {
                    Some(sig) => sig.clone(),
                    None => resolver.signature_of(&a.value)?,
                };
                let access = match a.role {
                    AccessorRole::Get => PropertyAccess::Read,
                    AccessorRole::Set => PropertyAccess::Write,
                };
                if let Some(existing) = entries
                    .iter_mut()
                    .find(|e| e.kind == MemberKind::Property && e.name == property)
                {
                    if existing.returns.as_ref() != Some(&sig) {
                        return Err(BusError::PropertyAccessorMismatch {
                            property,
                            first: existing
                                .returns
                                .as_ref()
                                .map(|s| s.as_str().to_string())
                                .unwrap_or_default(),
                            second: sig.as_str().to_string(),
                        });
                    }
                    existing.access = existing.access.map(|current| {
                        if current == access {
                            current
                        } else {
                            PropertyAccess::ReadWrite
                        }
                    });
                    if existing.timeout_ms.is_none() {
                        existing.timeout_ms = a.timeout_ms;
                    }
                } else {
                    push_entry(
                        &mut entries,
                        Entry {
                            kind: MemberKind::Property,
                            name: property,
                            args: Vec::new(),
                            returns: Some(sig),
                            access: Some(access),
                            timeout_ms: a.timeout_ms,
                        },
                    )?;
                }
            }
        }
    }

    let members = entries
        .into_iter()
        .enumerate()
        .map(|(position, e)| MemberDescriptor {
            kind: e.kind,
            name: e.name,
            args: e.args,
            returns: e.returns,
            access: e.access,
            position: position as u32,
            timeout_ms: e.timeout_ms,
        })
        .collect();

    Ok(InterfaceDescriptor {
        name: decl.name.clone(),
        announced: decl.announced,
        description: decl.description.clone(),
        description_language: decl.description_language.clone(),
        members,
    })
}

fn push_entry(entries: &mut Vec<Entry>, entry: Entry) -> Result<()> {
    if let Some(existing) = entries.iter().find(|e| e.name == entry.name) {
        let identical = existing.kind == entry.kind
            && existing.args == entry.args
            && existing.returns == entry.returns;
        if identical {
            return Ok(());
        }
        return Err(BusError::DuplicateMemberName(entry.name));
    }
    entries.push(entry);
    Ok(())
}

/// Logical property name of an accessor method: the name with a recognized
/// `get`/`set` prefix stripped, or the whole name when no prefix applies.
fn property_name(method: &str) -> &str {
    for prefix in ["get", "set"] {
        if let Some(rest) = method.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    method
}

/// Split a verbatim signature override into its per-argument terms.
fn split_terms(sig: &Signature) -> Result<Vec<Signature>> {
    Ok(signature::parse(sig.as_str())?
        .iter()
        .map(signature::format)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PrimitiveKind;
    use crate::registry::{StructTypeBuilder, TypeRegistry};
    use std::sync::Arc;

    fn resolver() -> TypeResolver {
        let registry = Arc::new(TypeRegistry::new());
        registry.register_struct(
            StructTypeBuilder::new("Point")
                .field_at(0, "x", PrimitiveKind::I32)
                .field_at(1, "y", PrimitiveKind::I32)
                .build(),
        );
        TypeResolver::new(registry)
    }

    #[test]
    fn methods_resolve_in_declaration_order() {
        let decl = InterfaceBuilder::new("org.example.Calc")
            .method(
                MethodSpec::new("Add")
                    .arg(PrimitiveKind::I32)
                    .arg(PrimitiveKind::I32)
                    .returns(PrimitiveKind::I32),
            )
            .method(
                MethodSpec::new("Translate")
                    .arg(TypeRef::named("Point"))
                    .returns(TypeRef::named("Point")),
            )
            .signal(SignalSpec::new("Overflow").arg(PrimitiveKind::Str))
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        assert_eq!(iface.name, "org.example.Calc");
        assert_eq!(iface.members.len(), 3);

        let add = &iface.members[0];
        assert_eq!(add.kind, MemberKind::Method);
        assert_eq!(add.position, 0);
        assert_eq!(
            add.args.iter().map(Signature::as_str).collect::<Vec<_>>(),
            ["i", "i"]
        );
        assert_eq!(add.returns.as_ref().map(Signature::as_str), Some("i"));

        let translate = &iface.members[1];
        assert_eq!(
            translate.args.iter().map(Signature::as_str).collect::<Vec<_>>(),
            ["(ii)"]
        );
        assert_eq!(
            translate.returns.as_ref().map(Signature::as_str),
            Some("(ii)")
        );

        let overflow = &iface.members[2];
        assert_eq!(overflow.kind, MemberKind::Signal);
        assert_eq!(overflow.position, 2);
        assert!(overflow.returns.is_none());
    }

    #[test]
    fn accessor_pair_becomes_read_write_property() {
        let decl = InterfaceBuilder::new("org.example.Door")
            .accessor(AccessorSpec::get("getState", PrimitiveKind::Str))
            .accessor(AccessorSpec::set("setState", PrimitiveKind::Str))
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        assert_eq!(iface.members.len(), 1);
        let state = iface.member("State").expect("property");
        assert_eq!(state.kind, MemberKind::Property);
        assert_eq!(state.access, Some(PropertyAccess::ReadWrite));
        assert_eq!(state.returns.as_ref().map(Signature::as_str), Some("s"));
        assert_eq!(state.position, 0);
    }

    #[test]
    fn lone_accessors_are_read_or_write_only() {
        let decl = InterfaceBuilder::new("org.example.Sensor")
            .accessor(AccessorSpec::get("getValue", PrimitiveKind::F64))
            .accessor(AccessorSpec::set("setThreshold", PrimitiveKind::F64))
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        assert_eq!(
            iface.member("Value").and_then(|m| m.access),
            Some(PropertyAccess::Read)
        );
        assert_eq!(
            iface.member("Threshold").and_then(|m| m.access),
            Some(PropertyAccess::Write)
        );
    }

    #[test]
    fn accessor_signature_mismatch_fails() {
        // getX() -> int32 paired with setX(value: string) must not extract.
        let decl = InterfaceBuilder::new("org.example.Broken")
            .accessor(AccessorSpec::get("getX", PrimitiveKind::I32))
            .accessor(AccessorSpec::set("setX", PrimitiveKind::Str))
            .build();

        assert_eq!(
            decl.extract(&resolver()).unwrap_err(),
            BusError::PropertyAccessorMismatch {
                property: "X".into(),
                first: "i".into(),
                second: "s".into(),
            }
        );
    }

    #[test]
    fn duplicate_member_with_conflicting_signature_fails() {
        let decl = InterfaceBuilder::new("org.example.Dup")
            .method(MethodSpec::new("Ping").returns(PrimitiveKind::Str))
            .method(MethodSpec::new("Ping").returns(PrimitiveKind::U32))
            .build();

        assert_eq!(
            decl.extract(&resolver()).unwrap_err(),
            BusError::DuplicateMemberName("Ping".into())
        );
    }

    #[test]
    fn identical_redeclaration_collapses() {
        let decl = InterfaceBuilder::new("org.example.Dup")
            .method(MethodSpec::new("Ping").returns(PrimitiveKind::Str))
            .method(MethodSpec::new("Ping").returns(PrimitiveKind::Str))
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        assert_eq!(iface.members.len(), 1);
    }

    #[test]
    fn method_and_property_name_collision_fails() {
        let decl = InterfaceBuilder::new("org.example.Clash")
            .method(MethodSpec::new("State").returns(PrimitiveKind::Str))
            .accessor(AccessorSpec::get("getState", PrimitiveKind::Str))
            .build();

        assert_eq!(
            decl.extract(&resolver()).unwrap_err(),
            BusError::DuplicateMemberName("State".into())
        );
    }

    #[test]
    fn overrides_are_honored_verbatim() {
        let decl = InterfaceBuilder::new("org.example.Legacy")
            .method(
                MethodSpec::new("concat")
                    .rename("Concatenate")
                    .args_signature("ss")
                    .reply_signature("s")
                    .timeout_ms(5000),
            )
            .accessor(
                AccessorSpec::get("currentMode", PrimitiveKind::U32)
                    .rename("Mode")
                    .value_signature("u"),
            )
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        let concat = iface.member("Concatenate").expect("renamed method");
        assert_eq!(
            concat.args.iter().map(Signature::as_str).collect::<Vec<_>>(),
            ["s", "s"]
        );
        assert_eq!(concat.timeout_ms, Some(5000));

        let mode = iface.member("Mode").expect("renamed property");
        assert_eq!(mode.returns.as_ref().map(Signature::as_str), Some("u"));
    }

    #[test]
    fn malformed_signature_override_fails() {
        let decl = InterfaceBuilder::new("org.example.Bad")
            .method(MethodSpec::new("Oops").args_signature("(i"))
            .build();

        assert!(matches!(
            decl.extract(&resolver()),
            Err(BusError::MalformedSignature(_))
        ));
    }

    #[test]
    fn interface_metadata_is_captured_once() {
        let decl = InterfaceBuilder::new("org.example.About")
            .announced(true)
            .description("Device information")
            .description_language("en")
            .method(MethodSpec::new("Version").returns(PrimitiveKind::U16))
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        assert!(iface.announced);
        assert_eq!(iface.description.as_deref(), Some("Device information"));
        assert_eq!(iface.description_language.as_deref(), Some("en"));
    }

    #[test]
    fn zero_argument_method_has_empty_args() {
        let decl = InterfaceBuilder::new("org.example.Ping")
            .method(MethodSpec::new("Ping"))
            .build();

        let iface = decl.extract(&resolver()).expect("extract");
        let ping = iface.member("Ping").expect("method");
        assert!(ping.args.is_empty());
        assert!(ping.returns.is_none());
    }

    #[test]
    fn property_name_stripping() {
        assert_eq!(property_name("getState"), "State");
        assert_eq!(property_name("setState"), "State");
        assert_eq!(property_name("Volume"), "Volume");
        assert_eq!(property_name("get"), "get");
    }
}
