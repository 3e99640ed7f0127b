//! Function signatures with resolved types.

use serde::{Deserialize, Serialize};

use crate::features::cache::Hash128;

/// Where in the 7-level chain a type name was resolved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResolutionLevel {
    Alias,
    Builtin,
    Local,
    Module,
    Project,
    Stdlib,
    Raw,
}

impl ResolutionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionLevel::Alias => "alias",
            ResolutionLevel::Builtin => "builtin",
            ResolutionLevel::Local => "local",
            ResolutionLevel::Module => "module",
            ResolutionLevel::Project => "project",
            ResolutionLevel::Stdlib => "stdlib",
            ResolutionLevel::Raw => "raw",
        }
    }
}

/// A resolved (or raw) type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Resolved type name (FQN when resolution found a definition)
    pub name: String,
    pub resolved: ResolutionLevel,
    /// Node id of the defining entity, when in-project
    pub entity_id: Option<String>,
}

impl TypeRef {
    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: ResolutionLevel::Raw,
            entity_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParam {
    pub name: String,
    pub type_ref: Option<TypeRef>,
    pub default: Option<String>,
}

/// Function signature. The hash covers names and resolved types, so a
/// signature-preserving body edit keeps it stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub function_id: String,
    pub fqn: String,
    pub params: Vec<SignatureParam>,
    pub return_type: Option<TypeRef>,
    pub is_async: bool,
    pub is_static: bool,
    pub throws: Vec<String>,
    pub hash: Hash128,
}

impl Signature {
    /// Compute the signature hash from its visible surface.
    pub fn compute_hash(
        fqn: &str,
        params: &[SignatureParam],
        return_type: Option<&TypeRef>,
        is_async: bool,
        is_static: bool,
        throws: &[String],
    ) -> Hash128 {
        let mut parts: Vec<u8> = Vec::new();
        parts.extend_from_slice(fqn.as_bytes());
        parts.push(0);
        for p in params {
            parts.extend_from_slice(p.name.as_bytes());
            parts.push(b':');
            if let Some(t) = &p.type_ref {
                parts.extend_from_slice(t.name.as_bytes());
            }
            parts.push(b',');
        }
        parts.push(b'>');
        if let Some(t) = return_type {
            parts.extend_from_slice(t.name.as_bytes());
        }
        parts.push(if is_async { 1 } else { 0 });
        parts.push(if is_static { 1 } else { 0 });
        for t in throws {
            parts.extend_from_slice(t.as_bytes());
            parts.push(b';');
        }
        Hash128::compute(&parts)
    }
}
