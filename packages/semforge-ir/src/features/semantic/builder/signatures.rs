//! Signature extraction and 7-level type resolution.
//!
//! Resolution order: alias → builtin → local → module → project → stdlib →
//! raw. The first level that answers wins; raw keeps the annotation text
//! verbatim so nothing is ever lost.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::project::ProjectContext;
use crate::features::semantic::domain::{
    ResolutionLevel, Signature, SignatureParam, TypeRef,
};
use crate::features::structural::StructuralIR;
use crate::shared::models::NodeKind;

static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "int", "float", "str", "bytes", "bool", "None", "object", "list", "dict", "set",
        "tuple", "frozenset", "type", "complex", "bytearray",
    ]
    .into_iter()
    .collect()
});

static STDLIB_MODULES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "os", "sys", "re", "json", "math", "time", "datetime", "pathlib", "typing",
        "collections", "itertools", "functools", "asyncio", "logging", "io", "abc",
    ]
    .into_iter()
    .collect()
});

/// 7-level type resolver scoped to one file.
pub struct TypeResolver<'a> {
    ir: &'a StructuralIR,
    project: &'a ProjectContext,
}

impl<'a> TypeResolver<'a> {
    pub fn new(ir: &'a StructuralIR, project: &'a ProjectContext) -> Self {
        Self { ir, project }
    }

    /// Resolve an annotation through the level chain.
    pub fn resolve(&self, annotation: &str) -> TypeRef {
        let name = annotation.trim();

        // 1. Import alias
        if let Some(imports) = self.project.imports(&self.ir.file_id) {
            let head = name.split('.').next().unwrap_or(name);
            if let Some(target) = imports.resolve(head) {
                let expanded = if head == name {
                    target.to_string()
                } else {
                    format!("{target}{}", &name[head.len()..])
                };
                return self
                    .lookup_project(&expanded)
                    .map(|mut t| {
                        t.resolved = ResolutionLevel::Alias;
                        t
                    })
                    .unwrap_or(TypeRef {
                        name: expanded,
                        resolved: ResolutionLevel::Alias,
                        entity_id: None,
                    });
            }
        }

        // 2. Builtin
        if BUILTIN_TYPES.contains(name) {
            return TypeRef {
                name: name.to_string(),
                resolved: ResolutionLevel::Builtin,
                entity_id: None,
            };
        }

        // 3. Local: type-like definition in this file, by simple name
        if let Some(node) = self.ir.nodes.iter().find(|n| {
            n.name == name
                && matches!(
                    n.kind,
                    NodeKind::Class | NodeKind::Interface | NodeKind::Enum | NodeKind::TypeAlias
                )
        }) {
            return TypeRef {
                name: node.fqn.clone(),
                resolved: ResolutionLevel::Local,
                entity_id: Some(node.id.clone()),
            };
        }

        // 4. Module: FQN defined in this file
        if let Some(node) = self.ir.nodes.iter().find(|n| n.fqn == name) {
            return TypeRef {
                name: node.fqn.clone(),
                resolved: ResolutionLevel::Module,
                entity_id: Some(node.id.clone()),
            };
        }

        // 5. Project: cross-file FQN or unique simple name
        if let Some(type_ref) = self.lookup_project(name) {
            return type_ref;
        }

        // 6. Stdlib: dotted name rooted at a known stdlib module
        let head = name.split('.').next().unwrap_or(name);
        if STDLIB_MODULES.contains(head) {
            return TypeRef {
                name: name.to_string(),
                resolved: ResolutionLevel::Stdlib,
                entity_id: None,
            };
        }

        // 7. Raw
        TypeRef::raw(name)
    }

    fn lookup_project(&self, name: &str) -> Option<TypeRef> {
        if let Some(symbol) = self.project.symbol(name) {
            return Some(TypeRef {
                name: symbol.fqn.clone(),
                resolved: ResolutionLevel::Project,
                entity_id: Some(symbol.node_id.clone()),
            });
        }
        let candidates = self.project.by_simple_name(name);
        candidates.first().and_then(|fqn| {
            self.project.symbol(fqn).map(|symbol| TypeRef {
                name: symbol.fqn.clone(),
                resolved: ResolutionLevel::Project,
                entity_id: Some(symbol.node_id.clone()),
            })
        })
    }
}

/// Extract signatures for every callable node. Deep type resolution only
/// runs when `resolve_types` is set (EXTENDED+); BASE keeps annotations
/// raw.
pub fn build_signatures(
    ir: &StructuralIR,
    project: &ProjectContext,
    resolve_types: bool,
) -> Vec<Signature> {
    let resolver = TypeResolver::new(ir, project);
    let mut signatures = Vec::new();

    for node in ir.callables() {
        let Some(attrs) = node.function_attrs() else {
            continue;
        };

        let resolve = |annotation: &Option<String>| -> Option<TypeRef> {
            annotation.as_ref().map(|a| {
                if resolve_types {
                    resolver.resolve(a)
                } else {
                    TypeRef::raw(a.clone())
                }
            })
        };

        let params: Vec<SignatureParam> = attrs
            .params
            .iter()
            .map(|p| SignatureParam {
                name: p.name.clone(),
                type_ref: resolve(&p.annotation),
                default: p.default.clone(),
            })
            .collect();
        let return_type = resolve(&attrs.return_annotation);

        let hash = Signature::compute_hash(
            &node.fqn,
            &params,
            return_type.as_ref(),
            attrs.is_async,
            attrs.is_static,
            &attrs.throws,
        );

        signatures.push(Signature {
            function_id: node.id.clone(),
            fqn: node.fqn.clone(),
            params,
            return_type,
            is_async: attrs.is_async,
            is_static: attrs.is_static,
            throws: attrs.throws.clone(),
            hash,
        });
    }

    signatures
}
