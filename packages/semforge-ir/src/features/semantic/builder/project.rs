//! Project-wide symbol context assembled from structural IR.
//!
//! Built once per request by the coordinator, shared read-only by the
//! per-file workers. Collects definitions, simple-name indices and
//! per-file import maps for type resolution and call linking.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::features::cache::FileId;
use crate::features::structural::StructuralIR;
use crate::shared::models::{NodeKind, ParamHint};

#[derive(Debug, Clone)]
pub struct ProjectSymbol {
    pub fqn: String,
    pub node_id: String,
    pub file_id: FileId,
    pub kind: NodeKind,
}

/// Per-file import view: alias → imported path.
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    aliases: FxHashMap<String, String>,
}

impl ImportMap {
    pub fn insert(&mut self, alias: String, path: String) {
        self.aliases.insert(alias, path);
    }

    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Read-only cross-file context for the semantic layers.
#[derive(Debug, Default)]
pub struct ProjectContext {
    symbols_by_fqn: FxHashMap<String, ProjectSymbol>,
    /// simple name → FQNs carrying it, sorted for deterministic lookup
    by_simple_name: FxHashMap<String, Vec<String>>,
    /// callable FQN → parameter hints (for arg-to-param linking)
    params_by_fqn: FxHashMap<String, Vec<ParamHint>>,
    imports_by_file: FxHashMap<FileId, ImportMap>,
}

impl ProjectContext {
    pub fn from_structural(irs: &[Arc<StructuralIR>]) -> Self {
        let mut ctx = Self::default();

        for ir in irs {
            let mut imports = ImportMap::default();
            for node in &ir.nodes {
                match node.kind {
                    NodeKind::Import => {
                        if let Some(attrs) = node.import_attrs() {
                            let alias = attrs
                                .alias
                                .clone()
                                .unwrap_or_else(|| last_segment(&attrs.module).to_string());
                            imports.insert(alias, attrs.module.clone());
                        }
                    }
                    NodeKind::Class
                    | NodeKind::Interface
                    | NodeKind::Enum
                    | NodeKind::TypeAlias
                    | NodeKind::Function
                    | NodeKind::Method => {
                        ctx.symbols_by_fqn.insert(
                            node.fqn.clone(),
                            ProjectSymbol {
                                fqn: node.fqn.clone(),
                                node_id: node.id.clone(),
                                file_id: ir.file_id.clone(),
                                kind: node.kind,
                            },
                        );
                        ctx.by_simple_name
                            .entry(node.name.clone())
                            .or_default()
                            .push(node.fqn.clone());
                        if let Some(attrs) = node.function_attrs() {
                            ctx.params_by_fqn
                                .insert(node.fqn.clone(), attrs.params.clone());
                        }
                    }
                    _ => {}
                }
            }
            ctx.imports_by_file.insert(ir.file_id.clone(), imports);
        }

        for fqns in ctx.by_simple_name.values_mut() {
            fqns.sort();
            fqns.dedup();
        }
        ctx
    }

    pub fn symbol(&self, fqn: &str) -> Option<&ProjectSymbol> {
        self.symbols_by_fqn.get(fqn)
    }

    /// FQNs carrying a simple name, sorted. The first entry is the
    /// deterministic pick when several match.
    pub fn by_simple_name(&self, name: &str) -> &[String] {
        self.by_simple_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn params_of(&self, fqn: &str) -> Option<&[ParamHint]> {
        self.params_by_fqn.get(fqn).map(Vec::as_slice)
    }

    pub fn imports(&self, file_id: &FileId) -> Option<&ImportMap> {
        self.imports_by_file.get(file_id)
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols_by_fqn.len()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
