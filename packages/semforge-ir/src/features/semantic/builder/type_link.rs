//! Type linking: attach resolved symbol ids to expressions.
//!
//! 7-step lookup per expression type name: direct → generic base → FQN →
//! import-map → simple name → union-first → optional-unwrap. The first
//! step that lands a project symbol wins.

use super::project::ProjectContext;
use crate::features::cache::FileId;
use crate::features::semantic::domain::Expression;

pub struct TypeLinker<'a> {
    project: &'a ProjectContext,
    file_id: &'a FileId,
}

impl<'a> TypeLinker<'a> {
    pub fn new(project: &'a ProjectContext, file_id: &'a FileId) -> Self {
        Self { project, file_id }
    }

    /// Link every typed expression to its defining symbol, when one exists.
    pub fn link(&self, expressions: &mut [Expression]) {
        for expr in expressions.iter_mut() {
            if expr.symbol_id.is_some() {
                continue;
            }
            let Some(type_name) = expr.inferred_type.clone() else {
                continue;
            };
            expr.symbol_id = self.lookup(&type_name);
        }
    }

    /// The 7-step chain. Each step produces a candidate name which is
    /// checked against the project symbol table.
    pub fn lookup(&self, type_name: &str) -> Option<String> {
        // 1. Direct match
        if let Some(symbol) = self.project.symbol(type_name) {
            return Some(symbol.node_id.clone());
        }

        // 2. Generic base: `List[Widget]` → `List`, then the argument
        if let Some(base) = generic_base(type_name) {
            if let Some(symbol) = self.project.symbol(base) {
                return Some(symbol.node_id.clone());
            }
            if let Some(arg) = generic_argument(type_name) {
                if let Some(id) = self.lookup(arg) {
                    return Some(id);
                }
            }
        }

        // 3. FQN: last-segment qualification against the project table
        if !type_name.contains('.') {
            let candidates = self.project.by_simple_name(type_name);
            if let Some(fqn) = candidates.first() {
                if let Some(symbol) = self.project.symbol(fqn) {
                    return Some(symbol.node_id.clone());
                }
            }
        }

        // 4. Import map: alias head expanded through this file's imports
        if let Some(imports) = self.project.imports(self.file_id) {
            let head = type_name.split('.').next().unwrap_or(type_name);
            if let Some(target) = imports.resolve(head) {
                let expanded = if head == type_name {
                    target.to_string()
                } else {
                    format!("{target}{}", &type_name[head.len()..])
                };
                if let Some(symbol) = self.project.symbol(&expanded) {
                    return Some(symbol.node_id.clone());
                }
            }
        }

        // 5. Simple name: strip qualification and retry
        if let Some(simple) = type_name.rsplit('.').next() {
            if simple != type_name {
                let candidates = self.project.by_simple_name(simple);
                if let Some(fqn) = candidates.first() {
                    if let Some(symbol) = self.project.symbol(fqn) {
                        return Some(symbol.node_id.clone());
                    }
                }
            }
        }

        // 6. Union-first: `A | B` → try A
        if let Some(first) = type_name.split('|').next() {
            let first = first.trim();
            if first != type_name && !first.is_empty() {
                if let Some(id) = self.lookup(first) {
                    return Some(id);
                }
            }
        }

        // 7. Optional-unwrap: `Optional[X]` → X
        if let Some(inner) = type_name
            .strip_prefix("Optional[")
            .and_then(|s| s.strip_suffix(']'))
        {
            return self.lookup(inner);
        }

        None
    }
}

fn generic_base(type_name: &str) -> Option<&str> {
    type_name.split_once('[').map(|(base, _)| base)
}

fn generic_argument(type_name: &str) -> Option<&str> {
    type_name
        .split_once('[')
        .and_then(|(_, rest)| rest.strip_suffix(']'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cache::{ContentHash, Language};
    use crate::features::structural::StructuralIR;
    use crate::shared::models::{ImportAttrs, Node, NodeAttrs, NodeKind, Span};
    use std::sync::Arc;

    fn context() -> (ProjectContext, FileId) {
        let file = FileId::new("pkg/m.py");
        let ir = Arc::new(StructuralIR::new(
            file.clone(),
            ContentHash::compute(b"src"),
            Language::Python,
            vec![
                Node::new("c1", NodeKind::Class, "Widget", Span::new(1, 0, 10, 0))
                    .with_fqn("pkg.m.Widget"),
                Node::new("i1", NodeKind::Import, "gadgets", Span::new(1, 0, 1, 0)).with_attrs(
                    NodeAttrs::Import(ImportAttrs {
                        module: "pkg.gadgets".into(),
                        alias: Some("gadgets".into()),
                        is_external: false,
                    }),
                ),
            ],
            vec![],
        ));
        let other = Arc::new(StructuralIR::new(
            FileId::new("pkg/gadgets.py"),
            ContentHash::compute(b"other"),
            Language::Python,
            vec![Node::new("g1", NodeKind::Class, "Gadget", Span::new(1, 0, 5, 0))
                .with_fqn("pkg.gadgets.Gadget")],
            vec![],
        ));
        (ProjectContext::from_structural(&[ir, other]), file)
    }

    #[test]
    fn test_direct_and_simple_name() {
        let (ctx, file) = context();
        let linker = TypeLinker::new(&ctx, &file);
        assert_eq!(linker.lookup("pkg.m.Widget").as_deref(), Some("c1"));
        assert_eq!(linker.lookup("Widget").as_deref(), Some("c1"));
    }

    #[test]
    fn test_generic_base_and_argument() {
        let (ctx, file) = context();
        let linker = TypeLinker::new(&ctx, &file);
        assert_eq!(linker.lookup("List[pkg.m.Widget]").as_deref(), Some("c1"));
    }

    #[test]
    fn test_import_map_expansion() {
        let (ctx, file) = context();
        let linker = TypeLinker::new(&ctx, &file);
        assert_eq!(linker.lookup("gadgets.Gadget").as_deref(), Some("g1"));
    }

    #[test]
    fn test_union_and_optional() {
        let (ctx, file) = context();
        let linker = TypeLinker::new(&ctx, &file);
        assert_eq!(linker.lookup("pkg.m.Widget | None").as_deref(), Some("c1"));
        assert_eq!(linker.lookup("Optional[pkg.m.Widget]").as_deref(), Some("c1"));
    }

    #[test]
    fn test_unknown_stays_unlinked() {
        let (ctx, file) = context();
        let linker = TypeLinker::new(&ctx, &file);
        assert!(linker.lookup("totally.Unknown").is_none());
    }
}
