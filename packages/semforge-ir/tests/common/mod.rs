//! Shared test fixtures: a deterministic line-based parser standing in
//! for the external language front end.
//!
//! Fixture syntax (one construct per line, whitespace-insensitive):
//!
//! ```text
//! module pkg.name
//! import pkg.other as alias
//! class Widget extends Base
//! fn main calls helper uses x y
//! !!            <- forces a syntax error
//! ```
//!
//! Output is fully content-determined: renaming the file does not change
//! the parsed structure, which is what the rename-tolerance scenarios
//! rely on.

use std::path::Path;
use std::sync::Arc;

use semforge_ir::config::BuildConfig;
use semforge_ir::features::cache::{ContentHash, FileId, Language};
use semforge_ir::features::incremental::SourceFile;
use semforge_ir::features::structural::StructuralIR;
use semforge_ir::shared::models::{
    ClassAttrs, Edge, EdgeKind, FunctionAttrs, ImportAttrs, Node, NodeAttrs, NodeKind, Span,
    Stmt, StmtHint,
};
use semforge_ir::shared::ports::{ParserError, StructuralParser};

pub struct FixtureParser;

impl StructuralParser for FixtureParser {
    fn parse(&self, file: &FileId, source: &[u8]) -> Result<StructuralIR, ParserError> {
        let text = std::str::from_utf8(source).map_err(|_| ParserError::Syntax {
            file: file.to_string(),
            reason: "not utf-8".into(),
        })?;

        let mut module = "main".to_string();
        struct FnDecl {
            name: String,
            callee: Option<String>,
            uses: Vec<String>,
            line: u32,
        }
        struct ClassDecl {
            name: String,
            base: Option<String>,
            line: u32,
        }
        let mut imports: Vec<(String, Option<String>, u32)> = Vec::new();
        let mut classes: Vec<ClassDecl> = Vec::new();
        let mut functions: Vec<FnDecl> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let lineno = index as u32 + 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "!!" {
                return Err(ParserError::Syntax {
                    file: file.to_string(),
                    reason: format!("unexpected token at line {lineno}"),
                });
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens[0] {
                "module" if tokens.len() >= 2 => module = tokens[1].to_string(),
                "import" if tokens.len() >= 2 => {
                    let alias = tokens
                        .iter()
                        .position(|t| *t == "as")
                        .and_then(|i| tokens.get(i + 1))
                        .map(|s| s.to_string());
                    imports.push((tokens[1].to_string(), alias, lineno));
                }
                "class" if tokens.len() >= 2 => {
                    let base = tokens
                        .iter()
                        .position(|t| *t == "extends")
                        .and_then(|i| tokens.get(i + 1))
                        .map(|s| s.to_string());
                    classes.push(ClassDecl {
                        name: tokens[1].to_string(),
                        base,
                        line: lineno,
                    });
                }
                "fn" if tokens.len() >= 2 => {
                    let callee = tokens
                        .iter()
                        .position(|t| *t == "calls")
                        .and_then(|i| tokens.get(i + 1))
                        .map(|s| s.to_string());
                    let uses = tokens
                        .iter()
                        .position(|t| *t == "uses")
                        .map(|i| tokens[i + 1..].iter().map(|s| s.to_string()).collect())
                        .unwrap_or_default();
                    functions.push(FnDecl {
                        name: tokens[1].to_string(),
                        callee,
                        uses,
                        line: lineno,
                    });
                }
                _ => {
                    return Err(ParserError::Syntax {
                        file: file.to_string(),
                        reason: format!("unknown construct at line {lineno}: {line}"),
                    })
                }
            }
        }

        let line_count = text.lines().count().max(1) as u32;
        let mut nodes = vec![Node::new(
            "file",
            NodeKind::File,
            module.clone(),
            Span::new(1, 0, line_count, 0),
        )
        .with_fqn(module.clone())];
        let mut edges = Vec::new();

        for (i, (target, alias, line)) in imports.iter().enumerate() {
            let id = format!("imp:{i}");
            nodes.push(
                Node::new(&id, NodeKind::Import, target.clone(), Span::new(*line, 0, *line, 80))
                    .with_fqn(target.clone())
                    .with_attrs(NodeAttrs::Import(ImportAttrs {
                        module: target.clone(),
                        alias: alias.clone(),
                        is_external: false,
                    })),
            );
            edges.push(Edge::new("file", id, EdgeKind::Contains));
        }

        for class in &classes {
            let id = format!("class:{}", class.name);
            nodes.push(
                Node::new(&id, NodeKind::Class, class.name.clone(), Span::new(class.line, 0, class.line, 80))
                    .with_fqn(format!("{module}.{}", class.name))
                    .with_attrs(NodeAttrs::Class(ClassAttrs {
                        bases: class.base.iter().cloned().collect(),
                        metaclass: None,
                        is_abstract: false,
                    })),
            );
            edges.push(Edge::new("file", id.clone(), EdgeKind::Contains));
            if let Some(base) = &class.base {
                match classes.iter().find(|c| &c.name == base) {
                    Some(_) => edges.push(Edge::new(id, format!("class:{base}"), EdgeKind::Inherits)),
                    None => edges.push(Edge::external(id, base.clone(), EdgeKind::Inherits)),
                }
            }
        }

        for function in &functions {
            let id = format!("fn:{}", function.name);
            let body = vec![
                Stmt::new(
                    Span::new(function.line, 4, function.line, 40),
                    StmtHint::Assign {
                        target: "result".into(),
                        reads: function.uses.clone(),
                        call: function.callee.clone(),
                    },
                ),
                Stmt::new(
                    Span::new(function.line, 41, function.line, 60),
                    StmtHint::Return {
                        reads: vec!["result".into()],
                    },
                ),
            ];
            nodes.push(
                Node::new(&id, NodeKind::Function, function.name.clone(), Span::new(function.line, 0, function.line, 80))
                    .with_fqn(format!("{module}.{}", function.name))
                    .with_attrs(NodeAttrs::Function(FunctionAttrs {
                        body,
                        ..Default::default()
                    })),
            );
            edges.push(Edge::new("file", id.clone(), EdgeKind::Contains));
            if let Some(callee) = &function.callee {
                match functions.iter().find(|f| &f.name == callee) {
                    Some(_) => edges.push(Edge::new(id, format!("fn:{callee}"), EdgeKind::Calls)),
                    None => edges.push(Edge::external(id, callee.clone(), EdgeKind::Calls)),
                }
            }
        }

        Ok(StructuralIR::new(
            file.clone(),
            ContentHash::compute(source),
            Language::Python,
            nodes,
            edges,
        )
        .seal())
    }

    fn version(&self) -> &str {
        "fixture-1"
    }
}

pub fn parser() -> Arc<dyn StructuralParser> {
    Arc::new(FixtureParser)
}

pub fn src(path: &str, content: &str, mtime: u64) -> SourceFile {
    SourceFile::new(FileId::new(path), content.as_bytes().to_vec(), mtime)
}

pub fn config_at(root: &Path) -> BuildConfig {
    BuildConfig {
        cache_root: root.to_path_buf(),
        parallel_workers: 2,
        ..BuildConfig::default()
    }
}
