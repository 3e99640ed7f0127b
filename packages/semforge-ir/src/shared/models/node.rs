//! Structural IR nodes.
//!
//! Node kinds are a closed set; per-kind attributes live in typed records
//! behind the `NodeAttrs` tag. The `Other` map exists for forward
//! compatibility only and must not be used for kinds listed here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::hints::Stmt;
use super::span::Span;

/// Node identifier, unique within a file.
pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Module,
    Class,
    Interface,
    Enum,
    Function,
    Method,
    Lambda,
    Variable,
    Parameter,
    Field,
    Constant,
    Property,
    TypeAlias,
    Import,
    Decorator,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Interface => "interface",
            NodeKind::Enum => "enum",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::Lambda => "lambda",
            NodeKind::Variable => "variable",
            NodeKind::Parameter => "parameter",
            NodeKind::Field => "field",
            NodeKind::Constant => "constant",
            NodeKind::Property => "property",
            NodeKind::TypeAlias => "type_alias",
            NodeKind::Import => "import",
            NodeKind::Decorator => "decorator",
        }
    }

    /// Kinds that carry a function body (and therefore flow graphs).
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method | NodeKind::Lambda)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural IR node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub fqn: String,
    pub span: Span,
    pub attrs: NodeAttrs,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, name: impl Into<String>, span: Span) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            kind,
            fqn: name.clone(),
            name,
            span,
            attrs: NodeAttrs::None,
        }
    }

    pub fn with_fqn(mut self, fqn: impl Into<String>) -> Self {
        self.fqn = fqn.into();
        self
    }

    pub fn with_attrs(mut self, attrs: NodeAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Lines of code covered by this node's span.
    pub fn loc(&self) -> u32 {
        self.span.line_count()
    }

    pub fn function_attrs(&self) -> Option<&FunctionAttrs> {
        match &self.attrs {
            NodeAttrs::Function(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn import_attrs(&self) -> Option<&ImportAttrs> {
        match &self.attrs {
            NodeAttrs::Import(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn class_attrs(&self) -> Option<&ClassAttrs> {
        match &self.attrs {
            NodeAttrs::Class(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// Per-kind typed attribute records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum NodeAttrs {
    #[default]
    None,
    Function(FunctionAttrs),
    Class(ClassAttrs),
    Import(ImportAttrs),
    Variable(VariableAttrs),
    /// Forward-compatibility escape hatch; keys sorted for determinism.
    Other(BTreeMap<String, Value>),
}

/// Attributes of Function / Method / Lambda nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FunctionAttrs {
    pub params: Vec<ParamHint>,
    pub return_annotation: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
    pub decorators: Vec<String>,
    pub throws: Vec<String>,
    /// Lowered statement outline of the body (AST hints)
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamHint {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
}

impl ParamHint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassAttrs {
    pub bases: Vec<String>,
    pub metaclass: Option<String>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImportAttrs {
    /// Imported module or symbol path as written
    pub module: String,
    pub alias: Option<String>,
    /// Target is outside the repository (third-party / stdlib)
    pub is_external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VariableAttrs {
    pub annotation: Option<String>,
    pub is_const: bool,
}
