//! Internal parse trees produced by the parse phase.
//!
//! Syntax only: no symbol or type information lives here. Attribution
//! results are keyed off each node's [`NodeId`] in the owning context's
//! type table, so trees stay immutable once parsed. Every node carries a
//! full [`Span`] with an end position so the mapper can reproduce source
//! layout.

/// Identity of one tree node, unique within a compiler context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Byte range in the originating source text plus the starting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32) -> Self {
        Span { start, end, line }
    }
}

/// A source comment retained by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub line: u32,
}

/// One parsed source unit. May be partial: the parser recovers from
/// malformed members and classes, recording diagnostics instead of failing.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub classes: Vec<ClassDecl>,
    pub comments: Vec<Comment>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: NodeId,
    pub name: String,
    pub extends: Option<TypeName>,
    pub members: Vec<Member>,
    pub span: Span,
}

/// A written type name, possibly qualified. Resolution happens during
/// attribution; the resolved type is recorded under this node's id.
#[derive(Debug, Clone)]
pub struct TypeName {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub id: NodeId,
    pub ty: TypeName,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub id: NodeId,
    pub ret: TypeName,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub ty: TypeName,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Local(LocalDecl),
    Return { value: Option<Expr>, span: Span },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub id: NodeId,
    pub ty: TypeName,
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident { id: NodeId, name: String, span: Span },
    Int { id: NodeId, value: i64, span: Span },
    Str { id: NodeId, value: String, span: Span },
    Bool { id: NodeId, value: bool, span: Span },
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Ident { id, .. }
            | Expr::Int { id, .. }
            | Expr::Str { id, .. }
            | Expr::Bool { id, .. } => *id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { span, .. }
            | Expr::Int { span, .. }
            | Expr::Str { span, .. }
            | Expr::Bool { span, .. } => *span,
        }
    }
}
