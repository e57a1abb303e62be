//! sable-toolchain: the internal, version-bound Sable compiler frontend.
//!
//! This crate is the native frontend an embedding pipeline drives through
//! three dependent phases sharing one mutable [`Context`]:
//!
//! 1. parsing ([`parse`]) -- tolerant, never fails, buffers diagnostics
//! 2. symbol entry ([`enter_all`]) -- one batch call into the shared scope
//! 3. type attribution ([`attribute`]) -- best-effort, results land in the
//!    context's type table keyed by node id
//!
//! The crate is deliberately resolution-agnostic outside the classpath: the
//! restricted core library is reached through the [`SymbolSource`] trait so
//! the embedder controls the isolation boundary.

/// Language/frontend version this toolchain build is bound to. A new
/// pipeline (and toolchain build) is required per language version.
pub const TOOLCHAIN_VERSION: &str = "1.0";

pub mod attr;
pub mod context;
pub mod diag;
pub mod enter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod signature;
pub mod tree;

// ── Convenience re-exports: key types ────────────────────────────────

pub use attr::{attribute, AttrError, SymbolSource, WorkQueue};
pub use context::{ClassSymbol, Context, ResolvedType, Scope, TypeOrigin, TypeTable};
pub use diag::{Diagnostic, DiagnosticLog, Severity};
pub use enter::{enter_all, qualify, EnterError};
pub use parser::parse;
pub use resolver::Resolver;
pub use signature::{read_sig_file, ClassSig, FieldSig, MethodSig, SigError, SymbolIndex};
pub use tree::{CompilationUnit, NodeId, Span};
