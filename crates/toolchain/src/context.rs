//! The shared mutable compiler context.
//!
//! One [`Context`] is exclusively owned by one frontend pipeline and carries
//! everything the parse, entry, and attribution phases share: the diagnostic
//! log buffer, the classpath resolver, the batch entry scope, the set of
//! already-compiled unit identities, the attribution work queue, and the
//! attribution type table. `reset()` reclaims all of it for a new batch.

use crate::diag::DiagnosticLog;
use crate::resolver::Resolver;
use crate::signature::ClassSig;
use crate::tree::NodeId;
use std::collections::{HashMap, HashSet, VecDeque};

/// A top-level class entered into the shared scope.
#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub fqn: String,
    pub simple_name: String,
    pub package: Option<String>,
    /// Display path of the unit that declared this class.
    pub unit: String,
    pub decl: NodeId,
}

/// The shared symbol-entry scope for one batch.
#[derive(Debug, Default)]
pub struct Scope {
    classes: HashMap<String, ClassSymbol>,
}

impl Scope {
    pub fn get(&self, fqn: &str) -> Option<&ClassSymbol> {
        self.classes.get(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.classes.contains_key(fqn)
    }

    pub fn enter(&mut self, symbol: ClassSymbol) {
        self.classes.insert(symbol.fqn.clone(), symbol);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn clear(&mut self) {
        self.classes.clear();
    }
}

/// Where a resolved class came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Declared by a unit in the current batch.
    Batch,
    /// The toolchain's restricted core library.
    Core,
    /// A classpath signature.
    Classpath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    Class { name: String, origin: TypeOrigin },
    /// Resolution failed; attribution recorded a diagnostic and moved on.
    Unknown,
}

impl ResolvedType {
    pub fn class(name: impl Into<String>, origin: TypeOrigin) -> Self {
        ResolvedType::Class {
            name: name.into(),
            origin,
        }
    }
}

/// Attribution results, keyed by tree node id.
#[derive(Debug, Default)]
pub struct TypeTable {
    entries: HashMap<NodeId, ResolvedType>,
}

impl TypeTable {
    pub fn insert(&mut self, node: NodeId, ty: ResolvedType) {
        self.entries.insert(node, ty);
    }

    pub fn get(&self, node: NodeId) -> Option<&ResolvedType> {
        self.entries.get(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug)]
pub struct Context {
    pub log: DiagnosticLog,
    resolver: Resolver,
    compiled: HashSet<String>,
    scope: Scope,
    todo: VecDeque<String>,
    types: TypeTable,
    next_node: u32,
}

impl Context {
    pub fn new() -> Self {
        Context {
            log: DiagnosticLog::new(),
            resolver: Resolver::new(),
            compiled: HashSet::new(),
            scope: Scope::default(),
            todo: VecDeque::new(),
            types: TypeTable::default(),
            next_node: 0,
        }
    }

    pub fn alloc_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Swap in a different resolution provider.
    ///
    /// Any pipeline built against the previous resolver will detect the swap
    /// through the identity stamp and refuse to continue.
    pub fn replace_resolver(&mut self, resolver: Resolver) {
        self.resolver = resolver;
    }

    /// Classpath lookup routed through this context's resolver, with
    /// resolver warnings landing in this context's log.
    pub fn lookup_classpath(&mut self, name: &str) -> Option<ClassSig> {
        self.resolver.lookup(name, &mut self.log)
    }

    pub fn is_compiled(&self, unit: &str) -> bool {
        self.compiled.contains(unit)
    }

    pub fn mark_compiled(&mut self, unit: impl Into<String>) {
        self.compiled.insert(unit.into());
    }

    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeTable {
        &mut self.types
    }

    pub fn push_todo(&mut self, unit: String) {
        self.todo.push_back(unit);
    }

    /// Hand the pending attribution queue to the caller, leaving the
    /// context's queue empty. The pipeline wraps the returned queue to time
    /// each unit as it is pulled.
    pub fn take_todo(&mut self) -> VecDeque<String> {
        std::mem::take(&mut self.todo)
    }

    /// Reclaim this context for a new batch: clear the diagnostic buffer,
    /// drop resolver file caches, and forget all entered and compiled state.
    /// Node ids keep advancing so ids never repeat across batches.
    pub fn reset(&mut self) {
        self.log.clear();
        self.resolver.flush();
        self.compiled.clear();
        self.scope.clear();
        self.todo.clear();
        self.types.clear();
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}
