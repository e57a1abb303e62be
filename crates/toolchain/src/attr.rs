//! Best-effort type attribution over the entered scope.
//!
//! Attribution pulls units from a caller-supplied [`WorkQueue`] (the
//! pipeline wraps the context's pending queue to time each pull), resolves
//! every written type name, and records the result in the context's type
//! table keyed by node id. Unresolvable names become `ResolvedType::Unknown`
//! plus a warning diagnostic; attribution itself only fails on batch-level
//! inconsistencies, and even that failure is caught and logged by the
//! pipeline rather than propagated.

use crate::context::{Context, ResolvedType, TypeOrigin};
use crate::enter::qualify;
use crate::signature::ClassSig;
use crate::tree::{CompilationUnit, Expr, Import, Member, NodeId, Stmt, TypeName};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Queue of units pending attribution. Implemented directly by
/// `VecDeque<String>`; the pipeline substitutes a timing wrapper.
pub trait WorkQueue {
    fn pull(&mut self) -> Option<String>;
}

impl WorkQueue for VecDeque<String> {
    fn pull(&mut self) -> Option<String> {
        self.pop_front()
    }
}

/// Symbol lookup outside the batch scope and classpath: the isolation
/// boundary around the toolchain's restricted library.
pub trait SymbolSource {
    /// True when `name` belongs to the toolchain's reserved namespace.
    fn restricted(&self, name: &str) -> bool;
    /// Restricted-library lookup. Only meaningful for restricted names.
    fn lookup(&self, name: &str) -> Option<ClassSig>;
}

#[derive(Debug)]
pub struct AttrError {
    pub unit: String,
}

impl fmt::Display for AttrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attribution queue produced unit '{}' which is not part of this batch",
            self.unit
        )
    }
}

impl std::error::Error for AttrError {}

/// Attribute every unit the queue yields. `units` maps display path to the
/// unit's parse tree.
pub fn attribute(
    ctx: &mut Context,
    queue: &mut dyn WorkQueue,
    units: &HashMap<String, &CompilationUnit>,
    env: &dyn SymbolSource,
) -> Result<(), AttrError> {
    while let Some(name) = queue.pull() {
        let unit = *units.get(&name).ok_or(AttrError { unit: name.clone() })?;
        attribute_unit(ctx, &name, unit, env);
    }
    Ok(())
}

fn attribute_unit(ctx: &mut Context, display: &str, unit: &CompilationUnit, env: &dyn SymbolSource) {
    for class in &unit.classes {
        let own = qualify(unit.package.as_deref(), &class.name);
        ctx.types_mut()
            .insert(class.id, ResolvedType::class(own, TypeOrigin::Batch));

        if let Some(extends) = &class.extends {
            attribute_type_name(ctx, display, unit, extends, env);
        }

        // field types first: fields are visible from every method body
        let mut fields: HashMap<&str, NodeId> = HashMap::new();
        for member in &class.members {
            if let Member::Field(field) = member {
                attribute_type_name(ctx, display, unit, &field.ty, env);
                fields.insert(field.name.as_str(), field.ty.id);
            }
        }

        for member in &class.members {
            if let Member::Method(method) = member {
                attribute_type_name(ctx, display, unit, &method.ret, env);

                let mut vars: HashMap<&str, NodeId> = fields.clone();
                for param in &method.params {
                    attribute_type_name(ctx, display, unit, &param.ty, env);
                    vars.insert(param.name.as_str(), param.ty.id);
                }

                for stmt in &method.body {
                    match stmt {
                        Stmt::Local(local) => {
                            attribute_type_name(ctx, display, unit, &local.ty, env);
                            if let Some(init) = &local.init {
                                attribute_expr(ctx, display, &vars, init);
                            }
                            vars.insert(local.name.as_str(), local.ty.id);
                        }
                        Stmt::Return { value, .. } => {
                            if let Some(value) = value {
                                attribute_expr(ctx, display, &vars, value);
                            }
                        }
                        Stmt::Expr(expr) => attribute_expr(ctx, display, &vars, expr),
                    }
                }
            }
        }
    }
}

fn attribute_type_name(
    ctx: &mut Context,
    display: &str,
    unit: &CompilationUnit,
    ty: &TypeName,
    env: &dyn SymbolSource,
) {
    match resolve_type_name(ctx, unit.package.as_deref(), &unit.imports, &ty.name, env) {
        Some(resolved) => ctx.types_mut().insert(ty.id, resolved),
        None => {
            ctx.log
                .warning(display, ty.span.line, format!("cannot resolve type '{}'", ty.name));
            ctx.types_mut().insert(ty.id, ResolvedType::Unknown);
        }
    }
}

fn attribute_expr(ctx: &mut Context, display: &str, vars: &HashMap<&str, NodeId>, expr: &Expr) {
    let resolved = match expr {
        Expr::Int { .. } => ResolvedType::class("lang.Int", TypeOrigin::Core),
        Expr::Str { .. } => ResolvedType::class("lang.String", TypeOrigin::Core),
        Expr::Bool { .. } => ResolvedType::class("lang.Bool", TypeOrigin::Core),
        Expr::Ident { name, span, .. } => match vars.get(name.as_str()) {
            Some(decl) => ctx
                .types()
                .get(*decl)
                .cloned()
                .unwrap_or(ResolvedType::Unknown),
            None => {
                ctx.log.warning(
                    display,
                    span.line,
                    format!("unresolved identifier '{}'", name),
                );
                ResolvedType::Unknown
            }
        },
    };
    ctx.types_mut().insert(expr.id(), resolved);
}

/// Resolve a written type name in the context of a unit's package and
/// imports: batch scope (same package, then default package) -> explicit
/// imports -> implicit `lang.*` -> classpath.
pub fn resolve_type_name(
    ctx: &mut Context,
    package: Option<&str>,
    imports: &[Import],
    name: &str,
    env: &dyn SymbolSource,
) -> Option<ResolvedType> {
    if name.contains('.') {
        return resolve_fqn(ctx, name, env);
    }

    if let Some(p) = package {
        let fqn = format!("{}.{}", p, name);
        if ctx.scope().contains(&fqn) {
            return Some(ResolvedType::class(fqn, TypeOrigin::Batch));
        }
    }
    if ctx.scope().contains(name) {
        return Some(ResolvedType::class(name, TypeOrigin::Batch));
    }

    for import in imports {
        if import.name.rsplit('.').next() == Some(name) {
            if let Some(resolved) = resolve_fqn(ctx, &import.name, env) {
                return Some(resolved);
            }
        }
    }

    let in_lang = format!("lang.{}", name);
    if let Some(resolved) = resolve_fqn(ctx, &in_lang, env) {
        return Some(resolved);
    }

    resolve_fqn(ctx, name, env)
}

/// Resolve a fully qualified name. Restricted-namespace names answer from
/// the internal library first, falling back to the classpath only when the
/// library lacks the name; everything else resolves through the classpath
/// alone.
pub fn resolve_fqn(ctx: &mut Context, fqn: &str, env: &dyn SymbolSource) -> Option<ResolvedType> {
    if ctx.scope().contains(fqn) {
        return Some(ResolvedType::class(fqn, TypeOrigin::Batch));
    }
    if env.restricted(fqn) && env.lookup(fqn).is_some() {
        return Some(ResolvedType::class(fqn, TypeOrigin::Core));
    }
    if ctx.lookup_classpath(fqn).is_some() {
        return Some(ResolvedType::class(fqn, TypeOrigin::Classpath));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::signature::SymbolIndex;
    use crate::{enter_all, ClassSig};

    /// Stub restricted library: `lang.*` names backed by a fixed index.
    struct StubEnv {
        core: SymbolIndex,
    }

    impl StubEnv {
        fn with_core(names: &[&str]) -> Self {
            let mut core = SymbolIndex::new();
            for name in names {
                core.insert(ClassSig {
                    name: (*name).to_owned(),
                    superclass: None,
                    fields: vec![],
                    methods: vec![],
                });
            }
            StubEnv { core }
        }
    }

    impl SymbolSource for StubEnv {
        fn restricted(&self, name: &str) -> bool {
            name.starts_with("lang.")
        }

        fn lookup(&self, name: &str) -> Option<ClassSig> {
            self.core.get(name).cloned()
        }
    }

    fn attribute_batch(
        ctx: &mut Context,
        units: Vec<(&str, &CompilationUnit)>,
        env: &dyn SymbolSource,
    ) {
        enter_all(ctx, units.iter().map(|(d, u)| (*d, *u))).unwrap();
        let mut todo = ctx.take_todo();
        let by_name: HashMap<String, &CompilationUnit> = units
            .iter()
            .map(|(d, u)| ((*d).to_owned(), *u))
            .collect();
        attribute(ctx, &mut todo, &by_name, env).unwrap();
    }

    #[test]
    fn resolves_cross_unit_reference_within_batch() {
        let env = StubEnv::with_core(&["lang.Object"]);
        let mut ctx = Context::new();
        let a = parse(&mut ctx, "A.sab", "package app; class Alpha {}");
        let b = parse(&mut ctx, "B.sab", "package app; class Beta { Alpha peer; }");

        attribute_batch(&mut ctx, vec![("A.sab", &a), ("B.sab", &b)], &env);

        let field_ty = match &b.classes[0].members[0] {
            Member::Field(f) => f.ty.id,
            other => panic!("expected field, got {:?}", other),
        };
        assert_eq!(
            ctx.types().get(field_ty),
            Some(&ResolvedType::class("app.Alpha", TypeOrigin::Batch))
        );
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn implicit_lang_resolution_comes_from_the_restricted_library() {
        let env = StubEnv::with_core(&["lang.String"]);
        let mut ctx = Context::new();
        let a = parse(&mut ctx, "A.sab", "class A { String s; }");

        attribute_batch(&mut ctx, vec![("A.sab", &a)], &env);

        let field_ty = match &a.classes[0].members[0] {
            Member::Field(f) => f.ty.id,
            other => panic!("expected field, got {:?}", other),
        };
        assert_eq!(
            ctx.types().get(field_ty),
            Some(&ResolvedType::class("lang.String", TypeOrigin::Core))
        );
    }

    #[test]
    fn restricted_names_shadow_same_named_classpath_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fake-core.sig.json"),
            r#"[{"name": "lang.String", "superclass": "fake.Root"}]"#,
        )
        .unwrap();

        let env = StubEnv::with_core(&["lang.String"]);
        let mut ctx = Context::new();
        ctx.resolver_mut().set_classpath(vec![dir.path().to_owned()]);

        let resolved = resolve_fqn(&mut ctx, "lang.String", &env).unwrap();
        assert_eq!(resolved, ResolvedType::class("lang.String", TypeOrigin::Core));
    }

    #[test]
    fn restricted_prefix_falls_back_to_classpath_when_library_lacks_the_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extra.sig.json"),
            r#"[{"name": "lang.Extra"}]"#,
        )
        .unwrap();

        let env = StubEnv::with_core(&["lang.String"]);
        let mut ctx = Context::new();
        ctx.resolver_mut().set_classpath(vec![dir.path().to_owned()]);

        let resolved = resolve_fqn(&mut ctx, "lang.Extra", &env).unwrap();
        assert_eq!(
            resolved,
            ResolvedType::class("lang.Extra", TypeOrigin::Classpath)
        );
    }

    #[test]
    fn unresolved_type_becomes_unknown_with_warning() {
        let env = StubEnv::with_core(&["lang.Object"]);
        let mut ctx = Context::new();
        let a = parse(&mut ctx, "A.sab", "class A { Missing m; }");

        attribute_batch(&mut ctx, vec![("A.sab", &a)], &env);

        let field_ty = match &a.classes[0].members[0] {
            Member::Field(f) => f.ty.id,
            other => panic!("expected field, got {:?}", other),
        };
        assert_eq!(ctx.types().get(field_ty), Some(&ResolvedType::Unknown));
        assert_eq!(ctx.log.len(), 1);
    }

    #[test]
    fn locals_and_literals_are_typed_in_method_bodies() {
        let env = StubEnv::with_core(&["lang.Int", "lang.String"]);
        let mut ctx = Context::new();
        let a = parse(
            &mut ctx,
            "A.sab",
            "class A { Int run(Int seed) { var String tag = \"x\"; return seed; } }",
        );

        attribute_batch(&mut ctx, vec![("A.sab", &a)], &env);

        let method = match &a.classes[0].members[0] {
            Member::Method(m) => m,
            other => panic!("expected method, got {:?}", other),
        };
        let ret_expr = match &method.body[1] {
            Stmt::Return { value: Some(e), .. } => e,
            other => panic!("expected return, got {:?}", other),
        };
        assert_eq!(
            ctx.types().get(ret_expr.id()),
            Some(&ResolvedType::class("lang.Int", TypeOrigin::Core))
        );
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn queue_with_unknown_unit_is_a_batch_level_error() {
        let env = StubEnv::with_core(&[]);
        let mut ctx = Context::new();
        let mut queue: VecDeque<String> = VecDeque::from(["ghost.sab".to_owned()]);
        let err = attribute(&mut ctx, &mut queue, &HashMap::new(), &env).unwrap_err();
        assert_eq!(err.unit, "ghost.sab");
    }
}
