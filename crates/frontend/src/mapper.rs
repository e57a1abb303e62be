//! Mapping attributed parse trees into the public source model.
//!
//! The mapper is the last pipeline phase and the only one allowed to fail a
//! unit outright. It is a trait so embedders can substitute their own model;
//! [`TreeMapper`] is the standard implementation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sable_toolchain::tree::{ClassDecl, Member, TypeName};
use sable_toolchain::{qualify, CompilationUnit, ResolvedType, TypeOrigin, TypeTable};

/// A named formatting style with free-form options, applied during mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedStyle {
    pub name: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl NamedStyle {
    pub fn new(name: impl Into<String>) -> Self {
        NamedStyle {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Everything a mapper may consult for one unit.
pub struct MapRequest<'a> {
    pub tree: &'a CompilationUnit,
    pub types: &'a TypeTable,
    pub source: &'a str,
    pub path: Option<&'a str>,
    pub relaxed_type_matching: bool,
    pub styles: &'a [NamedStyle],
}

#[derive(Debug)]
pub struct MapError {
    pub detail: String,
}

impl MapError {
    pub fn new(detail: impl Into<String>) -> Self {
        MapError {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for MapError {}

pub trait AstMapper: Send + Sync {
    fn map(&self, request: MapRequest<'_>) -> Result<SourceFile, MapError>;
}

// ────────────────────────────── public model ──────────────────────────────

/// A reference to a type as it appears in the public model, carrying where
/// the resolution came from so callers can see isolation precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeRef {
    Resolved { name: String, origin: String },
    Unresolved { written: String },
}

impl TypeRef {
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Resolved { name, .. } => name,
            TypeRef::Unresolved { written } => written,
        }
    }

    fn from_table(types: &TypeTable, written: &TypeName, relaxed: bool) -> TypeRef {
        match types.get(written.id) {
            Some(ResolvedType::Class { name, origin }) => TypeRef::Resolved {
                name: name.clone(),
                origin: origin_tag(*origin).to_owned(),
            },
            Some(ResolvedType::Unknown) | None => {
                if relaxed {
                    // Trust the written name as a nominal type.
                    TypeRef::Resolved {
                        name: written.name.clone(),
                        origin: "written".to_owned(),
                    }
                } else {
                    TypeRef::Unresolved {
                        written: written.name.clone(),
                    }
                }
            }
        }
    }
}

fn origin_tag(origin: TypeOrigin) -> &'static str {
    match origin {
        TypeOrigin::Batch => "batch",
        TypeOrigin::Core => "core",
        TypeOrigin::Classpath => "classpath",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub classes: Vec<ClassModel>,
    pub comment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassModel {
    pub name: String,
    pub qualified_name: String,
    pub line: u32,
    pub superclass: TypeRef,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    /// Verbatim source text of the declaration.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodModel {
    pub name: String,
    #[serde(rename = "return")]
    pub return_type: TypeRef,
    pub params: Vec<ParamModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamModel {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

// ─────────────────────────────── tree mapper ───────────────────────────────

/// Standard mapper from attributed trees to [`SourceFile`]s.
pub struct TreeMapper;

impl TreeMapper {
    fn map_class(&self, req: &MapRequest<'_>, class: &ClassDecl) -> Result<ClassModel, MapError> {
        let text = req
            .source
            .get(class.span.start..class.span.end)
            .ok_or_else(|| {
                MapError::new(format!(
                    "class '{}' spans bytes {}..{} outside its source text",
                    class.name, class.span.start, class.span.end
                ))
            })?
            .to_owned();

        let superclass = match &class.extends {
            Some(written) => TypeRef::from_table(req.types, written, req.relaxed_type_matching),
            None => TypeRef::Resolved {
                name: "lang.Object".to_owned(),
                origin: "core".to_owned(),
            },
        };

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        for member in &class.members {
            match member {
                Member::Field(field) => fields.push(FieldModel {
                    name: field.name.clone(),
                    ty: TypeRef::from_table(req.types, &field.ty, req.relaxed_type_matching),
                }),
                Member::Method(method) => methods.push(MethodModel {
                    name: method.name.clone(),
                    return_type: TypeRef::from_table(
                        req.types,
                        &method.ret,
                        req.relaxed_type_matching,
                    ),
                    params: method
                        .params
                        .iter()
                        .map(|p| ParamModel {
                            name: p.name.clone(),
                            ty: TypeRef::from_table(req.types, &p.ty, req.relaxed_type_matching),
                        })
                        .collect(),
                }),
            }
        }

        Ok(ClassModel {
            qualified_name: qualify(req.tree.package.as_deref(), &class.name),
            name: class.name.clone(),
            line: class.span.line,
            superclass,
            fields,
            methods,
            text,
        })
    }
}

impl AstMapper for TreeMapper {
    fn map(&self, req: MapRequest<'_>) -> Result<SourceFile, MapError> {
        let mut classes = Vec::with_capacity(req.tree.classes.len());
        for class in &req.tree.classes {
            classes.push(self.map_class(&req, class)?);
        }

        let mut imports: Vec<String> =
            req.tree.imports.iter().map(|i| i.name.clone()).collect();
        let sort_imports = req.styles.iter().any(|s| {
            s.name == "imports" && s.options.get("sort").map(String::as_str) == Some("true")
        });
        if sort_imports {
            imports.sort();
        }

        Ok(SourceFile {
            path: req.path.map(str::to_owned),
            package: req.tree.package.clone(),
            imports,
            classes,
            comment_count: req.tree.comments.len(),
        })
    }
}
