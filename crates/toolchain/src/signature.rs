//! Class signatures: the serialized type surface of already-compiled classes.
//!
//! Signature files (`*.sig.json`, a JSON array of [`ClassSig`]) are how the
//! frontend sees types it is not compiling in the current batch -- both
//! classpath entries and the toolchain's own restricted core library.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSig {
    /// Fully qualified class name, e.g. `lang.String`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSig {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    #[serde(rename = "return")]
    pub ret: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

#[derive(Debug)]
pub enum SigError {
    /// The signature file could not be read.
    Io { path: String, source: std::io::Error },
    /// The signature file is not a valid JSON array of class signatures.
    Malformed { path: String, detail: String },
}

impl fmt::Display for SigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigError::Io { path, source } => {
                write!(f, "cannot read signature file {}: {}", path, source)
            }
            SigError::Malformed { path, detail } => {
                write!(f, "malformed signature file {}: {}", path, detail)
            }
        }
    }
}

impl std::error::Error for SigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SigError::Io { source, .. } => Some(source),
            SigError::Malformed { .. } => None,
        }
    }
}

/// Read one signature file (a JSON array of class signatures).
pub fn read_sig_file(path: &Path) -> Result<Vec<ClassSig>, SigError> {
    let text = std::fs::read_to_string(path).map_err(|e| SigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| SigError::Malformed {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

/// Immutable lookup index from fully qualified name to signature.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    by_name: HashMap<String, ClassSig>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        SymbolIndex::default()
    }

    pub fn from_sigs(sigs: Vec<ClassSig>) -> Self {
        let mut idx = SymbolIndex::new();
        for sig in sigs {
            idx.insert(sig);
        }
        idx
    }

    /// First entry for a name wins, matching classpath-order precedence.
    pub fn insert(&mut self, sig: ClassSig) {
        self.by_name.entry(sig.name.clone()).or_insert(sig);
    }

    pub fn get(&self, name: &str) -> Option<&ClassSig> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
