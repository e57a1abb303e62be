//! Classpath signature resolution.
//!
//! One [`Resolver`] belongs to one compiler context. Signature directories
//! are loaded lazily and cached per directory; `flush()` drops the caches so
//! a context reset releases everything held open from the filesystem. Each
//! resolver carries a process-unique identity stamp: a pipeline records the
//! stamp of the resolver its context was built with and treats any mismatch
//! as context corruption.

use crate::diag::{Diagnostic, DiagnosticLog, Severity};
use crate::signature::{read_sig_file, ClassSig, SymbolIndex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct Resolver {
    stamp: u64,
    classpath: Vec<PathBuf>,
    loaded: HashMap<PathBuf, SymbolIndex>,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            stamp: NEXT_STAMP.fetch_add(1, Ordering::Relaxed),
            classpath: Vec::new(),
            loaded: HashMap::new(),
        }
    }

    /// Process-unique identity of this resolver instance.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Replace the classpath used for subsequent lookups. Previously loaded
    /// directory caches are discarded.
    pub fn set_classpath(&mut self, dirs: Vec<PathBuf>) {
        self.classpath = dirs;
        self.loaded.clear();
    }

    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }

    /// Look up a fully qualified name across the classpath, in order.
    /// Unreadable directories and malformed signature files are diagnosed
    /// as warnings, never fatal.
    pub fn lookup(&mut self, name: &str, log: &mut DiagnosticLog) -> Option<ClassSig> {
        let dirs = self.classpath.clone();
        for dir in dirs {
            if !self.loaded.contains_key(&dir) {
                let idx = load_dir(&dir, log);
                self.loaded.insert(dir.clone(), idx);
            }
            if let Some(sig) = self.loaded[&dir].get(name) {
                return Some(sig.clone());
            }
        }
        None
    }

    /// Drop all cached directory contents.
    pub fn flush(&mut self) {
        self.loaded.clear();
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

fn load_dir(dir: &Path, log: &mut DiagnosticLog) -> SymbolIndex {
    let mut idx = SymbolIndex::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log.push(Diagnostic::bare(
                Severity::Warning,
                format!("cannot read classpath directory {}: {}", dir.display(), e),
            ));
            return idx;
        }
    };
    // Sort for deterministic precedence among files in the same directory.
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        let is_sig = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".sig.json"));
        if !is_sig {
            continue;
        }
        match read_sig_file(&path) {
            Ok(sigs) => {
                for sig in sigs {
                    idx.insert(sig);
                }
            }
            Err(e) => log.push(Diagnostic::bare(Severity::Warning, e.to_string())),
        }
    }
    idx
}
