//! Toolchain isolation boundary.
//!
//! The compiler's view of the reserved `lang.*` core library comes from a
//! signature index loaded out of the toolchain installation, never from the
//! user classpath. The loaded [`IsolatedEnvironment`] is cached process-wide:
//! every pipeline instance shares one immutable copy, so a host embedding many
//! pipelines pays the load cost once.
//!
//! Resolution through this boundary is deliberately asymmetric: reserved names
//! answer from the core library (with classpath fallback handled upstream in
//! attribution), while non-reserved names never touch the core library at all.
//! A classpath entry can therefore never shadow `lang.String`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use sable_toolchain::{read_sig_file, ClassSig, SymbolIndex, SymbolSource};
use thiserror::Error;

/// Environment variable naming the toolchain installation root.
pub const HOME_ENV: &str = "SABLE_HOME";

/// Namespace prefixes reserved to the core library.
pub const RESERVED_PREFIXES: &[&str] = &["lang."];

const CORE_LIBRARY: &str = "lib/core.sig.json";

#[derive(Debug, Error)]
pub enum IsolationError {
    /// No usable toolchain. Raised once, at pipeline construction.
    #[error(
        "Sable toolchain unavailable: {detail}. Point SABLE_HOME at a full \
         toolchain installation; a runtime-only install carries no compiler library"
    )]
    ToolchainUnavailable { detail: String },

    /// A toolchain was found but its core library cannot be loaded.
    #[error("Sable toolchain at {home} has an unusable core library: {detail}")]
    CorruptLibrary { home: String, detail: String },
}

/// The restricted core-library signature index, plus where it came from.
#[derive(Debug)]
pub struct IsolatedEnvironment {
    home: PathBuf,
    core: SymbolIndex,
}

impl IsolatedEnvironment {
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Whether `name` lives in a namespace reserved to the core library.
    pub fn restricted(&self, name: &str) -> bool {
        RESERVED_PREFIXES.iter().any(|p| name.starts_with(p))
    }

    /// Core-library lookup. Non-reserved names always answer `None` here;
    /// they belong to the batch or the classpath.
    pub fn lookup(&self, name: &str) -> Option<&ClassSig> {
        if self.restricted(name) {
            self.core.get(name)
        } else {
            None
        }
    }

    pub fn core_len(&self) -> usize {
        self.core.len()
    }
}

/// Load an environment from an explicit installation root.
pub fn load_environment(home: &Path) -> Result<IsolatedEnvironment, IsolationError> {
    let lib = home.join(CORE_LIBRARY);
    if !lib.is_file() {
        return Err(IsolationError::ToolchainUnavailable {
            detail: format!("no core library at {}", lib.display()),
        });
    }
    let sigs = read_sig_file(&lib).map_err(|e| IsolationError::CorruptLibrary {
        home: home.display().to_string(),
        detail: e.to_string(),
    })?;
    if sigs.is_empty() {
        return Err(IsolationError::CorruptLibrary {
            home: home.display().to_string(),
            detail: "core library declares no classes".to_owned(),
        });
    }
    Ok(IsolatedEnvironment {
        home: home.to_owned(),
        core: SymbolIndex::from_sigs(sigs),
    })
}

static ENVIRONMENT: OnceCell<Arc<IsolatedEnvironment>> = OnceCell::new();

/// Acquire the process-wide shared environment, loading it from `SABLE_HOME`
/// on first use. A failed load is not cached; a later call retries.
pub fn acquire() -> Result<Arc<IsolatedEnvironment>, IsolationError> {
    ENVIRONMENT
        .get_or_try_init(|| {
            let home = std::env::var_os(HOME_ENV).ok_or_else(|| {
                IsolationError::ToolchainUnavailable {
                    detail: format!("{HOME_ENV} is not set"),
                }
            })?;
            load_environment(Path::new(&home)).map(Arc::new)
        })
        .cloned()
}

/// Adapter handing the attribution phase its view of the core library.
pub struct EnvSymbols(pub Arc<IsolatedEnvironment>);

impl SymbolSource for EnvSymbols {
    fn restricted(&self, name: &str) -> bool {
        self.0.restricted(name)
    }

    fn lookup(&self, name: &str) -> Option<ClassSig> {
        self.0.lookup(name).cloned()
    }
}
