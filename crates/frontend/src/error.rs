//! Pipeline error taxonomy.
//!
//! Parse and attribution problems are diagnostics, not errors: the pipeline
//! degrades to partial output and keeps going. Only structural misuse and
//! mapping failures surface here.

use thiserror::Error;

use crate::isolation::IsolationError;
use crate::mapper::MapError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// No usable toolchain installation. Raised at construction, never later.
    #[error(transparent)]
    ToolchainUnavailable(#[from] IsolationError),

    /// A batch was submitted while an earlier batch was still in flight.
    #[error("batch submitted while a previous batch is still {state}; call reset() first")]
    ReentrantUse { state: &'static str },

    /// A unit path was seen twice without an intervening reset.
    #[error("unit '{path}' was already compiled in this context; call reset() before resubmitting it")]
    DuplicateUnit { path: String },

    /// The compiler context was tampered with. The instance is poisoned and
    /// must be discarded; even reset() will not recover it.
    #[error("compiler context corrupted: {detail}; discard this pipeline instance")]
    ContextCorrupted { detail: String },

    /// Mapping failed for one unit and suppression is off.
    #[error("mapping failed for unit '{unit}': {source}")]
    Mapping { unit: String, source: MapError },
}
