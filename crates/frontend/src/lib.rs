//! Reentrant Sable frontend: parse, attribute, and map batches of source
//! units into a serializable source model.
//!
//! The embedding surface is [`FrontendPipeline`]: build one (which acquires
//! the shared isolated toolchain environment), feed it batches of [`Input`]s,
//! and reset it between logical sessions. Collaborator traits ([`AstMapper`],
//! [`LoggingSink`], [`MetricsSink`]) let hosts swap the output model and the
//! observability plumbing without touching the pipeline.

pub mod error;
pub mod input;
pub mod isolation;
pub mod mapper;
pub mod pipeline;
pub mod telemetry;

pub use error::PipelineError;
pub use input::{Encoding, Input, SOURCE_EXTENSION};
pub use isolation::{IsolatedEnvironment, IsolationError, HOME_ENV};
pub use mapper::{AstMapper, MapError, MapRequest, NamedStyle, SourceFile, TypeRef};
pub use pipeline::{FrontendPipeline, FrontendPipelineBuilder, PipelineState};
pub use telemetry::{LoggingSink, MetricsSink, Outcome, Step, TimingSample};
