//! The reentrant frontend pipeline.
//!
//! One [`FrontendPipeline`] owns one compiler context and drives a batch of
//! inputs through parse, symbol entry, attribution, and mapping. Parse and
//! attribution are best effort: malformed source degrades to partial trees
//! and `Unknown` types rather than failing the batch. The pipeline is
//! strictly serial; a batch must finish (or the pipeline must be reset)
//! before the next one starts.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sable_toolchain::{attribute, enter_all, parse, CompilationUnit, Context, Diagnostic, Severity};

use crate::error::PipelineError;
use crate::input::Input;
use crate::isolation::{self, EnvSymbols, IsolatedEnvironment};
use crate::mapper::{AstMapper, MapRequest, NamedStyle, SourceFile, TreeMapper};
use crate::telemetry::{
    LogFacadeSink, LoggingSink, MetricsSink, NoopMetrics, Outcome, Step, TimedTodo, TimingSample,
};

/// Where a pipeline instance is in its batch lifecycle.
///
/// `Parsing` and `Attributing` are observable only after an aborted batch;
/// a completed batch lands in `Mapped`, and `reset()` returns to `Fresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Fresh,
    Parsing,
    Attributing,
    Mapped,
}

impl PipelineState {
    fn name(self) -> &'static str {
        match self {
            PipelineState::Fresh => "fresh",
            PipelineState::Parsing => "parsing",
            PipelineState::Attributing => "attributing",
            PipelineState::Mapped => "mapped",
        }
    }
}

pub struct FrontendPipeline {
    env: Arc<IsolatedEnvironment>,
    ctx: Context,
    mapper: Box<dyn AstMapper>,
    logging: Arc<dyn LoggingSink>,
    metrics: Arc<dyn MetricsSink>,
    classpath: Option<Vec<PathBuf>>,
    relaxed_type_matching: bool,
    suppress_mapping_errors: bool,
    log_diagnostics: bool,
    styles: Vec<NamedStyle>,
    state: PipelineState,
    poisoned: bool,
    resolver_stamp: u64,
}

#[derive(Default)]
pub struct FrontendPipelineBuilder {
    toolchain_home: Option<PathBuf>,
    classpath: Option<Vec<PathBuf>>,
    relaxed_type_matching: bool,
    suppress_mapping_errors: bool,
    log_diagnostics: bool,
    styles: Vec<NamedStyle>,
    mapper: Option<Box<dyn AstMapper>>,
    logging: Option<Arc<dyn LoggingSink>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl FrontendPipelineBuilder {
    /// Load the toolchain from an explicit installation root instead of the
    /// process-wide cached environment.
    pub fn toolchain_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.toolchain_home = Some(home.into());
        self
    }

    /// Directories searched for `*.sig.json` signature files when resolving
    /// non-batch types.
    pub fn classpath(mut self, dirs: Vec<PathBuf>) -> Self {
        self.classpath = Some(dirs);
        self
    }

    /// Report unresolved written type names as resolved nominal types.
    pub fn relaxed_type_matching(mut self, relaxed: bool) -> Self {
        self.relaxed_type_matching = relaxed;
        self
    }

    /// Drop units that fail to map instead of failing the batch.
    pub fn suppress_mapping_errors(mut self, suppress: bool) -> Self {
        self.suppress_mapping_errors = suppress;
        self
    }

    /// Route compiler diagnostics to the logging sink. When off they are
    /// still drained from the context, just discarded.
    pub fn log_diagnostics(mut self, log: bool) -> Self {
        self.log_diagnostics = log;
        self
    }

    pub fn styles(mut self, styles: Vec<NamedStyle>) -> Self {
        self.styles = styles;
        self
    }

    pub fn mapper(mut self, mapper: Box<dyn AstMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn logging_sink(mut self, sink: Arc<dyn LoggingSink>) -> Self {
        self.logging = Some(sink);
        self
    }

    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Construct the pipeline, acquiring the isolated toolchain environment.
    /// This is the only point that can fail with `ToolchainUnavailable`.
    pub fn build(self) -> Result<FrontendPipeline, PipelineError> {
        let env = match &self.toolchain_home {
            Some(home) => Arc::new(isolation::load_environment(home)?),
            None => isolation::acquire()?,
        };
        let ctx = Context::new();
        let resolver_stamp = ctx.resolver().stamp();
        Ok(FrontendPipeline {
            env,
            ctx,
            mapper: self.mapper.unwrap_or_else(|| Box::new(TreeMapper)),
            logging: self.logging.unwrap_or_else(|| Arc::new(LogFacadeSink)),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            classpath: self.classpath,
            relaxed_type_matching: self.relaxed_type_matching,
            suppress_mapping_errors: self.suppress_mapping_errors,
            log_diagnostics: self.log_diagnostics,
            styles: self.styles,
            state: PipelineState::Fresh,
            poisoned: false,
            resolver_stamp,
        })
    }
}

struct ParsedUnit {
    /// Batch-unique identity: the display path for pathful inputs, a
    /// synthetic `<memory#N>` name for anonymous ones. Keys the entry scope,
    /// the attribution queue, diagnostics, and metrics.
    key: String,
    path: Option<String>,
    source: String,
    tree: CompilationUnit,
}

impl FrontendPipeline {
    pub fn builder() -> FrontendPipelineBuilder {
        FrontendPipelineBuilder::default()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn environment(&self) -> &Arc<IsolatedEnvironment> {
        &self.env
    }

    /// Replace the classpath for subsequent batches. Units already compiled
    /// in this context keep their original resolutions.
    pub fn configure_classpath(&mut self, dirs: Vec<PathBuf>) -> Result<(), PipelineError> {
        self.guard()?;
        self.check_resolver()?;
        self.classpath = Some(dirs);
        Ok(())
    }

    /// Run one batch through parse, entry, attribution, and mapping.
    ///
    /// Mapped files come back in submission order. Pathful inputs are keyed
    /// by their display path (relative to `relative_to` when given) for
    /// duplicate tracking across batches.
    pub fn run(
        &mut self,
        batch: Vec<Input>,
        relative_to: Option<&Path>,
    ) -> Result<Vec<SourceFile>, PipelineError> {
        self.guard()?;
        match self.state {
            PipelineState::Fresh | PipelineState::Mapped => {}
            aborted => return Err(PipelineError::ReentrantUse {
                state: aborted.name(),
            }),
        }
        self.check_resolver()?;
        self.state = PipelineState::Parsing;

        if let Some(dirs) = &self.classpath {
            self.ctx.resolver_mut().set_classpath(dirs.clone());
        }

        let parsed = self.parse_batch(batch, relative_to)?;
        self.flush_diagnostics();

        self.state = PipelineState::Attributing;
        self.attribute_batch(&parsed);
        self.flush_diagnostics();

        let results = self.map_batch(&parsed)?;
        self.state = PipelineState::Mapped;
        Ok(results)
    }

    /// Return the pipeline to `Fresh`: clears diagnostics, the compiled-unit
    /// set, the shared scope, type information, and resolver caches. A fresh
    /// pipeline and a reset one accept the same batches.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        self.guard()?;
        self.check_resolver()?;
        self.ctx.reset();
        self.state = PipelineState::Fresh;
        Ok(())
    }

    /// Escape hatch for embedders that need the raw compiler context.
    /// Replacing its resolver corrupts the pipeline permanently.
    #[doc(hidden)]
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    fn guard(&self) -> Result<(), PipelineError> {
        if self.poisoned {
            return Err(PipelineError::ContextCorrupted {
                detail: "instance was poisoned by an earlier corruption".to_owned(),
            });
        }
        Ok(())
    }

    fn check_resolver(&mut self) -> Result<(), PipelineError> {
        if self.ctx.resolver().stamp() != self.resolver_stamp {
            self.poisoned = true;
            return Err(PipelineError::ContextCorrupted {
                detail: "the classpath resolver was replaced out from under this pipeline"
                    .to_owned(),
            });
        }
        Ok(())
    }

    fn parse_batch(
        &mut self,
        batch: Vec<Input>,
        relative_to: Option<&Path>,
    ) -> Result<Vec<ParsedUnit>, PipelineError> {
        let mut parsed: Vec<ParsedUnit> = Vec::new();
        let mut batch_paths = HashSet::new();
        let mut anonymous = 0usize;
        for input in &batch {
            if !input.accepted() {
                continue;
            }
            let pathful = input.path().is_some();
            // Anonymous inputs all display as <memory>; each still needs its
            // own identity or they would collide in the entry scope and the
            // attribution queue.
            let key = if pathful {
                input.display_path(relative_to)
            } else {
                anonymous += 1;
                format!("<memory#{anonymous}>")
            };
            if pathful {
                if self.ctx.is_compiled(&key) || !batch_paths.insert(key.clone()) {
                    self.flush_diagnostics();
                    return Err(PipelineError::DuplicateUnit { path: key });
                }
            }
            let mut decode_failure = None;
            let source = match input.decode() {
                Ok(source) => source,
                Err(cause) => {
                    self.ctx.log.push(Diagnostic {
                        severity: Severity::Error,
                        message: cause.to_string(),
                        file: Some(key.clone()),
                        line: None,
                    });
                    decode_failure = Some("DecodeError".to_owned());
                    String::new()
                }
            };
            let start = Instant::now();
            let tree = parse(&mut self.ctx, &key, &source);
            self.metrics.record(TimingSample {
                step: Step::Parse,
                unit: key.clone(),
                outcome: if decode_failure.is_some() {
                    Outcome::Error
                } else {
                    Outcome::Success
                },
                error_kind: decode_failure,
                duration: start.elapsed(),
            });
            if pathful {
                self.ctx.mark_compiled(key.clone());
            }
            parsed.push(ParsedUnit {
                path: pathful.then(|| key.clone()),
                key,
                source,
                tree,
            });
        }
        Ok(parsed)
    }

    fn attribute_batch(&mut self, parsed: &[ParsedUnit]) {
        if let Err(cause) = enter_all(
            &mut self.ctx,
            parsed.iter().map(|u| (u.key.as_str(), &u.tree)),
        ) {
            self.logging.warning(
                "symbol entry failed; attribution proceeds on the entered subset",
                Some(&cause),
            );
        }

        let by_key: HashMap<String, &CompilationUnit> = parsed
            .iter()
            .map(|u| (u.key.clone(), &u.tree))
            .collect();
        let symbols = EnvSymbols(self.env.clone());
        let mut todo = TimedTodo::new(self.ctx.take_todo(), self.metrics.as_ref());
        if let Err(cause) = attribute(&mut self.ctx, &mut todo, &by_key, &symbols) {
            self.logging.warning(
                "type attribution failed; mapping proceeds with partial type information",
                Some(&cause),
            );
        }
        todo.finish();
    }

    fn map_batch(&mut self, parsed: &[ParsedUnit]) -> Result<Vec<SourceFile>, PipelineError> {
        let mut results = Vec::with_capacity(parsed.len());
        for unit in parsed {
            let start = Instant::now();
            let request = MapRequest {
                tree: &unit.tree,
                types: self.ctx.types(),
                source: &unit.source,
                path: unit.path.as_deref(),
                relaxed_type_matching: self.relaxed_type_matching,
                styles: &self.styles,
            };
            match self.mapper.map(request) {
                Ok(file) => {
                    self.metrics.record(TimingSample {
                        step: Step::Map,
                        unit: unit.key.clone(),
                        outcome: Outcome::Success,
                        error_kind: None,
                        duration: start.elapsed(),
                    });
                    results.push(file);
                }
                Err(cause) => {
                    self.metrics.record(TimingSample {
                        step: Step::Map,
                        unit: unit.key.clone(),
                        outcome: Outcome::Error,
                        error_kind: Some("MapError".to_owned()),
                        duration: start.elapsed(),
                    });
                    if self.suppress_mapping_errors {
                        self.logging.warning(
                            &format!("dropping unit '{}' after mapping failure", unit.key),
                            Some(&cause),
                        );
                    } else {
                        return Err(PipelineError::Mapping {
                            unit: unit.key.clone(),
                            source: cause,
                        });
                    }
                }
            }
        }
        Ok(results)
    }

    fn flush_diagnostics(&mut self) {
        for diag in self.ctx.log.drain() {
            if self.log_diagnostics {
                self.logging.diagnostic(&diag);
            }
        }
    }
}
