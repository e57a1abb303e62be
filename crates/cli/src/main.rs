use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use sable_frontend::{FrontendPipeline, Input, NamedStyle, PipelineError};

/// Sable source-model frontend.
#[derive(Parser)]
#[command(name = "sable", version, about = "Sable source-model frontend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, attribute, and map source files, printing the model as JSON
    Ast {
        /// Sable source files to process as one batch
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory of *.sig.json signature files for types outside the batch
        #[arg(long, value_name = "DIR")]
        classpath: Vec<PathBuf>,

        /// Show unit paths relative to this directory
        #[arg(long, value_name = "DIR")]
        relative_to: Option<PathBuf>,

        /// Toolchain installation root (defaults to $SABLE_HOME)
        #[arg(long, value_name = "DIR")]
        toolchain_home: Option<PathBuf>,

        /// Drop units that fail to map instead of aborting the batch
        #[arg(long)]
        suppress_mapping_errors: bool,

        /// Report unresolved written type names as nominal types
        #[arg(long)]
        relaxed: bool,

        /// Route compiler diagnostics to the log
        #[arg(long)]
        log_diagnostics: bool,

        /// Sort each file's imports in the output
        #[arg(long)]
        sort_imports: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ast {
            files,
            classpath,
            relative_to,
            toolchain_home,
            suppress_mapping_errors,
            relaxed,
            log_diagnostics,
            sort_imports,
        } => {
            cmd_ast(
                &files,
                classpath,
                relative_to.as_deref(),
                toolchain_home,
                suppress_mapping_errors,
                relaxed,
                log_diagnostics,
                sort_imports,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_ast(
    files: &[PathBuf],
    classpath: Vec<PathBuf>,
    relative_to: Option<&Path>,
    toolchain_home: Option<PathBuf>,
    suppress_mapping_errors: bool,
    relaxed: bool,
    log_diagnostics: bool,
    sort_imports: bool,
) {
    let mut batch = Vec::with_capacity(files.len());
    for path in files {
        match fs::read(path) {
            Ok(bytes) => batch.push(Input::new(path, bytes)),
            Err(e) => {
                eprintln!("error: cannot read {}: {}", path.display(), e);
                process::exit(2);
            }
        }
    }

    let mut styles = Vec::new();
    if sort_imports {
        styles.push(NamedStyle::new("imports").with_option("sort", "true"));
    }

    let mut builder = FrontendPipeline::builder()
        .classpath(classpath)
        .relaxed_type_matching(relaxed)
        .suppress_mapping_errors(suppress_mapping_errors)
        .log_diagnostics(log_diagnostics)
        .styles(styles);
    if let Some(home) = toolchain_home {
        builder = builder.toolchain_home(home);
    }

    let mut pipeline = match builder.build() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    match pipeline.run(batch, relative_to) {
        Ok(model) => match serde_json::to_string_pretty(&model) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: cannot serialize source model: {e}");
                process::exit(1);
            }
        },
        Err(e @ (PipelineError::DuplicateUnit { .. } | PipelineError::ReentrantUse { .. })) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
