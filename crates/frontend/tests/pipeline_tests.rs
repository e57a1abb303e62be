//! End-to-end pipeline behavior: batch lifecycle, duplicate tracking,
//! isolation precedence, mapping failure policy, and reset semantics.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use sable_frontend::mapper::{AstMapper, MapError, MapRequest, SourceFile, TreeMapper, TypeRef};
use sable_frontend::pipeline::PipelineState;
use sable_frontend::telemetry::{Outcome, RecordingLog, RecordingMetrics, Step};
use sable_frontend::{FrontendPipeline, Input, PipelineError};
use sable_toolchain::Resolver;

const CORE_SIGS: &str = r#"[
    {"name": "lang.Object", "superclass": null},
    {"name": "lang.Int", "superclass": "lang.Object"},
    {"name": "lang.Bool", "superclass": "lang.Object"},
    {"name": "lang.String", "superclass": "lang.Object"},
    {"name": "lang.Unit", "superclass": "lang.Object"}
]"#;

fn install_toolchain() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir(home.path().join("lib")).unwrap();
    fs::write(home.path().join("lib/core.sig.json"), CORE_SIGS).unwrap();
    home
}

fn pipeline(home: &Path) -> FrontendPipeline {
    FrontendPipeline::builder()
        .toolchain_home(home)
        .build()
        .unwrap()
}

fn resolved(name: &str, origin: &str) -> TypeRef {
    TypeRef::Resolved {
        name: name.to_owned(),
        origin: origin.to_owned(),
    }
}

#[test]
fn cross_file_references_resolve_within_a_batch() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    let files = pipeline
        .run(
            vec![
                Input::new("lib/base.sab", "package base;\nclass Account { Int balance; }\n"),
                Input::new(
                    "app/main.sab",
                    "package app;\nimport base.Account;\nclass Savings extends Account { }\n",
                ),
            ],
            None,
        )
        .unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[1].classes[0].qualified_name, "app.Savings");
    assert_eq!(
        files[1].classes[0].superclass,
        resolved("base.Account", "batch")
    );
    assert_eq!(
        files[0].classes[0].fields[0].ty,
        resolved("lang.Int", "core")
    );
    assert_eq!(pipeline.state(), PipelineState::Mapped);
}

#[test]
fn classpath_resolves_types_outside_the_batch() {
    let home = install_toolchain();
    let cp = tempfile::tempdir().unwrap();
    fs::write(
        cp.path().join("ext.sig.json"),
        r#"[{"name": "ext.Util", "superclass": "lang.Object"}]"#,
    )
    .unwrap();

    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .classpath(vec![cp.path().to_owned()])
        .build()
        .unwrap();

    let files = pipeline
        .run(
            vec![Input::new(
                "main.sab",
                "import ext.Util;\nclass App { Util helper; }\n",
            )],
            None,
        )
        .unwrap();

    assert_eq!(
        files[0].classes[0].fields[0].ty,
        resolved("ext.Util", "classpath")
    );
}

#[test]
fn classpath_never_shadows_the_core_library() {
    let home = install_toolchain();
    let cp = tempfile::tempdir().unwrap();
    // A hostile classpath entry claiming to be lang.String, plus a reserved
    // name the core library genuinely lacks.
    fs::write(
        cp.path().join("shadow.sig.json"),
        r#"[
            {"name": "lang.String", "superclass": null},
            {"name": "lang.Extra", "superclass": "lang.Object"}
        ]"#,
    )
    .unwrap();

    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .classpath(vec![cp.path().to_owned()])
        .build()
        .unwrap();

    let files = pipeline
        .run(
            vec![Input::new(
                "main.sab",
                "class App { String name; lang.Extra extra; }\n",
            )],
            None,
        )
        .unwrap();

    let fields = &files[0].classes[0].fields;
    assert_eq!(fields[0].ty, resolved("lang.String", "core"));
    assert_eq!(fields[1].ty, resolved("lang.Extra", "classpath"));
}

#[test]
fn duplicate_paths_within_a_batch_are_rejected() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    let err = pipeline
        .run(
            vec![
                Input::new("a.sab", "class A { }\n"),
                Input::new("a.sab", "class AAgain { }\n"),
            ],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateUnit { path } if path == "a.sab"));

    // The aborted batch leaves the pipeline mid-flight until reset.
    let err = pipeline
        .run(vec![Input::new("b.sab", "class B { }\n")], None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::ReentrantUse { state } if state == "parsing"));

    pipeline.reset().unwrap();
    pipeline
        .run(vec![Input::new("b.sab", "class B { }\n")], None)
        .unwrap();
}

#[test]
fn resubmitting_a_path_across_batches_requires_reset() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    pipeline
        .run(vec![Input::new("a.sab", "class A { }\n")], None)
        .unwrap();

    let err = pipeline
        .run(vec![Input::new("a.sab", "class A { }\n")], None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateUnit { path } if path == "a.sab"));

    pipeline.reset().unwrap();
    let files = pipeline
        .run(vec![Input::new("a.sab", "class A { }\n")], None)
        .unwrap();
    assert_eq!(files.len(), 1);
}

#[test]
fn distinct_paths_may_span_batches_without_reset() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    pipeline
        .run(vec![Input::new("a.sab", "class A { }\n")], None)
        .unwrap();
    let files = pipeline
        .run(vec![Input::new("b.sab", "class B { }\n")], None)
        .unwrap();
    assert_eq!(files[0].classes[0].name, "B");
}

#[test]
fn reset_pipeline_matches_a_fresh_one() {
    let home = install_toolchain();
    let batch = || {
        vec![Input::new(
            "a.sab",
            "package app;\nclass A { Int x; }\n",
        )]
    };

    let mut reused = pipeline(home.path());
    reused.run(batch(), None).unwrap();
    reused.reset().unwrap();
    let after_reset = reused.run(batch(), None).unwrap();

    let mut fresh = pipeline(home.path());
    let from_fresh = fresh.run(batch(), None).unwrap();

    assert_eq!(after_reset, from_fresh);
}

#[test]
fn unresolved_references_do_not_block_mapping() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    let files = pipeline
        .run(
            vec![
                Input::new("dangling.sab", "class Dangling extends Nowhere { }\n"),
                Input::new("fine.sab", "class Fine { }\n"),
            ],
            None,
        )
        .unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(
        files[0].classes[0].superclass,
        TypeRef::Unresolved {
            written: "Nowhere".to_owned()
        }
    );
    assert_eq!(files[1].classes[0].name, "Fine");
}

#[test]
fn malformed_source_degrades_to_partial_output() {
    let home = install_toolchain();
    let log = Arc::new(RecordingLog::new());
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .log_diagnostics(true)
        .logging_sink(log.clone())
        .build()
        .unwrap();

    let files = pipeline
        .run(
            vec![Input::new(
                "broken.sab",
                "class Ok { Int good; %%% }\nclass AlsoOk { }\n",
            )],
            None,
        )
        .unwrap();

    // Both classes survive; the junk member produced diagnostics, not failure.
    assert_eq!(files[0].classes.len(), 2);
    assert!(log.lines().iter().any(|l| l.starts_with("broken.sab:")));
}

#[test]
fn diagnostics_are_dropped_when_logging_is_off() {
    let home = install_toolchain();
    let log = Arc::new(RecordingLog::new());
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .logging_sink(log.clone())
        .build()
        .unwrap();

    pipeline
        .run(vec![Input::new("broken.sab", "class X { %%% }\n")], None)
        .unwrap();
    assert!(log.lines().is_empty());
}

struct FailOn(&'static str);

impl AstMapper for FailOn {
    fn map(&self, request: MapRequest<'_>) -> Result<SourceFile, MapError> {
        if request.path == Some(self.0) {
            return Err(MapError::new("synthetic mapping failure"));
        }
        TreeMapper.map(request)
    }
}

#[test]
fn mapping_failure_aborts_the_batch_by_default() {
    let home = install_toolchain();
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .mapper(Box::new(FailOn("bad.sab")))
        .build()
        .unwrap();

    let err = pipeline
        .run(
            vec![
                Input::new("ok.sab", "class A { }\n"),
                Input::new("bad.sab", "class B { }\n"),
            ],
            None,
        )
        .unwrap_err();
    assert!(matches!(&err, PipelineError::Mapping { unit, .. } if unit == "bad.sab"));

    let err = pipeline
        .run(vec![Input::new("c.sab", "class C { }\n")], None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::ReentrantUse { state } if state == "attributing"));

    pipeline.reset().unwrap();
    pipeline
        .run(vec![Input::new("c.sab", "class C { }\n")], None)
        .unwrap();
}

#[test]
fn suppressed_mapping_failures_drop_the_unit_and_keep_order() {
    let home = install_toolchain();
    let log = Arc::new(RecordingLog::new());
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .mapper(Box::new(FailOn("mid.sab")))
        .suppress_mapping_errors(true)
        .logging_sink(log.clone())
        .build()
        .unwrap();

    let files = pipeline
        .run(
            vec![
                Input::new("first.sab", "class First { }\n"),
                Input::new("mid.sab", "class Mid { }\n"),
                Input::new("last.sab", "class Last { }\n"),
            ],
            None,
        )
        .unwrap();

    let names: Vec<_> = files
        .iter()
        .map(|f| f.classes[0].name.as_str())
        .collect();
    assert_eq!(names, ["First", "Last"]);
    assert_eq!(pipeline.state(), PipelineState::Mapped);
    assert!(log.lines().iter().any(|l| l.contains("mid.sab")));
}

#[test]
fn non_source_and_anonymous_inputs() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    let files = pipeline
        .run(
            vec![
                Input::new("notes.txt", "not sable at all"),
                Input::anonymous("class Scratch { }\n"),
            ],
            None,
        )
        .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, None);
    assert_eq!(files[0].classes[0].name, "Scratch");
}

#[test]
fn multiple_anonymous_inputs_are_attributed_independently() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());

    let files = pipeline
        .run(
            vec![
                Input::anonymous("class First { Int x; }\n"),
                Input::anonymous("class Second { Int y; }\n"),
            ],
            None,
        )
        .unwrap();

    assert_eq!(files.len(), 2);
    for file in &files {
        assert_eq!(file.path, None);
        assert_eq!(
            file.classes[0].fields[0].ty,
            resolved("lang.Int", "core"),
            "field in class '{}' not attributed",
            file.classes[0].name
        );
    }
}

#[test]
fn entry_failure_is_logged_and_both_units_still_map() {
    let home = install_toolchain();
    let log = Arc::new(RecordingLog::new());
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .logging_sink(log.clone())
        .build()
        .unwrap();

    // Two distinct paths declaring the same fully qualified class.
    let files = pipeline
        .run(
            vec![
                Input::new("one.sab", "package app;\nclass Clash { }\n"),
                Input::new("two.sab", "package app;\nclass Clash { }\n"),
            ],
            None,
        )
        .unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].classes[0].qualified_name, "app.Clash");
    assert_eq!(files[1].classes[0].qualified_name, "app.Clash");
    assert!(
        log.lines()
            .iter()
            .any(|l| l.contains("symbol entry failed") && l.contains("app.Clash")),
        "missing entry-failure warning in {:?}",
        log.lines()
    );
}

#[test]
fn decode_failure_is_tagged_in_the_parse_sample() {
    let home = install_toolchain();
    let metrics = Arc::new(RecordingMetrics::new());
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .metrics_sink(metrics.clone())
        .build()
        .unwrap();

    pipeline
        .run(
            vec![
                Input::new("bad.sab", vec![0xff, 0xfe]),
                Input::new("good.sab", "class A { }\n"),
            ],
            None,
        )
        .unwrap();

    let samples = metrics.samples();
    let bad = samples
        .iter()
        .find(|s| s.step == Step::Parse && s.unit == "bad.sab")
        .unwrap();
    assert_eq!(bad.outcome, Outcome::Error);
    assert_eq!(bad.error_kind.as_deref(), Some("DecodeError"));
    let good = samples
        .iter()
        .find(|s| s.step == Step::Parse && s.unit == "good.sab")
        .unwrap();
    assert_eq!(good.outcome, Outcome::Success);
    assert_eq!(good.error_kind, None);
}

#[test]
fn display_paths_are_relative_to_the_given_root() {
    let home = install_toolchain();
    let root = tempfile::tempdir().unwrap();
    let src = root.path().join("src/a.sab");
    let mut pipeline = pipeline(home.path());

    let files = pipeline
        .run(
            vec![Input::new(&src, "class A { }\n")],
            Some(root.path()),
        )
        .unwrap();
    assert_eq!(files[0].path.as_deref(), Some("src/a.sab"));
}

#[test]
fn missing_toolchain_fails_at_construction() {
    let empty = tempfile::tempdir().unwrap();
    let err = match FrontendPipeline::builder()
        .toolchain_home(empty.path())
        .build()
    {
        Ok(_) => panic!("construction succeeded without a toolchain"),
        Err(err) => err,
    };
    assert!(matches!(err, PipelineError::ToolchainUnavailable(_)));
}

#[test]
fn replacing_the_resolver_poisons_the_instance() {
    let home = install_toolchain();
    let mut pipeline = pipeline(home.path());
    pipeline
        .run(vec![Input::new("a.sab", "class A { }\n")], None)
        .unwrap();

    pipeline.context_mut().replace_resolver(Resolver::new());

    let err = pipeline
        .run(vec![Input::new("b.sab", "class B { }\n")], None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::ContextCorrupted { .. }));

    // Poisoning is permanent; reset does not recover.
    let err = pipeline.reset().unwrap_err();
    assert!(matches!(err, PipelineError::ContextCorrupted { .. }));
}

#[test]
fn metrics_cover_every_phase_per_unit() {
    let home = install_toolchain();
    let metrics = Arc::new(RecordingMetrics::new());
    let mut pipeline = FrontendPipeline::builder()
        .toolchain_home(home.path())
        .metrics_sink(metrics.clone())
        .build()
        .unwrap();

    pipeline
        .run(vec![Input::new("a.sab", "class A { Int x; }\n")], None)
        .unwrap();

    let samples = metrics.samples();
    for step in [Step::Parse, Step::Attribute, Step::Map] {
        assert!(
            samples
                .iter()
                .any(|s| s.step == step && s.unit == "a.sab" && s.outcome == Outcome::Success),
            "missing {} sample",
            step.as_str()
        );
    }
}
