/// Integration tests for the error annotator and the pipeline entry flow,
/// exercised through the public `mlproject::` API.
use std::io;

use mlproject::components::data_ingestion::{
    DataIngestion, DataIngestionConfig, Ingest, IngestionArtifacts,
};
use mlproject::exception::{
    AnnotateExt, AnnotatedError, ExecutionContext, Fault, ResultExt, SourceLocation, annotate,
};
use mlproject::{fault, pipeline, raise};
use tempfile::tempdir;

fn divide(a: i64, b: i64) -> anyhow::Result<i64> {
    if b == 0 {
        raise!("division by zero");
    }
    Ok(a / b)
}

#[test]
fn calc_scenario_has_exact_message() {
    let fault = Fault::new(SourceLocation::new("calc.ext", 42), "division by zero");
    let err = AnnotatedError::wrap(fault, ExecutionContext::capture());
    assert_eq!(
        err.to_string(),
        "Error occurred in script [calc.ext] line number [42] error message [division by zero]"
    );
}

#[test]
fn message_contains_file_line_and_original_text() {
    let err = divide(10, 0).annotate().unwrap_err();
    let record = err.record();
    let text = err.to_string();

    assert_eq!(record.source_file(), "tests/integration.rs");
    assert!(text.contains(record.source_file()));
    assert!(text.contains(&format!("[{}]", record.line_number())));
    assert!(text.contains("division by zero"));
}

#[test]
fn raise_macro_records_its_own_line() {
    let (err, line) = (fault!("bad shape {}x{}", 3, 4), line!());
    let annotated = annotate(err);
    assert_eq!(annotated.record().line_number(), line);
    assert_eq!(annotated.record().original_message(), "bad shape 3x4");
}

#[test]
fn located_std_error_beats_wrap_site() {
    let located = std::fs::read_to_string("/definitely/not/here.csv").located();
    let line = line!() - 1;
    let annotated = AnnotatedError::wrap(
        located.unwrap_err(),
        ExecutionContext::at(SourceLocation::new("elsewhere.rs", 900)),
    );
    assert_eq!(annotated.record().source_file(), "tests/integration.rs");
    assert_eq!(annotated.record().line_number(), line);
}

#[test]
fn empty_message_boundary() {
    let err = AnnotatedError::wrap(
        io::Error::other(""),
        ExecutionContext::at(SourceLocation::new("calc.ext", 1)),
    );
    assert!(err.to_string().ends_with("error message []"));
}

#[test]
fn annotated_error_propagates_with_question_mark() {
    fn outer() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        divide(1, 0).annotate()?;
        Ok(())
    }
    let err = outer().unwrap_err();
    let annotated = err.downcast_ref::<AnnotatedError>().expect("annotated");
    assert_eq!(annotated.record().original_message(), "division by zero");
}

struct Broken;

impl Ingest for Broken {
    fn initiate_data_ingestion(&self) -> anyhow::Result<IngestionArtifacts> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "artifacts locked").into())
    }
}

#[test]
fn pipeline_annotates_ingestion_failure() {
    let err = pipeline::run(&Broken).unwrap_err();
    assert_eq!(err.record().source_file(), "src/pipeline.rs");
    assert_eq!(err.record().original_message(), "artifacts locked");
    let io_err = err.original().downcast_ref::<io::Error>().expect("io error");
    assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
}

#[test]
fn pipeline_runs_real_ingestion() {
    let tmp = tempdir().expect("tempdir");
    let source_path = tmp.path().join("raw.csv");
    std::fs::write(&source_path, "x,y\n1,2\n3,4\n5,6\n7,8\n9,10\n").unwrap();
    let ingestion = DataIngestion::new(DataIngestionConfig {
        source_path,
        artifacts_dir: tmp.path().join("artifacts"),
        test_ratio: 0.4,
    });

    let artifacts = pipeline::run(&ingestion).expect("pipeline");
    assert_eq!(artifacts.test_rows, 2);
    assert_eq!(artifacts.train_rows, 3);
    assert_eq!(
        std::fs::read_to_string(&artifacts.test_data_path).unwrap(),
        "x,y\n5,6\n9,10\n"
    );
}

#[test]
fn pipeline_reports_ragged_row_location_in_ingestion() {
    let tmp = tempdir().expect("tempdir");
    let source_path = tmp.path().join("raw.csv");
    std::fs::write(&source_path, "x,y\n1,2\n3\n").unwrap();
    let ingestion = DataIngestion::new(DataIngestionConfig {
        source_path,
        artifacts_dir: tmp.path().join("artifacts"),
        test_ratio: 0.5,
    });

    let err = pipeline::run(&ingestion).unwrap_err();
    assert_eq!(
        err.record().source_file(),
        "src/components/data_ingestion.rs"
    );
    assert!(err.record().original_message().starts_with("malformed dataset"));
}
