use tracing::info;

use crate::components::data_ingestion::{Ingest, IngestionArtifacts};
use crate::exception::{AnnotatedError, ExecutionContext};

/// Run the protected part of the pipeline.
///
/// Any ingestion failure is logged once and returned annotated with the
/// location it was raised at (or this call site, if it carries none).
pub fn run<I: Ingest + ?Sized>(ingestion: &I) -> Result<IngestionArtifacts, AnnotatedError> {
    info!("The execution has started");

    match ingestion.initiate_data_ingestion() {
        Ok(artifacts) => Ok(artifacts),
        Err(err) => {
            info!("Custom Exception");
            Err(AnnotatedError::wrap(err, ExecutionContext::capture()))
        }
    }
}
