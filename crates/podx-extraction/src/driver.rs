use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use podx_core::document::ExtractionResult;
use podx_core::error::{PodxError, Result};
use podx_core::extraction::DocumentExtractor;

/// Extracts every document with at most `concurrency` extractions in flight.
///
/// Results are returned in completion order. The first failure stops the run:
/// remaining tasks are aborted and the error is returned.
pub async fn run_all(
    extractor: Arc<dyn DocumentExtractor>,
    paths: &[PathBuf],
    concurrency: usize,
) -> Result<Vec<ExtractionResult>> {
    let run_id = Uuid::new_v4();
    let concurrency = concurrency.max(1);

    tracing::info!(%run_id, count = paths.len(), concurrency, "Starting extraction run");

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut join_set = JoinSet::new();

    for path in paths {
        let extractor = extractor.clone();
        let semaphore = semaphore.clone();
        let path = path.clone();

        join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return Err(PodxError::Task(format!("worker pool closed: {e}"))),
            };
            extractor.extract(&path).await
        });
    }

    let mut results = Vec::with_capacity(paths.len());

    while let Some(joined) = join_set.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(join_err) => Err(PodxError::Task(format!("extraction task failed: {join_err}"))),
        };

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    %run_id,
                    document = %result.document.display(),
                    completed = results.len() + 1,
                    "Document finished"
                );
                results.push(result);
            }
            Err(e) => {
                tracing::error!(
                    %run_id,
                    error = %e,
                    completed = results.len(),
                    "Extraction run aborted"
                );
                join_set.abort_all();
                return Err(e);
            }
        }
    }

    tracing::info!(%run_id, count = results.len(), "Extraction run complete");

    Ok(results)
}
