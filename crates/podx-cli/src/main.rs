use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use podx_core::{ClientConfig, Result};
use podx_extraction::{run_all, ReductoClient};

const DEFAULT_DOCUMENTS: &[&str] = &["./pg1.pdf", "./pg2.pdf", "./pg3.pdf"];

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("podx=info".parse().unwrap()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Extraction failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = ClientConfig::from_env()?;
    let concurrency = config.concurrency;

    let documents = document_paths(std::env::args().skip(1));
    let client = Arc::new(ReductoClient::new(config)?);

    let results = run_all(client, &documents, concurrency).await?;

    let outputs: Vec<&serde_json::Value> = results.iter().map(|r| &r.output).collect();
    println!("{}", serde_json::to_string_pretty(&outputs)?);

    Ok(())
}

fn document_paths(args: impl Iterator<Item = String>) -> Vec<PathBuf> {
    let paths: Vec<PathBuf> = args.map(PathBuf::from).collect();
    if paths.is_empty() {
        DEFAULT_DOCUMENTS.iter().map(PathBuf::from).collect()
    } else {
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_documents_when_no_args() {
        let paths = document_paths(std::iter::empty());
        assert_eq!(
            paths,
            vec![
                PathBuf::from("./pg1.pdf"),
                PathBuf::from("./pg2.pdf"),
                PathBuf::from("./pg3.pdf")
            ]
        );
    }

    #[test]
    fn test_args_replace_defaults() {
        let paths = document_paths(vec!["a.pdf".to_string(), "b/c.pdf".to_string()].into_iter());
        assert_eq!(paths, vec![PathBuf::from("a.pdf"), PathBuf::from("b/c.pdf")]);
    }
}
