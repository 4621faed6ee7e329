//! Concurrent document loading shared by the batch commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use fisc_core::{BatchOutcome, FailureReason, SourceDocument};

/// Expand a glob pattern into the matching files with one of the extensions,
/// in path order.
pub fn expand_inputs(pattern: &str, extensions: &[&str]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            extensions.contains(&ext.to_lowercase().as_str())
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", pattern);
    }

    files.sort();
    Ok(files)
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and extract every file on the blocking pool, at most `jobs` at a time.
///
/// The outcome keeps the submission order of `paths` regardless of which
/// extraction finishes first.
pub async fn extract_parallel<T, F>(
    paths: Vec<PathBuf>,
    jobs: usize,
    extract: F,
) -> anyhow::Result<BatchOutcome<T>>
where
    T: Send + 'static,
    F: Fn(SourceDocument) -> Result<T, FailureReason> + Send + Sync + 'static,
{
    let extract = Arc::new(extract);
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));

    let progress = ProgressBar::new(paths.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut tasks = JoinSet::new();
    for (index, path) in paths.into_iter().enumerate() {
        let extract = Arc::clone(&extract);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let name = display_name(&path);
            let document_name = name.clone();

            let result = tokio::task::spawn_blocking(move || {
                let bytes = fs::read(&path).map_err(|e| FailureReason::Unreadable(e.to_string()))?;
                let content = String::from_utf8_lossy(&bytes).into_owned();
                extract(SourceDocument::new(document_name, content))
            })
            .await?;

            anyhow::Ok((index, name, result))
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, name, result) = joined??;
        debug!("Finished {} ({})", name, if result.is_ok() { "ok" } else { "failed" });
        results.push((index, name, result));
        progress.inc(1);
    }
    progress.finish_and_clear();

    results.sort_by_key(|(index, _, _)| *index);

    Ok(BatchOutcome::from_results(
        results.into_iter().map(|(_, name, result)| (name, result)),
    ))
}
