//! Read-only usage analysis over a directory tree.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::{
    adapter::{FileHook, HookOutcome},
    error::TransformError,
    report::{SkipRecord, TransformRecord, TransformResult},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: String,
    pub transform_count: usize,
    pub skipped_count: usize,
    pub transforms: Vec<TransformRecord>,
    pub skipped: Vec<SkipRecord>,
    pub helper_injected: bool,
    pub warnings: Vec<String>,
}

impl FileReport {
    fn new(path: String, result: TransformResult) -> Self {
        Self {
            path,
            transform_count: result.transform_count,
            skipped_count: result.skipped_count,
            transforms: result.transforms,
            skipped: result.skipped,
            helper_injected: result.helper_injected,
            warnings: result.warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub root: String,
    pub files_scanned: usize,
    pub files_with_loader_calls: usize,
    pub total_transforms: usize,
    pub total_skipped: usize,
    pub helpers_injected: usize,
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
}

/// Collects candidate source files under `root`, pruning excluded
/// directories. Sorted by path.
pub fn collect_files(root: &Path, hook: &FileHook) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !hook.filter.is_excluded(relative(root, e.path())))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && hook.filter.check(relative(root, e.path())).is_none())
        .map(|e| e.into_path())
        .collect()
}

/// Runs the engine over every candidate file under `root` in parallel and
/// aggregates the results. Never writes to disk; unreadable or unparsable
/// files are listed in [`AnalysisReport::failures`].
pub fn analyze_dir(root: &Path, hook: &FileHook) -> AnalysisReport {
    let files = collect_files(root, hook);
    tracing::debug!(root = %root.display(), count = files.len(), "analyzing files");

    let outcomes: Vec<(String, Result<HookOutcome, TransformError>)> = files
        .par_iter()
        .map(|path| {
            let rel = relative(root, path);
            let display = rel.to_string_lossy().replace('\\', "/");
            let outcome = std::fs::read_to_string(path)
                .map_err(|source| TransformError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|source| hook.process(rel, &source));
            (display, outcome)
        })
        .collect();

    let mut report = AnalysisReport {
        root: root.display().to_string(),
        files_scanned: files.len(),
        ..Default::default()
    };
    for (path, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                let Some(result) = outcome.result() else {
                    continue;
                };
                if result.transform_count + result.skipped_count == 0 {
                    continue;
                }
                report.files_with_loader_calls += 1;
                report.total_transforms += result.transform_count;
                report.total_skipped += result.skipped_count;
                if result.helper_injected {
                    report.helpers_injected += 1;
                }
                report.files.push(FileReport::new(path, result.clone()));
            }
            Err(err) => {
                tracing::warn!(file = %path, error = %err, "analysis failed");
                report.failures.push(FileFailure {
                    path,
                    message: err.to_string(),
                });
            }
        }
    }
    report
}

fn relative<'p>(root: &Path, path: &'p Path) -> &'p Path {
    path.strip_prefix(root).unwrap_or(path)
}
