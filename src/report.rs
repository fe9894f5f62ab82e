//! Report Emitter: per-unit bookkeeping of rewrite outcomes.

use serde::Serialize;

use crate::{
    classify::CallSite,
    strategy::{Rewrite, Strategy},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRecord {
    pub module_path: Option<String>,
    pub chunk_name: Option<String>,
    pub strategy: Strategy,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipRecord {
    pub reason: String,
    pub line: usize,
    pub column: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub code: String,
    pub transform_count: usize,
    pub skipped_count: usize,
    pub transforms: Vec<TransformRecord>,
    pub skipped: Vec<SkipRecord>,
    pub helper_injected: bool,
    pub warnings: Vec<String>,
}

impl TransformResult {
    pub fn skip_reasons(&self) -> impl Iterator<Item = &str> {
        self.skipped.iter().map(|s| s.reason.as_str())
    }

    pub fn is_changed(&self) -> bool {
        self.transform_count > 0
    }
}

#[derive(Debug, Default)]
pub struct ReportBuilder {
    transforms: Vec<TransformRecord>,
    skipped: Vec<SkipRecord>,
    warnings: Vec<String>,
}

impl ReportBuilder {
    pub fn transformed(&mut self, site: &CallSite, rewrite: &Rewrite) {
        self.transforms.push(TransformRecord {
            module_path: site.path.as_ref().and_then(|p| p.value()).map(str::to_string),
            chunk_name: rewrite.chunk_name.clone(),
            strategy: rewrite.strategy,
            line: site.line,
            column: site.column,
        });
    }

    pub fn skipped(&mut self, site: &CallSite, source: &str) {
        let reason = site
            .skip_reason()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        self.skipped.push(SkipRecord {
            reason,
            line: site.line,
            column: site.column,
            snippet: source[site.range.clone()].to_string(),
        });
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn finish(self, code: String, helper_injected: bool) -> TransformResult {
        TransformResult {
            code,
            transform_count: self.transforms.len(),
            skipped_count: self.skipped.len(),
            transforms: self.transforms,
            skipped: self.skipped,
            helper_injected,
            warnings: self.warnings,
        }
    }
}
