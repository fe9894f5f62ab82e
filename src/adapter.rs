//! The per-file hook every bundler integration drives: filter, fast-path,
//! transform, and decide what to do with parse failures.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::{
    error::{Result, TransformError},
    options::TransformOptions,
    report::TransformResult,
    source::Dialect,
    transform_unit,
};

pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];
pub const DEFAULT_EXCLUDE: &[&str] = &["node_modules"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    exclude: Vec<Regex>,
}

impl FileFilter {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        let exclude = config
            .exclude
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude,
        })
    }

    pub fn check(&self, path: &Path) -> Option<SkipFile> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.extensions.iter().any(|e| *e == ext) {
            return Some(SkipFile::Extension);
        }
        if self.is_excluded(path) {
            return Some(SkipFile::Excluded);
        }
        None
    }

    /// Whether `path` (file or directory) matches an exclude pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.exclude.iter().any(|re| re.is_match(&normalized))
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE
                .iter()
                .map(|p| Regex::new(&regex::escape(p)).expect("escaped literal is a valid pattern"))
                .collect(),
        }
    }
}

/// What the host tool should do when a file fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    Fail,
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipFile {
    Extension,
    Excluded,
    /// The file never mentions a loader module.
    NoLoaderToken,
    ParseFailed,
}

#[derive(Debug, Clone)]
pub enum HookOutcome {
    Skipped(SkipFile),
    /// Analyzed but nothing was rewritten; the host keeps the original.
    Unchanged(TransformResult),
    /// The host replaces the file's content with `code`.
    Transformed(TransformResult),
}

impl HookOutcome {
    pub fn result(&self) -> Option<&TransformResult> {
        match self {
            HookOutcome::Skipped(_) => None,
            HookOutcome::Unchanged(r) | HookOutcome::Transformed(r) => Some(r),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            HookOutcome::Transformed(r) => Some(&r.code),
            _ => None,
        }
    }
}

/// A stateless per-file hook. Safe to share across worker threads.
#[derive(Debug, Clone, Default)]
pub struct FileHook {
    pub options: TransformOptions,
    pub filter: FileFilter,
    pub on_error: ErrorPolicy,
}

impl FileHook {
    pub fn new(options: TransformOptions, filter: FileFilter, on_error: ErrorPolicy) -> Self {
        Self {
            options,
            filter,
            on_error,
        }
    }

    pub fn process(&self, path: &Path, source: &str) -> Result<HookOutcome> {
        if let Some(reason) = self.filter.check(path) {
            return Ok(HookOutcome::Skipped(reason));
        }
        if !self.options.mentions_loader_module(source) {
            return Ok(HookOutcome::Skipped(SkipFile::NoLoaderToken));
        }

        let dialect = Dialect::from_path(path);
        let file = path.to_string_lossy();

        match transform_unit(&file, source, dialect, &self.options) {
            Ok(result) if result.is_changed() => Ok(HookOutcome::Transformed(result)),
            Ok(result) => Ok(HookOutcome::Unchanged(result)),
            Err(err @ TransformError::Parse { .. }) if self.on_error == ErrorPolicy::PassThrough => {
                tracing::warn!(file = %file, error = %err, "leaving file untouched");
                Ok(HookOutcome::Skipped(SkipFile::ParseFailed))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "import lazy from 'lazy-import';\nexport const Page = lazy('./Page');\n";

    #[test]
    fn filters_by_extension_and_exclude_pattern() {
        let filter = FileFilter::default();
        assert_eq!(filter.check(Path::new("src/a.css")), Some(SkipFile::Extension));
        assert_eq!(filter.check(Path::new("README")), Some(SkipFile::Extension));
        assert_eq!(
            filter.check(Path::new("node_modules/pkg/index.js")),
            Some(SkipFile::Excluded)
        );
        assert_eq!(filter.check(Path::new("src/App.TSX")), None);
    }

    #[test]
    fn custom_filter_config() {
        let filter = FileFilter::new(&FilterConfig {
            extensions: vec![".vue".into()],
            exclude: vec![r"^dist/".into()],
        })
        .unwrap();
        assert_eq!(filter.check(Path::new("a.vue")), None);
        assert_eq!(filter.check(Path::new("a.js")), Some(SkipFile::Extension));
        assert_eq!(filter.check(Path::new("dist/a.vue")), Some(SkipFile::Excluded));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = FileFilter::new(&FilterConfig {
            extensions: vec![],
            exclude: vec!["(".into()],
        })
        .unwrap_err();
        assert!(matches!(err, TransformError::InvalidPattern(_)));
    }

    #[test]
    fn fast_path_skips_files_without_loader_token() {
        let hook = FileHook::default();
        let out = hook.process(Path::new("a.js"), "export const x = 1;").unwrap();
        assert!(matches!(out, HookOutcome::Skipped(SkipFile::NoLoaderToken)));
    }

    #[test]
    fn transformed_file_exposes_code() {
        let hook = FileHook::default();
        let out = hook.process(Path::new("src/routes.js"), SRC).unwrap();
        let code = out.code().expect("rewritten");
        assert!(code.contains("export const Page = () => import("));
    }

    #[test]
    fn file_with_only_skips_is_unchanged() {
        let hook = FileHook::default();
        let src = "import lazy from 'lazy-import';\nconst P = lazy(name);\n";
        let out = hook.process(Path::new("a.js"), src).unwrap();
        match out {
            HookOutcome::Unchanged(r) => {
                assert_eq!(r.skipped_count, 1);
                assert_eq!(r.code, src);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn dialect_follows_extension() {
        let hook = FileHook::default();
        let src = "import lazy from 'lazy-import';\nconst P = lazy<Props>('./P') as any;\n";
        assert!(hook.process(Path::new("a.ts"), src).is_ok());
        assert!(hook.process(Path::new("a.js"), src).is_err());
    }

    #[test]
    fn parse_errors_follow_policy() {
        let src = "import lazy from 'lazy-import';\nconst = ;";
        let failing = FileHook::default();
        let err = failing.process(Path::new("bad.js"), src).unwrap_err();
        assert_eq!(err.file().as_deref(), Some("bad.js"));

        let lenient = FileHook {
            on_error: ErrorPolicy::PassThrough,
            ..Default::default()
        };
        let out = lenient.process(Path::new("bad.js"), src).unwrap();
        assert!(matches!(out, HookOutcome::Skipped(SkipFile::ParseFailed)));
    }
}
