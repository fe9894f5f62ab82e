//! Build-time rewrite of lazy-import loader calls.
//!
//! `lazy('./Page')` becomes `() => import('./Page')`, `lazy('./Page')()`
//! becomes `import('./Page')`, and calls that pass runtime options are
//! routed through a small injected helper that keeps caching and retry
//! behavior. Calls the engine cannot prove safe are left byte-for-byte
//! untouched and reported as skips.

pub mod adapter;
pub mod analyzer;
pub mod bindings;
pub mod chunk_name;
pub mod classify;
pub mod error;
pub mod helper;
pub mod options;
pub mod report;
pub mod runtime;
pub mod source;
pub mod strategy;

pub use adapter::{ErrorPolicy, FileFilter, FileHook, HookOutcome, SkipFile};
pub use chunk_name::chunk_name;
pub use error::{Result, TransformError};
pub use options::TransformOptions;
pub use report::{SkipRecord, TransformRecord, TransformResult};
pub use source::Dialect;
pub use strategy::Strategy;

use bindings::LoaderBindings;
use classify::{classify_calls, CallSite};
use helper::{HelperInjector, Injection};
use report::ReportBuilder;
use source::{apply_edits, SourceUnit};

const ANONYMOUS_FILE: &str = "<input>";

// -----------------------------------------------------------------------------
// Entrypoints
// -----------------------------------------------------------------------------

/// Transforms a source text that has no file identity, parsed as TSX.
pub fn transform(source: &str, options: &TransformOptions) -> Result<TransformResult> {
    transform_unit(ANONYMOUS_FILE, source, Dialect::Tsx, options)
}

/// Transforms one source unit.
///
/// Only fails when the unit cannot be parsed; every call the engine will
/// not rewrite is reported in [`TransformResult::skipped`] instead.
pub fn transform_unit(
    file: &str,
    source: &str,
    dialect: Dialect,
    options: &TransformOptions,
) -> Result<TransformResult> {
    let unit = SourceUnit::parse(file, source, dialect)?;

    let bindings = LoaderBindings::resolve(&unit.module, options);
    if bindings.is_empty() {
        return Ok(ReportBuilder::default().finish(source.to_string(), false));
    }

    let sites = classify_calls(&unit, &bindings, options);
    let mut injector = HelperInjector::new(&options.helper_name);
    let mut report = ReportBuilder::default();
    let mut edits = Vec::with_capacity(sites.len() + 1);

    for site in &sites {
        match strategy::choose(site, options) {
            Some(chosen) => {
                let rewrite = strategy::render(site, chosen, &unit, options);
                if chosen == Strategy::HelperWrap {
                    injector.mark_used();
                }
                log_transform(file, site, &rewrite, options.debug);
                report.transformed(site, &rewrite);
                edits.push(rewrite.edit);
            }
            None => {
                log_skip(file, site, options.debug);
                report.skipped(site, source);
            }
        }
    }

    let helper_injected = match injector.finish(&unit) {
        Injection::Injected(edit) => {
            edits.push(edit);
            true
        }
        Injection::Collision => {
            tracing::warn!(
                file,
                helper = %options.helper_name,
                "helper identifier already declared; relying on existing definition"
            );
            report.warn(format!(
                "`{}` is already declared in {file}; the existing definition is used for option-preserving calls",
                options.helper_name
            ));
            false
        }
        Injection::NotNeeded => false,
    };

    let code = if edits.is_empty() {
        source.to_string()
    } else {
        apply_edits(source, edits)
    };
    Ok(report.finish(code, helper_injected))
}

// -----------------------------------------------------------------------------
// Diagnostics
// -----------------------------------------------------------------------------

fn log_transform(file: &str, site: &CallSite, rewrite: &strategy::Rewrite, debug: bool) {
    let path = site.path.as_ref().and_then(|p| p.value()).unwrap_or("<dynamic>");
    let chunk = rewrite.chunk_name.as_deref().unwrap_or("-");
    if debug {
        tracing::info!(file, line = site.line, column = site.column, strategy = %rewrite.strategy, chunk, "rewrote {path}");
    } else {
        tracing::debug!(file, line = site.line, column = site.column, strategy = %rewrite.strategy, chunk, "rewrote {path}");
    }
}

fn log_skip(file: &str, site: &CallSite, debug: bool) {
    let reason = site.skip_reason().map(|r| r.to_string()).unwrap_or_default();
    if debug {
        tracing::info!(file, line = site.line, column = site.column, callee = %site.callee, "skipped: {reason}");
    } else {
        tracing::debug!(file, line = site.line, column = site.column, callee = %site.callee, "skipped: {reason}");
    }
}
