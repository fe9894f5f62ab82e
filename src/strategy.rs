//! Rewrite Strategist: picks the output shape for each transformable call
//! and renders its replacement text.

use std::fmt;

use serde::Serialize;

use crate::{
    chunk_name::{chunk_name, sanitize},
    classify::{CallSite, ModulePath},
    options::TransformOptions,
    source::{Edit, SourceUnit},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// `load('./x')()` -> `import('./x')`
    DirectCollapse,
    /// `load('./x')` -> `() => import('./x')`
    PlainWrap,
    /// `load('./x', opts)` -> `helper(() => import('./x'), opts)`
    HelperWrap,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::DirectCollapse => "direct-collapse",
            Strategy::PlainWrap => "plain-wrap",
            Strategy::HelperWrap => "helper-wrap",
        })
    }
}

/// Pure decision for one call site. `None` for skipped calls.
///
/// Helper-wrap wins over direct-collapse when an immediately invoked call
/// also carries options, otherwise caching and retries would be lost.
pub fn choose(site: &CallSite, options: &TransformOptions) -> Option<Strategy> {
    if !site.is_transformable() {
        return None;
    }
    let has_options = site.options.is_some();
    if has_options && options.preserve_options {
        Some(Strategy::HelperWrap)
    } else if site.invoked_by.is_some() && !has_options {
        Some(Strategy::DirectCollapse)
    } else {
        Some(Strategy::PlainWrap)
    }
}

#[derive(Debug, Clone)]
pub struct Rewrite {
    pub strategy: Strategy,
    pub chunk_name: Option<String>,
    pub edit: Edit,
}

/// Chunk label for a call: a static `chunkName` option wins, otherwise the
/// name is derived from the module path. Dynamic paths have none.
pub fn chunk_name_for(site: &CallSite, options: &TransformOptions) -> Option<String> {
    let Some(ModulePath::Static { value, .. }) = &site.path else {
        return None;
    };
    match site.options.as_ref().and_then(|o| o.chunk_name.as_deref()) {
        Some(name) => Some(sanitize(name)),
        None => Some(chunk_name(value, &options.chunk_name_template)),
    }
}

pub fn render(
    site: &CallSite,
    strategy: Strategy,
    unit: &SourceUnit<'_>,
    options: &TransformOptions,
) -> Rewrite {
    let chunk = chunk_name_for(site, options);
    let import = import_expr(site, unit, options.chunk_comment.then_some(chunk.as_deref()).flatten());

    let edit = match strategy {
        Strategy::DirectCollapse => {
            let outer = site.invoked_by.clone().unwrap_or_else(|| site.range.clone());
            Edit::replace(outer, import)
        }
        Strategy::PlainWrap => {
            let arrow = if site.operand {
                format!("(() => {import})")
            } else {
                format!("() => {import}")
            };
            // A leading `(` would otherwise continue an unterminated
            // previous statement as a call.
            let guard = if site.starts_statement && continues_previous(&unit.text[..site.range.start]) {
                ";"
            } else {
                ""
            };
            Edit::replace(site.range.clone(), format!("{guard}{arrow}"))
        }
        Strategy::HelperWrap => {
            let opts_text = site
                .options
                .as_ref()
                .map(|o| &unit.text[o.raw.clone()])
                .unwrap_or("undefined");
            Edit::replace(
                site.range.clone(),
                format!("{}(() => {import}, {opts_text})", options.helper_name),
            )
        }
    };

    Rewrite {
        strategy,
        chunk_name: chunk,
        edit,
    }
}

fn continues_previous(before: &str) -> bool {
    !matches!(before.trim_end().chars().last(), None | Some(';' | '{' | ':'))
}

fn import_expr(site: &CallSite, unit: &SourceUnit<'_>, chunk: Option<&str>) -> String {
    let path_text = site
        .path
        .as_ref()
        .map(|p| &unit.text[p.raw().clone()])
        .unwrap_or("undefined");
    match chunk {
        Some(name) => format!("import(/* webpackChunkName: \"{name}\" */ {path_text})"),
        None => format!("import({path_text})"),
    }
}
