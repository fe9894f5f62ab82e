//! Chunk Namer: derives bundler-safe chunk labels from module paths.

use std::sync::LazyLock;

use regex::Regex;

use crate::options::NAME_PLACEHOLDER;

pub const SEPARATOR: char = '-';
const FALLBACK_NAME: &str = "chunk";

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid chunk-name pattern"));

/// `('./components/Foo.tsx', '[name]-lazy')` -> `components-Foo-lazy`.
///
/// Leading `./` and `../` segments are dropped, the final extension is
/// stripped, path separators become [`SEPARATOR`] and anything outside
/// `[A-Za-z0-9_-]` is removed before substitution into `template`.
pub fn chunk_name(module_path: &str, template: &str) -> String {
    let normalized = module_path.replace('\\', "/");
    let mut rest = normalized.as_str();
    loop {
        if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix("../") {
            rest = r;
        } else {
            break;
        }
    }

    let without_ext = match rest.rfind('.') {
        Some(dot) if dot > rest.rfind('/').map_or(0, |s| s + 1) => &rest[..dot],
        _ => rest,
    };

    let joined = without_ext
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string());

    apply_template(&sanitize(&joined), template)
}

/// Strips characters that are unsafe in a chunk label.
pub fn sanitize(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name, "").into_owned();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

fn apply_template(name: &str, template: &str) -> String {
    if template.contains(NAME_PLACEHOLDER) {
        template.replace(NAME_PLACEHOLDER, name)
    } else {
        name.to_string()
    }
}
