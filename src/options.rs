use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_MODULE_NAME: &str = "lazy-import";
pub const DEFAULT_IMPORT_NAME: &str = "lazy";
pub const DEFAULT_HELPER_NAME: &str = "__lazyImport";
pub const NAME_PLACEHOLDER: &str = "[name]";

/// Per-invocation configuration, deserialized from the camelCase JSON the
/// bundler integrations pass through. Missing keys take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub chunk_comment: bool,
    /// Use the helper-wrap strategy when a call passes an options argument.
    pub preserve_options: bool,
    pub string_literals_only: bool,
    pub chunk_name_template: String,
    pub debug: bool,
    pub module_names: Vec<String>,
    pub import_default: bool,
    pub import_names: Vec<String>,
    pub helper_name: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            chunk_comment: true,
            preserve_options: true,
            string_literals_only: true,
            chunk_name_template: NAME_PLACEHOLDER.to_string(),
            debug: false,
            module_names: vec![DEFAULT_MODULE_NAME.to_string()],
            import_default: true,
            import_names: vec![DEFAULT_IMPORT_NAME.to_string()],
            helper_name: DEFAULT_HELPER_NAME.to_string(),
        }
    }
}

impl TransformOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_loader_module(&self, source: &str) -> bool {
        self.module_names.iter().any(|m| m == source)
    }

    pub fn is_loader_export(&self, name: &str) -> bool {
        if name == "default" {
            return self.import_default;
        }
        self.import_names.iter().any(|n| n == name)
    }

    /// Cheap textual pre-check used by file hooks before parsing.
    pub fn mentions_loader_module(&self, source: &str) -> bool {
        self.module_names.iter().any(|m| source.contains(m.as_str()))
    }
}
