use thiserror::Error;

use super::Document;

/// The comment heading every generated workflow.
pub const BANNER: &str =
    "# Workflow automatically generated by gat\n# DO NOT CHANGE THIS FILE MANUALLY\n\n";

/// Errors of rendering a [`Document`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompileError {
    /// The document could not be serialized to YAML.
    #[error("failed to serialize the workflow: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

/// Renders a document to YAML text, prefixed with [`BANNER`].
///
/// The same document always renders to the same bytes: keys keep the order of the document, long lines are never
/// folded, multi-line strings become literal blocks, and no anchors are emitted.
///
/// # Errors
///
/// Returns [`CompileError::Serialization`] if the document cannot be serialized.
pub fn render(document: &Document<'_>) -> Result<String, CompileError> {
    let yaml = serde_yaml::to_string(document)?;

    let mut text = String::with_capacity(BANNER.len() + yaml.len());
    text.push_str(BANNER);
    text.push_str(&yaml);
    Ok(text)
}
