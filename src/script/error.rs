use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors from loading a scripted suite.
#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("failed to read scripted suite {path}")]
    #[diagnostic(code(harrow::script::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scripted suite: {reason}")]
    #[diagnostic(code(harrow::script::syntax), help("scripted suites are JSON documents with an `assemblies` array"))]
    Syntax {
        reason: String,
        #[source_code]
        source_code: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("invalid scripted suite: {0}")]
    #[diagnostic(code(harrow::script::invalid))]
    Invalid(String),
}

impl ScriptError {
    /// Attach a serde error to the document it came from.
    pub(crate) fn syntax(name: &str, source: &str, err: &serde_json::Error) -> Self {
        let offset = offset_of(source, err.line(), err.column());
        let len = usize::from(offset < source.len());
        ScriptError::Syntax {
            reason: err.to_string(),
            source_code: NamedSource::new(name, source.to_string()),
            span: (offset, len).into(),
        }
    }
}

/// Byte offset of a one-based line/column position, clamped to the source.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source.split_inclusive('\n').take(line - 1).map(str::len).sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}
