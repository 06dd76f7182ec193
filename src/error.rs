use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of an assembly run. Unresolved identities and undefined ratios are not
/// errors; they are counted in the per-stage reports instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing input table {table}: {}", path.display())]
    MissingInput { table: &'static str, path: PathBuf },

    #[error("input table {table} has no usable rows")]
    EmptyTable { table: &'static str },

    #[error("schema mismatch in {table}: {detail}")]
    SchemaMismatch { table: &'static str, detail: String },

    #[error("CSV error in {table}: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn missing_column(table: &'static str, column: &str) -> Self {
        Self::SchemaMismatch {
            table,
            detail: format!("required column '{column}' not found"),
        }
    }
}
