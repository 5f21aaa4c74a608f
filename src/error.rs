//src/error.rs

use thiserror::Error;

/// Everything that can go wrong while reading records or computing statistics.
///
/// Normal end of input is *not* an error: record sources signal it with
/// `has_next() == false` (or `None` from the iterator).
#[derive(Debug, Error)]
pub enum SeqQcError {
    /// The byte stream ended or broke in the middle of a record.
    #[error("malformed input at line {line}: {message}")]
    MalformedInput { line: u64, message: String },

    /// The input path does not carry a FASTA or FASTQ extension.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// `next_record` was called after the source was exhausted.
    #[error("no more records in source")]
    NoMoreRecords,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The structured export could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SeqQcError {
    pub fn malformed(line: u64, message: impl Into<String>) -> Self {
        SeqQcError::MalformedInput {
            line,
            message: message.into(),
        }
    }
}
