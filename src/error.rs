/// Failures that end an upload-and-rank request.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The upload carried no bytes or no text.
    #[error("no attendance report was provided")]
    EmptyUpload,

    /// Text was read but no line produced a valid attendance record.
    #[error("no valid attendance data found in the report")]
    NoRecords,

    /// The PDF text layer could not be decoded.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// A matcher or identifier pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True when the request was rejected because of its input rather than
    /// a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyUpload | Self::NoRecords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_rejections_are_client_errors() {
        assert!(IngestError::EmptyUpload.is_client_error());
        assert!(IngestError::NoRecords.is_client_error());
        assert!(!IngestError::Extraction("bad xref".to_string()).is_client_error());
        assert!(!IngestError::Storage("listing failed".to_string()).is_client_error());
    }

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            IngestError::NoRecords.to_string(),
            "no valid attendance data found in the report"
        );
        assert_eq!(
            IngestError::Extraction("truncated stream".to_string()).to_string(),
            "PDF extraction error: truncated stream"
        );
    }
}
