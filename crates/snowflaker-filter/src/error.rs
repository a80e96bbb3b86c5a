/// Errors that stop the filter.
///
/// Malformed records are not errors: they are forwarded unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("failed to read or write records: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to generate an ID: {0}")]
    Generator(#[from] snowflaker::Error),

    #[error("failed to serialize a stamped record: {0}")]
    Serialize(#[from] serde_json::Error),
}
