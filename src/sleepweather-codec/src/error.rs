use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid epoch timestamp: {0}")]
    InvalidEpoch(i64),
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error(transparent)]
    InvalidStage(#[from] sleepweather_types::InvalidStageCode),
    #[error("missing {0} block")]
    MissingBlock(&'static str),
    #[error("{block} time axis is not uniform at index {index}")]
    IrregularAxis { block: &'static str, index: usize },
    #[error("{block}.{variable} has {actual} values, time axis has {expected}")]
    LengthMismatch {
        block: &'static str,
        variable: String,
        expected: usize,
        actual: usize,
    },
}
