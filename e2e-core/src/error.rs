use thiserror::Error;

/// Failure to decode one structural unit (a directory record, a chunk header, or
/// one chunk payload). Passes treat this as "skip the unit and keep going".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{what}: need {need} bytes, have {have}")]
    Truncated { what: &'static str, need: usize, have: usize },
    #[error("{what}: undecodable text")]
    Text { what: &'static str },
    #[error("cannot shape {available} samples into a {height}x{width} image")]
    Shape { height: u32, width: u32, available: usize },
    #[error("layout: {0}")]
    Layout(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
