use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of data reading {field} at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        field: &'static str,
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("Invalid value {value} for {field} at offset {offset}")]
    InvalidValue {
        field: &'static str,
        offset: usize,
        value: u64,
    },
    #[error("Uninitialized {layout} account")]
    Uninitialized { layout: &'static str },
}

impl DecodeError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            DecodeError::UnexpectedEof { offset, .. }
            | DecodeError::InvalidValue { offset, .. } => Some(*offset),
            DecodeError::Uninitialized { .. } => None,
        }
    }
}
