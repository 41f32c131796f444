use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    MalformedContainer,
    InvalidPadding,
    MalformedJson,
    InvalidFieldValue,
    UnknownTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True for every failure that means "this save file could not be read":
    /// a short or misaligned container, bad padding (usually a wrong passphrase),
    /// or a payload that is not a save document.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self.code,
            CoreErrorCode::MalformedContainer
                | CoreErrorCode::InvalidPadding
                | CoreErrorCode::MalformedJson
        )
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
