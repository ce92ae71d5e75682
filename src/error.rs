use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A rendering asset (font) is missing or unusable. Raised before any page is drawn.
    Configuration(String),
    /// The record lacks a field the composer cannot do without.
    InvalidRecord { field: &'static str },
    /// An embedded image could not be decoded. Never escapes `render`; the
    /// affected cell is left blank instead.
    AssetDecode(String),
    Json(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Error::InvalidRecord { field } => {
                write!(f, "invalid document record: missing required field `{field}`")
            }
            Error::AssetDecode(msg) => write!(f, "could not decode image: {msg}"),
            Error::Json(msg) => write!(f, "invalid JSON input: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
