use std::fmt;

/// Result type alias for phloem core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for phloem core operations
#[derive(Debug)]
pub enum Error {
    /// I/O errors from the transport layer
    Io(std::io::Error),

    /// Transport-level failures below the HTTP layer
    Transport(String),

    /// Configuration errors (fatal at initialization)
    Config(String),

    /// A table name that has no counter in the key space
    UnknownTable(String),

    /// The transaction-time key chooser could not produce an in-range key
    /// within the attempt budget
    KeySelectionExhausted { table: String, attempts: u32 },

    /// Other errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Transport(msg) => write!(f, "Transport error: {msg}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::UnknownTable(table) => write!(f, "Unknown table: {table}"),
            Error::KeySelectionExhausted { table, attempts } => write!(
                f,
                "Key selection for table {table} exhausted after {attempts} attempts"
            ),
            Error::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
