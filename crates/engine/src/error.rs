use std::fmt;

#[derive(Debug)]
pub enum MatchError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty source path, bad tolerance, etc.).
    ConfigValidation(String),
    /// Missing required column in an export file.
    MissingColumn { file: String, column: String },
    /// Timestamp missing its required `Z` suffix, or otherwise malformed.
    TimestampParse { record_id: String, value: String },
    /// Malformed numeric amount field.
    AmountParse { record_id: String, value: String },
    /// Status outside {succeeded, failed}.
    UnknownStatus { record_id: String, value: String },
    /// Kind outside the processor's transaction vocabulary.
    UnknownKind { record_id: String, value: String },
    /// Record state the matcher cannot proceed with.
    Integrity(String),
    /// The scan was cancelled from outside (operator interrupt).
    Interrupted,
    /// Exchange store error (open, query).
    Store(String),
    /// IO error (file read/write, CSV).
    Io(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { file, column } => {
                write!(f, "{file}: missing column '{column}'")
            }
            Self::TimestampParse { record_id, value } => {
                write!(f, "record '{record_id}': cannot parse timestamp '{value}'")
            }
            Self::AmountParse { record_id, value } => {
                write!(f, "record '{record_id}': cannot parse amount '{value}'")
            }
            Self::UnknownStatus { record_id, value } => {
                write!(f, "record '{record_id}': unknown status '{value}'")
            }
            Self::UnknownKind { record_id, value } => {
                write!(f, "record '{record_id}': unknown kind '{value}'")
            }
            Self::Integrity(msg) => write!(f, "integrity error: {msg}"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<rusqlite::Error> for MatchError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<std::io::Error> for MatchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for MatchError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}
