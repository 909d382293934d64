//! Errors raised by the tab cache store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// SQLite failure, including constraint violations such as a tab row
    /// whose song has not been stored.
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column (tuning, contributors) or a recents list could not be
    /// encoded or decoded.
    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_converts() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("cache database error"));
    }

    #[test]
    fn test_encoding_error_converts() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
