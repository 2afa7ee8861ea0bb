//! Errors raised while querying the relational source.

use movies_etl_shared::EntityStream;
use thiserror::Error;

/// Represents errors that can occur within the source repository.
#[derive(Debug, Error)]
pub enum SourceRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Stream {0} has no junction table to film works")]
    NoJunction(EntityStream),
}

impl SourceRepositoryError {
    /// Whether the failure is worth retrying with backoff.
    ///
    /// Connection-level failures and the SQLSTATEs a restarting or overloaded
    /// server answers with are transient; everything else (bad SQL, decode
    /// failures, constraint violations) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DatabaseError(error) => match error {
                sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db_error) => db_error
                    .code()
                    .map(|code| is_transient_sqlstate(&code))
                    .unwrap_or(false),
                _ => false,
            },
            Self::NoJunction(_) => false,
        }
    }
}

fn is_transient_sqlstate(code: &str) -> bool {
    // class 08: connection exception; 57014: cancelled by statement_timeout
    code.starts_with("08")
        || matches!(
            code,
            "57014" | "57P01" | "57P02" | "57P03" | "40001" | "40P01"
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_errors_are_transient() {
        let error = SourceRepositoryError::from(sqlx::Error::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )));
        assert!(error.is_transient());
        assert!(SourceRepositoryError::from(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn test_logic_errors_are_permanent() {
        assert!(!SourceRepositoryError::from(sqlx::Error::RowNotFound).is_transient());
        assert!(!SourceRepositoryError::NoJunction(EntityStream::FilmWork).is_transient());
    }

    #[test]
    fn test_transient_sqlstates() {
        assert!(is_transient_sqlstate("08006"));
        assert!(is_transient_sqlstate("57P01"));
        assert!(is_transient_sqlstate("40001"));
        assert!(is_transient_sqlstate("57014"));
        assert!(!is_transient_sqlstate("42P01"));
        assert!(!is_transient_sqlstate("23505"));
    }
}
