//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};

pub const DUPLICATE_KEY: i32 = 11000;
pub const WRITE_CONFLICT: i32 = 112;

/// Return true if the given error is a duplicate key error, from either a
/// single write or a bulk insert.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(ref failure) => failure
            .write_errors
            .as_ref()
            .map_or(false, |errors| errors.iter().any(|e| e.code == DUPLICATE_KEY)),
        ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Return true if the given error means a concurrent transaction touched the
/// same documents first.
pub fn is_write_conflict(err: &DbError) -> bool {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        return true;
    }
    matches!(*err.kind, ErrorKind::Command(ref e) if e.code == WRITE_CONFLICT)
}


#[cfg(test)]
mod tests {
    use super::examples::*;
    use super::*;

    #[test]
    fn duplicate_keys_recognised() {
        assert!(is_duplicate_key_error(&write_error(DUPLICATE_KEY)));
        assert!(is_duplicate_key_error(&command_error(DUPLICATE_KEY)));
        assert!(!is_duplicate_key_error(&write_error(WRITE_CONFLICT)));
        assert!(!is_duplicate_key_error(&command_error(WRITE_CONFLICT)));
    }

    #[test]
    fn write_conflicts_recognised() {
        assert!(is_write_conflict(&command_error(WRITE_CONFLICT)));
        assert!(!is_write_conflict(&command_error(DUPLICATE_KEY)));
        assert!(!is_write_conflict(&write_error(DUPLICATE_KEY)));
    }
}
