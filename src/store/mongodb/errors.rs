//! The mongodb crate doesn't provide error code constants, so this module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Is this a duplicate key write error, i.e. a unique index violation?
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}
