//! CLI Exit Code Registry
//!
//! Single source of truth for all exit codes. Exit codes are part of the
//! shell contract — audit scripts branch on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                   |
//! |------|-----------|-----------------------------------------------|
//! | 0    | Universal | Success                                       |
//! | 1    | Universal | General error (unspecified)                   |
//! | 2    | Universal | CLI usage error (bad args, missing file)      |
//! | 3    | config    | Config file unreadable or invalid             |
//! | 4    | extract   | Source data could not be parsed               |
//! | 5    | extract   | Source data carried an unknown status/kind    |
//! | 6    | store     | Exchange database unavailable or broken       |
//! | 7    | scan      | Data integrity failure mid-scan               |
//! | 130  | scan      | Interrupted by the operator (SIGINT)          |

use ledgermatch_engine::MatchError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// Emitted by clap's own error path, kept here for the registry.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Config file missing, unparseable, or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A source record could not be parsed (column, timestamp, amount).
pub const EXIT_PARSE: u8 = 4;

/// A source record carried a status or kind outside the known sets.
pub const EXIT_VALIDATION: u8 = 5;

/// The exchange store could not be opened or queried.
pub const EXIT_STORE: u8 = 6;

/// The scan hit a record that violates a data invariant.
pub const EXIT_INTEGRITY: u8 = 7;

/// The operator interrupted the scan; 128 + SIGINT per shell convention.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &MatchError) -> u8 {
    match err {
        MatchError::ConfigParse(_) | MatchError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        MatchError::MissingColumn { .. }
        | MatchError::TimestampParse { .. }
        | MatchError::AmountParse { .. } => EXIT_PARSE,
        MatchError::UnknownStatus { .. } | MatchError::UnknownKind { .. } => EXIT_VALIDATION,
        MatchError::Store(_) => EXIT_STORE,
        MatchError::Integrity(_) => EXIT_INTEGRITY,
        MatchError::Interrupted => EXIT_INTERRUPTED,
        MatchError::Io(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_their_domain_codes() {
        assert_eq!(exit_code_for(&MatchError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(
            exit_code_for(&MatchError::TimestampParse {
                record_id: "WD1".into(),
                value: "yesterday".into(),
            }),
            EXIT_PARSE
        );
        assert_eq!(
            exit_code_for(&MatchError::UnknownKind {
                record_id: "WD1".into(),
                value: "chargeback".into(),
            }),
            EXIT_VALIDATION
        );
        assert_eq!(exit_code_for(&MatchError::Store("locked".into())), EXIT_STORE);
        assert_eq!(exit_code_for(&MatchError::Integrity("gap".into())), EXIT_INTEGRITY);
        assert_eq!(exit_code_for(&MatchError::Interrupted), EXIT_INTERRUPTED);
        assert_eq!(exit_code_for(&MatchError::Io("enoent".into())), EXIT_ERROR);
    }
}
