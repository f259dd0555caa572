use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::MatchError;
use crate::model::{Transaction, TransactionKind, TransactionStatus};

/// Per-session export file name produced by the processor.
pub const EXPORT_FILE_NAME: &str = "_balanced.csv";

// The first test transactions from the processor's sandbox; never real money.
const SANDBOX_TRANSACTION_IDS: [&str; 2] = ["WD7qFYL9rqIrCUmbXsgJJ8HT", "WD16Zqy9ISWN5muEhXo19vpn"];

// Escrow shuffles to and from the platform's own float; not tied to any
// one user, so reconciliation can never pair them.
const ESCROW_CUSTOMER_ID: &str = "AC13kr5rmbUkMJWbocmNs3tD";

/// Recursively discover export files under `root`, parse and normalize
/// every row, and return the transactions ordered by their raw
/// `created_at` string (lexicographic ISO8601 is time order).
pub fn load_transactions(root: &Path) -> Result<Vec<Transaction>, MatchError> {
    let mut files = Vec::new();
    discover_exports(root, &mut files)?;
    files.sort();

    let mut transactions = Vec::new();
    for path in &files {
        let data = fs::read_to_string(path)
            .map_err(|e| MatchError::Io(format!("cannot read {}: {e}", path.display())))?;
        parse_export(&data, &path.display().to_string(), &mut transactions)?;
    }

    transactions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(transactions)
}

fn discover_exports(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), MatchError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| MatchError::Io(format!("cannot read {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| MatchError::Io(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            discover_exports(&path, files)?;
        } else if path.file_name().is_some_and(|n| n == EXPORT_FILE_NAME) {
            files.push(path);
        }
    }
    Ok(())
}

/// Parse one export file's contents, appending normalized transactions.
///
/// Holds superseded by a linked debit are dropped here: the debit carries
/// the economically meaningful event. Sandbox and escrow rows are policy
/// exclusions, not general rules.
pub fn parse_export(
    csv_data: &str,
    file: &str,
    out: &mut Vec<Transaction>,
) -> Result<(), MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MatchError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, MatchError> {
        headers.iter().position(|h| h == name).ok_or_else(|| MatchError::MissingColumn {
            file: file.into(),
            column: name.into(),
        })
    };

    let id_idx = idx("id")?;
    let kind_idx = idx("kind")?;
    let status_idx = idx("status")?;
    let created_at_idx = idx("created_at")?;
    let amount_idx = idx("amount")?;
    let description_idx = idx("description")?;
    let customer_idx = idx("links__customer")?;
    let card_idx = idx("links__card")?;
    let debit_idx = idx("links__debit")?;

    for record in reader.records() {
        let record = record.map_err(|e| MatchError::Io(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();

        let id = field(id_idx);
        if SANDBOX_TRANSACTION_IDS.contains(&id.as_str()) {
            continue;
        }

        let customer = field(customer_idx);
        if customer == ESCROW_CUSTOMER_ID {
            continue;
        }

        let amount_str = field(amount_idx);
        let mut amount_cents: i64 =
            amount_str.parse().map_err(|_| MatchError::AmountParse {
                record_id: id.clone(),
                value: amount_str.clone(),
            })?;

        let created_at = field(created_at_idx);
        let timestamp = parse_timestamp(&id, &created_at)?;
        let status = parse_status(&id, &field(status_idx))?;
        let kind = parse_kind(&id, &field(kind_idx))?;

        let debit = field(debit_idx);
        match kind {
            // A hold with a linked debit is superseded by that debit.
            TransactionKind::CardHold if !debit.is_empty() => continue,
            TransactionKind::CardHold => {}
            TransactionKind::Credit | TransactionKind::Refund => amount_cents = -amount_cents,
            TransactionKind::Debit | TransactionKind::Reversal => {}
        }

        let mut raw_fields = BTreeMap::new();
        for (i, h) in headers.iter().enumerate() {
            if let Some(val) = record.get(i) {
                raw_fields.insert(h.clone(), val.to_string());
            }
        }

        let card = field(card_idx);
        out.push(Transaction {
            id,
            kind,
            status,
            amount_cents,
            created_at,
            timestamp,
            customer_id: (!customer.is_empty()).then_some(customer),
            card_id: (!card.is_empty()).then_some(card),
            debit_id: (!debit.is_empty()).then_some(debit),
            description: field(description_idx),
            raw_fields,
        });
    }

    Ok(())
}

/// Strict export timestamp: `YYYY-MM-DDTHH:MM:SS.ffffffZ`. The trailing
/// `Z` is required; anything else is a data-integrity failure.
pub fn parse_timestamp(record_id: &str, value: &str) -> Result<DateTime<Utc>, MatchError> {
    let err = || MatchError::TimestampParse {
        record_id: record_id.into(),
        value: value.into(),
    };
    let bare = value.strip_suffix('Z').ok_or_else(err)?;
    let naive = NaiveDateTime::parse_from_str(bare, "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| err())?;
    Ok(naive.and_utc())
}

fn parse_status(record_id: &str, value: &str) -> Result<TransactionStatus, MatchError> {
    match value {
        "succeeded" => Ok(TransactionStatus::Succeeded),
        "failed" => Ok(TransactionStatus::Failed),
        other => Err(MatchError::UnknownStatus {
            record_id: record_id.into(),
            value: other.into(),
        }),
    }
}

fn parse_kind(record_id: &str, value: &str) -> Result<TransactionKind, MatchError> {
    match value {
        "card_hold" => Ok(TransactionKind::CardHold),
        "debit" => Ok(TransactionKind::Debit),
        "credit" => Ok(TransactionKind::Credit),
        "refund" => Ok(TransactionKind::Refund),
        "reversal" => Ok(TransactionKind::Reversal),
        other => Err(MatchError::UnknownKind {
            record_id: record_id.into(),
            value: other.into(),
        }),
    }
}
