//! CSV output: one file of matched pairs, one file per non-empty
//! unmatchable category.

use std::fs;
use std::path::Path;

use crate::error::MatchError;
use crate::model::{format_cents, ExchangeRecord, MatchedPair, Transaction, Unmatchable};

pub const MATCHED_FILE: &str = "matched.csv";

/// Write everything under `dir`, creating it if needed. Empty categories
/// produce no file, so the directory listing doubles as a summary.
pub fn dump(
    matches: &[MatchedPair],
    unmatchable: &Unmatchable,
    dir: &Path,
) -> Result<(), MatchError> {
    fs::create_dir_all(dir)
        .map_err(|e| MatchError::Io(format!("cannot create {}: {e}", dir.display())))?;

    write_matches(matches, &dir.join(MATCHED_FILE))?;

    for (category, bucket) in unmatchable.transaction_buckets() {
        if !bucket.is_empty() {
            write_transactions(bucket, &dir.join(format!("unmatchable.{category}.csv")))?;
        }
    }
    if !unmatchable.exchanges.is_empty() {
        write_exchanges(
            &unmatchable.exchanges,
            &dir.join("unmatchable.exchanges.csv"),
        )?;
    }

    Ok(())
}

fn write_matches(matches: &[MatchedPair], path: &Path) -> Result<(), MatchError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "participant",
        "user_id",
        "customer_id",
        "exchange_id",
        "exchange_amount",
        "transaction_id",
        "transaction_status",
        "transaction_kind",
    ])?;

    for pair in matches {
        let t = &pair.transaction;
        let e = &pair.exchange;
        let user_id = e.user_id.to_string();
        let exchange_id = e.id.to_string();
        let amount = format_cents(e.amount_cents);
        let status = t.status.to_string();
        let kind = t.kind.to_string();
        writer.write_record([
            e.participant.as_str(),
            user_id.as_str(),
            t.customer_id.as_deref().unwrap_or(""),
            exchange_id.as_str(),
            amount.as_str(),
            t.id.as_str(),
            status.as_str(),
            kind.as_str(),
        ])?;
    }

    writer.flush().map_err(|e| MatchError::Io(e.to_string()))?;
    Ok(())
}

/// Transactions are dumped with their original export columns so a bucket
/// file can be eyeballed against the source data directly.
fn write_transactions(bucket: &[Transaction], path: &Path) -> Result<(), MatchError> {
    let mut writer = csv::Writer::from_path(path)?;

    let columns: Vec<&String> = bucket[0].raw_fields.keys().collect();
    writer.write_record(&columns)?;
    for t in bucket {
        let row: Vec<&str> = columns
            .iter()
            .map(|c| t.raw_fields.get(*c).map(String::as_str).unwrap_or(""))
            .collect();
        writer.write_record(row)?;
    }

    writer.flush().map_err(|e| MatchError::Io(e.to_string()))?;
    Ok(())
}

fn write_exchanges(exchanges: &[ExchangeRecord], path: &Path) -> Result<(), MatchError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "id",
        "participant",
        "user_id",
        "amount",
        "fee",
        "timestamp",
        "recorder",
        "ref",
        "status",
    ])?;

    for e in exchanges {
        let id = e.id.to_string();
        let user_id = e.user_id.to_string();
        let amount = format_cents(e.amount_cents);
        let fee = format_cents(e.fee_cents);
        let timestamp = e.timestamp.to_rfc3339();
        writer.write_record([
            id.as_str(),
            e.participant.as_str(),
            user_id.as_str(),
            amount.as_str(),
            fee.as_str(),
            timestamp.as_str(),
            e.recorder.as_deref().unwrap_or(""),
            e.reference.as_deref().unwrap_or(""),
            e.status.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush().map_err(|e| MatchError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_timestamp;
    use crate::model::{TransactionKind, TransactionStatus};
    use std::collections::BTreeMap;

    fn sample_transaction(id: &str) -> Transaction {
        let mut raw_fields = BTreeMap::new();
        raw_fields.insert("id".to_string(), id.to_string());
        raw_fields.insert("amount".to_string(), "1000".to_string());
        raw_fields.insert("description".to_string(), "alice".to_string());
        Transaction {
            id: id.into(),
            kind: TransactionKind::Debit,
            status: TransactionStatus::Succeeded,
            amount_cents: 1000,
            created_at: "2015-06-01T12:00:00.000000Z".into(),
            timestamp: parse_timestamp(id, "2015-06-01T12:00:00.000000Z").unwrap(),
            customer_id: Some("AC1".into()),
            card_id: None,
            debit_id: None,
            description: "alice".into(),
            raw_fields,
        }
    }

    fn sample_exchange(id: i64) -> ExchangeRecord {
        ExchangeRecord {
            id,
            participant: "alice".into(),
            user_id: 1,
            amount_cents: 941,
            fee_cents: 59,
            timestamp: parse_timestamp("e", "2015-06-01T12:00:05.000000Z").unwrap(),
            recorder: None,
            reference: None,
            status: None,
        }
    }

    #[test]
    fn matched_file_always_written() {
        let dir = tempfile::tempdir().unwrap();
        dump(&[], &Unmatchable::default(), dir.path()).unwrap();

        let matched = fs::read_to_string(dir.path().join(MATCHED_FILE)).unwrap();
        assert!(matched.starts_with("participant,user_id,customer_id"));
        assert_eq!(matched.lines().count(), 1);
    }

    #[test]
    fn empty_buckets_produce_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut unmatchable = Unmatchable::default();
        unmatchable.dregs.push(sample_transaction("WD1"));
        dump(&[], &unmatchable, dir.path()).unwrap();

        assert!(dir.path().join("unmatchable.dregs.csv").exists());
        assert!(!dir.path().join("unmatchable.early_failures.csv").exists());
        assert!(!dir.path().join("unmatchable.exchanges.csv").exists());
    }

    #[test]
    fn matched_rows_format_amounts_as_decimal() {
        let dir = tempfile::tempdir().unwrap();
        let pair = MatchedPair {
            transaction: sample_transaction("WD1"),
            exchange: sample_exchange(7),
        };
        dump(&[pair], &Unmatchable::default(), dir.path()).unwrap();

        let matched = fs::read_to_string(dir.path().join(MATCHED_FILE)).unwrap();
        let row = matched.lines().nth(1).unwrap();
        assert_eq!(row, "alice,1,AC1,7,9.41,WD1,succeeded,debit");
    }

    #[test]
    fn transaction_bucket_uses_raw_export_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut unmatchable = Unmatchable::default();
        unmatchable.still_no_cid.push(sample_transaction("CH9"));
        dump(&[], &unmatchable, dir.path()).unwrap();

        let bucket =
            fs::read_to_string(dir.path().join("unmatchable.still_no_cid.csv")).unwrap();
        let mut lines = bucket.lines();
        assert_eq!(lines.next().unwrap(), "amount,description,id");
        assert_eq!(lines.next().unwrap(), "1000,alice,CH9");
    }

    #[test]
    fn exchange_bucket_round_trips_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut unmatchable = Unmatchable::default();
        unmatchable.exchanges.push(sample_exchange(3));
        dump(&[], &unmatchable, dir.path()).unwrap();

        let bucket =
            fs::read_to_string(dir.path().join("unmatchable.exchanges.csv")).unwrap();
        let row = bucket.lines().nth(1).unwrap();
        assert!(row.starts_with("3,alice,1,9.41,0.59,2015-06-01T12:00:05"));
    }
}
