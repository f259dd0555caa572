use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Processor transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    CardHold,
    Debit,
    Credit,
    Refund,
    Reversal,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CardHold => write!(f, "card_hold"),
            Self::Debit => write!(f, "debit"),
            Self::Credit => write!(f, "credit"),
            Self::Refund => write!(f, "refund"),
            Self::Reversal => write!(f, "reversal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One normalized row from a processor export file.
///
/// Amounts are signed minor units; credits and refunds are negated at load
/// time so the sign convention matches the exchange ledger. `created_at`
/// keeps the raw ISO8601 string — lexicographic order on it is time order.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount_cents: i64,
    pub created_at: String,
    pub timestamp: DateTime<Utc>,
    /// Processor-side customer link. Empty on most holds; identity
    /// resolution fills it in where the card/username indexes allow.
    pub customer_id: Option<String>,
    pub card_id: Option<String>,
    pub debit_id: Option<String>,
    /// The participant username used as the counterparty description.
    pub description: String,
    /// Every column of the source row, keyed by header. Kept for the
    /// audit dumps of unmatchable records.
    pub raw_fields: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Exchange records
// ---------------------------------------------------------------------------

/// One row from the internal exchange store, joined with the owning
/// participant's user id.
#[derive(Debug, Clone)]
pub struct ExchangeRecord {
    pub id: i64,
    pub participant: String,
    pub user_id: i64,
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub timestamp: DateTime<Utc>,
    pub recorder: Option<String>,
    /// Processor transaction id, when one was recorded.
    pub reference: Option<String>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub transaction: Transaction,
    pub exchange: ExchangeRecord,
}

/// Records that could not be confidently paired, categorized for audit.
/// Nothing here is ever discarded.
#[derive(Debug, Default)]
pub struct Unmatchable {
    /// Failed before the ledger began recording failures.
    pub early_failures: Vec<Transaction>,
    /// Not a card hold, yet no customer link.
    pub non_card_hold_without_cid: Vec<Transaction>,
    /// A card hold with no card to dereference.
    pub card_hold_without_card: Vec<Transaction>,
    /// Card dereferences to zero or several customer ids; never guess.
    pub ambiguous_card_hold: Vec<Transaction>,
    /// No customer id even after resolution.
    pub still_no_cid: Vec<Transaction>,
    /// Survived the scan without a partner.
    pub dregs: Vec<Transaction>,
    /// Exchange records left over after their group was pulled.
    pub exchanges: Vec<ExchangeRecord>,
}

impl Unmatchable {
    /// Transaction buckets with their report names, in dump order.
    pub fn transaction_buckets(&self) -> [(&'static str, &Vec<Transaction>); 6] {
        [
            ("early_failures", &self.early_failures),
            ("non_card_hold_without_cid", &self.non_card_hold_without_cid),
            ("card_hold_without_card", &self.card_hold_without_card),
            ("ambiguous_card_hold", &self.ambiguous_card_hold),
            ("still_no_cid", &self.still_no_cid),
            ("dregs", &self.dregs),
        ]
    }

    pub fn transaction_total(&self) -> usize {
        self.transaction_buckets().iter().map(|(_, b)| b.len()).sum()
    }
}

/// Render signed minor units as a decimal string with exactly two places,
/// zero-padded so small amounts never start with a bare point.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_format_pads_and_signs() {
        assert_eq!(format_cents(1000), "10.00");
        assert_eq!(format_cents(50), "0.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-500), "-5.00");
        assert_eq!(format_cents(-7), "-0.07");
    }

    #[test]
    fn kind_and_status_wire_names() {
        assert_eq!(TransactionKind::CardHold.to_string(), "card_hold");
        assert_eq!(TransactionKind::Reversal.to_string(), "reversal");
        assert_eq!(TransactionStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(TransactionStatus::Failed.to_string(), "failed");
    }
}
