//! Identity resolution: mapping opaque processor-side card/customer ids to
//! internal participants for the records that lack a direct link.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::model::{
    ExchangeRecord, Transaction, TransactionKind, TransactionStatus, Unmatchable,
};

/// Failures were not recorded internally before this date.
pub const EARLY_FAILURE_CUTOFF: &str = "2014-12-18";

/// Cross-reference multimaps derived from the normalized transactions.
/// `BTreeSet` values keep unions deterministic regardless of scan order.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    /// Card id to the usernames that used it as a hold.
    pub card_to_usernames: HashMap<String, BTreeSet<String>>,
    /// Username to the customer ids seen alongside it.
    pub username_to_customers: HashMap<String, BTreeSet<String>>,
}

/// Explicit post-pass over the normalized transaction list. A card's hold
/// carries the username; a fully-linked record carries both username and
/// customer id; between the two we can often dereference a hold's customer.
pub fn build_index(transactions: &[Transaction]) -> IdentityIndex {
    let mut index = IdentityIndex::default();
    for t in transactions {
        if t.kind == TransactionKind::CardHold && !t.description.is_empty() {
            if let Some(card) = &t.card_id {
                index
                    .card_to_usernames
                    .entry(card.clone())
                    .or_default()
                    .insert(t.description.clone());
            }
        }
        if let Some(cid) = &t.customer_id {
            if !t.description.is_empty() {
                index
                    .username_to_customers
                    .entry(t.description.clone())
                    .or_default()
                    .insert(cid.clone());
            }
        }
    }
    index
}

/// Fill in missing customer ids and file the hopeless transactions.
///
/// Order matters: the early-failure cutoff is checked first, on the raw
/// `created_at` string, regardless of any other property. After that, a
/// transaction without a customer id is only salvageable when it is a card
/// hold whose card dereferences to exactly one customer — the resolver
/// never guesses among multiple candidates.
///
/// Resolved ids are written back onto the records. Filed transactions stay
/// in the caller's list (they still shape the scan) but their ids land in
/// `filed` so they are never filed twice.
pub fn resolve_customer_ids(
    transactions: &mut [Transaction],
    index: &IdentityIndex,
    unmatchable: &mut Unmatchable,
    filed: &mut HashSet<String>,
) {
    for t in transactions.iter_mut() {
        if t.status == TransactionStatus::Failed && t.created_at.as_str() < EARLY_FAILURE_CUTOFF {
            filed.insert(t.id.clone());
            unmatchable.early_failures.push(t.clone());
            continue;
        }

        if t.customer_id.is_none() {
            if t.kind != TransactionKind::CardHold {
                // A hold is the only kind expected to arrive without one.
                filed.insert(t.id.clone());
                unmatchable.non_card_hold_without_cid.push(t.clone());
                continue;
            }
            let Some(card) = t.card_id.clone() else {
                filed.insert(t.id.clone());
                unmatchable.card_hold_without_card.push(t.clone());
                continue;
            };

            let candidates = candidate_customers(index, &card);
            if candidates.len() == 1 {
                t.customer_id = candidates.into_iter().next();
            } else {
                filed.insert(t.id.clone());
                unmatchable.ambiguous_card_hold.push(t.clone());
                continue;
            }
        }

        if t.customer_id.is_none() {
            filed.insert(t.id.clone());
            unmatchable.still_no_cid.push(t.clone());
        }
    }
}

/// Union of customer ids across every username that used this card.
fn candidate_customers(index: &IdentityIndex, card: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    if let Some(usernames) = index.card_to_usernames.get(card) {
        for username in usernames {
            if let Some(cids) = index.username_to_customers.get(username) {
                out.extend(cids.iter().cloned());
            }
        }
    }
    out
}

/// Customer id to transaction ids, in list (time) order. Filed
/// transactions are excluded; the matcher owns the records themselves.
pub fn partition_by_customer(
    transactions: &[Transaction],
    filed: &HashSet<String>,
) -> HashMap<String, Vec<String>> {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for t in transactions {
        if filed.contains(&t.id) {
            continue;
        }
        if let Some(cid) = &t.customer_id {
            groups.entry(cid.clone()).or_default().push(t.id.clone());
        }
    }
    groups
}

/// User id to exchange ids, in list (time) order.
pub fn partition_by_user(exchanges: &[ExchangeRecord]) -> HashMap<i64, Vec<i64>> {
    let mut groups: HashMap<i64, Vec<i64>> = HashMap::new();
    for e in exchanges {
        groups.entry(e.user_id).or_default().push(e.id);
    }
    groups
}
