//! The core engine: a synchronized two-cursor scan over the time-ordered
//! transaction and exchange lists, with a bounded local bipartite pass
//! whenever the primary scan finds a plausible pair.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;

use crate::config::ToleranceConfig;
use crate::error::MatchError;
use crate::identity;
use crate::model::{ExchangeRecord, MatchedPair, Transaction, TransactionStatus, Unmatchable};
use crate::progress::ScanProgress;

/// Outcome of one cursor-advance step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Continue,
    Done,
}

// ---------------------------------------------------------------------------
// Matching predicates
// ---------------------------------------------------------------------------

/// Positive exchanges settle net of fee: amount plus fee must equal the
/// transaction amount. Negative exchanges mirror the transaction exactly.
pub fn amounts_match(t: &Transaction, e: &ExchangeRecord) -> bool {
    if e.amount_cents > 0 && e.amount_cents + e.fee_cents != t.amount_cents {
        return false;
    }
    if e.amount_cents < 0 && e.amount_cents != t.amount_cents {
        return false;
    }
    true
}

/// The transaction's counterparty description is the participant username.
pub fn usernames_match(t: &Transaction, e: &ExchangeRecord) -> bool {
    t.description == e.participant
}

/// Whether the exchange is no later than `seconds` after the transaction.
/// No lower bound; the local pass adds its own.
pub fn ts_within(t: &Transaction, e: &ExchangeRecord, seconds: i64) -> bool {
    e.timestamp <= t.timestamp + Duration::seconds(seconds)
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

pub struct Matcher {
    transactions: Vec<Transaction>,
    exchanges: Vec<ExchangeRecord>,
    /// Resolved customer id -> transaction ids, consumed one group per pull.
    customer_groups: HashMap<String, Vec<String>>,
    /// User id -> exchange ids, consumed one group per pull.
    user_groups: HashMap<i64, Vec<i64>>,
    /// Ids of transactions already filed into an unmatchable bucket.
    filed: HashSet<String>,
    /// External cancellation flag, polled once per outer iteration.
    cancel: Option<Arc<AtomicBool>>,
    tolerance: ToleranceConfig,
    pub matches: Vec<MatchedPair>,
    pub unmatchable: Unmatchable,
    i: usize,
    j: usize,
    k: usize,
}

impl Matcher {
    /// Build a matcher over the two time-ordered streams. Identity
    /// resolution runs here: holds without a customer link are resolved
    /// through the card/username indexes or filed, and both streams are
    /// partitioned into per-customer / per-user groups.
    pub fn new(
        mut transactions: Vec<Transaction>,
        exchanges: Vec<ExchangeRecord>,
        tolerance: ToleranceConfig,
    ) -> Self {
        let index = identity::build_index(&transactions);
        let mut unmatchable = Unmatchable::default();
        let mut filed = HashSet::new();
        identity::resolve_customer_ids(&mut transactions, &index, &mut unmatchable, &mut filed);
        let customer_groups = identity::partition_by_customer(&transactions, &filed);
        let user_groups = identity::partition_by_user(&exchanges);

        Self {
            transactions,
            exchanges,
            customer_groups,
            user_groups,
            filed,
            cancel: None,
            tolerance,
            matches: Vec::new(),
            unmatchable,
            i: 0,
            j: 0,
            k: 0,
        }
    }

    /// Cancel the scan from another thread by setting `flag`. The run
    /// returns `MatchError::Interrupted`; matches and buckets accumulated
    /// up to that point stay on the matcher.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Single-pass primary scan. `on_progress` is called every ten outer
    /// iterations with a snapshot of the cursors and the time estimate.
    ///
    /// Fatal errors abort the pass; the matches and buckets accumulated so
    /// far stay on the matcher so the caller can still dump them.
    pub fn run(&mut self, mut on_progress: impl FnMut(&ScanProgress)) -> Result<(), MatchError> {
        let n_initial = self.transactions.len().max(1);
        let started = Instant::now();
        let mut iterations: u64 = 0;

        while self.i < self.transactions.len() {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    return Err(MatchError::Interrupted);
                }
            }

            iterations += 1;
            if iterations % 10 == 0 {
                on_progress(&self.progress(n_initial, started.elapsed().as_secs_f64()));
            }

            if self.j >= self.exchanges.len() {
                if self.advance() == Advance::Done {
                    break;
                }
                continue;
            }

            let transaction = &self.transactions[self.i];
            let exchange = &self.exchanges[self.j];
            if exchange.participant.is_empty() {
                return Err(MatchError::Integrity(format!(
                    "exchange {} has no participant",
                    exchange.id
                )));
            }

            if amounts_match(transaction, exchange) && usernames_match(transaction, exchange) {
                let cid = transaction.customer_id.clone();
                let uid = exchange.user_id;
                self.local_match(cid.as_deref(), uid);
                self.k = self.j;
                continue;
            }

            if self.advance() == Advance::Done {
                break;
            }
        }

        self.sweep();
        Ok(())
    }

    /// Try moving the exchange cursor first. Past the end of the list, or
    /// more than `trail_secs` beyond the current transaction, move the
    /// transaction cursor instead: reset the exchange cursor to the last
    /// group checkpoint and slide it back until the exchange no longer
    /// trails the new transaction.
    fn advance(&mut self) -> Advance {
        let next_j = self.j + 1;
        let exchange_fits = next_j < self.exchanges.len()
            && ts_within(
                &self.transactions[self.i],
                &self.exchanges[next_j],
                self.tolerance.trail_secs,
            );
        if exchange_fits {
            self.j = next_j;
            return Advance::Continue;
        }

        let next_i = self.i + 1;
        if next_i == self.transactions.len() {
            return Advance::Done;
        }

        let mut j = self.k.min(self.exchanges.len().saturating_sub(1));
        let transaction = &self.transactions[next_i];
        while j > 0 && !ts_within(transaction, &self.exchanges[j], 0) {
            j -= 1;
        }

        self.i = next_i;
        self.j = j;
        Advance::Continue
    }

    /// Pull the whole customer/user group out of the global lists and match
    /// within it, first-fit in original order — no backtracking, by policy.
    /// Leftovers are filed (dregs / exchanges) rather than returned.
    fn local_match(&mut self, customer_id: Option<&str>, user_id: i64) {
        let transaction_ids = customer_id
            .and_then(|cid| self.customer_groups.remove(cid))
            .unwrap_or_default();
        let exchange_ids = self.user_groups.remove(&user_id).unwrap_or_default();

        // Remove the group from the global lists, walking the cursors back
        // when a removed record's timestamp precedes the current one.
        let mut group_t: Vec<Transaction> = Vec::with_capacity(transaction_ids.len());
        for id in &transaction_ids {
            let Some(pos) = self.transactions.iter().position(|t| &t.id == id) else {
                continue; // already consumed
            };
            if self.i < self.transactions.len()
                && self.transactions[pos].timestamp < self.transactions[self.i].timestamp
            {
                self.i = self.i.saturating_sub(1);
            }
            group_t.push(self.transactions.remove(pos));
        }

        let mut group_e: Vec<ExchangeRecord> = Vec::with_capacity(exchange_ids.len());
        for id in &exchange_ids {
            let Some(pos) = self.exchanges.iter().position(|e| &e.id == id) else {
                continue;
            };
            if self.j < self.exchanges.len()
                && self.exchanges[pos].timestamp < self.exchanges[self.j].timestamp
            {
                self.j = self.j.saturating_sub(1);
                self.k = self.k.saturating_sub(1);
            }
            group_e.push(self.exchanges.remove(pos));
        }

        // First fit wins. The expected outputs were audited against this
        // greedy policy, so a better pairing left unmade stays unmade.
        let mut used = vec![false; group_e.len()];
        for t in group_t {
            let earliest = t.timestamp - Duration::seconds(self.tolerance.lookback_secs);
            let mut hit = None;
            for (pos, e) in group_e.iter().enumerate() {
                if used[pos] {
                    continue;
                }
                if e.timestamp < earliest || !ts_within(&t, e, self.tolerance.lookahead_secs) {
                    continue;
                }
                if !amounts_match(&t, e) {
                    // Failed attempts were recorded at the nominal tip
                    // amount, not the attempted charge; link them on the
                    // strength of the identity and timestamp alone.
                    if t.status != TransactionStatus::Failed || e.amount_cents > t.amount_cents {
                        continue;
                    }
                }
                hit = Some(pos);
                break;
            }

            match hit {
                Some(pos) => {
                    used[pos] = true;
                    self.matches.push(MatchedPair {
                        transaction: t,
                        exchange: group_e[pos].clone(),
                    });
                }
                None => {
                    self.filed.insert(t.id.clone());
                    self.unmatchable.dregs.push(t);
                }
            }
        }

        for (pos, e) in group_e.into_iter().enumerate() {
            if !used[pos] {
                self.unmatchable.exchanges.push(e);
            }
        }
    }

    /// File whatever survived the scan without being matched or already
    /// categorized, so every record ends in exactly one bucket.
    fn sweep(&mut self) {
        for t in self.transactions.drain(..) {
            if self.filed.insert(t.id.clone()) {
                self.unmatchable.dregs.push(t);
            }
        }
        self.unmatchable.exchanges.extend(self.exchanges.drain(..));
    }

    fn progress(&self, n_initial: usize, elapsed_secs: f64) -> ScanProgress {
        let n = self.transactions.len();
        let m = self.exchanges.len();
        let done_frac = (n_initial - n) as f64 / n_initial as f64;
        let total = elapsed_secs / done_frac.max(0.001);
        ScanProgress {
            transaction_cursor: self.i,
            transactions_left: n,
            exchange_cursor: self.j,
            exchanges_left: m,
            matches: self.matches.len(),
            percent: done_frac * 100.0,
            remaining_secs: total - elapsed_secs,
        }
    }
}
