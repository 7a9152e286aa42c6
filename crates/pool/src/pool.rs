use crate::SessionToken;
use metrics::gauge;
use parking_lot::RwLock;
use relay_primitives::{Address, SignedTransaction};
use rustc_hash::FxHashMap;
use std::{collections::BTreeMap, time::Instant};
use tracing::{debug, trace};

/// Errors produced when admitting a transaction to the pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// A same-or-higher-priced entry for this `(sender, nonce)` already exists.
    #[error("already known")]
    AlreadyKnown,
}

/// How an admission was resolved.
#[derive(Debug)]
pub enum AdmitOutcome {
    /// The slot was free.
    Admitted,
    /// A lower-priced entry occupied the slot and was replaced.
    Replaced(Box<PoolTransaction>),
}

/// One accepted-but-unreconciled submission.
#[derive(Debug, Clone)]
pub struct PoolTransaction {
    /// The signed envelope.
    pub transaction: SignedTransaction,
    /// Signature-recovered sender.
    pub sender: Address,
    /// When the pool admitted it.
    pub submitted_at: Instant,
    /// The sender-lock session that admitted it.
    pub session: SessionToken,
}

/// The pending pool.
///
/// Entries live from acceptance until hash reconciliation removes them (or a
/// replacement supersedes them); there is never more than one entry per
/// `(sender, nonce)`. When the pool is disabled every operation is a no-op and
/// the views are empty.
#[derive(Debug)]
pub struct PendingPool {
    enabled: bool,
    txs: RwLock<FxHashMap<(Address, u64), PoolTransaction>>,
}

// === impl PendingPool ===

impl PendingPool {
    /// Creates a pool; a disabled pool ignores all writes.
    pub fn new(enabled: bool) -> Self {
        Self { enabled, txs: RwLock::new(FxHashMap::default()) }
    }

    /// Admits `transaction` under `(sender, nonce)`.
    ///
    /// A colliding entry is replaced when the newcomer pays a strictly higher
    /// max gas price, otherwise the newcomer is rejected as already known.
    pub fn admit(
        &self,
        sender: Address,
        transaction: SignedTransaction,
        session: SessionToken,
    ) -> Result<AdmitOutcome, PoolError> {
        if !self.enabled {
            return Ok(AdmitOutcome::Admitted)
        }
        let nonce = transaction.nonce();
        let entry =
            PoolTransaction { transaction, sender, submitted_at: Instant::now(), session };

        let mut txs = self.txs.write();
        let outcome = match txs.get(&(sender, nonce)) {
            Some(existing) => {
                if entry.transaction.max_gas_price() <= existing.transaction.max_gas_price() {
                    trace!(target: "txpool", %sender, nonce, "rejecting duplicate at same or lower price");
                    return Err(PoolError::AlreadyKnown)
                }
                let old = txs.insert((sender, nonce), entry).expect("checked above");
                debug!(target: "txpool", %sender, nonce, "replaced by higher price");
                AdmitOutcome::Replaced(Box::new(old))
            }
            None => {
                txs.insert((sender, nonce), entry);
                AdmitOutcome::Admitted
            }
        };
        gauge!("relay_txpool_pending").set(txs.len() as f64);
        Ok(outcome)
    }

    /// Removes the entry under `(sender, nonce)`, returning it if present.
    pub fn remove(&self, sender: Address, nonce: u64) -> Option<PoolTransaction> {
        let mut txs = self.txs.write();
        let removed = txs.remove(&(sender, nonce));
        gauge!("relay_txpool_pending").set(txs.len() as f64);
        removed
    }

    /// Removes the entry under `(sender, nonce)` only if it still holds the
    /// transaction with `hash`.
    ///
    /// Reconciliation of a submission that was replaced by a higher-priced
    /// transaction must not evict the replacement.
    pub fn remove_matching(
        &self,
        sender: Address,
        nonce: u64,
        hash: relay_primitives::TxHash,
    ) -> Option<PoolTransaction> {
        let mut txs = self.txs.write();
        if txs.get(&(sender, nonce)).is_some_and(|entry| entry.transaction.hash() == hash) {
            let removed = txs.remove(&(sender, nonce));
            gauge!("relay_txpool_pending").set(txs.len() as f64);
            return removed
        }
        None
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.txs.read().len()
    }

    /// Whether the pool has no entries.
    pub fn is_empty(&self) -> bool {
        self.txs.read().is_empty()
    }

    /// Full pool content grouped by sender and nonce, for `txpool_content`.
    pub fn content(&self) -> BTreeMap<Address, BTreeMap<u64, SignedTransaction>> {
        let txs = self.txs.read();
        let mut content: BTreeMap<Address, BTreeMap<u64, SignedTransaction>> = BTreeMap::new();
        for ((sender, nonce), entry) in txs.iter() {
            content.entry(*sender).or_default().insert(*nonce, entry.transaction.clone());
        }
        content
    }

    /// Pool content of a single sender, for `txpool_contentFrom`.
    pub fn content_from(&self, sender: Address) -> BTreeMap<u64, SignedTransaction> {
        let txs = self.txs.read();
        txs.iter()
            .filter(|((s, _), _)| *s == sender)
            .map(|((_, nonce), entry)| (*nonce, entry.transaction.clone()))
            .collect()
    }

    /// Human-readable summaries grouped like [`Self::content`], for
    /// `txpool_inspect`.
    pub fn inspect(&self) -> BTreeMap<Address, BTreeMap<u64, String>> {
        let txs = self.txs.read();
        let mut inspect: BTreeMap<Address, BTreeMap<u64, String>> = BTreeMap::new();
        for ((sender, nonce), entry) in txs.iter() {
            let tx = &entry.transaction;
            let to = tx
                .to()
                .map(|to| to.to_string())
                .unwrap_or_else(|| "contract creation".to_owned());
            let summary = format!(
                "{}: {} wei + {} gas x {} wei",
                to,
                tx.value(),
                tx.gas_limit(),
                tx.max_gas_price()
            );
            inspect.entry(*sender).or_default().insert(*nonce, summary);
        }
        inspect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use assert_matches::assert_matches;
    use relay_primitives::{
        transaction::{AccessList, Signature, Transaction, TransactionKind},
        Bytes, U256,
    };

    fn signed(nonce: u64, max_fee: u128) -> SignedTransaction {
        SignedTransaction::new(
            Transaction::Eip1559 {
                chain_id: 298,
                nonce,
                max_priority_fee_per_gas: 0,
                max_fee_per_gas: max_fee,
                gas_limit: 21_000,
                to: TransactionKind::Call(address!("00000000000000000000000000000000000000cc")),
                value: U256::from(1u64),
                input: Bytes::new(),
                access_list: AccessList::default(),
            },
            Signature::default(),
        )
    }

    const SENDER: Address = address!("00000000000000000000000000000000000000aa");

    #[test]
    fn one_entry_per_sender_nonce() {
        let pool = PendingPool::new(true);
        pool.admit(SENDER, signed(5, 100), SessionToken::random()).unwrap();
        assert_eq!(pool.len(), 1);

        // same nonce, same price
        assert_matches!(
            pool.admit(SENDER, signed(5, 100), SessionToken::random()),
            Err(PoolError::AlreadyKnown)
        );
        // same nonce, lower price
        assert_matches!(
            pool.admit(SENDER, signed(5, 99), SessionToken::random()),
            Err(PoolError::AlreadyKnown)
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn higher_price_replaces() {
        let pool = PendingPool::new(true);
        pool.admit(SENDER, signed(5, 100), SessionToken::random()).unwrap();

        let outcome = pool.admit(SENDER, signed(5, 101), SessionToken::random()).unwrap();
        assert_matches!(outcome, AdmitOutcome::Replaced(old) if old.transaction.max_gas_price() == 100);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.content_from(SENDER)[&5].max_gas_price(), 101);
    }

    #[test]
    fn remove_clears_the_slot() {
        let pool = PendingPool::new(true);
        pool.admit(SENDER, signed(7, 100), SessionToken::random()).unwrap();
        assert!(pool.remove(SENDER, 7).is_some());
        assert!(pool.remove(SENDER, 7).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn views_group_by_sender() {
        let other = address!("00000000000000000000000000000000000000bb");
        let pool = PendingPool::new(true);
        pool.admit(SENDER, signed(1, 100), SessionToken::random()).unwrap();
        pool.admit(SENDER, signed(2, 100), SessionToken::random()).unwrap();
        pool.admit(other, signed(9, 100), SessionToken::random()).unwrap();

        let content = pool.content();
        assert_eq!(content[&SENDER].len(), 2);
        assert_eq!(content[&other].len(), 1);

        let inspect = pool.inspect();
        assert!(inspect[&SENDER][&1].contains("21000 gas"));
    }

    #[test]
    fn disabled_pool_ignores_writes() {
        let pool = PendingPool::new(false);
        pool.admit(SENDER, signed(1, 100), SessionToken::random()).unwrap();
        assert!(pool.is_empty());
        assert!(pool.content().is_empty());
    }
}
