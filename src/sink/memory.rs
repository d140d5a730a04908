//! In-memory transactional sink
//!
//! A stand-in for a real database driver behind the [`SqlSink`] trait. The
//! shared [`MemoryDb`] plays the server; every worker connects its own
//! [`MemorySink`], which stages operations privately and applies them to the
//! shared table on commit. This keeps the standalone binary and the tests
//! runnable end-to-end with real transaction and conflict semantics.
//!
//! # Features
//!
//! - Staged operations are invisible to other sinks until commit
//! - Duplicate-key inserts fail the commit and discard the transaction
//! - Update/delete of a missing key affects zero rows, as in SQL
//! - Configurable failure injection for worker-failure tests
//!
//! # Example
//!
//! ```
//! use benchload::sink::memory::MemoryDb;
//! use benchload::sink::{SqlSink, WriteOp};
//! use benchload::order::OrderLine;
//! use benchload::random::Nurand;
//!
//! let db = MemoryDb::new();
//! let mut sink = db.connect();
//! let mut rnd = Nurand::load_master_with_seed(1).derive_with_seed(2);
//!
//! let row = OrderLine::synthesize(&mut rnd, 1, 1, 1, 42);
//! sink.execute(&WriteOp::Insert(row)).unwrap();
//! assert_eq!(db.row_count(), 0); // not visible before commit
//! sink.commit().unwrap();
//! assert_eq!(db.row_count(), 1);
//! ```

use super::{SqlSink, WriteOp};
use crate::order::{OrderLine, OrderLineKey};
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct DbInner {
    rows: HashMap<OrderLineKey, OrderLine>,
    committed_batches: u64,
    ops_applied: u64,
}

/// Shared in-memory order-line table.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Mutex<DbInner>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection with its own private transaction state.
    pub fn connect(&self) -> MemorySink {
        MemorySink {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
            fail_after_ops: None,
            ops_staged: 0,
        }
    }

    /// Number of committed rows in the table.
    pub fn row_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    /// Committed row for `key`, if present.
    pub fn get(&self, key: &OrderLineKey) -> Option<OrderLine> {
        self.inner.lock().unwrap().rows.get(key).cloned()
    }

    /// Number of successful commits across all connections.
    pub fn committed_batches(&self) -> u64 {
        self.inner.lock().unwrap().committed_batches
    }

    /// Number of operations applied by successful commits.
    pub fn ops_applied(&self) -> u64 {
        self.inner.lock().unwrap().ops_applied
    }
}

/// One connection to a [`MemoryDb`].
///
/// Owns the staged operations of its current transaction; the shared table
/// is only touched on commit.
#[derive(Debug)]
pub struct MemorySink {
    inner: Arc<Mutex<DbInner>>,
    pending: Vec<WriteOp>,
    /// Fail the execute call that would stage operation `n + 1` on this
    /// connection. Lets tests kill one worker without touching siblings.
    fail_after_ops: Option<u64>,
    ops_staged: u64,
}

impl MemorySink {
    /// Operations staged in the current transaction.
    pub fn pending_ops(&self) -> usize {
        self.pending.len()
    }

    /// Inject a failure after `n` staged operations on this connection.
    pub fn fail_after_ops(&mut self, n: u64) {
        self.fail_after_ops = Some(n);
    }

    fn stage(&mut self, ops: &[WriteOp]) -> Result<()> {
        if let Some(limit) = self.fail_after_ops {
            if self.ops_staged + ops.len() as u64 > limit {
                anyhow::bail!("injected sink failure after {} operations", self.ops_staged);
            }
        }
        self.ops_staged += ops.len() as u64;
        self.pending.extend_from_slice(ops);
        Ok(())
    }

    fn apply(rows: &mut HashMap<OrderLineKey, OrderLine>, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::Insert(row) => {
                let key = row.key();
                if rows.contains_key(&key) {
                    anyhow::bail!(
                        "duplicate key ({}, {}, {}, {})",
                        key.o_id,
                        key.d_id,
                        key.w_id,
                        key.number
                    );
                }
                rows.insert(key, row.clone());
            }
            WriteOp::Update { key, item_id, .. } => {
                // Zero rows affected is not an error, as in SQL.
                if let Some(row) = rows.get_mut(key) {
                    row.item_id = *item_id;
                }
            }
            WriteOp::Delete { key } => {
                rows.remove(key);
            }
            WriteOp::InsertOrUpdate { row, .. } => {
                let key = row.key();
                if let Some(existing) = rows.get_mut(&key) {
                    existing.item_id = row.item_id;
                } else {
                    rows.insert(key, row.clone());
                }
            }
            WriteOp::Upsert(row) => {
                rows.insert(row.key(), row.clone());
            }
        }
        Ok(())
    }
}

impl SqlSink for MemorySink {
    fn execute(&mut self, op: &WriteOp) -> Result<()> {
        self.stage(std::slice::from_ref(op))
    }

    fn execute_batch(&mut self, ops: &[WriteOp]) -> Result<()> {
        self.stage(ops)
    }

    fn execute_values(&mut self, ops: &[WriteOp]) -> Result<()> {
        // One multi-row statement; staging semantics are the same.
        self.stage(ops)
    }

    fn commit(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().unwrap();

        // Apply against a staged copy so a failed commit leaves the table
        // untouched.
        let mut staged = inner.rows.clone();
        for op in &pending {
            if let Err(e) = Self::apply(&mut staged, op) {
                return Err(e.context("commit failed"));
            }
        }

        inner.rows = staged;
        inner.committed_batches += 1;
        inner.ops_applied += pending.len() as u64;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Nurand;

    fn rnd() -> Nurand {
        Nurand::load_master_with_seed(1).derive_with_seed(2)
    }

    fn row(rnd: &mut Nurand, w_id: u32, o_id: u32, number: u32) -> OrderLine {
        OrderLine::synthesize(rnd, w_id, o_id, number, 42)
    }

    #[test]
    fn test_commit_applies_staged_ops() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        let mut rnd = rnd();

        let ops: Vec<_> = (1..=3)
            .map(|n| WriteOp::Insert(row(&mut rnd, 1, 1, n)))
            .collect();
        sink.execute_batch(&ops).unwrap();
        assert_eq!(db.row_count(), 0);

        sink.commit().unwrap();
        assert_eq!(db.row_count(), 3);
        assert_eq!(db.committed_batches(), 1);
        assert_eq!(db.ops_applied(), 3);
    }

    #[test]
    fn test_rollback_discards_staged_ops() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        let mut rnd = rnd();

        sink.execute(&WriteOp::Insert(row(&mut rnd, 1, 1, 1))).unwrap();
        sink.rollback().unwrap();
        sink.commit().unwrap();
        assert_eq!(db.row_count(), 0);
        assert_eq!(db.committed_batches(), 0);
    }

    #[test]
    fn test_duplicate_insert_fails_commit_atomically() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        let mut rnd = rnd();

        let first = row(&mut rnd, 1, 1, 1);
        sink.execute(&WriteOp::Insert(first.clone())).unwrap();
        sink.commit().unwrap();

        let fresh = WriteOp::Insert(row(&mut rnd, 1, 1, 2));
        let duplicate = WriteOp::Insert(row(&mut rnd, 1, 1, 1));
        sink.execute_batch(&[fresh, duplicate]).unwrap();
        assert!(sink.commit().is_err());

        // Nothing from the failed transaction is visible.
        assert_eq!(db.row_count(), 1);
    }

    #[test]
    fn test_update_overwrites_item_payload() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        let mut rnd = rnd();

        let stored = row(&mut rnd, 2, 5, 1);
        let key = stored.key();
        sink.execute(&WriteOp::Insert(stored)).unwrap();
        sink.commit().unwrap();

        sink.execute(&WriteOp::Update {
            key,
            item_id: 777,
            bucketed: false,
        })
        .unwrap();
        sink.commit().unwrap();
        assert_eq!(db.get(&key).unwrap().item_id, 777);
    }

    #[test]
    fn test_update_missing_key_affects_zero_rows() {
        let db = MemoryDb::new();
        let mut sink = db.connect();

        sink.execute(&WriteOp::Update {
            key: OrderLineKey::for_line(9, 9, 9),
            item_id: 1,
            bucketed: false,
        })
        .unwrap();
        sink.commit().unwrap();
        assert_eq!(db.row_count(), 0);
    }

    #[test]
    fn test_delete_removes_row() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        let mut rnd = rnd();

        let stored = row(&mut rnd, 3, 1, 1);
        let key = stored.key();
        sink.execute(&WriteOp::Insert(stored)).unwrap();
        sink.commit().unwrap();

        sink.execute(&WriteOp::Delete { key }).unwrap();
        sink.commit().unwrap();
        assert_eq!(db.row_count(), 0);
    }

    #[test]
    fn test_insert_or_update_and_upsert_never_conflict() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        let mut rnd = rnd();

        let stored = row(&mut rnd, 4, 1, 1);
        let key = stored.key();
        sink.execute(&WriteOp::Insert(stored.clone())).unwrap();
        sink.commit().unwrap();

        let mut conflicting = stored.clone();
        conflicting.item_id = 12345;
        sink.execute(&WriteOp::InsertOrUpdate {
            row: conflicting,
            bucketed: true,
        })
        .unwrap();
        sink.commit().unwrap();
        assert_eq!(db.get(&key).unwrap().item_id, 12345);

        let mut replacement = stored;
        replacement.item_id = 12345678;
        sink.execute(&WriteOp::Upsert(replacement)).unwrap();
        sink.commit().unwrap();
        assert_eq!(db.get(&key).unwrap().item_id, 12345678);
        assert_eq!(db.row_count(), 1);
    }

    #[test]
    fn test_staged_ops_invisible_across_connections() {
        let db = MemoryDb::new();
        let mut a = db.connect();
        let mut b = db.connect();
        let mut rnd = rnd();

        a.execute(&WriteOp::Insert(row(&mut rnd, 5, 1, 1))).unwrap();
        b.execute(&WriteOp::Insert(row(&mut rnd, 6, 1, 1))).unwrap();
        assert_eq!(db.row_count(), 0);

        a.commit().unwrap();
        assert_eq!(db.row_count(), 1);
        b.commit().unwrap();
        assert_eq!(db.row_count(), 2);
    }

    #[test]
    fn test_failure_injection_is_per_connection() {
        let db = MemoryDb::new();
        let mut failing = db.connect();
        failing.fail_after_ops(2);
        let mut healthy = db.connect();
        let mut rnd = rnd();

        failing.execute(&WriteOp::Insert(row(&mut rnd, 1, 1, 1))).unwrap();
        failing.execute(&WriteOp::Insert(row(&mut rnd, 1, 1, 2))).unwrap();
        assert!(failing
            .execute(&WriteOp::Insert(row(&mut rnd, 1, 1, 3)))
            .is_err());

        // The sibling connection is unaffected.
        healthy.execute(&WriteOp::Insert(row(&mut rnd, 2, 1, 1))).unwrap();
        healthy.commit().unwrap();
        assert_eq!(db.row_count(), 1);
    }

    #[test]
    fn test_empty_commit_is_noop() {
        let db = MemoryDb::new();
        let mut sink = db.connect();
        sink.commit().unwrap();
        assert_eq!(db.committed_batches(), 0);
    }
}
