//! Durable-write sink abstraction
//!
//! This module defines the narrow interface the loader needs from whatever
//! provides durability. Write strategies produce typed [`WriteOp`]s; a
//! [`SqlSink`] turns them into parameterized statements against a relational
//! store and owns the transaction boundary. The concrete persistence
//! technology and its connection handling live behind this trait and are not
//! part of this crate's scope; [`memory::MemorySink`] is the in-process
//! implementation used by the standalone binary and the tests.
//!
//! Text output does not go through [`SqlSink`]: CSV-mode workers append to a
//! single shared stream instead (see [`text`]).
//!
//! # Transaction contract
//!
//! `execute`, `execute_batch` and `execute_values` stage operations inside
//! the sink's current transaction. `commit` makes everything staged since
//! the last commit durable as one atomic unit; `rollback` discards it. A
//! failed execute or commit leaves no partial subset behind once the caller
//! rolls back.
//!
//! # Thread safety
//!
//! Sinks must be `Send`; each worker owns its sink exclusively for its whole
//! lifetime, so no `Sync` is required.

pub mod memory;
pub mod text;

use crate::order::{OrderLine, OrderLineKey};
use crate::Result;

/// One parameterized write operation against the order-line table.
///
/// The operation carries typed values rather than statement text; the sink
/// renders them for its dialect. Bucketed operations address a
/// pre-partitioned target whose conflict key includes the bucket
/// discriminant of the row key.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Append a new row. A duplicate key is a hard failure.
    Insert(OrderLine),
    /// Point update of the item payload, keyed by the full line key.
    Update {
        key: OrderLineKey,
        item_id: u32,
        bucketed: bool,
    },
    /// Point delete, same key.
    Delete { key: OrderLineKey },
    /// Insert, overwriting the item payload on key conflict.
    InsertOrUpdate { row: OrderLine, bucketed: bool },
    /// Blind write: insert or replace without conflict detection.
    Upsert(OrderLine),
}

impl WriteOp {
    /// The line key this operation addresses.
    pub fn key(&self) -> OrderLineKey {
        match self {
            WriteOp::Insert(row) | WriteOp::Upsert(row) => row.key(),
            WriteOp::InsertOrUpdate { row, .. } => row.key(),
            WriteOp::Update { key, .. } | WriteOp::Delete { key } => *key,
        }
    }
}

/// Sink with relational-write capabilities.
///
/// The capability set mirrors what the loader needs and nothing more:
/// execute one parameterized statement, execute a batch of them, execute a
/// single multi-row values statement, and control the transaction.
pub trait SqlSink: Send {
    /// Execute one operation inside the current transaction.
    fn execute(&mut self, op: &WriteOp) -> Result<()>;

    /// Execute a batch of operations inside the current transaction.
    ///
    /// Semantically equivalent to executing each operation in order, but
    /// the sink may submit them as one round trip.
    fn execute_batch(&mut self, ops: &[WriteOp]) -> Result<()>;

    /// Execute all operations as one multi-row values statement.
    ///
    /// Key semantics are identical to [`SqlSink::execute_batch`]; only the
    /// statement shape differs (one statement text carrying a value list).
    fn execute_values(&mut self, ops: &[WriteOp]) -> Result<()>;

    /// Commit everything staged since the last commit.
    fn commit(&mut self) -> Result<()>;

    /// Discard everything staged since the last commit.
    fn rollback(&mut self) -> Result<()>;
}
