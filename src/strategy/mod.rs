//! Batched write strategies
//!
//! A write strategy converts the stream of synthesized rows for a warehouse
//! unit into grouped transactional writes. The strategy is selected once per
//! worker as a [`WriteMode`] value; per-row dispatch is a match on that
//! enum, never a string comparison.
//!
//! All modes share the same buffering contract: `add_row` buffers one
//! operation, an automatic flush fires whenever the buffer reaches the
//! configured batch size, and `end_unit`/`finalize` force a trailing partial
//! flush. A flush is one durable transaction: execute the buffered
//! operations through the sink, then commit. The one exception is the
//! row-at-a-time `update` mode, which commits after every single row.
//!
//! A failed flush is rolled back and surfaced with the identity of the unit
//! being processed; strategies never retry.

use crate::order::OrderLine;
use crate::sink::{SqlSink, WriteOp};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Write-mode policy, one per worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Append new rows; a duplicate key is a hard failure.
    Insert,
    /// Point update of the item payload, one commit per row.
    Update,
    /// Point update, batched.
    UpdateBatch,
    /// Point delete, batched.
    DeleteBatch,
    /// Insert, overwriting the item payload on key conflict.
    InsertUpdate,
    /// Insert-or-update against a bucketed target (extended conflict key).
    InsertUpdateBucket,
    /// Blind insert-or-replace.
    Upsert,
    /// Insert rendered as one multi-row values statement per flush.
    InsertBatchValue,
    /// Update rendered as one multi-row values statement per flush.
    UpdateBatchValue,
    /// Bucketed update rendered as one multi-row values statement per flush.
    UpdateBatchValueList,
    /// Delete rendered as one multi-row values statement per flush.
    DeleteBatchValue,
    /// Upsert rendered as one multi-row values statement per flush.
    UpsertBatchValue,
}

/// How a mode's buffered operations reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushChannel {
    /// One execute + commit per row; no buffering.
    RowByRow,
    /// One batch of parameterized statements per flush.
    Batch,
    /// One multi-row values statement per flush.
    Values,
}

impl WriteMode {
    /// All modes, in the order the CLI help lists them.
    pub const ALL: [WriteMode; 12] = [
        WriteMode::Insert,
        WriteMode::Update,
        WriteMode::UpdateBatch,
        WriteMode::DeleteBatch,
        WriteMode::InsertUpdate,
        WriteMode::InsertUpdateBucket,
        WriteMode::Upsert,
        WriteMode::InsertBatchValue,
        WriteMode::UpdateBatchValue,
        WriteMode::UpdateBatchValueList,
        WriteMode::DeleteBatchValue,
        WriteMode::UpsertBatchValue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WriteMode::Insert => "insert",
            WriteMode::Update => "update",
            WriteMode::UpdateBatch => "update_batch",
            WriteMode::DeleteBatch => "delete_batch",
            WriteMode::InsertUpdate => "insert_update",
            WriteMode::InsertUpdateBucket => "insert_update_bucket",
            WriteMode::Upsert => "upsert",
            WriteMode::InsertBatchValue => "insert_batch_value",
            WriteMode::UpdateBatchValue => "update_batch_value",
            WriteMode::UpdateBatchValueList => "update_batch_value_list",
            WriteMode::DeleteBatchValue => "delete_batch_value",
            WriteMode::UpsertBatchValue => "upsert_batch_value",
        }
    }

    /// Verb for progress lines ("Worker 003: Loading Warehouse ...").
    pub fn verb(&self) -> &'static str {
        match self {
            WriteMode::Insert | WriteMode::InsertBatchValue => "Loading",
            WriteMode::Update
            | WriteMode::UpdateBatch
            | WriteMode::UpdateBatchValue
            | WriteMode::UpdateBatchValueList => "Updating",
            WriteMode::DeleteBatch | WriteMode::DeleteBatchValue => "Deleting",
            WriteMode::InsertUpdate | WriteMode::InsertUpdateBucket => "Insert-updating",
            WriteMode::Upsert | WriteMode::UpsertBatchValue => "Upserting",
        }
    }

    fn channel(&self) -> FlushChannel {
        match self {
            WriteMode::Update => FlushChannel::RowByRow,
            WriteMode::Insert
            | WriteMode::UpdateBatch
            | WriteMode::DeleteBatch
            | WriteMode::InsertUpdate
            | WriteMode::InsertUpdateBucket
            | WriteMode::Upsert => FlushChannel::Batch,
            WriteMode::InsertBatchValue
            | WriteMode::UpdateBatchValue
            | WriteMode::UpdateBatchValueList
            | WriteMode::DeleteBatchValue
            | WriteMode::UpsertBatchValue => FlushChannel::Values,
        }
    }

    /// Fixed payload item id for modes that write a marker value instead of
    /// the synthesized random item.
    fn fixed_item(&self) -> Option<u32> {
        match self {
            WriteMode::InsertUpdate => Some(12_345),
            WriteMode::InsertUpdateBucket => Some(1_234_567),
            WriteMode::Upsert => Some(12_345_678),
            WriteMode::UpdateBatchValue => Some(1_234),
            WriteMode::UpdateBatchValueList => Some(1),
            WriteMode::UpsertBatchValue => Some(123),
            _ => None,
        }
    }

    /// Map one synthesized row to this mode's write operation.
    fn op_for(&self, row: &OrderLine) -> WriteOp {
        let item_id = self.fixed_item().unwrap_or(row.item_id);
        match self {
            WriteMode::Insert | WriteMode::InsertBatchValue => WriteOp::Insert(row.clone()),
            WriteMode::Update | WriteMode::UpdateBatch | WriteMode::UpdateBatchValue => {
                WriteOp::Update {
                    key: row.key(),
                    item_id,
                    bucketed: false,
                }
            }
            WriteMode::UpdateBatchValueList => WriteOp::Update {
                key: row.key(),
                item_id,
                bucketed: true,
            },
            WriteMode::DeleteBatch | WriteMode::DeleteBatchValue => {
                WriteOp::Delete { key: row.key() }
            }
            WriteMode::InsertUpdate => WriteOp::InsertOrUpdate {
                row: with_item(row, item_id),
                bucketed: false,
            },
            WriteMode::InsertUpdateBucket => WriteOp::InsertOrUpdate {
                row: with_item(row, item_id),
                bucketed: true,
            },
            WriteMode::Upsert | WriteMode::UpsertBatchValue => {
                WriteOp::Upsert(with_item(row, item_id))
            }
        }
    }
}

fn with_item(row: &OrderLine, item_id: u32) -> OrderLine {
    let mut row = row.clone();
    row.item_id = item_id;
    row
}

impl Default for WriteMode {
    fn default() -> Self {
        Self::Insert
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        WriteMode::ALL
            .into_iter()
            .find(|mode| mode.name() == lowered)
            .ok_or_else(|| {
                format!(
                    "unknown write mode '{}' (expected one of: {})",
                    s,
                    WriteMode::ALL.map(|m| m.name()).join(", ")
                )
            })
    }
}

/// Converts added rows into grouped transactional writes for one worker.
///
/// Owns the sink and the batch buffer for its whole lifetime; never shared
/// across workers.
pub struct BatchWriter {
    mode: WriteMode,
    sink: Box<dyn SqlSink>,
    batch_size: usize,
    buffer: Vec<WriteOp>,
    current_unit: u64,
    rows_written: u64,
    batches_committed: u64,
}

impl BatchWriter {
    pub fn new(mode: WriteMode, sink: Box<dyn SqlSink>, batch_size: usize) -> Self {
        Self {
            mode,
            sink,
            batch_size: batch_size.max(1),
            buffer: Vec::with_capacity(batch_size.max(1)),
            current_unit: 0,
            rows_written: 0,
            batches_committed: 0,
        }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Start processing a unit; subsequent failures report this unit id.
    pub fn begin_unit(&mut self, unit: u64) {
        self.current_unit = unit;
    }

    /// Buffer the operation for one row, flushing when the batch is full.
    ///
    /// In row-at-a-time mode the operation is executed and committed
    /// immediately instead.
    pub fn add_row(&mut self, row: &OrderLine) -> Result<()> {
        let op = self.mode.op_for(row);
        if self.mode.channel() == FlushChannel::RowByRow {
            let result = self
                .sink
                .execute(&op)
                .and_then(|()| self.sink.commit());
            if let Err(e) = result {
                let _ = self.sink.rollback();
                return Err(e.context(format!(
                    "row write failed for warehouse {}",
                    self.current_unit
                )));
            }
            self.rows_written += 1;
            self.batches_committed += 1;
            return Ok(());
        }

        self.buffer.push(op);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush the trailing partial batch of the current unit.
    pub fn end_unit(&mut self) -> Result<()> {
        self.flush()
    }

    /// Flush anything still buffered. Call once after the last unit.
    pub fn finalize(&mut self) -> Result<()> {
        self.flush()
    }

    /// Rows durably written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Transactions committed so far.
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    /// Execute and commit the buffered operations as one transaction.
    ///
    /// Empty buffers are a no-op: a full batch followed by `finalize` never
    /// produces a trailing empty flush. On failure the transaction is rolled
    /// back and the error carries the owning unit; there is no retry.
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.buffer);

        let result = match self.mode.channel() {
            FlushChannel::Batch => self.sink.execute_batch(&ops),
            FlushChannel::Values => self.sink.execute_values(&ops),
            FlushChannel::RowByRow => unreachable!("row mode never buffers"),
        }
        .and_then(|()| self.sink.commit());

        match result {
            Ok(()) => {
                self.rows_written += ops.len() as u64;
                self.batches_committed += 1;
                Ok(())
            }
            Err(e) => {
                let _ = self.sink.rollback();
                Err(e.context(format!(
                    "flush of {} operations failed for warehouse {}",
                    ops.len(),
                    self.current_unit
                )))
            }
        }
    }
}
