//! Synthesized order-line rows
//!
//! One warehouse unit expands to a fixed grid of rows: 3000 orders with 10
//! order lines each. Rows are immutable once synthesized; strategies turn
//! them into write operations without ever mutating them.
//!
//! The workload fixes most fields: the district id is the warehouse id
//! shifted by 10, the supplying warehouse is the warehouse itself, and the
//! quantity is constant. The delivery timestamp and the amount follow the
//! 2100-order split: the first 2100 orders of a unit are delivered (real
//! timestamp, amount 0.00), the rest are open (no timestamp, random amount).

use crate::random::Nurand;
use chrono::{DateTime, Utc};

/// Orders synthesized per warehouse unit.
pub const ORDERS_PER_WAREHOUSE: u32 = 3000;

/// Order lines per order.
pub const LINES_PER_ORDER: u32 = 10;

/// Orders `1..=DELIVERED_ORDER_CUTOFF` of a unit are delivered.
pub const DELIVERED_ORDER_CUTOFF: u32 = 2100;

/// The workload addresses district `w_id + DISTRICT_OFFSET` of each unit.
pub const DISTRICT_OFFSET: u32 = 10;

/// Fixed line quantity.
pub const LINE_QUANTITY: u32 = 5;

/// Length of the district-info payload string.
pub const DIST_INFO_LEN: i64 = 24;

/// Shard count for bucketed targets; the bucket discriminant of a row is
/// `w_id % BUCKET_COUNT`.
pub const BUCKET_COUNT: u32 = 12;

/// Primary key of an order line: (order, district, warehouse, line number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderLineKey {
    pub o_id: u32,
    pub d_id: u32,
    pub w_id: u32,
    pub number: u32,
}

impl OrderLineKey {
    /// Key of line `number` of order `o_id` within warehouse unit `w_id`.
    pub fn for_line(w_id: u32, o_id: u32, number: u32) -> Self {
        Self {
            o_id,
            d_id: w_id + DISTRICT_OFFSET,
            w_id,
            number,
        }
    }

    /// Bucket discriminant for bucketed targets.
    pub fn bucket(&self) -> u32 {
        self.w_id % BUCKET_COUNT
    }
}

/// One synthesized order line. Immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub o_id: u32,
    pub d_id: u32,
    pub w_id: u32,
    pub number: u32,
    pub item_id: u32,
    pub supply_w_id: u32,
    /// Present for delivered orders only.
    pub delivery_d: Option<DateTime<Utc>>,
    pub quantity: u32,
    /// Two-decimal monetary amount; exactly 0.00 for delivered orders.
    pub amount: f64,
    pub dist_info: String,
}

impl OrderLine {
    /// Synthesize the row for line `number` of order `o_id` in unit `w_id`.
    ///
    /// `item_id` is supplied by the caller because write modes differ in
    /// their payload (uniform random vs a fixed marker value). The delivery
    /// timestamp and amount follow the 2100-order split.
    pub fn synthesize(rnd: &mut Nurand, w_id: u32, o_id: u32, number: u32, item_id: u32) -> Self {
        let delivered = o_id <= DELIVERED_ORDER_CUTOFF;
        Self {
            o_id,
            d_id: w_id + DISTRICT_OFFSET,
            w_id,
            number,
            item_id,
            supply_w_id: w_id,
            delivery_d: delivered.then(Utc::now),
            quantity: LINE_QUANTITY,
            amount: if delivered {
                0.00
            } else {
                rnd.next_long(1, 999_999) as f64 / 100.0
            },
            dist_info: rnd.a_string(DIST_INFO_LEN, DIST_INFO_LEN),
        }
    }

    /// Primary key of this row.
    pub fn key(&self) -> OrderLineKey {
        OrderLineKey {
            o_id: self.o_id,
            d_id: self.d_id,
            w_id: self.w_id,
            number: self.number,
        }
    }
}
