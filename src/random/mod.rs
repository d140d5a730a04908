//! Non-uniform random value generation
//!
//! This module implements the random value generator the workload is built on.
//! The TPC-C specification (clause 2.1.6) requires that the non-uniform draws
//! for item ids, customer ids and customer last names combine a uniform draw
//! with a per-process constant (the "C value") through a bitwise OR, an add
//! and a modulo. All generator instances of one process must share the same
//! C values, while each worker thread needs its own private random stream.
//!
//! # Architecture
//!
//! - [`NurandConstants`] holds the three C values. It is computed exactly once
//!   by a master constructor and shared read-only (`Arc`) by every derived
//!   instance. There is no global state to initialize twice.
//! - [`Nurand`] owns a private xoshiro256++ stream seeded from OS entropy per
//!   instance, so derived generators are uncorrelated.
//!
//! # Load phase vs run phase
//!
//! The load phase draws all three constants fresh. A later run phase must use
//! a C value for the last-name draw that differs from the load-phase value by
//! a controlled margin (clause 2.1.6.1); [`Nurand::run_master`] reproduces
//! that rejection rule.
//!
//! # Example
//!
//! ```
//! use benchload::random::Nurand;
//!
//! let master = Nurand::load_master();
//! let mut rnd = master.derive();
//!
//! let item = rnd.item_id();
//! assert!((1..=100_000).contains(&item));
//! ```

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;

/// Alphanumeric alphabet for synthetic strings: 26 upper, 26 lower, 10 digits.
///
/// The first character of an alphanumeric string is drawn from the 52-letter
/// prefix only; remaining characters use the full alphabet.
const A_STRING_CHARS: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Syllable table for customer last names, indexed by base-10 digit.
const LAST_NAME_SYLLABLES: [&str; 10] = [
    "BAR", "OUGHT", "ABLE", "PRI", "PRES", "ESE", "ANTI", "CALLY", "ATION", "EING",
];

/// Process-wide C values for the non-uniform draws.
///
/// Write-once: a master constructor computes these, after which they are only
/// ever read. Every generator derived from the same master observes the same
/// values through a shared `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NurandConstants {
    /// C value for the last-name draw, in [0, 255].
    pub c_last: i64,
    /// C value for the customer-id draw, in [0, 1023].
    pub c_customer: i64,
    /// C value for the item-id draw, in [0, 8191].
    pub c_item: i64,
}

/// Random value generator bound to one set of C values.
///
/// A master instance is created once per process (load or run phase); every
/// worker thread gets its own instance via [`Nurand::derive`]. Instances are
/// `Send` and intended for exclusive use by a single thread.
pub struct Nurand {
    constants: Arc<NurandConstants>,
    rng: Xoshiro256PlusPlus,
}

impl Nurand {
    /// Create the master generator for a database load.
    ///
    /// Draws all three C values fresh and uniformly.
    pub fn load_master() -> Self {
        Self::load_master_from(Xoshiro256PlusPlus::from_entropy())
    }

    /// Create a load-phase master with a specific stream seed.
    ///
    /// Useful for reproducible tests.
    pub fn load_master_with_seed(seed: u64) -> Self {
        Self::load_master_from(Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    fn load_master_from(mut rng: Xoshiro256PlusPlus) -> Self {
        let constants = NurandConstants {
            c_last: uniform(&mut rng, 0, 255),
            c_customer: uniform(&mut rng, 0, 1023),
            c_item: uniform(&mut rng, 0, 8191),
        };
        Self {
            constants: Arc::new(constants),
            rng,
        }
    }

    /// Create the master generator for a benchmark run.
    ///
    /// `c_last_load` is the last-name C value recorded from the load phase.
    /// The run-phase value is drawn by rejection so that the absolute
    /// difference to the load value is in [65, 119] and is neither 96 nor
    /// 112, as clause 2.1.6.1 requires.
    pub fn run_master(c_last_load: i64) -> Self {
        Self::run_master_from(c_last_load, Xoshiro256PlusPlus::from_entropy())
    }

    /// Create a run-phase master with a specific stream seed.
    pub fn run_master_with_seed(c_last_load: i64, seed: u64) -> Self {
        Self::run_master_from(c_last_load, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    fn run_master_from(c_last_load: i64, mut rng: Xoshiro256PlusPlus) -> Self {
        let c_customer = uniform(&mut rng, 0, 1023);
        let c_item = uniform(&mut rng, 0, 8191);
        let c_last = loop {
            let candidate = uniform(&mut rng, 0, 255);
            let delta = (candidate - c_last_load).abs();
            if delta == 96 || delta == 112 {
                continue;
            }
            if !(65..=119).contains(&delta) {
                continue;
            }
            break candidate;
        };
        Self {
            constants: Arc::new(NurandConstants {
                c_last,
                c_customer,
                c_item,
            }),
            rng,
        }
    }

    /// Derive a generator for another worker thread.
    ///
    /// The child shares this generator's C values and owns a fresh stream
    /// seeded from OS entropy, so sibling outputs are uncorrelated.
    pub fn derive(&self) -> Self {
        Self {
            constants: Arc::clone(&self.constants),
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Derive a generator with a specific stream seed (for tests).
    pub fn derive_with_seed(&self, seed: u64) -> Self {
        Self {
            constants: Arc::clone(&self.constants),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// The C values this generator was initialized with.
    pub fn constants(&self) -> NurandConstants {
        *self.constants
    }

    /// Produce a number uniformly distributed in [low, high].
    pub fn next_long(&mut self, low: i64, high: i64) -> i64 {
        uniform(&mut self.rng, low, high)
    }

    /// Produce a number uniformly distributed in [low, high].
    pub fn next_int(&mut self, low: i32, high: i32) -> i32 {
        uniform(&mut self.rng, low as i64, high as i64) as i32
    }

    /// Produce a non-uniform random item id in [1, 100000].
    pub fn item_id(&mut self) -> u32 {
        let draw = self.next_long(0, 8191) | self.next_long(1, 100_000);
        (((draw + self.constants.c_item) % 100_000) + 1) as u32
    }

    /// Produce a non-uniform random customer id in [1, 3000].
    pub fn customer_id(&mut self) -> u32 {
        let draw = self.next_long(0, 1023) | self.next_long(1, 3000);
        (((draw + self.constants.c_customer) % 3000) + 1) as u32
    }

    /// Produce a non-uniform random last-name index in [0, 999].
    pub fn last_name_index(&mut self) -> u32 {
        let draw = self.next_long(0, 255) | self.next_long(0, 999);
        ((draw + self.constants.c_last) % 1000) as u32
    }

    /// Map a last-name index in [0, 999] to its syllable representation.
    ///
    /// Pure: the index is decomposed into three base-10 digits (most
    /// significant first) and each digit selects a fixed syllable.
    pub fn last_name(index: u32) -> String {
        let mut num = index;
        let mut result = String::new();
        for _ in 0..3 {
            result.insert_str(0, LAST_NAME_SYLLABLES[(num % 10) as usize]);
            num /= 10;
        }
        result
    }

    /// Produce a non-uniform random customer last name.
    pub fn random_last_name(&mut self) -> String {
        let index = self.last_name_index();
        Self::last_name(index)
    }

    /// Produce a random alphanumeric string of length [min, max].
    ///
    /// The character set is alphanumeric only; clause 4.3.2.2 constrains the
    /// storage character set, not the generated values, and staying inside
    /// ASCII avoids UTF-8 trouble in text sinks. The first character is a
    /// letter, the rest draw from the full 62-char alphabet.
    pub fn a_string(&mut self, min: i64, max: i64) -> String {
        if max <= 0 {
            return String::new();
        }
        let len = self.next_long(min, max);
        let mut result = String::with_capacity(len.max(1) as usize);
        result.push(A_STRING_CHARS[self.next_long(0, 51) as usize] as char);
        let mut have = 1;
        while have < len {
            result.push(A_STRING_CHARS[self.next_long(0, 61) as usize] as char);
            have += 1;
        }
        result
    }

    /// Produce a random numeric string of length [min, max].
    pub fn n_string(&mut self, min: i64, max: i64) -> String {
        let len = self.next_long(min, max);
        let mut result = String::new();
        let mut have = 0;
        while have < len {
            result.push(self.next_long('0' as i64, '9' as i64) as u8 as char);
            have += 1;
        }
        result
    }

    /// Produce a random two-letter state code.
    pub fn state_code(&mut self) -> String {
        let mut result = String::with_capacity(2);
        result.push(self.next_int('A' as i32, 'Z' as i32) as u8 as char);
        result.push(self.next_int('A' as i32, 'Z' as i32) as u8 as char);
        result
    }
}

/// Uniform draw in [low, high] from a continuous draw in [0, 1).
///
/// `floor(draw * (high - low + 1)) + low`; the draw is strictly below 1.0 so
/// the result never exceeds `high`, and `low == high` always yields `low`.
fn uniform(rng: &mut Xoshiro256PlusPlus, low: i64, high: i64) -> i64 {
    (rng.gen::<f64>() * (high - low + 1) as f64) as i64 + low
}
