//! TPC-C name and address synthesis.
//!
//! Last names are built from three syllables indexed by the digits of a
//! number in 0..=999. Loaded customers with id <= 1000 get the name of
//! (id - 1); everybody else, and every by-name lookup, draws the number
//! through NURand so lookups hit a skewed but populated set of names.

use crate::rng::WorkerRng;

/// NURand constant for last names. Fixed for the lifetime of a dataset
/// so that lookups and loaded rows agree on the distribution.
pub const C_LAST: i32 = 173;

const SYLLABLES: [&str; 10] = [
    "BAR", "OUGHT", "ABLE", "PRI", "PRES", "ESE", "ANTI", "CALLY", "ATION", "EING",
];

pub const MIDDLE_NAME: &str = "OE";

/// Street, city, state and zip for warehouses, districts and customers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub street_1: String,
    pub street_2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

pub struct NameGenerator;

impl NameGenerator {
    /// Syllable name for `number` in 0..=999.
    pub fn last_name(number: i32) -> String {
        let n = number.rem_euclid(1000) as usize;
        format!(
            "{}{}{}",
            SYLLABLES[n / 100],
            SYLLABLES[(n / 10) % 10],
            SYLLABLES[n % 10]
        )
    }

    /// Non-uniform last name used by Payment and Order-Status lookups.
    pub fn random_last_name(rng: &mut WorkerRng) -> String {
        Self::last_name(rng.nurand(255, 0, 999, C_LAST))
    }

    /// Last name for a loaded customer.
    pub fn customer_last_name(c_id: i32, rng: &mut WorkerRng) -> String {
        if c_id <= 1000 {
            Self::last_name(c_id - 1)
        } else {
            Self::random_last_name(rng)
        }
    }

    pub fn first_name(rng: &mut WorkerRng) -> String {
        rng.alpha_string_between(8, 16)
    }

    pub fn address(rng: &mut WorkerRng) -> Address {
        Address {
            street_1: rng.alpha_string_between(10, 20),
            street_2: rng.alpha_string_between(10, 20),
            city: rng.alpha_string_between(10, 20),
            state: rng.alpha_string(2).to_uppercase(),
            zip: format!("{}11111", rng.numeric_string(4)),
        }
    }
}
