//! Pack engine: size sets, shipment plans and the calculator.
//!
//! ```text
//! PackSizeConfig ──snapshot()──▶ PackSizeSnapshot ──calculator()──▶ PackCalculator
//!        │                              │                               │
//!   replace(sizes)                 version, sizes               calculate(amount)
//!        ▼                                                              ▼
//!   PackSizeStore                                                 ShipmentPlan
//! ```

mod active;
mod plan;
mod sizes;
mod solver;

pub use active::{PackSizeConfig, PackSizeSnapshot};
pub use plan::ShipmentPlan;
pub use sizes::{DEFAULT_PACK_SIZES, PackSizeSet};
pub use solver::{PackCalculator, validate_amount};

/// Upper bounds that keep DP tables bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLimits {
    /// Largest amount a single calculation accepts.
    pub max_amount: u64,
    /// Largest pack size a [`PackSizeSet`] accepts.
    pub max_pack_size: u64,
    /// Most sizes a [`PackSizeSet`] may hold; table builds scale with it.
    pub max_sizes: usize,
}

impl PackLimits {
    pub const DEFAULT_MAX_AMOUNT: u64 = 10_000_000;
    pub const DEFAULT_MAX_PACK_SIZE: u64 = 1_000_000;
    pub const DEFAULT_MAX_SIZES: usize = 32;
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            max_amount: Self::DEFAULT_MAX_AMOUNT,
            max_pack_size: Self::DEFAULT_MAX_PACK_SIZE,
            max_sizes: Self::DEFAULT_MAX_SIZES,
        }
    }
}
