//! Shipment plans returned by the calculator.

use std::collections::BTreeMap;

use serde::Serialize;

/// Packs to ship for one request: pack size → number of packs.
///
/// Only sizes with a non-zero count are stored, so an empty map means nothing
/// ships. Serialises as `{"packs": {"<size>": count, ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentPlan {
    #[serde(skip)]
    amount: u64,
    packs: BTreeMap<u64, u64>,
}

impl ShipmentPlan {
    pub(crate) fn empty(amount: u64) -> Self {
        Self { amount, packs: BTreeMap::new() }
    }

    pub(crate) fn from_counts(amount: u64, counts: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let mut packs = BTreeMap::new();
        for (size, count) in counts {
            if count > 0 {
                *packs.entry(size).or_insert(0) += count;
            }
        }
        Self { amount, packs }
    }

    /// Amount the plan was computed for.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn packs(&self) -> &BTreeMap<u64, u64> {
        &self.packs
    }

    /// Number of packs of `size` (zero if unused).
    pub fn count(&self, size: u64) -> u64 {
        self.packs.get(&size).copied().unwrap_or(0)
    }

    pub fn items_shipped(&self) -> u64 {
        self.packs.iter().map(|(size, count)| size * count).sum()
    }

    pub fn pack_count(&self) -> u64 {
        self.packs.values().sum()
    }

    /// Items shipped beyond the requested amount.
    pub fn overage(&self) -> u64 {
        self.items_shipped().saturating_sub(self.amount)
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}
