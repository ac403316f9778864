//! Pack calculator: minimal-overage, fewest-pack shipment plans.
//!
//! The search runs in two stages over residue classes, so table sizes depend
//! on the pack sizes and never on the requested amount.
//!
//! 1. **Minimal total.** Shortest paths modulo the smallest size `m` give the
//!    smallest representable total in every residue class. Any larger total
//!    in a class is representable by adding `m`-packs, so the minimal total
//!    `>= amount` lies in `[amount, amount + m - 1]`, inside the wider
//!    `[amount, amount + max - 1]` window (drop any pack from a plan beyond
//!    it and the amount is still covered).
//! 2. **Fewest packs for that total.** A plan is `q` packs of the largest
//!    size `M` plus smaller packs summing to `R`, and
//!    `M * packs = total + Σ cᵢ (M - sᵢ)`. Shortest paths modulo `M` with
//!    edge weight `M - sᵢ` therefore minimise the pack count. The residue
//!    path is only usable when `R <= total`; a shortest path visits each
//!    residue once, so `R < M²` and large totals always qualify. Small totals
//!    go through a direct DP over `[0, total]` instead.
//!
//! Ties on pack count resolve to the count vector that is lexicographically
//! greatest when read largest size first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::OnceLock;

use tracing::debug;

use super::plan::ShipmentPlan;
use super::sizes::PackSizeSet;
use crate::error::PackError;

const UNREACHABLE: u64 = u64::MAX;

/// Totals up to this many largest packs are solved with the direct DP.
const DIRECT_WINDOW_PACKS: u64 = 4;

/// Check a client-supplied amount against `0..=max_amount`.
pub fn validate_amount(amount: i64, max_amount: u64) -> Result<u64, PackError> {
    let amount = u64::try_from(amount)
        .map_err(|_| PackError::InvalidAmount(format!("amount must be >= 0, got {amount}")))?;
    if amount > max_amount {
        return Err(PackError::InvalidAmount(format!(
            "amount must be <= {max_amount}, got {amount}"
        )));
    }
    Ok(amount)
}

/// Computes shipment plans for one fixed pack-size set.
///
/// Residue tables are built on first use and kept for the calculator's
/// lifetime; a new size set means a new calculator.
#[derive(Debug)]
pub struct PackCalculator {
    /// Largest first.
    sizes: Vec<u64>,
    cover: OnceLock<CoverTable>,
    count: OnceLock<CountTable>,
}

impl PackCalculator {
    pub fn new(sizes: &PackSizeSet) -> Self {
        Self {
            sizes: sizes.to_vec(),
            cover: OnceLock::new(),
            count: OnceLock::new(),
        }
    }

    /// Plan the packs for `amount` items.
    ///
    /// `amount == 0` yields an empty plan whatever the sizes are.
    pub fn calculate(&self, amount: u64) -> Result<ShipmentPlan, PackError> {
        if amount == 0 {
            return Ok(ShipmentPlan::empty(0));
        }
        let total = self
            .minimal_total(amount)
            .ok_or(PackError::NoPackSizesConfigured)?;
        let largest = self.sizes[0];

        let counts = if total <= largest.saturating_mul(DIRECT_WINDOW_PACKS) {
            fewest_packs_direct(&self.sizes, total)
        } else {
            let table = self.count.get_or_init(|| CountTable::build(&self.sizes));
            match table.fewest_packs(total) {
                Some(counts) => counts,
                None => {
                    debug!(amount, total, "residue path overshoots total, using direct table");
                    fewest_packs_direct(&self.sizes, total)
                }
            }
        };

        let plan = ShipmentPlan::from_counts(amount, counts);
        debug!(
            amount,
            total = plan.items_shipped(),
            overage = plan.overage(),
            packs = plan.pack_count(),
            "plan computed"
        );
        Ok(plan)
    }

    /// Smallest total `>= amount` expressible with the configured sizes, or
    /// `None` when there are no sizes.
    pub fn minimal_total(&self, amount: u64) -> Option<u64> {
        if self.sizes.is_empty() {
            return None;
        }
        let table = self.cover.get_or_init(|| CoverTable::build(&self.sizes));
        Some(table.min_total(amount))
    }
}

// ── Stage 1: smallest representable total per residue of the smallest size ──

#[derive(Debug)]
struct CoverTable {
    modulus: u64,
    /// `dist[r]` = smallest representable total `≡ r (mod modulus)`.
    dist: Vec<u64>,
}

impl CoverTable {
    fn build(sizes: &[u64]) -> Self {
        let modulus = sizes[sizes.len() - 1];
        let mut dist = vec![UNREACHABLE; modulus as usize];
        dist[0] = 0;

        let mut heap = BinaryHeap::from([Reverse((0u64, 0usize))]);
        while let Some(Reverse((reached, residue))) = heap.pop() {
            if reached > dist[residue] {
                continue;
            }
            for &size in sizes {
                let next = reached + size;
                let next_residue = (next % modulus) as usize;
                if next < dist[next_residue] {
                    dist[next_residue] = next;
                    heap.push(Reverse((next, next_residue)));
                }
            }
        }

        Self { modulus, dist }
    }

    fn min_total(&self, amount: u64) -> u64 {
        let lift = |base: u64| {
            if base >= amount {
                base
            } else {
                base + (amount - base).div_ceil(self.modulus) * self.modulus
            }
        };
        self.dist
            .iter()
            .filter(|&&base| base != UNREACHABLE)
            .map(|&base| lift(base))
            .fold(lift(0), u64::min)
    }
}

// ── Stage 2: fewest packs per residue of the largest size ────────────────────

/// Path cost to a residue: extra weight `Σ (M - sᵢ)` then number of small packs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PathKey {
    weight: u64,
    packs: u64,
}

const UNSET: PathKey = PathKey { weight: u64::MAX, packs: u64::MAX };
const ORIGIN: PathKey = PathKey { weight: 0, packs: 0 };

#[derive(Debug)]
struct CountTable {
    modulus: u64,
    /// Every size except the largest, largest first.
    small: Vec<u64>,
    keys: Vec<PathKey>,
}

impl CountTable {
    fn build(sizes: &[u64]) -> Self {
        let modulus = sizes[0];
        let small = sizes[1..].to_vec();
        let mut keys = vec![UNSET; modulus as usize];
        keys[0] = ORIGIN;

        let mut heap = BinaryHeap::from([Reverse((ORIGIN, 0usize))]);
        while let Some(Reverse((key, residue))) = heap.pop() {
            if key > keys[residue] {
                continue;
            }
            for &size in &small {
                let next = PathKey {
                    weight: key.weight + (modulus - size),
                    packs: key.packs + 1,
                };
                let next_residue = ((residue as u64 + size) % modulus) as usize;
                if next < keys[next_residue] {
                    keys[next_residue] = next;
                    heap.push(Reverse((next, next_residue)));
                }
            }
        }

        Self { modulus, small, keys }
    }

    /// `(size, count)` pairs for exactly `total`, or `None` when the cheapest
    /// small-pack path for the residue sums past `total`.
    fn fewest_packs(&self, total: u64) -> Option<Vec<(u64, u64)>> {
        let modulus = self.modulus;
        let mut residue = (total % modulus) as usize;
        let key = self.keys[residue];
        if key == UNSET {
            return None;
        }
        let small_total = modulus * key.packs - key.weight;
        if small_total > total {
            return None;
        }

        // Walk back along the path, preferring the largest size at each step.
        let mut tally = vec![0u64; self.small.len()];
        while self.keys[residue].packs > 0 {
            let current = self.keys[residue];
            let (index, previous) = self.small.iter().enumerate().find_map(|(index, &size)| {
                let previous = ((residue as u64 + modulus - size) % modulus) as usize;
                let key = self.keys[previous];
                let on_path = key != UNSET
                    && key.weight + (modulus - size) == current.weight
                    && key.packs + 1 == current.packs;
                on_path.then_some((index, previous))
            })?;
            tally[index] += 1;
            residue = previous;
        }

        let mut counts = Vec::with_capacity(self.small.len() + 1);
        counts.push((modulus, (total - small_total) / modulus));
        counts.extend(self.small.iter().copied().zip(tally));
        Some(counts)
    }
}

// ── Direct DP over totals ─────────────────────────────────────────────────────

/// Fewest packs summing to exactly `total` (which must be representable),
/// reconstructed largest size first.
fn fewest_packs_direct(sizes: &[u64], total: u64) -> Vec<(u64, u64)> {
    const NONE: u32 = u32::MAX;

    let len = total as usize + 1;
    let mut packs = vec![NONE; len];
    packs[0] = 0;
    for t in 1..len {
        let mut best = NONE;
        for &size in sizes {
            let size = size as usize;
            if size <= t && packs[t - size] != NONE && packs[t - size] + 1 < best {
                best = packs[t - size] + 1;
            }
        }
        packs[t] = best;
    }

    let mut tally = vec![0u64; sizes.len()];
    let mut remaining = total as usize;
    'walk: while remaining > 0 {
        for (index, &size) in sizes.iter().enumerate() {
            let size = size as usize;
            if size <= remaining
                && packs[remaining - size] != NONE
                && packs[remaining - size] + 1 == packs[remaining]
            {
                tally[index] += 1;
                remaining -= size;
                continue 'walk;
            }
        }
        break;
    }
    debug_assert_eq!(remaining, 0, "total {total} is not representable");

    sizes.iter().copied().zip(tally).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::pack::PackLimits;

    const UNBOUNDED: PackLimits = PackLimits {
        max_amount: u64::MAX,
        max_pack_size: u64::MAX,
        max_sizes: usize::MAX,
    };

    fn calculator(sizes: &[u64]) -> PackCalculator {
        PackCalculator::new(&PackSizeSet::from_sizes(sizes, UNBOUNDED).unwrap())
    }

    fn plan(sizes: &[u64], amount: u64) -> BTreeMap<u64, u64> {
        calculator(sizes).calculate(amount).unwrap().packs().clone()
    }

    fn packs(pairs: &[(u64, u64)]) -> BTreeMap<u64, u64> {
        pairs.iter().copied().collect()
    }

    const DEFAULTS: [u64; 5] = [250, 500, 1000, 2000, 5000];

    #[test]
    fn default_set_examples() {
        assert_eq!(plan(&DEFAULTS, 1), packs(&[(250, 1)]));
        assert_eq!(plan(&DEFAULTS, 250), packs(&[(250, 1)]));
        assert_eq!(plan(&DEFAULTS, 251), packs(&[(500, 1)]));
        assert_eq!(plan(&DEFAULTS, 501), packs(&[(500, 1), (250, 1)]));
        assert_eq!(
            plan(&DEFAULTS, 12001),
            packs(&[(5000, 2), (2000, 1), (250, 1)])
        );
    }

    #[test]
    fn order_12001_totals() {
        let plan = calculator(&DEFAULTS).calculate(12001).unwrap();
        assert_eq!(plan.items_shipped(), 12250);
        assert_eq!(plan.overage(), 249);
        assert_eq!(plan.pack_count(), 4);
    }

    #[test]
    fn zero_amount_is_empty_plan() {
        assert!(calculator(&DEFAULTS).calculate(0).unwrap().is_empty());
        let empty = PackCalculator::new(&PackSizeSet::default());
        assert!(empty.calculate(0).unwrap().is_empty());
    }

    #[test]
    fn empty_sizes_error() {
        let empty = PackCalculator::new(&PackSizeSet::default());
        assert_eq!(empty.calculate(10), Err(PackError::NoPackSizesConfigured));
        assert_eq!(empty.minimal_total(10), None);
    }

    #[test]
    fn large_amount_fills_exactly() {
        assert_eq!(
            plan(&[23, 31, 53], 500_000),
            packs(&[(23, 2), (31, 7), (53, 9429)])
        );
        assert_eq!(plan(&[23, 31, 53], 1_000_000), packs(&[(31, 5), (53, 18865)]));
    }

    #[test]
    fn large_amount_on_default_set() {
        assert_eq!(plan(&DEFAULTS, 10_000_000), packs(&[(5000, 2000)]));
        assert_eq!(plan(&DEFAULTS, 9_999_999), packs(&[(5000, 2000)]));
    }

    #[test]
    fn residue_path_overshoot_falls_back() {
        // 656 > 4 * 96, but the cheapest residue path sums past 656.
        assert_eq!(plan(&[58, 95, 96], 656), packs(&[(96, 2), (58, 8)]));
        assert_eq!(plan(&[46, 82, 103], 624), packs(&[(82, 2), (46, 10)]));
    }

    #[test]
    fn non_coprime_sizes_round_up() {
        assert_eq!(plan(&[6, 10, 15], 1), packs(&[(6, 1)]));
        assert_eq!(plan(&[6, 10, 15], 29), packs(&[(15, 2)]));
        assert_eq!(calculator(&[6, 10, 15]).minimal_total(29), Some(30));
    }

    #[test]
    fn single_size() {
        assert_eq!(plan(&[7], 15), packs(&[(7, 3)]));
        assert_eq!(plan(&[7], 7_000_001), packs(&[(7, 1_000_001)]));
    }

    #[test]
    fn prefers_fewer_packs_over_smaller_sizes() {
        assert_eq!(plan(&[3, 5], 7), packs(&[(5, 1), (3, 1)]));
        // 9 = 3+3+3 = 4+5; two packs win.
        assert_eq!(plan(&[3, 4, 5], 9), packs(&[(5, 1), (4, 1)]));
    }

    #[test]
    fn tie_prefers_larger_sizes() {
        // 12 = 6+6 = 5+7; the 7 makes the second plan win.
        assert_eq!(plan(&[5, 6, 7], 12), packs(&[(7, 1), (5, 1)]));
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let calc = calculator(&[23, 31, 53]);
        let first = calc.calculate(77_777).unwrap();
        for _ in 0..3 {
            assert_eq!(calc.calculate(77_777).unwrap(), first);
        }
        assert_eq!(first.amount(), 77_777);
    }

    #[test]
    fn residue_and_direct_tables_agree() {
        let desc = [41u64, 29, 17];
        let count_table = CountTable::build(&desc);
        for total in 2_000..2_300u64 {
            let Some(residue) = count_table.fewest_packs(total) else {
                continue;
            };
            let direct = fewest_packs_direct(&desc, total);
            let to_map = |v: Vec<(u64, u64)>| -> BTreeMap<u64, u64> {
                v.into_iter().filter(|&(_, c)| c > 0).collect()
            };
            assert_eq!(to_map(residue), to_map(direct), "total {total}");
        }
    }

    #[test]
    fn validate_amount_bounds() {
        assert_eq!(validate_amount(0, 100), Ok(0));
        assert_eq!(validate_amount(100, 100), Ok(100));
        assert!(matches!(validate_amount(-1, 100), Err(PackError::InvalidAmount(_))));
        assert!(matches!(validate_amount(101, 100), Err(PackError::InvalidAmount(_))));
    }
}
