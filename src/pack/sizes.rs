//! Validated pack-size sets.

use super::PackLimits;
use crate::error::PackError;

/// Sizes seeded into an empty store at startup.
pub const DEFAULT_PACK_SIZES: [u64; 5] = [250, 500, 1000, 2000, 5000];

/// Distinct, positive pack sizes ordered largest first.
///
/// Construction rejects duplicates instead of folding them so that a `PUT`
/// either applies exactly what was sent or fails.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackSizeSet {
    sizes: Vec<u64>,
}

impl PackSizeSet {
    /// Validate raw client input (may contain zero or negative values).
    pub fn parse(sizes: &[i64], limits: PackLimits) -> Result<Self, PackError> {
        let positive = sizes
            .iter()
            .map(|&s| {
                u64::try_from(s)
                    .ok()
                    .filter(|&s| s > 0)
                    .ok_or_else(|| PackError::InvalidPackSize(format!("{s} is not a positive integer")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_sizes(&positive, limits)
    }

    /// Validate sizes that are already unsigned (store contents, config defaults).
    pub fn from_sizes(sizes: &[u64], limits: PackLimits) -> Result<Self, PackError> {
        if sizes.is_empty() {
            return Err(PackError::EmptyPackSizeSet);
        }
        if sizes.len() > limits.max_sizes {
            return Err(PackError::InvalidPackSize(format!(
                "{} sizes given, at most {} are allowed",
                sizes.len(),
                limits.max_sizes
            )));
        }

        let mut sorted = sizes.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));

        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(PackError::InvalidPackSize(format!("{} is listed more than once", pair[0])));
            }
        }
        if sorted.last() == Some(&0) {
            return Err(PackError::InvalidPackSize("0 is not a positive integer".into()));
        }
        if sorted[0] > limits.max_pack_size {
            return Err(PackError::InvalidPackSize(format!(
                "{} exceeds the maximum pack size of {}",
                sorted[0], limits.max_pack_size
            )));
        }

        Ok(Self { sizes: sorted })
    }

    /// Sizes, largest first.
    pub fn as_slice(&self) -> &[u64] {
        &self.sizes
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.sizes.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn contains(&self, size: u64) -> bool {
        self.sizes.binary_search_by(|probe| size.cmp(probe)).is_ok()
    }
}
