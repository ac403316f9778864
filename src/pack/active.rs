//! Active pack-size set: versioned snapshots behind a swap.
//!
//! Readers clone an `Arc<PackSizeSnapshot>` under a read lock that is held
//! only for the clone, so a calculation keeps one complete set for its whole
//! run no matter how many replacements land meanwhile. Writers serialise on
//! `writer`, persist to the store, then swap the published snapshot.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info};

use super::plan::ShipmentPlan;
use super::sizes::PackSizeSet;
use super::solver::{PackCalculator, validate_amount};
use super::PackLimits;
use crate::error::{AppError, PackError};
use crate::store::{MemoryStore, PackSizeStore};

/// One immutable generation of the pack-size set.
#[derive(Debug)]
pub struct PackSizeSnapshot {
    version: u64,
    sizes: PackSizeSet,
    calculator: PackCalculator,
}

impl PackSizeSnapshot {
    fn new(version: u64, sizes: PackSizeSet) -> Self {
        let calculator = PackCalculator::new(&sizes);
        Self { version, sizes, calculator }
    }

    /// Starts at 1 and increases by one per replace.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn sizes(&self) -> &PackSizeSet {
        &self.sizes
    }

    /// Calculator bound to this generation; its residue tables are built on
    /// first use and dropped with the snapshot.
    pub fn calculator(&self) -> &PackCalculator {
        &self.calculator
    }
}

pub struct PackSizeConfig {
    current: RwLock<Arc<PackSizeSnapshot>>,
    writer: Mutex<()>,
    store: Arc<dyn PackSizeStore>,
    limits: PackLimits,
}

impl PackSizeConfig {
    /// Load the set from `store`, seeding `defaults` when the store is empty.
    pub fn open(
        store: Arc<dyn PackSizeStore>,
        defaults: &[u64],
        limits: PackLimits,
    ) -> Result<Self, AppError> {
        let stored = store.load()?;
        let sizes = if stored.is_empty() {
            let sizes = PackSizeSet::from_sizes(defaults, limits)?;
            store.save(sizes.as_slice())?;
            info!(store = store.store_type(), sizes = ?sizes.as_slice(), "seeded default pack sizes");
            sizes
        } else {
            PackSizeSet::from_sizes(&stored, limits)?
        };

        Ok(Self {
            current: RwLock::new(Arc::new(PackSizeSnapshot::new(1, sizes))),
            writer: Mutex::new(()),
            store,
            limits,
        })
    }

    /// Memory-backed config seeded with `defaults`.
    pub fn in_memory(defaults: &[u64], limits: PackLimits) -> Result<Self, AppError> {
        Self::open(Arc::new(MemoryStore::new()), defaults, limits)
    }

    /// The current snapshot. Never blocks on a running calculation.
    pub fn snapshot(&self) -> Arc<PackSizeSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current sizes, largest first.
    pub fn get(&self) -> PackSizeSet {
        self.snapshot().sizes().clone()
    }

    /// Validate `sizes`, persist them and publish them as the new set.
    ///
    /// Validation failures come back as [`AppError::Pack`]; the published set
    /// and the store are untouched in that case.
    pub fn replace(&self, sizes: &[i64]) -> Result<PackSizeSet, AppError> {
        let next = PackSizeSet::parse(sizes, self.limits)?;

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.save(next.as_slice())?;

        let version = self.snapshot().version() + 1;
        let snapshot = Arc::new(PackSizeSnapshot::new(version, next.clone()));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

        info!(version, sizes = ?next.as_slice(), "pack sizes replaced");
        Ok(next)
    }

    /// Plan `amount` against the snapshot current at entry.
    pub fn calculate(&self, amount: i64) -> Result<ShipmentPlan, PackError> {
        let amount = validate_amount(amount, self.limits.max_amount)?;
        let snapshot = self.snapshot();
        debug!(amount, version = snapshot.version(), "calculating");
        snapshot.calculator().calculate(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::pack::DEFAULT_PACK_SIZES;

    fn config() -> PackSizeConfig {
        PackSizeConfig::in_memory(&DEFAULT_PACK_SIZES, PackLimits::default()).unwrap()
    }

    #[test]
    fn seeds_defaults_into_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let cfg = PackSizeConfig::open(store.clone(), &DEFAULT_PACK_SIZES, PackLimits::default())
            .unwrap();
        assert_eq!(cfg.get().as_slice(), &[5000, 2000, 1000, 500, 250]);
        assert_eq!(store.load().unwrap(), vec![5000, 2000, 1000, 500, 250]);
        assert_eq!(cfg.snapshot().version(), 1);
    }

    #[test]
    fn existing_store_contents_win_over_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.save(&[53, 31, 23]).unwrap();
        let cfg = PackSizeConfig::open(store, &DEFAULT_PACK_SIZES, PackLimits::default()).unwrap();
        assert_eq!(cfg.get().as_slice(), &[53, 31, 23]);
    }

    #[test]
    fn invalid_defaults_fail_open() {
        let result = PackSizeConfig::in_memory(&[], PackLimits::default());
        assert!(matches!(result, Err(AppError::Pack(PackError::EmptyPackSizeSet))));
    }

    #[test]
    fn replace_publishes_new_version() {
        let cfg = config();
        let set = cfg.replace(&[31, 23, 53]).unwrap();
        assert_eq!(set.as_slice(), &[53, 31, 23]);
        assert_eq!(cfg.get(), set);
        assert_eq!(cfg.snapshot().version(), 2);
    }

    #[test]
    fn replace_writes_through_to_store() {
        let store = Arc::new(MemoryStore::new());
        let cfg = PackSizeConfig::open(store.clone(), &DEFAULT_PACK_SIZES, PackLimits::default())
            .unwrap();
        cfg.replace(&[10, 20]).unwrap();
        assert_eq!(store.load().unwrap(), vec![20, 10]);
    }

    #[test]
    fn replace_rejects_empty_and_negative() {
        let cfg = config();
        assert!(matches!(cfg.replace(&[]), Err(AppError::Pack(PackError::EmptyPackSizeSet))));
        assert!(matches!(
            cfg.replace(&[100, -5]),
            Err(AppError::Pack(PackError::InvalidPackSize(_)))
        ));
        assert_eq!(cfg.get().as_slice(), &[5000, 2000, 1000, 500, 250]);
        assert_eq!(cfg.snapshot().version(), 1);
    }

    #[test]
    fn replace_respects_max_pack_size() {
        let limits = PackLimits { max_amount: 1_000, max_pack_size: 100, max_sizes: 4 };
        let cfg = PackSizeConfig::in_memory(&[10, 20], limits).unwrap();
        assert!(matches!(
            cfg.replace(&[50, 101]),
            Err(AppError::Pack(PackError::InvalidPackSize(_)))
        ));
    }

    #[test]
    fn replace_respects_max_sizes() {
        let limits = PackLimits { max_amount: 1_000, max_pack_size: 100, max_sizes: 4 };
        let cfg = PackSizeConfig::in_memory(&[10, 20], limits).unwrap();
        assert!(matches!(
            cfg.replace(&[1, 2, 3, 4, 5]),
            Err(AppError::Pack(PackError::InvalidPackSize(_)))
        ));
        assert_eq!(cfg.replace(&[1, 2, 3, 4]).unwrap().as_slice(), &[4, 3, 2, 1]);
    }

    /// Accepts the seeding write, then fails every save once `broken` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        broken: AtomicBool,
    }

    impl PackSizeStore for FlakyStore {
        fn store_type(&self) -> &str {
            "flaky"
        }

        fn load(&self) -> Result<Vec<u64>, AppError> {
            self.inner.load()
        }

        fn save(&self, sizes: &[u64]) -> Result<(), AppError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(AppError::Store("disk full".into()));
            }
            self.inner.save(sizes)
        }
    }

    #[test]
    fn failed_store_write_leaves_set_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let cfg = PackSizeConfig::open(store.clone(), &[500, 250], PackLimits::default()).unwrap();
        store.broken.store(true, Ordering::SeqCst);

        assert!(matches!(cfg.replace(&[7]), Err(AppError::Store(_))));
        assert_eq!(cfg.get().as_slice(), &[500, 250]);
        assert_eq!(cfg.snapshot().version(), 1);
        assert_eq!(store.load().unwrap(), vec![500, 250]);

        store.broken.store(false, Ordering::SeqCst);
        cfg.replace(&[7]).unwrap();
        assert_eq!(cfg.snapshot().version(), 2);
    }

    #[test]
    fn calculate_uses_current_set() {
        let cfg = config();
        assert_eq!(cfg.calculate(501).unwrap().pack_count(), 2);
        cfg.replace(&[1000]).unwrap();
        let plan = cfg.calculate(501).unwrap();
        assert_eq!(plan.count(1000), 1);
        assert_eq!(plan.pack_count(), 1);
    }

    #[test]
    fn calculate_validates_amount() {
        let limits = PackLimits { max_amount: 1_000, ..PackLimits::default() };
        let cfg = PackSizeConfig::in_memory(&DEFAULT_PACK_SIZES, limits).unwrap();
        assert!(matches!(cfg.calculate(-1), Err(PackError::InvalidAmount(_))));
        assert!(matches!(cfg.calculate(1_001), Err(PackError::InvalidAmount(_))));
        assert!(cfg.calculate(1_000).is_ok());
    }

    #[test]
    fn held_snapshot_survives_replace() {
        let cfg = config();
        let before = cfg.snapshot();
        cfg.replace(&[7]).unwrap();
        assert_eq!(before.sizes().as_slice(), &[5000, 2000, 1000, 500, 250]);
        assert_eq!(before.calculator().calculate(251).unwrap().count(500), 1);
        assert_eq!(cfg.snapshot().sizes().as_slice(), &[7]);
    }

    #[test]
    fn concurrent_replace_and_calculate_never_mix_sets() {
        const SETS: [&[i64]; 2] = [&[250, 500, 1000, 2000, 5000], &[23, 31, 53]];
        let cfg = Arc::new(config());

        let writer = {
            let cfg = cfg.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    cfg.replace(SETS[i % 2]).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cfg = cfg.clone();
                std::thread::spawn(move || {
                    for amount in 1..300i64 {
                        let snapshot = cfg.snapshot();
                        let plan = snapshot.calculator().calculate(amount as u64).unwrap();
                        for size in plan.packs().keys() {
                            assert!(snapshot.sizes().contains(*size), "size {size} not in snapshot");
                        }
                        let keys: Vec<i64> = plan.packs().keys().map(|&s| s as i64).collect();
                        let only_defaults = keys.iter().all(|s| SETS[0].contains(s));
                        let only_primes = keys.iter().all(|s| SETS[1].contains(s));
                        assert!(only_defaults || only_primes, "mixed plan {:?}", plan.packs());
                        assert!(plan.items_shipped() >= amount as u64);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cfg.snapshot().version(), 201);
    }
}
