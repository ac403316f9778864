//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the `-f` path), then applies
//! `PACKCALC_BIND`, `PACKCALC_LOG_LEVEL`, `PACKCALC_STORE` and
//! `PACKCALC_DB_PATH`. Without a config file a built-in default applies.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;
use crate::pack::{DEFAULT_PACK_SIZES, PackLimits};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,
}

/// Which [`PackSizeStore`](crate::store::PackSizeStore) backs the size set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl StoreBackend {
    fn parse(name: &str) -> Result<Self, AppError> {
        match name {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(AppError::Config(format!(
                "unknown store backend '{other}' (expected \"memory\" or \"sqlite\")"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file (already expanded, no `~`). Ignored by the memory backend.
    pub path: PathBuf,
}

/// Pack engine configuration.
#[derive(Debug, Clone)]
pub struct PacksConfig {
    /// Seeded into an empty store at startup.
    pub defaults: Vec<u64>,
    pub limits: PackLimits,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub server: ServerConfig,
    pub packs: PacksConfig,
    pub store: StoreConfig,
}

/// Env-var overrides, captured once so tests can pass them explicitly.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub store: Option<String>,
    pub db_path: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            bind: env::var("PACKCALC_BIND").ok(),
            log_level: env::var("PACKCALC_LOG_LEVEL").ok(),
            store: env::var("PACKCALC_STORE").ok(),
            db_path: env::var("PACKCALC_DB_PATH").ok(),
        }
    }
}

/// Raw TOML shape, deserialized before resolution.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    packs: RawPacks,
    #[serde(default)]
    store: RawStore,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPacks {
    #[serde(default = "default_pack_sizes")]
    defaults: Vec<u64>,
    #[serde(default = "default_max_amount")]
    max_amount: u64,
    #[serde(default = "default_max_pack_size")]
    max_pack_size: u64,
    #[serde(default = "default_max_sizes")]
    max_sizes: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStore {
    /// Defaults to `"memory"` so a bare checkout runs without touching disk.
    #[serde(default = "default_store_backend")]
    backend: String,
    #[serde(default = "default_db_path")]
    path: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind(), log_level: default_log_level() }
    }
}

impl Default for RawPacks {
    fn default() -> Self {
        Self {
            defaults: default_pack_sizes(),
            max_amount: default_max_amount(),
            max_pack_size: default_max_pack_size(),
            max_sizes: default_max_sizes(),
        }
    }
}

impl Default for RawStore {
    fn default() -> Self {
        Self { backend: default_store_backend(), path: default_db_path() }
    }
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_pack_sizes() -> Vec<u64> { DEFAULT_PACK_SIZES.to_vec() }
fn default_max_amount() -> u64 { PackLimits::DEFAULT_MAX_AMOUNT }
fn default_max_pack_size() -> u64 { PackLimits::DEFAULT_MAX_PACK_SIZE }
fn default_max_sizes() -> usize { PackLimits::DEFAULT_MAX_SIZES }
fn default_store_backend() -> String { "memory".to_string() }
fn default_db_path() -> String { "data/packs.db".to_string() }

/// Load config from `config_path`, or `config/default.toml` when present,
/// then apply env-var overrides.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Load from an explicit path with explicit overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;
    resolve(parsed, overrides)
}

fn resolve(raw: RawConfig, overrides: &Overrides) -> Result<Config, AppError> {
    let backend_name = overrides.store.as_deref().unwrap_or(&raw.store.backend);
    let backend = StoreBackend::parse(backend_name)?;
    let db_path = expand_home(overrides.db_path.as_deref().unwrap_or(&raw.store.path));

    if raw.packs.max_amount == 0 {
        return Err(AppError::Config("packs.max_amount must be greater than 0".into()));
    }
    if raw.packs.max_pack_size == 0 {
        return Err(AppError::Config("packs.max_pack_size must be greater than 0".into()));
    }
    if raw.packs.max_sizes == 0 {
        return Err(AppError::Config("packs.max_sizes must be greater than 0".into()));
    }

    let log_level = overrides.log_level.clone().unwrap_or(raw.server.log_level);
    logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("server.log_level: {e}")))?;

    Ok(Config {
        log_level,
        server: ServerConfig {
            bind: overrides.bind.clone().unwrap_or(raw.server.bind),
        },
        packs: PacksConfig {
            defaults: raw.packs.defaults,
            limits: PackLimits {
                max_amount: raw.packs.max_amount,
                max_pack_size: raw.packs.max_pack_size,
                max_sizes: raw.packs.max_sizes,
            },
        },
        store: StoreConfig { backend, path: db_path },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path {
        "~" => "",
        p => match p.strip_prefix("~/") {
            Some(rest) => rest,
            None => return PathBuf::from(path),
        },
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// In-memory `Config` for tests: default sizes, memory store, ephemeral port.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            log_level: "info".into(),
            server: ServerConfig { bind: "127.0.0.1:0".into() },
            packs: PacksConfig {
                defaults: DEFAULT_PACK_SIZES.to_vec(),
                limits: PackLimits::default(),
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                path: PathBuf::from("data/packs.db"),
            },
        }
    }
}
