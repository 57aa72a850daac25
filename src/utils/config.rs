//! Application configuration constants.
//! Defaults and names in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory config file, e.g. `.tarbridge.toml`.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable for `key`, e.g. `TARBRIDGE_BATCH_SIZE`.
    pub fn env_var(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key.to_uppercase())
    }
}

// ---- Batching ----

/// Messages per output batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 100;

// ---- Queue ----

/// Bounded message queue capacity. One slot keeps the producer at most one message ahead
/// of the consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;
