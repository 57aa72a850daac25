//! Load `.tarbridge.toml` and environment overrides (CLI only). Lib callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{FailurePolicy, Opts};

#[derive(Debug, Default, Deserialize)]
pub struct TarbridgeToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    input: Option<String>,
    output: Option<String>,
    batch_size: Option<usize>,
    queue_capacity: Option<usize>,
    policy: Option<FailurePolicy>,
    verbose: Option<bool>,
}

/// Load the config file from `dir` if present. Returns None if missing or unreadable.
pub fn load_tarbridge_toml(dir: &Path) -> Option<TarbridgeToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_tarbridge_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_tarbridge_toml(s: &str) -> Result<TarbridgeToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($src:expr, $opts:expr, $src_field:ident => $opts_field:ident) => {
        if let Some(v) = $src.$src_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before env and CLI.
pub fn apply_file_to_opts(file: &TarbridgeToml, opts: &mut Opts) {
    let s = &file.settings;
    if let Some(ref p) = s.input {
        opts.input = Some(PathBuf::from(p));
    }
    if let Some(ref p) = s.output {
        opts.output = Some(PathBuf::from(p));
    }
    apply_file_opt!(s, opts, batch_size => batch_size);
    apply_file_opt!(s, opts, queue_capacity => queue_capacity);
    apply_file_opt!(s, opts, policy => policy);
    apply_file_opt!(s, opts, verbose => verbose);
}

/// Apply `TARBRIDGE_BATCH_SIZE` / `TARBRIDGE_QUEUE_CAPACITY`, reading `.env` in `dir` first
/// when one exists. Unparseable values are logged and skipped.
pub fn apply_env_to_opts(dir: &Path, opts: &mut Opts) {
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
    }
    let paths = PackagePaths::get();
    if let Some(n) = env_usize(&paths.env_var("batch_size")) {
        opts.batch_size = n;
    }
    if let Some(n) = env_usize(&paths.env_var("queue_capacity")) {
        opts.queue_capacity = n;
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    raw.trim()
        .parse()
        .map_err(|e| log::warn!("{key}={raw:?}: {e}"))
        .ok()
}
