use std::path::{Path, PathBuf};

use {
    anyhow::{Context, bail},
    secrecy::Secret,
    tracing::{debug, info, warn},
};

use crate::{env_subst::substitute_env, schema::WardenConfig};

/// Config file names, checked in order inside each search directory.
const CONFIG_FILENAMES: &[&str] = &["warden.toml", "warden.yaml", "warden.yml", "warden.json"];

/// Environment overrides applied after the file is parsed.
const ENV_TOKEN: &str = "WARDEN_DISCORD_TOKEN";
const ENV_ADDRESS: &str = "WARDEN_CLIENT_ADDRESS";
const ENV_MAC: &str = "WARDEN_CLIENT_MAC";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<WardenConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.resolve_placeholders();
    Ok(config)
}

/// Load the explicit path if given, otherwise the first config file found in
/// the standard locations:
///
/// 1. `./warden.{toml,yaml,yml,json}`
/// 2. `~/.config/warden/warden.{toml,yaml,yml,json}`
///
/// Falls back to defaults (plus environment overrides) when nothing is found.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<WardenConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading config");
        return load_config(path);
    }

    match find_config_file(&search_dirs()) {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            warn!("no config file found, using defaults and environment");
            let mut config = WardenConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config.resolve_placeholders();
            Ok(config)
        },
    }
}

/// Directories searched by [`discover_and_load`], most specific first.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(dir) = config_dir() {
        dirs.push(dir);
    }
    dirs
}

/// Returns `~/.config/warden/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("warden"))
}

/// First existing config file across `dirs`, honouring [`CONFIG_FILENAMES`] order.
pub fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

fn apply_env_overrides(config: &mut WardenConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(token) = env(ENV_TOKEN).filter(|t| !t.is_empty()) {
        debug!("discord token taken from {ENV_TOKEN}");
        config.discord.token = Some(Secret::new(token));
    }
    if let Some(address) = env(ENV_ADDRESS).filter(|a| !a.is_empty()) {
        config.client.address = address;
    }
    if let Some(mac) = env(ENV_MAC).filter(|m| !m.is_empty()) {
        config.client.mac = mac;
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<WardenConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => bail!("unsupported config format: .{ext}"),
    }
}
