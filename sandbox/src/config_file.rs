use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use blood::BleedingConfig;
use bevy_log::info;
use ron::de::from_str;
use ron::ser::PrettyConfig;

/// Reads a config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<BleedingConfig, Box<dyn std::error::Error>> {
    if !path.exists() {
        info!(
            "Config file not found: {}. Using default bleeding config.",
            path.display()
        );
        return Ok(BleedingConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: BleedingConfig = from_str(&contents)?;
    info!("Loaded bleeding config from {}", path.display());
    Ok(config)
}

pub fn save_config(config: &BleedingConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pretty_config = PrettyConfig::new()
        .with_depth_limit(2)
        .with_separate_tuple_members(true);

    let serialized = ron::ser::to_string_pretty(config, pretty_config)?;
    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    info!("Bleeding config saved to {}", path.display());
    Ok(())
}

/// Config for a run: the file at `path` (or defaults) with command-line
/// overrides applied, saved to `write_to` when given.
///
/// Fails if the file cannot be read or the effective config cannot be saved.
pub fn effective_config(
    path: Option<&Path>,
    seed: Option<u64>,
    max_updates: Option<usize>,
    write_to: Option<&Path>,
) -> Result<BleedingConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => load_config(path).map_err(|err| format!("could not read config: {err}"))?,
        None => BleedingConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(max_updates) = max_updates {
        config.max_surface_updates_per_tick = max_updates;
    }

    if let Some(write_to) = write_to {
        save_config(&config, write_to)
            .map_err(|err| format!("could not save config to {}: {err}", write_to.display()))?;
    }
    Ok(config)
}
