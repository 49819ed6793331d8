use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::AppConfig;

/// Load application settings from a file using the config crate.
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub fn load_settings(settings_path: &Path) -> Result<AppConfig> {
    // Determine file format based on extension
    let format = match settings_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let settings = Config::builder()
        .add_source(File::new(
            settings_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", settings_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build settings from {}", settings_path.display()))?;

    let app_config: AppConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize settings from {}",
            settings_path.display()
        )
    })?;

    Ok(app_config)
}
