use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::WatermarkError;
use crate::export::Codec;

/// Top-level configuration for emblem.
///
/// Holds the watermark options, export settings, an optional font override
/// and an optional RNG seed. The value is loaded once and passed explicitly
/// to the planner, the renderers and the exporter.
///
/// # Loading
///
/// ```rust,no_run
/// use emblem::config::{Config, Layout};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.watermark.layout = Layout::Compact;
/// config.watermark.location = "Kyoto".into();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What the watermark shows and how it is painted.
    pub watermark: RenderOptions,
    /// Where and how watermarked images are written.
    pub output: OutputConfig,
    /// Font override.
    pub font: FontConfig,
    /// Seed for the concealed-mode perturbation. `None` draws a fresh seed
    /// per render.
    pub seed: Option<u64>,
}

/// How the watermark is painted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum WatermarkMode {
    /// Translucent text overlay.
    Visible,
    /// Luminance perturbation under a text-shaped mask.
    #[default]
    Concealed,
}

/// Line arrangement of the watermark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Layout {
    /// Device line over capture info, centred near the bottom.
    #[default]
    Full,
    /// Location/copyright over device and capture info, left-aligned.
    Compact,
}

/// Colour of the visible overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum BrightnessBias {
    /// Black ink.
    #[default]
    Darken,
    /// White ink.
    Lighten,
}

/// A metadata field that can be toggled on or off in the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Manufacturer,
    Model,
    Lens,
    FNumber,
    ShutterSpeed,
    FocalLength,
    Iso,
    Date,
    Time,
    Copyright,
}

/// The set of fields enabled in the watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldToggles {
    pub manufacturer: bool,
    pub model: bool,
    pub lens: bool,
    pub f_number: bool,
    pub shutter_speed: bool,
    pub focal_length: bool,
    pub iso: bool,
    pub date: bool,
    pub time: bool,
    pub copyright: bool,
}

impl Default for FieldToggles {
    fn default() -> Self {
        Self {
            manufacturer: false,
            model: true,
            lens: false,
            f_number: true,
            shutter_speed: true,
            focal_length: true,
            iso: true,
            date: true,
            time: true,
            copyright: true,
        }
    }
}

impl FieldToggles {
    /// Every field on, including the manufacturer and lens.
    pub fn all() -> Self {
        Self {
            manufacturer: true,
            lens: true,
            ..Self::default()
        }
    }

    /// Every field off.
    pub fn none() -> Self {
        Self {
            manufacturer: false,
            model: false,
            lens: false,
            f_number: false,
            shutter_speed: false,
            focal_length: false,
            iso: false,
            date: false,
            time: false,
            copyright: false,
        }
    }

    pub fn is_enabled(&self, field: Field) -> bool {
        match field {
            Field::Manufacturer => self.manufacturer,
            Field::Model => self.model,
            Field::Lens => self.lens,
            Field::FNumber => self.f_number,
            Field::ShutterSpeed => self.shutter_speed,
            Field::FocalLength => self.focal_length,
            Field::Iso => self.iso,
            Field::Date => self.date,
            Field::Time => self.time,
            Field::Copyright => self.copyright,
        }
    }

    pub fn set(&mut self, field: Field, enabled: bool) {
        let slot = match field {
            Field::Manufacturer => &mut self.manufacturer,
            Field::Model => &mut self.model,
            Field::Lens => &mut self.lens,
            Field::FNumber => &mut self.f_number,
            Field::ShutterSpeed => &mut self.shutter_speed,
            Field::FocalLength => &mut self.focal_length,
            Field::Iso => &mut self.iso,
            Field::Date => &mut self.date,
            Field::Time => &mut self.time,
            Field::Copyright => &mut self.copyright,
        };
        *slot = enabled;
    }
}

/// Snapshot of the user's watermark settings for one render pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub mode: WatermarkMode,
    pub layout: Layout,
    pub fields: FieldToggles,
    pub brightness: BrightnessBias,
    /// Free text shown before the copyright segment.
    pub location: String,
    /// Replaces the Copyright tag when non-empty.
    pub copyright_override: String,
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory. `None` uses the user's pictures directory.
    pub directory: Option<PathBuf>,
    /// Names both the output subfolder and the file prefix.
    pub app_name: String,
    pub codec: Codec,
    /// Copy the source EXIF block into the exported file.
    pub preserve_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            app_name: "Emblem".to_string(),
            codec: Codec::WebpLossless,
            preserve_metadata: true,
        }
    }
}

/// Font settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// TrueType/OpenType file used instead of the embedded DejaVu Sans.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Reject settings the exporter cannot honour.
    pub fn validate(&self) -> crate::Result<()> {
        let name = self.output.app_name.trim();
        if name.is_empty() {
            return Err(WatermarkError::Config("output.app_name must not be empty".into()));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(WatermarkError::Config(format!(
                "output.app_name {name:?} must be a plain folder name"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.watermark.mode, WatermarkMode::Concealed);
        assert_eq!(config.watermark.layout, Layout::Full);
        assert_eq!(config.watermark.brightness, BrightnessBias::Darken);
        assert!(!config.watermark.fields.manufacturer);
        assert!(config.watermark.fields.model);
        assert!(!config.watermark.fields.lens);
        assert_eq!(config.output.app_name, "Emblem");
        assert_eq!(config.output.codec, Codec::WebpLossless);
        assert!(config.output.preserve_metadata);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.watermark.layout = Layout::Compact;
        config.watermark.location = "Lisbon".into();
        config.watermark.fields.set(Field::Iso, false);
        config.output.codec = Codec::Jpeg;
        config.seed = Some(42);
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "watermark": { "mode": "visible", "brightness": "lighten" } }"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.watermark.mode, WatermarkMode::Visible);
        assert_eq!(config.watermark.brightness, BrightnessBias::Lighten);
        assert_eq!(config.watermark.layout, Layout::Full);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn app_name_with_separator_rejected() {
        let mut config = Config::default();
        config.output.app_name = "../escape".into();
        assert!(matches!(config.validate(), Err(WatermarkError::Config(_))));

        config.output.app_name = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toggles_set_and_query() {
        let mut fields = FieldToggles::none();
        assert!(!fields.is_enabled(Field::Date));
        fields.set(Field::Date, true);
        assert!(fields.is_enabled(Field::Date));
        assert!(FieldToggles::all().is_enabled(Field::Manufacturer));
        assert!(FieldToggles::all().is_enabled(Field::Lens));
    }
}
