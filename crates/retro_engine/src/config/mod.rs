//! Configuration system
//!
//! Serializable configuration structures with TOML and RON file support.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// # Renderer Configuration
///
/// Tunables for the frame renderer: queue sizing, environment-map bounds,
/// fade timing, and texture sampling preferences. All fields have sensible
/// defaults matching the sizes the renderer was tuned for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum number of queue entries that can be submitted per frame.
    /// Exceeding this is a fatal contract violation.
    pub max_queue_size: usize,

    /// Maximum vertex count a single environment-mapped mesh may have.
    /// Exceeding this is a fatal contract violation.
    pub max_env_map_vertices: usize,

    /// Duration of the freeze-frame fade-out, in seconds
    pub freeze_fade_duration: f32,

    /// How long the freeze-frame fade holds full blackness, in seconds
    pub freeze_fade_hold: f32,

    /// Whether uploaded textures use linear filtering (nearest otherwise)
    pub texture_filtering: bool,

    /// Clear color applied at frame start
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 4096,
            max_env_map_vertices: 5000,
            freeze_fade_duration: 0.33,
            freeze_fade_hold: 0.1,
            texture_filtering: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_config_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.max_queue_size, 4096);
        assert_eq!(config.max_env_map_vertices, 5000);
        assert!(config.texture_filtering);
    }

    #[test]
    fn test_renderer_config_toml_round_trip() {
        let config = RendererConfig {
            max_queue_size: 128,
            texture_filtering: false,
            ..RendererConfig::default()
        };

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RendererConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.max_queue_size, 128);
        assert!(!parsed.texture_filtering);
        assert_eq!(parsed.max_env_map_vertices, config.max_env_map_vertices);
    }

    #[test]
    fn test_renderer_config_partial_toml_uses_defaults() {
        let parsed: RendererConfig = toml::from_str("max_queue_size = 16").unwrap();
        assert_eq!(parsed.max_queue_size, 16);
        assert_eq!(parsed.max_env_map_vertices, 5000);
    }
}
