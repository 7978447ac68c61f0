use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    model::{Location, Measurement},
    registry::LocationRegistry,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file")]
    Parse(#[from] toml::de::Error),

    #[error("No locations configured.\nHint: add at least one [[locations]] entry.")]
    NoLocations,

    #[error("Location #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("Location name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("Location '{name}' has latitude {value}, expected a value in [-90, 90]")]
    LatitudeOutOfRange { name: String, value: f64 },

    #[error("Location '{name}' has longitude {value}, expected a value in [-180, 180]")]
    LongitudeOutOfRange { name: String, value: f64 },
}

/// Which optional fields a measurement carries.
///
/// Fields switched on here are still only written when the provider reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSet {
    pub cloud_cover: bool,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self { cloud_cover: true }
    }
}

/// Field sets per measurement. `hourly` and `currently` may differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub hourly: FieldSet,
    pub currently: FieldSet,
}

impl SchemaConfig {
    pub fn fields_for(&self, measurement: Measurement) -> FieldSet {
        match measurement {
            Measurement::Hourly => self.hourly,
            Measurement::Currently => self.currently,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    schema: SchemaConfig,
}

/// Validated contents of the collector config file.
///
/// Example TOML:
/// ```toml
/// [[locations]]
/// name = "solna"
/// latitude = 59.3775869
/// longitude = 18.010939
///
/// [schema.hourly]
/// cloud_cover = false
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub locations: LocationRegistry,
    pub schema: SchemaConfig,
}

impl Config {
    /// Load and validate a config file. A missing file is an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        Ok(Self { locations: LocationRegistry::load(raw.locations)?, schema: raw.schema })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [[locations]]
        name = "solna"
        latitude = 59.3775869
        longitude = 18.010939

        [[locations]]
        name = "umeå"
        latitude = 63.8258471
        longitude = 20.2630354
    "#;

    #[test]
    fn parses_locations_with_default_schema() {
        let cfg = Config::parse(SAMPLE).expect("valid config");

        assert_eq!(cfg.locations.len(), 2);
        assert_eq!(cfg.locations[0].name, "solna");
        assert_eq!(cfg.locations[1].latitude, 63.8258471);
        assert_eq!(cfg.schema, SchemaConfig::default());
        assert!(cfg.schema.fields_for(Measurement::Hourly).cloud_cover);
    }

    #[test]
    fn schema_can_diverge_per_measurement() {
        let toml = format!("{SAMPLE}\n[schema.hourly]\ncloud_cover = false\n");
        let cfg = Config::parse(&toml).expect("valid config");

        assert!(!cfg.schema.fields_for(Measurement::Hourly).cloud_cover);
        assert!(cfg.schema.fields_for(Measurement::Currently).cloud_cover);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::parse("[[locations]]\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_coordinate_is_parse_error() {
        let err = Config::parse("[[locations]]\nname = \"solna\"\nlatitude = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_key_is_parse_error() {
        let err = Config::parse(&format!("{SAMPLE}\n[schema.daily]\ncloud_cover = true\n"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_location_surfaces_validation_error() {
        let toml = format!("{SAMPLE}\n[[locations]]\nname = \"solna\"\nlatitude = 0.0\nlongitude = 0.0\n");
        let err = Config::parse(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(_)));
    }

    #[test]
    fn empty_file_has_no_locations() {
        let err = Config::parse("").unwrap_err();
        assert!(matches!(err, ConfigError::NoLocations));
    }

    #[test]
    fn bundled_locations_file_is_valid() {
        let cfg = Config::parse(include_str!("../../locations.toml")).expect("valid config");
        let names: Vec<_> = cfg.locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["solna", "löa", "umeå"]);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write config");

        let cfg = Config::from_file(file.path()).expect("valid config file");
        assert_eq!(cfg.locations.len(), 2);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read(ref p, _) if *p == path));
        assert!(err.to_string().contains("absent.toml"));
    }
}
