use crate::actions::HashLength;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const MAX_VALUE_LENGTH_DEFAULT: usize = 200;

#[derive(Error, Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum ConfigError {
    #[error("invalid hash length: {0}")]
    InvalidHashLength(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unable to load configuration: {0}")]
    Load(String),
}

impl From<garde::Report> for ConfigError {
    fn from(report: garde::Report) -> Self {
        ConfigError::Invalid(report.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Load(format!("{err}"))
    }
}

/// How the manufacturer and institution inside the Contributing Equipment Sequence are
/// reported in the summary rows.
///
/// The anonymizer always overwrites both fields. This only decides what the
/// "pre-anonymization" summary shows for them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCapture {
    /// Report the values found in the data set.
    #[default]
    CaptureBeforeWrite,

    /// Report the anonymization placeholders, never the original values.
    WriteOnly,
}

/// Configuration for metadata export, anonymization and series grouping.
///
/// # Fields
///
/// * `include_private` - Whether private tags appear in the flat metadata export
/// * `include_pixel_data` - Whether the pixel data value is rendered in the export
/// * `max_value_length` - Display values longer than this are truncated in the export
/// * `anonymize` - Whether de-identified copies are written
/// * `remove_private_tags` - Whether private tags are stripped from de-identified copies
/// * `equipment_capture` - See [`EquipmentCapture`]
/// * `pseudonym_length` - Number of characters of the generated pseudo-identifiers
#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    #[garde(skip)]
    include_private: bool,
    #[garde(skip)]
    include_pixel_data: bool,
    #[garde(range(min = 1))]
    max_value_length: usize,

    #[garde(skip)]
    anonymize: bool,
    #[garde(skip)]
    remove_private_tags: bool,
    #[garde(skip)]
    equipment_capture: EquipmentCapture,

    #[garde(skip)]
    pseudonym_length: HashLength,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_private: true,
            include_pixel_data: false,
            max_value_length: MAX_VALUE_LENGTH_DEFAULT,
            anonymize: false,
            remove_private_tags: true,
            equipment_capture: EquipmentCapture::default(),
            pseudonym_length: HashLength::default(),
        }
    }
}

impl Config {
    pub fn include_private(&self) -> bool {
        self.include_private
    }

    pub fn include_pixel_data(&self) -> bool {
        self.include_pixel_data
    }

    pub fn max_value_length(&self) -> usize {
        self.max_value_length
    }

    pub fn anonymize(&self) -> bool {
        self.anonymize
    }

    pub fn remove_private_tags(&self) -> bool {
        self.remove_private_tags
    }

    pub fn equipment_capture(&self) -> EquipmentCapture {
        self.equipment_capture
    }

    pub fn pseudonym_length(&self) -> HashLength {
        self.pseudonym_length
    }

    /// Parses and validates a JSON configuration. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

/// A builder for [`Config`].
///
/// # Example
///
/// ```
/// use dicom_audit::config::{ConfigBuilder, EquipmentCapture};
///
/// let config = ConfigBuilder::new()
///     .include_private(false)
///     .max_value_length(64)
///     .anonymize(true)
///     .equipment_capture(EquipmentCapture::WriteOnly)
///     .build()
///     .unwrap();
/// assert!(config.anonymize());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigBuilder(Config);

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder(Config::default())
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: Config) -> Self {
        ConfigBuilder(config)
    }

    /// Controls whether private tags (odd group numbers) appear in the flat metadata export.
    pub fn include_private(mut self, include: bool) -> Self {
        self.0.include_private = include;
        self
    }

    /// Controls whether the value of Pixel Data `(7FE0,0010)` is rendered in the export.
    ///
    /// When disabled, the value is shown as `<PixelData omitted>`.
    pub fn include_pixel_data(mut self, include: bool) -> Self {
        self.0.include_pixel_data = include;
        self
    }

    /// Sets the number of characters after which export values are cut off.
    pub fn max_value_length(mut self, length: usize) -> Self {
        self.0.max_value_length = length;
        self
    }

    /// Controls whether de-identified copies of the input files are written.
    pub fn anonymize(mut self, anonymize: bool) -> Self {
        self.0.anonymize = anonymize;
        self
    }

    /// Controls whether private tags are removed from de-identified copies.
    pub fn remove_private_tags(mut self, remove: bool) -> Self {
        self.0.remove_private_tags = remove;
        self
    }

    pub fn equipment_capture(mut self, capture: EquipmentCapture) -> Self {
        self.0.equipment_capture = capture;
        self
    }

    pub fn pseudonym_length(mut self, length: HashLength) -> Self {
        self.0.pseudonym_length = length;
        self
    }

    /// Validates and returns the [`Config`].
    pub fn build(self) -> Result<Config, ConfigError> {
        self.0.validate()?;
        Ok(self.0)
    }
}
