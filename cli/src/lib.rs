use mask_tree::{ExportOptions, SegmentationConfig};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Batch configuration lists no inputs")]
    NoInputs,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One image to vectorize
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchInput {
    /// Path to the source image
    pub image: String,
    /// Directory of PNG masks, used in file-name order; without it masks are
    /// generated by flood fill over the whole image
    pub masks: Option<String>,
    /// Base name of the exported files; defaults to the image file stem
    pub name: Option<String>,
}

impl BatchInput {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            masks: None,
            name: None,
        }
    }

    /// Export base name
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            Path::new(&self.image)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string())
        })
    }
}

/// Batch run configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    pub output_dir: String,
    #[serde(default)]
    pub export: ExportOptions,
    /// Settings for generating masks when an input has no mask directory
    #[serde(default)]
    pub generator: SegmentationConfig,
    /// Pass every loaded mask through overlap and size admission first
    #[serde(default)]
    pub filter_masks: bool,
    pub inputs: Vec<BatchInput>,
}

impl BatchConfig {
    /// Config for a single image with default options
    pub fn single(input: BatchInput, output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            export: ExportOptions::default(),
            generator: SegmentationConfig::default(),
            filter_masks: false,
            inputs: vec![input],
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    fn validate(self) -> Result<Self, CliError> {
        if self.inputs.is_empty() {
            return Err(CliError::NoInputs);
        }
        Ok(self)
    }

    /// Load BatchConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: BatchConfig = toml::from_str(content)?;
        config.validate()
    }

    /// Load BatchConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let config: BatchConfig = serde_json::from_str(content)?;
        config.validate()
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// JSON schema of the configuration file
    pub fn schema_json() -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&schemars::schema_for!(BatchConfig))?)
    }
}
