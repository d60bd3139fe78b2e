use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{AssemblyFormat, dedup_formats};
use crate::error::KiraError;
use crate::remote::DEFAULT_TIMEOUT;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub assemblies: Vec<String>,
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub formats: Vec<AssemblyFormat>,
    #[serde(default)]
    pub output_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input: Option<PathBuf>,
    pub formats: Vec<AssemblyFormat>,
    pub output_dir: Option<Utf8PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub urls: Vec<String>,
    pub formats: Vec<AssemblyFormat>,
    pub output_dir: Utf8PathBuf,
    pub timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Config::default(),
        };
        Self::resolve_config(config, overrides)
    }

    pub fn load(path: &Path) -> Result<Config, KiraError> {
        let content =
            fs::read_to_string(path).map_err(|_| KiraError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let mut urls = config.assemblies;
        if let Some(input) = overrides.input.or(config.input) {
            urls.extend(read_url_list(&input)?);
        }
        let urls = urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect::<Vec<_>>();
        if urls.is_empty() {
            return Err(KiraError::MissingInput);
        }

        let formats = if !overrides.formats.is_empty() {
            overrides.formats
        } else if !config.formats.is_empty() {
            config.formats
        } else {
            default_formats()
        };

        let output_dir = overrides
            .output_dir
            .or(config.output_dir)
            .ok_or(KiraError::MissingOutputDir)?;

        let timeout = overrides
            .timeout_secs
            .or(config.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(ResolvedConfig {
            schema_version,
            urls,
            formats: dedup_formats(&formats),
            output_dir,
            timeout,
        })
    }
}

/// Reads one assembly URL per line. Blank lines are dropped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>, KiraError> {
    let content =
        fs::read_to_string(path).map_err(|_| KiraError::InputRead(path.to_path_buf()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn default_formats() -> Vec<AssemblyFormat> {
    vec![AssemblyFormat::Fna]
}
