//! Typed catalog schema.
//!
//! The YAML catalog is deserialized into named structs with defaults and
//! validated once at load time; the rest of the build reads plain fields
//! instead of probing loose maps.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildError;

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub project: ProjectConfig,
    #[serde(default)]
    pub world_bank: Option<WorldBankConfig>,
    #[serde(default)]
    pub faostat_fbs: Option<FaostatConfig>,
    #[serde(default)]
    pub messy: Option<MessyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// ISO2 country codes used by the World Bank build.
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// `0` disables cache expiry.
    #[serde(default = "default_ttl_hours")]
    pub cache_ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldBankConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_base: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub group: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaostatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_base: String,
    #[serde(default = "default_fao_out_folder")]
    pub out_folder: String,
    #[serde(default)]
    pub countries_iso3: Vec<String>,
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
    /// Element labels to keep; empty keeps everything.
    #[serde(default)]
    pub elements: Vec<String>,
    /// Ordered bulk ZIP mirrors; first reachable, non-empty mirror wins.
    #[serde(default)]
    pub bulk_mirrors: Vec<String>,
    /// CKAN package-search endpoint used as the last fallback tier.
    #[serde(default)]
    pub hdx_search_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub items: Vec<MessyItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessyItem {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_license")]
    pub license: String,
    #[serde(default)]
    pub expected_issues: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_out_dir() -> String {
    String::from("data")
}

fn default_cache_dir() -> String {
    String::from(".cache")
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_per_page() -> u32 {
    20_000
}

fn default_fao_out_folder() -> String {
    String::from("faostat_fbs")
}

fn default_domains() -> Vec<String> {
    vec![String::from("FBS")]
}

fn default_license() -> String {
    String::from("unknown")
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let text = std::fs::read_to_string(path).map_err(|source| BuildError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Self =
            serde_yaml::from_str(&text).map_err(|source| BuildError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_str(text: &str) -> Result<Self, BuildError> {
        let catalog: Self = serde_yaml::from_str(text).map_err(|source| BuildError::ConfigParse {
            path: Path::new("<inline>").to_path_buf(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.project.out_dir.trim().is_empty() {
            return Err(BuildError::ConfigInvalid(String::from(
                "project.out_dir must not be empty",
            )));
        }
        if self.project.cache_dir.trim().is_empty() {
            return Err(BuildError::ConfigInvalid(String::from(
                "project.cache_dir must not be empty",
            )));
        }
        if let Some(wb) = &self.world_bank {
            if wb.enabled && wb.api_base.trim().is_empty() {
                return Err(BuildError::ConfigInvalid(String::from(
                    "world_bank.api_base must not be empty",
                )));
            }
            if wb.enabled && self.project.countries.is_empty() {
                return Err(BuildError::ConfigInvalid(String::from(
                    "project.countries must list at least one ISO2 code when world_bank is enabled",
                )));
            }
        }
        if let Some(fao) = &self.faostat_fbs {
            if fao.enabled && fao.api_base.trim().is_empty() {
                return Err(BuildError::ConfigInvalid(String::from(
                    "faostat_fbs.api_base must not be empty",
                )));
            }
        }
        if let Some(messy) = &self.messy {
            for item in &messy.items {
                if item.slug.trim().is_empty() || item.url.trim().is_empty() {
                    return Err(BuildError::ConfigInvalid(String::from(
                        "messy items need both a slug and a url",
                    )));
                }
            }
        }
        Ok(())
    }
}
