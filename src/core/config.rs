//! Lending configuration.
//!
//! Loaded from a JSON file, with `PRIVATE_LENDING_*` environment variables
//! taking precedence over file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::Error;
use crate::storage::backend::{BinaryStore, FileStore, InMemoryStore, StorageBackend};
use crate::utils::constants::{DEFAULT_DATA_DIR_NAME, ENV_PREFIX};

// ═══════════════════════════════════════════════════════════════════════════════
// POLICIES
// ═══════════════════════════════════════════════════════════════════════════════

/// What `request_loan` does for a borrower who already holds an approved loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReapprovalPolicy {
    /// Refuse with `LoanAlreadyApproved` before verification
    Reject,
    /// Verify and replace principal and collateral
    #[default]
    Overwrite,
}

impl ReapprovalPolicy {
    /// Get policy name
    pub fn name(&self) -> &'static str {
        match self {
            ReapprovalPolicy::Reject => "reject",
            ReapprovalPolicy::Overwrite => "overwrite",
        }
    }
}

impl std::str::FromStr for ReapprovalPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(ReapprovalPolicy::Reject),
            "overwrite" | "replace" => Ok(ReapprovalPolicy::Overwrite),
            _ => Err(ConfigError::Validation(format!(
                "Unknown reapproval policy: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ReapprovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ledger storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    /// Hex-keyed JSON snapshot (`data.json`)
    #[default]
    Json,
    /// bincode snapshot (`data.bin`)
    Binary,
    /// Nothing persisted
    Memory,
}

impl StorageFormat {
    /// Get format name
    pub fn name(&self) -> &'static str {
        match self {
            StorageFormat::Json => "json",
            StorageFormat::Binary => "binary",
            StorageFormat::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StorageFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "file" => Ok(StorageFormat::Json),
            "binary" | "bin" | "bincode" => Ok(StorageFormat::Binary),
            "memory" | "mem" => Ok(StorageFormat::Memory),
            _ => Err(ConfigError::Validation(format!(
                "Unknown storage format: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LENDING CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Lending configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Data directory (ledger files live here)
    pub data_dir: PathBuf,
    /// Ledger storage format
    pub storage_format: StorageFormat,
    /// Verifying key for collateral proofs
    pub collateral_vk_path: Option<PathBuf>,
    /// Verifying key for interest/liquidation proofs
    pub interest_vk_path: Option<PathBuf>,
    /// Behaviour when an approved borrower requests a new loan
    pub reapproval_policy: ReapprovalPolicy,
    /// Refuse interest proofs for borrowers without an approved loan
    pub require_approved_loan: bool,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_format: StorageFormat::Json,
            collateral_vk_path: None,
            interest_vk_path: None,
            reapproval_policy: ReapprovalPolicy::Overwrite,
            require_approved_loan: true,
        }
    }
}

impl LendingConfig {
    /// Default configuration rooted at a data directory
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Load from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `PRIVATE_LENDING_*` environment variables on top of this config
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognised names (after the `PRIVATE_LENDING_` prefix): `DATA_DIR`,
    /// `STORAGE_FORMAT`, `COLLATERAL_VK`, `INTEREST_VK`, `REAPPROVAL_POLICY`,
    /// `REQUIRE_APPROVED_LOAN`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}_{}", ENV_PREFIX, suffix));

        if let Some(dir) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(format) = var("STORAGE_FORMAT") {
            self.storage_format = format.parse()?;
        }

        if let Some(path) = var("COLLATERAL_VK") {
            self.collateral_vk_path = Some(PathBuf::from(path));
        }

        if let Some(path) = var("INTEREST_VK") {
            self.interest_vk_path = Some(PathBuf::from(path));
        }

        if let Some(policy) = var("REAPPROVAL_POLICY") {
            self.reapproval_policy = policy.parse()?;
        }

        if let Some(flag) = var("REQUIRE_APPROVED_LOAN") {
            self.require_approved_loan = parse_bool(&flag).ok_or_else(|| {
                ConfigError::Validation(format!("Invalid boolean for REQUIRE_APPROVED_LOAN: {}", flag))
            })?;
        }

        Ok(self)
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.json")
    }

    /// Config file path inside this config's data directory
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Directory holding the ledger snapshot
    pub fn ledger_dir(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Data directory cannot be empty".into()));
        }

        for (name, path) in [
            ("collateral_vk_path", &self.collateral_vk_path),
            ("interest_vk_path", &self.interest_vk_path),
        ] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(ConfigError::Validation(format!(
                        "{} does not point to a file: {}",
                        name,
                        path.display()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Open the ledger storage backend selected by `storage_format`
    pub fn open_storage(&self) -> crate::error::Result<Box<dyn StorageBackend>> {
        Ok(match self.storage_format {
            StorageFormat::Json => Box::new(FileStore::new(self.ledger_dir())?),
            StorageFormat::Binary => Box::new(BinaryStore::new(self.ledger_dir())?),
            StorageFormat::Memory => Box::new(InMemoryStore::new()),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get default data directory
fn default_data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(DEFAULT_DATA_DIR_NAME);
        }
    }

    #[cfg(windows)]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("private-lending");
        }
    }

    PathBuf::from(DEFAULT_DATA_DIR_NAME)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
