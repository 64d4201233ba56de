//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::schema::ColumnSpec;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Destination connection.
    #[serde(default)]
    pub connection: TargetConfig,

    /// Destination table name (required).
    #[serde(default)]
    pub table_name: String,

    /// CSV source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Per-column type configuration.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    /// Transform pipeline behavior.
    #[serde(default)]
    pub transform: TransformConfig,

    /// Bulk load behavior.
    #[serde(default)]
    pub load: LoadConfig,

    /// Verification read-back.
    #[serde(default)]
    pub verify: VerifyConfig,

    /// Connection profile persistence.
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Supported MySQL-family client variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbKind {
    #[default]
    #[serde(alias = "mysql+pymysql", alias = "mysql+mysqlconnector")]
    Mysql,
    #[serde(alias = "mariadb+pymysql")]
    MariaDb,
}

impl DbKind {
    /// URL scheme for connection strings.
    pub fn scheme(&self) -> &'static str {
        match self {
            DbKind::Mysql => "mysql",
            DbKind::MariaDb => "mariadb",
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for DbKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mysql+pymysql" | "mysql+mysqlconnector" => Ok(DbKind::Mysql),
            "mariadb" | "mariadb+pymysql" => Ok(DbKind::MariaDb),
            other => Err(format!(
                "unknown db_type '{}', expected 'mysql' or 'mariadb'",
                other
            )),
        }
    }
}

/// Destination database configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Client variant; falls back to the saved profile, then `mysql`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_type: Option<DbKind>,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    #[serde(default)]
    pub username: String,

    /// Password (plain text; URL-encoded only in URLs and the profile file).
    #[serde(default)]
    pub password: String,

    /// Database name.
    #[serde(default)]
    pub database_name: String,

    /// SSL mode: disable, prefer, require, verify-ca, verify-full (default: prefer).
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            db_type: None,
            host: String::new(),
            port: default_mysql_port(),
            username: String::new(),
            password: String::new(),
            database_name: String::new(),
            ssl_mode: default_prefer(),
        }
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database_name", &self.database_name)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// CSV source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// CSV file path (the CLI `--csv` flag overrides it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Field delimiter (default: ',').
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: default_delimiter(),
        }
    }
}

/// What the transform pipeline does after a command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommitPolicy {
    /// Record the failure, run the remaining commands, commit at the end.
    #[default]
    #[serde(rename = "commit")]
    CommitAlways,
    /// Stop at the first failure and roll the transaction back.
    #[serde(rename = "rollback")]
    RollbackOnFailure,
}

impl FromStr for CommitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "commit" => Ok(CommitPolicy::CommitAlways),
            "rollback" => Ok(CommitPolicy::RollbackOnFailure),
            other => Err(format!(
                "unknown policy '{}', expected 'commit' or 'rollback'",
                other
            )),
        }
    }
}

/// Transform pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Behavior when an update command fails (default: commit).
    #[serde(default)]
    pub on_command_failure: CommitPolicy,
}

/// Bulk load configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Rows per INSERT statement (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Verification read-back configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Rows to read back and preview (default: 10).
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            sample_rows: default_sample_rows(),
        }
    }
}

/// Connection profile persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile file location (default: profile.yaml).
    #[serde(default = "default_profile_path")]
    pub path: PathBuf,

    /// Save the connection fields after a successful run (default: true).
    #[serde(default = "default_true")]
    pub save: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            path: default_profile_path(),
            save: true,
        }
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_batch_size() -> usize {
    1000
}

fn default_sample_rows() -> usize {
    10
}

fn default_profile_path() -> PathBuf {
    PathBuf::from("profile.yaml")
}

fn default_true() -> bool {
    true
}
