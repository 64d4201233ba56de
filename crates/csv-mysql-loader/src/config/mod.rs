//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::validate_table_name;

use std::path::Path;

use url::form_urlencoded;

use crate::error::Result;
use crate::profile::ConnectionProfile;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.table_name = config.table_name.trim().to_string();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl TargetConfig {
    /// Client variant, defaulting to MySQL.
    pub fn db_kind(&self) -> DbKind {
        self.db_type.unwrap_or_default()
    }

    /// Build the connection URL:
    /// `<db_type>://<username>:<urlEncodedPassword>@<host>[:port]/<database_name>`.
    pub fn connection_url(&self) -> String {
        self.format_url(&encode_component(&self.password))
    }

    /// Connection URL with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        self.format_url("****")
    }

    /// Check the fields needed to open a connection.
    pub fn validate(&self) -> Result<()> {
        validation::validate_connection(self)
    }

    /// Fill fields left empty from a saved profile.
    pub fn apply_profile(&mut self, profile: &ConnectionProfile) {
        if self.db_type.is_none() && !profile.db_type.is_empty() {
            self.db_type = profile.db_type.parse().ok();
        }
        fill(&mut self.host, &profile.host);
        fill(&mut self.username, &profile.username);
        fill(&mut self.password, &profile.password);
        fill(&mut self.database_name, &profile.database_name);
    }

    /// Connection fields to persist after a successful run.
    pub fn to_profile(&self) -> ConnectionProfile {
        ConnectionProfile {
            db_type: self.db_kind().to_string(),
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            database_name: self.database_name.clone(),
        }
    }

    fn format_url(&self, password: &str) -> String {
        let host = if self.port == 3306 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        };
        format!(
            "{}://{}:{}@{}/{}",
            self.db_kind().scheme(),
            self.username,
            password,
            host,
            self.database_name
        )
    }
}

fn fill(field: &mut String, fallback: &str) {
    if field.is_empty() {
        *field = fallback.to_string();
    }
}

/// Form-URL-encode a value (spaces become `+`).
pub fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Reverse [`encode_component`].
pub fn decode_component(value: &str) -> String {
    form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}
