//! Configuration types shared across crates.

use crate::path::PathLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path (":memory:" for an ephemeral store).
        path: PathBuf,
        /// How long a writer waits on a locked database before failing.
        #[serde(default = "default_busy_timeout_secs")]
        busy_timeout_secs: u64,
    },
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/records.db"),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// Which authorization policy guards record paths.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Any verified identity may touch any path.
    #[default]
    AllowAll,
    /// A caller may only touch paths inside their own home directory.
    HomeOwner,
}

/// Token verification configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret shared with the token issuer.
    /// WARNING: Prefer the PROPAGATOR_AUTH__SHARED_SECRET env var over storing it in config.
    pub shared_secret: String,
    /// Authorization policy applied after verification.
    #[serde(default)]
    pub policy: PolicyKind,
}

impl AuthConfig {
    /// Create a test configuration with a fixed secret.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            shared_secret: "test-shared-secret".to_string(),
            policy: PolicyKind::AllowAll,
        }
    }
}

/// Home directory layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Number of leading path segments that form a user's home directory.
    #[serde(default = "default_home_depth")]
    pub home_depth: usize,
}

fn default_home_depth() -> usize {
    PathLayout::DEFAULT_HOME_DEPTH
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            home_depth: default_home_depth(),
        }
    }
}

impl LayoutConfig {
    /// Build the path layout.
    pub fn layout(&self) -> crate::Result<PathLayout> {
        PathLayout::new(self.home_depth)
    }
}

/// Ancestor propagation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Insert placeholder directory records for ancestors that have none.
    #[serde(default = "default_create_missing_ancestors")]
    pub create_missing_ancestors: bool,
}

fn default_create_missing_ancestors() -> bool {
    true
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            create_missing_ancestors: default_create_missing_ancestors(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Token verification configuration (required).
    pub auth: AuthConfig,
    /// Home directory layout.
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Ancestor propagation configuration.
    #[serde(default)]
    pub propagation: PropagationConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses an in-memory SQLite store and a fixed secret.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::Sqlite {
                path: PathBuf::from(":memory:"),
                busy_timeout_secs: default_busy_timeout_secs(),
            },
            auth: AuthConfig::for_testing(),
            layout: LayoutConfig::default(),
            propagation: PropagationConfig::default(),
        }
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.shared_secret.trim().is_empty() {
            return Err("auth.shared_secret cannot be empty".to_string());
        }
        self.layout.layout().map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let json = r#"{"auth": {"shared_secret": "s3cret"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert_eq!(config.layout.home_depth, 4);
        assert_eq!(config.auth.policy, PolicyKind::AllowAll);
        assert!(config.propagation.create_missing_ancestors);
        assert!(matches!(config.metadata, MetadataConfig::Sqlite { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_parses_snake_case() {
        let json = r#"{"shared_secret": "s", "policy": "home_owner"}"#;
        let auth: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(auth.policy, PolicyKind::HomeOwner);
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = AppConfig::for_testing();
        config.auth.shared_secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_home_depth() {
        let mut config = AppConfig::for_testing();
        config.layout.home_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sqlite_busy_timeout_default() {
        let json = r#"{"type": "sqlite", "path": "/tmp/records.db"}"#;
        let config: MetadataConfig = serde_json::from_str(json).unwrap();
        match config {
            MetadataConfig::Sqlite {
                busy_timeout_secs, ..
            } => assert_eq!(busy_timeout_secs, 5),
        }
    }
}
