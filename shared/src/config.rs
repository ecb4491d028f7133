//! Runtime configuration read from environment variables.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_pool_id: String,
}

/// Where stored images live and how they are addressed publicly.
#[derive(Debug, Clone, PartialEq)]
pub struct Assets {
    pub bucket: String,
    pub base_url: String,
}

impl Assets {
    pub fn new(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let base_url = format!("https://{}.s3.amazonaws.com", bucket);
        Self { bucket, base_url }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Settings consumed by the session provider.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Email that is granted an admin profile on first sign-in.
    /// Unset disables the bootstrap.
    pub bootstrap_admin_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub cognito: CognitoConfig,
    pub assets: Assets,
    pub session: SessionOptions,
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::Config(format!("{} must be set", name)))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cognito = CognitoConfig {
            client_id: required("COGNITO_CLIENT_ID")?,
            client_secret: required("COGNITO_CLIENT_SECRET")?,
            user_pool_id: required("COGNITO_USER_POOL_ID")?,
        };

        let table_name = optional("TABLE_NAME").unwrap_or_else(|| "sitebuilder".to_string());
        let bucket = optional("ASSETS_BUCKET").unwrap_or_else(|| "sitebuilder-assets".to_string());
        let mut assets = Assets::new(bucket);
        if let Some(base_url) = optional("ASSET_BASE_URL") {
            assets = assets.with_base_url(base_url);
        }

        let bootstrap_admin_email = optional("BOOTSTRAP_ADMIN_EMAIL");
        if bootstrap_admin_email.is_some() {
            tracing::warn!("Admin bootstrap is enabled via BOOTSTRAP_ADMIN_EMAIL");
        }

        Ok(Self {
            table_name,
            cognito,
            assets,
            session: SessionOptions {
                bootstrap_admin_email,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const REQUIRED: &[&str] = &[
        "COGNITO_CLIENT_ID",
        "COGNITO_CLIENT_SECRET",
        "COGNITO_USER_POOL_ID",
    ];
    const OPTIONAL: &[&str] = &[
        "TABLE_NAME",
        "ASSETS_BUCKET",
        "ASSET_BASE_URL",
        "BOOTSTRAP_ADMIN_EMAIL",
    ];

    fn reset_env() {
        for name in REQUIRED.iter().chain(OPTIONAL) {
            std::env::remove_var(name);
        }
        std::env::set_var("COGNITO_CLIENT_ID", "client-id");
        std::env::set_var("COGNITO_CLIENT_SECRET", "client-secret");
        std::env::set_var("COGNITO_USER_POOL_ID", "us-east-1_pool");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        reset_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.table_name, "sitebuilder");
        assert_eq!(config.cognito.client_id, "client-id");
        assert_eq!(config.cognito.user_pool_id, "us-east-1_pool");
        assert_eq!(config.assets, Assets::new("sitebuilder-assets"));
        assert!(config.session.bootstrap_admin_email.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        reset_env();
        std::env::set_var("TABLE_NAME", "sites-prod");
        std::env::set_var("ASSETS_BUCKET", "prod-assets");
        std::env::set_var("ASSET_BASE_URL", "https://cdn.example.com/");
        std::env::set_var("BOOTSTRAP_ADMIN_EMAIL", " owner@example.com ");

        let config = Config::from_env().unwrap();
        assert_eq!(config.table_name, "sites-prod");
        assert_eq!(config.assets.bucket, "prod-assets");
        assert_eq!(config.assets.base_url, "https://cdn.example.com");
        assert_eq!(
            config.session.bootstrap_admin_email.as_deref(),
            Some("owner@example.com")
        );
    }

    #[test]
    #[serial]
    fn test_blank_bootstrap_email_disables_bootstrap() {
        reset_env();
        std::env::set_var("BOOTSTRAP_ADMIN_EMAIL", "   ");

        let config = Config::from_env().unwrap();
        assert!(config.session.bootstrap_admin_email.is_none());
    }

    #[test]
    #[serial]
    fn test_missing_required_key_is_config_error() {
        reset_env();
        std::env::remove_var("COGNITO_USER_POOL_ID");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(ref message) if message.contains("COGNITO_USER_POOL_ID")));
    }

    #[test]
    fn test_default_asset_base_url() {
        let assets = Assets::new("my-bucket");
        assert_eq!(assets.base_url, "https://my-bucket.s3.amazonaws.com");
    }

    #[test]
    fn test_custom_asset_base_url_trims_slash() {
        let assets = Assets::new("my-bucket").with_base_url("https://cdn.example.com/");
        assert_eq!(assets.bucket, "my-bucket");
        assert_eq!(assets.base_url, "https://cdn.example.com");
    }
}
