//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//! - `SANITY_PROJECT_ID` - Sanity project id
//! - `SANITY_API_TOKEN` - Sanity token with write access to orders
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `DEPLOYMENT_HOST` - Host of the current deployment; checkout redirects
//!   go to `https://{DEPLOYMENT_HOST}` when set
//! - `STOREFRONT_BASE_URL` - Public URL used for redirects otherwise
//! - `STRIPE_WEBHOOK_SECRET` - Webhook signing secret; webhooks are rejected
//!   without it
//! - `STRIPE_API_BASE` - Stripe API root (default: <https://api.stripe.com>)
//! - `STRIPE_CURRENCY` - Checkout currency (default: gbp)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Allowed signature age (default: 300)
//! - `SANITY_DATASET` - Dataset name (default: production)
//! - `SANITY_API_VERSION` - Dated API version (default: 2024-11-01)
//! - `SANITY_API_HOST` - API host override, for proxies and tests
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use basketry_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;

use crate::services::checkout::CheckoutSettings;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment host, preferred for checkout redirects
    pub deployment_host: Option<String>,
    /// Public base URL for the storefront
    pub base_url: Option<String>,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Sanity configuration
    pub sanity: SanityConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret
    pub webhook_secret: Option<SecretString>,
    /// API root
    pub api_base: String,
    /// Currency for checkout line items
    pub currency: CurrencyCode,
    /// Maximum age of a webhook signature, in seconds
    pub webhook_tolerance_secs: u64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}

impl StripeConfig {
    /// Allowed age of a webhook signature.
    #[must_use]
    pub const fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook_tolerance_secs)
    }
}

/// Sanity API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SanityConfig {
    /// Project id
    pub project_id: String,
    /// Dataset name
    pub dataset: String,
    /// Dated API version, e.g. 2024-11-01
    pub api_version: String,
    /// API token
    pub api_token: SecretString,
    /// Host override, e.g. `http://127.0.0.1:8080`
    pub api_host: Option<String>,
}

impl std::fmt::Debug for SanityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("api_token", &"[REDACTED]")
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl SanityConfig {
    /// Versioned API root with a trailing slash.
    #[must_use]
    pub fn api_base(&self) -> String {
        let host = self.api_host.as_ref().map_or_else(
            || format!("https://{}.api.sanity.io", self.project_id),
            |host| host.trim_end_matches('/').to_string(),
        );
        let version = self.api_version.trim_start_matches('v');
        format!("{host}/v{version}/")
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;

        Ok(Self {
            host,
            port,
            deployment_host: get_optional_env("DEPLOYMENT_HOST"),
            base_url: get_optional_env("STOREFRONT_BASE_URL"),
            stripe: StripeConfig::from_env()?,
            sanity: SanityConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Settings the checkout service needs from this configuration.
    #[must_use]
    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            deployment_host: self.deployment_host.clone(),
            base_url: self.base_url.clone(),
            currency: self.stripe.currency,
            sanity_project_id: self.sanity.project_id.clone(),
            sanity_dataset: self.sanity.dataset.clone(),
        }
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("STRIPE_CURRENCY", "gbp")
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STRIPE_CURRENCY".to_string(), e.to_string())
            })?;
        let webhook_tolerance_secs = get_env_or_default("STRIPE_WEBHOOK_TOLERANCE_SECS", "300")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS".to_string(),
                    e.to_string(),
                )
            })?;

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_optional_env("STRIPE_WEBHOOK_SECRET").map(SecretString::from),
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            currency,
            webhook_tolerance_secs,
        })
    }
}

impl SanityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: get_required_env("SANITY_PROJECT_ID")?,
            dataset: get_env_or_default("SANITY_DATASET", "production"),
            api_version: get_env_or_default("SANITY_API_VERSION", "2024-11-01"),
            api_token: get_validated_secret("SANITY_API_TOKEN")?,
            api_host: get_optional_env("SANITY_API_HOST"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // API keys are random; a low-entropy value is almost certainly a stand-in
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sanity_config(api_host: Option<&str>) -> SanityConfig {
        SanityConfig {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-11-01".to_string(),
            api_token: SecretString::from("skQv7Lr2NwXe9TpZc4Hb8YmK"),
            api_host: api_host.map(str::to_string),
        }
    }

    fn stripe_config() -> StripeConfig {
        StripeConfig {
            secret_key: SecretString::from("sk_test_super_secret_value"),
            webhook_secret: Some(SecretString::from("whsec_super_secret_value")),
            api_base: "https://api.stripe.com".to_string(),
            currency: CurrencyCode::GBP,
            webhook_tolerance_secs: 300,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-stripe-key-here", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));

        assert!(validate_secret_strength("sk_test_changeme", "STRIPE_SECRET_KEY").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result =
            validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "SANITY_API_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_issued_keys() {
        assert!(
            validate_secret_strength("sk_test_4eC39HqLyjWDarjtT1zdp7dc", "STRIPE_SECRET_KEY")
                .is_ok()
        );
        assert!(validate_secret_strength("skQv7Lr2NwXe9TpZc4Hb8YmK", "SANITY_API_TOKEN").is_ok());
    }

    #[test]
    fn test_sanity_api_base_default_host() {
        assert_eq!(
            sanity_config(None).api_base(),
            "https://abc123.api.sanity.io/v2024-11-01/"
        );
    }

    #[test]
    fn test_sanity_api_base_override() {
        assert_eq!(
            sanity_config(Some("http://127.0.0.1:9000/")).api_base(),
            "http://127.0.0.1:9000/v2024-11-01/"
        );

        let mut prefixed = sanity_config(None);
        prefixed.api_version = "v2021-10-21".to_string();
        assert_eq!(
            prefixed.api_base(),
            "https://abc123.api.sanity.io/v2021-10-21/"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            deployment_host: None,
            base_url: Some("http://localhost:3000".to_string()),
            stripe: stripe_config(),
            sanity: sanity_config(None),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);

        let settings = config.checkout_settings();
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(settings.sanity_project_id, "abc123");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let stripe = format!("{:?}", stripe_config());
        assert!(stripe.contains("[REDACTED]"));
        assert!(stripe.contains("api.stripe.com"));
        assert!(!stripe.contains("sk_test_super_secret_value"));
        assert!(!stripe.contains("whsec_super_secret_value"));

        let sanity = format!("{:?}", sanity_config(None));
        assert!(sanity.contains("abc123"));
        assert!(!sanity.contains("skQv7Lr2NwXe9TpZc4Hb8YmK"));
    }

    #[test]
    fn test_webhook_tolerance() {
        assert_eq!(stripe_config().webhook_tolerance(), Duration::from_secs(300));
    }
}
