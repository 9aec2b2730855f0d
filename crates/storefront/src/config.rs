//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (used for payment return URLs)
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_BACKEND` - `hosted` or `relay` (default: relay)
//! - `RELAY_URL` - Base URL of the checkout relay (default: `STOREFRONT_BASE_URL`)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `PRINTFUL_API_KEY` - Printful API token; without it the static catalog is used
//!   and the relay cannot place fulfillment orders
//! - `PRINTFUL_API_BASE` - Printful API base URL (default: <https://api.printful.com>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your_",
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
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

/// Which payment backend the checkout initiator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutBackendKind {
    /// Open the hosted payment page directly; the payment provider collects
    /// the shipping address and no fulfillment order is relayed.
    Hosted,
    /// Collect customer details locally and go through the relay endpoints.
    #[default]
    Relay,
}

impl FromStr for CheckoutBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" => Ok(Self::Hosted),
            "relay" => Ok(Self::Relay),
            other => Err(format!("expected 'hosted' or 'relay', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Checkout backend selection
    pub checkout_backend: CheckoutBackendKind,
    /// Base URL of the relay endpoints, without a trailing slash
    pub relay_url: String,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Printful API configuration, if a key was provided
    pub printful: Option<PrintfulConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe API base URL
    pub api_base: String,
    /// Secret API key (server-side only)
    pub secret_key: SecretString,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Printful API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct PrintfulConfig {
    /// Printful API base URL
    pub api_base: String,
    /// Private API token
    pub api_key: SecretString,
}

impl std::fmt::Debug for PrintfulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintfulConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .finish()
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
        let base_url = get_url("STOREFRONT_BASE_URL", None)?;
        let checkout_backend = get_env_or_default("CHECKOUT_BACKEND", "relay")
            .parse::<CheckoutBackendKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_BACKEND".to_string(), e))?;
        let relay_url = get_url("RELAY_URL", Some(&base_url))?;

        let stripe = StripeConfig {
            api_base: get_url("STRIPE_API_BASE", Some("https://api.stripe.com"))?,
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
        };

        let printful = match get_optional_env("PRINTFUL_API_KEY") {
            Some(key) => {
                validate_secret_strength(&key, "PRINTFUL_API_KEY")?;
                Some(PrintfulConfig {
                    api_base: get_url("PRINTFUL_API_BASE", Some("https://api.printful.com"))?,
                    api_key: SecretString::from(key),
                })
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            base_url,
            checkout_backend,
            relay_url,
            stripe,
            printful,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Where the payment provider sends the shopper after paying.
    ///
    /// `{CHECKOUT_SESSION_ID}` is substituted by the provider.
    #[must_use]
    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.base_url)
    }

    /// Where the payment provider sends the shopper after cancelling.
    #[must_use]
    pub fn cancel_url(&self) -> String {
        format!("{}/cancel", self.base_url)
    }

    /// Whether session cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get an absolute http(s) URL, normalised without a trailing slash.
fn get_url(key: &str, default: Option<&str>) -> Result<String, ConfigError> {
    let value = match (get_optional_env(key), default) {
        (Some(value), _) => value,
        (None, Some(default)) => default.to_string(),
        (None, None) => return Err(ConfigError::MissingEnvVar(key.to_string())),
    };
    normalize_base_url(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

/// Check that `value` is an http(s) URL and strip any trailing slash.
fn normalize_base_url(value: &str) -> Result<String, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL must have a host".to_string());
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
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
    let len = s.chars().count() as f64;
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

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the provider dashboard."
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
    use secrecy::ExposeSecret;

    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            checkout_backend: CheckoutBackendKind::Relay,
            relay_url: "http://localhost:3000".to_string(),
            stripe: StripeConfig {
                api_base: "https://api.stripe.com".to_string(),
                secret_key: SecretString::from("sk_test_super_secret_value"),
            },
            printful: Some(PrintfulConfig {
                api_base: "https://api.printful.com".to_string(),
                api_key: SecretString::from("printful_super_secret_value"),
            }),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_stripe_key_rejected() {
        // The key shipped in the old sample server.
        let result = validate_secret_strength("sk_test_your_stripe_secret_key", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_low_entropy_rejected() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "PRINTFUL_API_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_realistic_key_accepted() {
        let result = validate_secret_strength(
            "sk_test_51Hq3kLBf8ZrT0uW4zC6nL5pQ7rT2mK9xY",
            "STRIPE_SECRET_KEY",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(
            "Hosted".parse::<CheckoutBackendKind>().unwrap(),
            CheckoutBackendKind::Hosted
        );
        assert_eq!(
            "relay".parse::<CheckoutBackendKind>().unwrap(),
            CheckoutBackendKind::Relay
        );
        assert!("direct".parse::<CheckoutBackendKind>().is_err());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://shop.test/").unwrap(),
            "https://shop.test"
        );
        assert!(normalize_base_url("ftp://shop.test").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_return_urls() {
        let config = config();
        assert_eq!(
            config.success_url(),
            "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(config.cancel_url(), "http://localhost:3000/cancel");
        assert!(!config.is_secure());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(config.stripe.secret_key.expose_secret()));
        assert!(!debug_output.contains("printful_super_secret_value"));
    }
}
