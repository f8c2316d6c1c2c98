//! Broker configuration: issuer endpoint, client credentials, and renewal timing.
//!
//! Values come either from [`BrokerConfig::builder`] or from the hosting environment via
//! [`BrokerConfig::from_env`]. Client id and secret are optional at construction time; their
//! absence is reported as [`AuthError::NotConfigured`] by the broker before any issuer call.

/// Builder API for assembling broker configs.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Safety margin subtracted from the issuer's expiry before a cached token is renewed.
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::seconds(60);
/// Lifetime assumed when the issuer omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::seconds(7_200);
/// Upper bound for issuer-declared lifetimes and every configured duration.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::days(366);

/// Environment variable holding the issuer's token endpoint.
pub const ENV_TOKEN_URL: &str = "TOKEN_BROKER_TOKEN_URL";
/// Environment variable holding the client identifier.
pub const ENV_CLIENT_ID: &str = "TOKEN_BROKER_CLIENT_ID";
/// Environment variable holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "TOKEN_BROKER_CLIENT_SECRET";
/// Environment variable holding an optional space-delimited scope.
pub const ENV_SCOPE: &str = "TOKEN_BROKER_SCOPE";
/// Environment variable overriding the refresh buffer, in seconds.
pub const ENV_REFRESH_BUFFER_SECS: &str = "TOKEN_BROKER_REFRESH_BUFFER_SECS";
/// Environment variable overriding the default token lifetime, in seconds.
pub const ENV_DEFAULT_LIFETIME_SECS: &str = "TOKEN_BROKER_DEFAULT_LIFETIME_SECS";

/// How client credentials are presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Validated broker configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerConfig {
	/// Issuer token endpoint receiving every grant.
	pub token_endpoint: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: Option<String>,
	/// OAuth 2.0 client secret.
	pub client_secret: Option<TokenSecret>,
	/// Client authentication method applied to every grant.
	pub client_auth_method: ClientAuthMethod,
	/// Optional scope sent with client-credentials grants.
	pub scope: Option<String>,
	/// Additional form parameters sent with client-credentials grants (audience, resource).
	pub extra_params: Vec<(String, String)>,
	/// Margin subtracted from the issuer's expiry when deciding whether to renew.
	pub refresh_buffer: Duration,
	/// Lifetime applied when the issuer omits `expires_in`.
	pub default_lifetime: Duration,
}
impl BrokerConfig {
	/// Creates a new builder for the provided token endpoint.
	pub fn builder(token_endpoint: impl Into<String>) -> BrokerConfigBuilder {
		BrokerConfigBuilder::new(token_endpoint)
	}

	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let token_url = lookup(ENV_TOKEN_URL)
			.filter(|value| !value.trim().is_empty())
			.ok_or(ConfigError::MissingEnv { name: ENV_TOKEN_URL })?;
		let mut builder = Self::builder(token_url.trim());

		if let Some(id) = lookup(ENV_CLIENT_ID) {
			builder = builder.client_id(id);
		}
		if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
			builder = builder.client_secret(secret);
		}
		if let Some(scope) = lookup(ENV_SCOPE) {
			builder = builder.scope(scope);
		}
		if let Some(secs) = lookup(ENV_REFRESH_BUFFER_SECS) {
			builder = builder.refresh_buffer(parse_secs(ENV_REFRESH_BUFFER_SECS, secs)?);
		}
		if let Some(secs) = lookup(ENV_DEFAULT_LIFETIME_SECS) {
			builder = builder.default_lifetime(parse_secs(ENV_DEFAULT_LIFETIME_SECS, secs)?);
		}

		builder.build()
	}

	/// Returns the client id and secret, or the name of the first one that is missing.
	pub fn credentials(&self) -> Result<(&str, &TokenSecret)> {
		let id = self
			.client_id
			.as_deref()
			.filter(|value| !value.is_empty())
			.ok_or(AuthError::NotConfigured { missing: "client_id" })?;
		let secret = self
			.client_secret
			.as_ref()
			.filter(|value| !value.expose().is_empty())
			.ok_or(AuthError::NotConfigured { missing: "client_secret" })?;

		Ok((id, secret))
	}
}
impl Debug for BrokerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrokerConfig")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("client_auth_method", &self.client_auth_method)
			.field("scope", &self.scope)
			.field("refresh_buffer", &self.refresh_buffer)
			.field("default_lifetime", &self.default_lifetime)
			.finish()
	}
}

fn parse_secs(name: &'static str, raw: String) -> Result<Duration, ConfigError> {
	raw.trim()
		.parse::<i64>()
		.ok()
		.filter(|secs| (0..=MAX_TOKEN_LIFETIME.whole_seconds()).contains(secs))
		.map(Duration::seconds)
		.ok_or(ConfigError::InvalidEnvValue { name, value: raw })
}
