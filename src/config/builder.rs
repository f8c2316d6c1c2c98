// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{
		BrokerConfig, ClientAuthMethod, DEFAULT_REFRESH_BUFFER, DEFAULT_TOKEN_LIFETIME,
		MAX_TOKEN_LIFETIME,
	},
	error::ConfigError,
};

/// Builder for [`BrokerConfig`] values.
#[derive(Debug)]
pub struct BrokerConfigBuilder {
	token_endpoint: String,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	client_auth_method: ClientAuthMethod,
	scope: Option<String>,
	extra_params: Vec<(String, String)>,
	refresh_buffer: Duration,
	default_lifetime: Duration,
}
impl BrokerConfigBuilder {
	/// Creates a new builder seeded with the provided token endpoint.
	pub fn new(token_endpoint: impl Into<String>) -> Self {
		Self {
			token_endpoint: token_endpoint.into(),
			client_id: None,
			client_secret: None,
			client_auth_method: ClientAuthMethod::default(),
			scope: None,
			extra_params: Vec::new(),
			refresh_buffer: DEFAULT_REFRESH_BUFFER,
			default_lifetime: DEFAULT_TOKEN_LIFETIME,
		}
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, id: impl Into<String>) -> Self {
		self.client_id = Some(id.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Sets the scope requested by client-credentials grants. Blank values clear it.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		let scope = scope.into();

		self.scope = if scope.trim().is_empty() { None } else { Some(scope.trim().to_owned()) };

		self
	}

	/// Adds a form parameter sent with client-credentials grants.
	pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.push((key.into(), value.into()));

		self
	}

	/// Overrides the refresh buffer (defaults to 60 seconds). Values are clamped to
	/// `0..=MAX_TOKEN_LIFETIME`.
	pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = buffer.clamp(Duration::ZERO, MAX_TOKEN_LIFETIME);

		self
	}

	/// Overrides the lifetime applied when the issuer omits `expires_in` (defaults to 7200
	/// seconds). Non-positive values fall back to the default; longer ones are capped at
	/// [`MAX_TOKEN_LIFETIME`].
	pub fn default_lifetime(mut self, lifetime: Duration) -> Self {
		self.default_lifetime = if lifetime.is_positive() {
			lifetime.min(MAX_TOKEN_LIFETIME)
		} else {
			DEFAULT_TOKEN_LIFETIME
		};

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<BrokerConfig, ConfigError> {
		let token_endpoint = Url::parse(&self.token_endpoint)
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;

		validate_endpoint(&token_endpoint)?;

		Ok(BrokerConfig {
			token_endpoint,
			client_id: self.client_id,
			client_secret: self.client_secret,
			client_auth_method: self.client_auth_method,
			scope: self.scope,
			extra_params: self.extra_params,
			refresh_buffer: self.refresh_buffer,
			default_lifetime: self.default_lifetime,
		})
	}
}

fn validate_endpoint(url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureTokenEndpoint { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
