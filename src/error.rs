//! Broker-level error types shared across grants, transports, and configuration.

// self
use crate::{_prelude::*, issuer::GrantType};

/// Broker-wide result type alias returning [`AuthError`] by default.
pub type Result<T, E = AuthError> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error returned by [`TokenBroker::token`](crate::broker::TokenBroker::token).
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Client id or secret is absent; no issuer call was made.
	#[error("Client credentials are not configured: {missing} is missing.")]
	NotConfigured {
		/// Name of the first missing credential field.
		missing: &'static str,
	},
	/// Issuer answered a grant with a non-success status.
	#[error("Issuer rejected the {grant} grant with HTTP {status}: {detail}.")]
	IssuerRejected {
		/// Grant that was rejected.
		grant: GrantType,
		/// HTTP status returned by the issuer.
		status: u16,
		/// Best available error detail extracted from the response body.
		detail: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Issuer answered with a success status but an unusable body.
	#[error("Issuer returned a malformed {grant} response: {reason}.")]
	MalformedResponse {
		/// Grant whose response could not be mapped.
		grant: GrantType,
		/// Description of the missing or invalid field.
		reason: String,
	},
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem surfaced while building a request.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl AuthError {
	/// Returns the machine-readable classification of the error.
	pub fn kind(&self) -> AuthErrorKind {
		match self {
			Self::NotConfigured { .. } => AuthErrorKind::NotConfigured,
			Self::IssuerRejected { .. } => AuthErrorKind::IssuerRejected,
			Self::MalformedResponse { .. } => AuthErrorKind::MalformedResponse,
			Self::Transport(_) => AuthErrorKind::TransportFailure,
			Self::Config(_) => AuthErrorKind::Misconfigured,
		}
	}

	/// HTTP status an HTTP-facing component should answer with when it cannot obtain a token.
	///
	/// Upstream throttling, upstream outages, transport failures, and missing credentials map to
	/// `503`; every other issuer problem maps to `502`.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::IssuerRejected { status, .. } if *status == 429 || *status >= 500 => 503,
			Self::IssuerRejected { .. } | Self::MalformedResponse { .. } => 502,
			Self::NotConfigured { .. } | Self::Transport(_) | Self::Config(_) => 503,
		}
	}

	/// Builds a serializable body carrying the error kind and a human-readable detail.
	pub fn to_body(&self) -> ErrorBody {
		ErrorBody { kind: self.kind(), detail: self.to_string() }
	}

	/// Returns `true` when the failure happened before or while reaching the issuer.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}
}

/// Machine-readable error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
	/// Client id or secret missing.
	NotConfigured,
	/// Issuer returned a non-success status.
	IssuerRejected,
	/// Issuer response lacked a required field.
	MalformedResponse,
	/// Network-level failure reaching the issuer.
	TransportFailure,
	/// Request could not be constructed from the local configuration.
	Misconfigured,
}
impl AuthErrorKind {
	/// Returns a stable label suitable for response bodies or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthErrorKind::NotConfigured => "not_configured",
			AuthErrorKind::IssuerRejected => "issuer_rejected",
			AuthErrorKind::MalformedResponse => "malformed_response",
			AuthErrorKind::TransportFailure => "transport_failure",
			AuthErrorKind::Misconfigured => "misconfigured",
		}
	}
}
impl Display for AuthErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error payload for HTTP-facing components built on the broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Machine-readable error kind.
	pub kind: AuthErrorKind,
	/// Human-readable detail string.
	pub detail: String,
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Token endpoint cannot be parsed.
	#[error("Token endpoint is not a valid URL.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureTokenEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Environment variable holds a value that cannot be parsed.
	#[error("Environment variable {name} holds an invalid value: {value}.")]
	InvalidEnvValue {
		/// Variable name.
		name: &'static str,
		/// Raw value found in the environment.
		value: String,
	},
	/// Token endpoint variable is absent from the environment.
	#[error("Environment variable {name} is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within the transport timeout.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// Transport failed without a typed source.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn issuer_rejections_map_to_gateway_statuses() {
		let rejected = AuthError::IssuerRejected {
			grant: GrantType::ClientCredentials,
			status: 401,
			detail: "invalid_client".into(),
			retry_after: None,
		};
		let throttled = AuthError::IssuerRejected {
			grant: GrantType::ClientCredentials,
			status: 429,
			detail: "slow down".into(),
			retry_after: Some(Duration::seconds(5)),
		};

		assert_eq!(rejected.http_status(), 502);
		assert_eq!(throttled.http_status(), 503);
		assert_eq!(AuthError::NotConfigured { missing: "client_id" }.http_status(), 503);
		assert_eq!(
			AuthError::from(TransportError::Other { message: "reset".into() }).http_status(),
			503
		);
	}

	#[test]
	fn error_body_carries_kind_and_detail() {
		let err = AuthError::MalformedResponse {
			grant: GrantType::RefreshToken,
			reason: "access_token is missing".into(),
		};
		let body = err.to_body();

		assert_eq!(body.kind, AuthErrorKind::MalformedResponse);
		assert!(body.detail.contains("access_token is missing"));

		let payload = serde_json::to_value(&body).expect("Error body should serialize to JSON.");

		assert_eq!(payload["kind"], "malformed_response");
	}

	#[test]
	fn kinds_cover_every_variant() {
		assert_eq!(
			AuthError::NotConfigured { missing: "client_secret" }.kind(),
			AuthErrorKind::NotConfigured
		);
		assert_eq!(
			AuthError::from(ConfigError::InsecureTokenEndpoint { url: "http://x".into() }).kind(),
			AuthErrorKind::Misconfigured
		);
		assert!(AuthError::from(TransportError::Other { message: "eof".into() }).is_transport());
		assert_eq!(AuthErrorKind::TransportFailure.to_string(), "transport_failure");
	}
}
