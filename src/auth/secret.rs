//! Secure secret wrappers that redact sensitive material.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Bearer access token handed to callers of the broker.
///
/// Obtain one immediately before an outbound request and drop it afterwards; the broker owns
/// the cached copy and its renewal.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	secret: TokenSecret,
	expires_at: OffsetDateTime,
}
impl AccessToken {
	pub(crate) fn new(secret: TokenSecret, expires_at: OffsetDateTime) -> Self {
		Self { secret, expires_at }
	}

	/// Returns the raw token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Issuer-declared expiry of the token.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Formats the value of an `Authorization` header.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn access_token_formats_bearer_header_without_leaking_debug() {
		let token =
			AccessToken::new(TokenSecret::new("abc123"), macros::datetime!(2025-01-01 02:00 UTC));

		assert_eq!(token.bearer_header(), "Bearer abc123");
		assert!(!format!("{token:?}").contains("abc123"));
	}
}
