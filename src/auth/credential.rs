//! Cached credential record, its lifecycle states, and the builder used by grant mappers.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret},
	issuer::GrantType,
};

/// Lifecycle state of the broker's cache slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialState {
	/// Nothing cached.
	Empty,
	/// Cached token is served without contacting the issuer.
	Valid,
	/// Cached token is inside the refresh buffer or past its expiry; the next call renews it.
	Expiring,
}

/// Errors produced by [`CachedCredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no (or an empty) access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the relative expiry does not fit in the supported date range.
	#[error("Expiry is outside the supported date range.")]
	ExpiryOutOfRange,
}

/// Credential held by the broker between calls.
///
/// The record is replaced as a whole on every successful grant, so the access token, its
/// expiry, and the refresh token always belong to the same issuer response (or carry the
/// refresh token forward from the previous one).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredential {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the issuer returned one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the issuer response was received.
	pub issued_at: OffsetDateTime,
	/// Issuer-declared expiry: `issued_at` plus the declared (or default) lifetime.
	pub expires_at: OffsetDateTime,
	/// Grant that produced the access token.
	pub grant: GrantType,
	/// Instant the access token was invalidated locally, if it was.
	pub revoked_at: Option<OffsetDateTime>,
}
impl CachedCredential {
	/// Returns a builder for constructing records.
	pub fn builder(grant: GrantType) -> CachedCredentialBuilder {
		CachedCredentialBuilder::new(grant)
	}

	/// Instant from which the record is no longer served from cache.
	pub fn renew_at(&self, buffer: Duration) -> OffsetDateTime {
		self.expires_at.saturating_sub(buffer)
	}

	/// Computes the lifecycle state at a given instant for the provided buffer.
	pub fn state_at(&self, instant: OffsetDateTime, buffer: Duration) -> CredentialState {
		if self.revoked_at.is_none() && instant < self.renew_at(buffer) {
			CredentialState::Valid
		} else {
			CredentialState::Expiring
		}
	}

	/// Returns `true` if the record may be served at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime, buffer: Duration) -> bool {
		matches!(self.state_at(instant, buffer), CredentialState::Valid)
	}

	/// Expiry expressed as milliseconds since the Unix epoch.
	pub fn expires_at_epoch_ms(&self) -> i64 {
		i64::try_from(self.expires_at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
	}

	/// Clones the access token into the value handed to callers.
	pub fn access_token(&self) -> AccessToken {
		AccessToken::new(self.access_token.clone(), self.expires_at)
	}

	/// Returns `true` if the access token has been invalidated locally.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Invalidates the access token; the refresh token stays usable for the next renewal.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at = Some(instant);
	}
}
impl Debug for CachedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedCredential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("grant", &self.grant)
			.field("revoked_at", &self.revoked_at)
			.finish()
	}
}

/// Builder for [`CachedCredential`].
#[derive(Clone, Debug)]
pub struct CachedCredentialBuilder {
	grant: GrantType,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CachedCredentialBuilder {
	fn new(grant: GrantType) -> Self {
		Self {
			grant,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value. Empty values are ignored.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		let token = token.into();

		if !token.is_empty() {
			self.refresh_token = Some(TokenSecret::new(token));
		}

		self
	}

	/// Provides an optional refresh token secret.
	pub fn maybe_refresh_token(mut self, token: Option<TokenSecret>) -> Self {
		self.refresh_token = token.filter(|secret| !secret.expose().is_empty());

		self
	}

	/// Consumes the builder and produces a [`CachedCredential`].
	pub fn build(self) -> Result<CachedCredential, CredentialBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.expose().is_empty())
			.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(CredentialBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		Ok(CachedCredential {
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			grant: self.grant,
			revoked_at: None,
		})
	}
}
