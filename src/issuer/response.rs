//! Strict mapping of issuer token responses.
//!
//! Issuers return loosely-typed JSON. The body is decoded here, immediately after the HTTP
//! call, into [`IssuedToken`]; anything that cannot be mapped becomes
//! [`AuthError::MalformedResponse`] and never reaches the cache.

// crates.io
use oauth2::HttpResponse;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{CachedCredential, TokenSecret},
	config::MAX_TOKEN_LIFETIME,
	http,
	issuer::GrantType,
};

const BODY_PREVIEW_LIMIT: usize = 256;
const DETAIL_FIELDS: [&str; 3] = ["error_description", "error", "message"];

/// Validated token response.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
	/// Grant that produced the response.
	pub grant: GrantType,
	/// Non-empty access token.
	pub access_token: TokenSecret,
	/// Declared (or default) lifetime.
	pub expires_in: Duration,
	/// Refresh token, when the issuer returned a non-empty one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the response was received.
	pub received_at: OffsetDateTime,
}
impl IssuedToken {
	/// Builds the cache record, carrying `previous_refresh` forward when the issuer did not
	/// rotate the refresh token.
	pub fn into_credential(
		self,
		previous_refresh: Option<TokenSecret>,
	) -> Result<CachedCredential> {
		let grant = self.grant;

		CachedCredential::builder(grant)
			.access_token(self.access_token.expose())
			.maybe_refresh_token(self.refresh_token.or(previous_refresh))
			.issued_at(self.received_at)
			.expires_in(self.expires_in)
			.build()
			.map_err(|err| AuthError::MalformedResponse { grant, reason: err.to_string() })
	}
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken")
			.field("grant", &self.grant)
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("received_at", &self.received_at)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponseDto {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<ExpiresInDto>,
	#[serde(default)]
	refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresInDto {
	Integer(i64),
	Float(f64),
	Text(String),
}
impl ExpiresInDto {
	fn seconds(&self) -> Option<i64> {
		match self {
			Self::Integer(secs) => Some(*secs),
			Self::Float(secs)
				if secs.is_finite() && secs.fract() == 0.0 && secs.abs() < i64::MAX as f64 =>
				Some(*secs as i64),
			Self::Float(_) => None,
			Self::Text(raw) => raw.trim().parse().ok(),
		}
	}
}

/// Maps a raw issuer response into an [`IssuedToken`] or the matching broker error.
pub(crate) fn map_token_response(
	grant: GrantType,
	response: &HttpResponse,
	default_lifetime: Duration,
	now: OffsetDateTime,
) -> Result<IssuedToken> {
	let status = response.status();

	if !status.is_success() {
		return Err(AuthError::IssuerRejected {
			grant,
			status: status.as_u16(),
			detail: issuer_detail(response.body())
				.or_else(|| status.canonical_reason().map(str::to_owned))
				.unwrap_or_else(|| "no error detail supplied".into()),
			retry_after: http::parse_retry_after(response.headers(), now),
		});
	}

	let malformed = |reason: String| AuthError::MalformedResponse { grant, reason };
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let dto: TokenResponseDto = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|err| malformed(format!("body is not a valid token response ({err})")))?;
	let access_token = dto
		.access_token
		.filter(|value| !value.is_empty())
		.ok_or_else(|| malformed("access_token is missing".into()))?;
	let expires_in = match dto.expires_in {
		None => default_lifetime,
		Some(raw) => match raw.seconds() {
			Some(secs) if secs > 0 && secs <= MAX_TOKEN_LIFETIME.whole_seconds() =>
				Duration::seconds(secs),
			_ =>
				return Err(malformed(format!(
					"expires_in must be between 1 and {} seconds",
					MAX_TOKEN_LIFETIME.whole_seconds()
				))),
		},
	};

	Ok(IssuedToken {
		grant,
		access_token: TokenSecret::new(access_token),
		expires_in,
		refresh_token: dto.refresh_token.filter(|value| !value.is_empty()).map(TokenSecret::new),
		received_at: now,
	})
}

/// Extracts the most descriptive error string an issuer put in its response body.
fn issuer_detail(body: &[u8]) -> Option<String> {
	if let Ok(value) = serde_json::from_slice::<Value>(body) {
		let detail = DETAIL_FIELDS.iter().find_map(|field| match value.get(*field) {
			Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_owned()),
			Some(Value::Object(nested)) =>
				nested.get("message").and_then(Value::as_str).map(str::to_owned),
			_ => None,
		});

		if detail.is_some() {
			return detail;
		}
	}

	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() { None } else { Some(truncate_preview(text)) }
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
	use time::macros;
	// self
	use super::*;

	const NOW: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status is valid.");

		response
	}

	fn map(status: u16, body: &str) -> Result<IssuedToken> {
		map_token_response(
			GrantType::ClientCredentials,
			&response(status, body),
			Duration::seconds(7_200),
			NOW,
		)
	}

	#[test]
	fn maps_complete_responses() {
		let token = map(
			200,
			r#"{"access_token":"abc","expires_in":3600,"refresh_token":"def","token_type":"bearer"}"#,
		)
		.expect("Complete response should map.");

		assert_eq!(token.access_token.expose(), "abc");
		assert_eq!(token.expires_in, Duration::hours(1));
		assert_eq!(token.refresh_token.as_ref().map(TokenSecret::expose), Some("def"));
		assert_eq!(token.received_at, NOW);
	}

	#[test]
	fn applies_the_default_lifetime_and_tolerates_string_lifetimes() {
		let token =
			map(200, r#"{"access_token":"abc"}"#).expect("Response without expiry should map.");

		assert_eq!(token.expires_in, Duration::seconds(7_200));
		assert!(token.refresh_token.is_none());

		let token = map(200, r#"{"access_token":"abc","expires_in":"900","refresh_token":""}"#)
			.expect("String lifetimes should map.");

		assert_eq!(token.expires_in, Duration::minutes(15));
		assert!(token.refresh_token.is_none());
	}

	#[test]
	fn missing_or_empty_access_tokens_are_malformed() {
		for body in [r#"{"expires_in":7200}"#, r#"{"access_token":"","expires_in":7200}"#] {
			let err = map(200, body).expect_err("Missing access tokens must be rejected.");

			assert!(
				matches!(&err, AuthError::MalformedResponse { reason, .. } if reason.contains("access_token"))
			);
		}
	}

	#[test]
	fn non_json_and_bad_lifetimes_are_malformed() {
		assert!(matches!(map(200, "<html>ok</html>"), Err(AuthError::MalformedResponse { .. })));
		assert!(matches!(
			map(200, r#"{"access_token":"abc","expires_in":0}"#),
			Err(AuthError::MalformedResponse { .. })
		));
		assert!(matches!(
			map(200, r#"{"access_token":42}"#),
			Err(AuthError::MalformedResponse { .. })
		));
	}

	#[test]
	fn lifetimes_beyond_the_cap_are_malformed() {
		for body in [
			r#"{"access_token":"abc","expires_in":9223372036854775807}"#,
			r#"{"access_token":"abc","expires_in":1e300}"#,
			r#"{"access_token":"abc","expires_in":"31622401"}"#,
		] {
			let err = map(200, body).expect_err("Oversized lifetimes must be rejected.");

			assert!(
				matches!(&err, AuthError::MalformedResponse { reason, .. } if reason.contains("expires_in"))
			);
		}

		let token = map(200, r#"{"access_token":"abc","expires_in":31622400}"#)
			.expect("A lifetime at the cap should map.");

		assert_eq!(token.expires_in, MAX_TOKEN_LIFETIME);
	}

	#[test]
	fn rejections_carry_status_and_best_detail() {
		let err = map(400, r#"{"error":"invalid_grant","error_description":"Token revoked"}"#)
			.expect_err("Non-success statuses must be rejected.");

		match err {
			AuthError::IssuerRejected { status, detail, grant, .. } => {
				assert_eq!(status, 400);
				assert_eq!(detail, "Token revoked");
				assert_eq!(grant, GrantType::ClientCredentials);
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let err = map(401, r#"{"error":{"message":"bad client"}}"#)
			.expect_err("Nested error objects should be read.");

		assert!(matches!(err, AuthError::IssuerRejected { detail, .. } if detail == "bad client"));

		let err = map(502, "").expect_err("Empty bodies fall back to the reason phrase.");

		assert!(matches!(err, AuthError::IssuerRejected { detail, .. } if detail == "Bad Gateway"));
	}

	#[test]
	fn rejections_truncate_plain_text_bodies() {
		let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let err = map(500, &body).expect_err("Server errors must be rejected.");

		match err {
			AuthError::IssuerRejected { detail, .. } => {
				assert_eq!(detail.chars().count(), BODY_PREVIEW_LIMIT + 1);
				assert!(detail.ends_with('…'));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn rejections_capture_retry_after() {
		let mut response = response(429, r#"{"error":"slow_down"}"#);

		response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static("30"));

		let err = map_token_response(GrantType::RefreshToken, &response, Duration::hours(2), NOW)
			.expect_err("Throttled responses must be rejected.");

		assert!(matches!(
			err,
			AuthError::IssuerRejected { retry_after: Some(delay), .. } if delay == Duration::seconds(30)
		));
	}

	#[test]
	fn refresh_tokens_carry_forward_when_not_rotated() {
		let token = map(200, r#"{"access_token":"abc","expires_in":60}"#)
			.expect("Response should map.");
		let record = token
			.into_credential(Some(TokenSecret::new("kept")))
			.expect("Credential should build.");

		assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("kept"));
		assert_eq!(record.expires_at, NOW + Duration::seconds(60));
	}
}
