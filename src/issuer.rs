//! Issuer client: grant request construction, dispatch, and transport error mapping.

pub mod response;

pub use response::IssuedToken;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{BrokerConfig, ClientAuthMethod},
	error::{ConfigError, TransportError},
	http::TokenHttpClient,
};

/// OAuth 2.0 grant types issued by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Client Credentials grant for app-only tokens.
	ClientCredentials,
	/// Refresh Token grant.
	RefreshToken,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::ClientCredentials => "client_credentials",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps HTTP transport failures into broker [`AuthError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	fn map_transport_error(&self, grant: GrantType, error: HttpClientError<E>) -> AuthError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_grant: GrantType,
		err: HttpClientError<ReqwestError>,
	) -> AuthError {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() =>
				ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ =>
				TransportError::Other { message: "unrecognized transport failure".into() }.into(),
		}
	}
}

/// Issues grants against the configured token endpoint.
pub(crate) struct IssuerClient<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: &'a BrokerConfig,
	http_client: &'a C,
	error_mapper: &'a M,
}
impl<'a, C, M> IssuerClient<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(config: &'a BrokerConfig, http_client: &'a C, error_mapper: &'a M) -> Self {
		Self { config, http_client, error_mapper }
	}

	/// Performs the `client_credentials` grant.
	pub(crate) async fn client_credentials(&self, now: OffsetDateTime) -> Result<IssuedToken> {
		const GRANT: GrantType = GrantType::ClientCredentials;

		let mut form = vec![("grant_type", GRANT.as_str())];

		if let Some(scope) = self.config.scope.as_deref() {
			form.push(("scope", scope));
		}
		for (key, value) in &self.config.extra_params {
			form.push((key.as_str(), value.as_str()));
		}

		self.exchange(GRANT, form, now).await
	}

	/// Performs the `refresh_token` grant.
	pub(crate) async fn refresh(
		&self,
		refresh_token: &TokenSecret,
		now: OffsetDateTime,
	) -> Result<IssuedToken> {
		const GRANT: GrantType = GrantType::RefreshToken;

		let form = vec![("grant_type", GRANT.as_str()), ("refresh_token", refresh_token.expose())];

		self.exchange(GRANT, form, now).await
	}

	async fn exchange(
		&self,
		grant: GrantType,
		form: Vec<(&str, &str)>,
		now: OffsetDateTime,
	) -> Result<IssuedToken> {
		let request = self.build_request(&form)?;
		let handle = self.http_client.handle();
		let response: HttpResponse = handle
			.call(request)
			.await
			.map_err(|err| self.error_mapper.map_transport_error(grant, err))?;

		response::map_token_response(grant, &response, self.config.default_lifetime, now)
	}

	fn build_request(&self, form: &[(&str, &str)]) -> Result<HttpRequest> {
		let (client_id, client_secret) = self.config.credentials()?;
		let mut body = form_urlencoded::Serializer::new(String::new());
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(self.config.token_endpoint.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json");

		body.extend_pairs(form);

		match self.config.client_auth_method {
			ClientAuthMethod::ClientSecretPost => {
				body.append_pair("client_id", client_id);
				body.append_pair("client_secret", client_secret.expose());
			},
			ClientAuthMethod::ClientSecretBasic => {
				builder =
					builder.header(AUTHORIZATION, basic_auth_header(client_id, client_secret));
			},
		}

		builder.body(body.finish().into_bytes()).map_err(|err| ConfigError::from(err).into())
	}
}

/// Encodes client credentials for `client_secret_basic` (RFC 6749 §2.3.1).
fn basic_auth_header(client_id: &str, client_secret: &TokenSecret) -> String {
	let id = form_urlencoded::byte_serialize(client_id.as_bytes()).collect::<String>();
	let secret =
		form_urlencoded::byte_serialize(client_secret.expose().as_bytes()).collect::<String>();

	format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}
