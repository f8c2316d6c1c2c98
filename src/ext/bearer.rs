//! Bearer attachment for reqwest request builders.

// crates.io
use reqwest::RequestBuilder;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	broker::TokenBroker,
	http::TokenHttpClient,
	issuer::TransportErrorMapper,
};

/// Boxed future returned by [`BearerAuthExt::bearer_from`].
pub type BearerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Attaches `Authorization: Bearer <token>` to outbound protected-API requests.
///
/// Fetch the token right before sending so each request carries whatever the broker currently
/// considers valid, and call [`TokenBroker::invalidate`] when the API still answers `401`.
pub trait BearerAuthExt
where
	Self: Sized,
{
	/// Attaches an already acquired token.
	fn bearer(self, token: &AccessToken) -> Self;

	/// Asks `broker` for a token and attaches it.
	fn bearer_from<'a, C, M>(self, broker: &'a TokenBroker<C, M>) -> BearerFuture<'a, Self>
	where
		C: ?Sized + TokenHttpClient,
		M: ?Sized + TransportErrorMapper<C::TransportError>;
}
impl BearerAuthExt for RequestBuilder {
	fn bearer(self, token: &AccessToken) -> Self {
		self.bearer_auth(token.expose())
	}

	fn bearer_from<'a, C, M>(self, broker: &'a TokenBroker<C, M>) -> BearerFuture<'a, Self>
	where
		C: ?Sized + TokenHttpClient,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		Box::pin(async move {
			let token = broker.token().await?;

			Ok(self.bearer(&token))
		})
	}
}
