//! Token broker: serves one cached bearer token and renews it on demand.
//!
//! [`TokenBroker::token`] returns the cached access token while it is outside the refresh
//! buffer. Otherwise it takes the broker's single-flight renewal guard, re-checks the cache,
//! and renews through two explicit steps: [`TokenBroker::attempt_refresh`] when a refresh token
//! is cached, then [`TokenBroker::attempt_client_credentials`] when there is none or the refresh
//! failed. A failed refresh discards the whole cached credential before the fallback runs.

mod client_credentials;
mod metrics;
mod refresh;

pub use metrics::BrokerMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CachedCredential, CredentialState},
	config::BrokerConfig,
	http::TokenHttpClient,
	issuer::{IssuerClient, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, issuer::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Caches and renews the bearer credential for one issuer/client pair.
///
/// Clones share the transport, the cache slot, the renewal guard, and the counters, so a single
/// broker can be handed to every task that calls the protected API.
pub struct TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every issuer request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	config: Arc<BrokerConfig>,
	cache: Arc<RwLock<Option<CachedCredential>>>,
	renewal_guard: Arc<AsyncMutex<()>>,
	metrics: Arc<BrokerMetrics>,
}
impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: BrokerConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config: Arc::new(config),
			cache: Default::default(),
			renewal_guard: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Configuration the broker was built with.
	pub fn config(&self) -> &BrokerConfig {
		&self.config
	}

	/// Counters describing cache and issuer activity.
	pub fn metrics(&self) -> &BrokerMetrics {
		&self.metrics
	}

	/// Returns a valid access token, renewing it through the issuer when needed.
	pub async fn token(&self) -> Result<AccessToken> {
		self.token_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`token`](Self::token) with an explicit clock reading.
	///
	/// `now` decides cache freshness and becomes the acquisition instant of any credential
	/// issued during the call.
	pub async fn token_at(&self, now: OffsetDateTime) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::Token;

		let span = FlowSpan::new(KIND, "token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.config.credentials()?;

				if let Some(token) = self.serve_cached(now) {
					return Ok(token);
				}

				let _renewal = self.renewal_guard.lock().await;

				// A concurrent caller may have committed a fresh credential while this one
				// waited for the guard.
				if let Some(token) = self.serve_cached(now) {
					return Ok(token);
				}

				self.renew(now).await.map(|record| record.access_token())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Returns a copy of the cached credential, if any.
	pub fn cached(&self) -> Option<CachedCredential> {
		self.cache.read().clone()
	}

	/// Lifecycle state of the cache slot at `now`.
	pub fn state_at(&self, now: OffsetDateTime) -> CredentialState {
		match self.cache.read().as_ref() {
			Some(record) => record.state_at(now, self.config.refresh_buffer),
			None => CredentialState::Empty,
		}
	}

	/// Lifecycle state of the cache slot at the current instant.
	pub fn state(&self) -> CredentialState {
		self.state_at(OffsetDateTime::now_utc())
	}

	/// Expires the cached access token so the next call renews it, keeping the refresh token.
	///
	/// Use it when the protected API rejects a token the broker still considered valid.
	pub fn invalidate(&self) {
		if let Some(record) = self.cache.write().as_mut() {
			record.revoke(OffsetDateTime::now_utc());
		}
	}

	/// Drops the cached credential, refresh token included.
	pub fn clear(&self) {
		*self.cache.write() = None;
	}

	fn serve_cached(&self, now: OffsetDateTime) -> Option<AccessToken> {
		let token = self
			.cache
			.read()
			.as_ref()
			.filter(|record| record.is_valid_at(now, self.config.refresh_buffer))
			.map(CachedCredential::access_token)?;

		self.metrics.record_cache_hit();
		obs::record_flow_outcome(FlowKind::Token, FlowOutcome::CacheHit);
		obs::flow_event(FlowKind::Token, "served cached access token");

		Some(token)
	}

	async fn renew(&self, now: OffsetDateTime) -> Result<CachedCredential> {
		let refresh_token =
			self.cache.read().as_ref().and_then(|record| record.refresh_token.clone());

		if let Some(refresh_token) = refresh_token {
			if let Ok(record) = self.attempt_refresh(&refresh_token, now).await {
				return Ok(record);
			}

			self.clear();
			self.metrics.record_fallback();
			obs::flow_event(FlowKind::Refresh, "refresh grant failed; cache cleared");
		}

		self.attempt_client_credentials(now).await
	}

	fn issuer(&self) -> IssuerClient<'_, C, M> {
		IssuerClient::new(&self.config, self.http_client.as_ref(), self.transport_mapper.as_ref())
	}

	/// Replaces the cached credential in a single write.
	fn commit(&self, record: CachedCredential) {
		*self.cache.write() = Some(record);
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker that provisions its own reqwest-backed transport.
	pub fn new(config: BrokerConfig) -> Result<Self> {
		Ok(Self::with_http_client(
			config,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}

	/// Creates a reqwest-backed broker from the process environment.
	pub fn from_env() -> Result<Self> {
		Self::new(BrokerConfig::from_env()?)
	}
}
impl<C, M> Clone for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			config: self.config.clone(),
			cache: self.cache.clone(),
			renewal_guard: self.renewal_guard.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<C, M> Debug for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("config", &self.config)
			.field("cached", &self.cache.read().as_ref())
			.field("metrics", &self.metrics)
			.finish()
	}
}
