//! Client Credentials step: obtains a fresh credential from the client's own identity.

// self
use crate::{
	_prelude::*,
	auth::CachedCredential,
	broker::TokenBroker,
	http::TokenHttpClient,
	issuer::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Performs the `client_credentials` grant and commits the result to the cache.
	///
	/// The configured scope and extra parameters are sent with the grant. On failure the cache
	/// keeps whatever it held before the call.
	pub async fn attempt_client_credentials(
		&self,
		now: OffsetDateTime,
	) -> Result<CachedCredential> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, "attempt_client_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.metrics.record_issuer_call();

				let record = self.issuer().client_credentials(now).await?.into_credential(None)?;

				self.commit(record.clone());

				Ok(record)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => {
				self.metrics.record_grant_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}
}
