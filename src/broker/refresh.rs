//! Refresh step: exchanges the cached refresh token for a new credential.

// self
use crate::{
	_prelude::*,
	auth::{CachedCredential, TokenSecret},
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
	/// Performs the `refresh_token` grant and commits the result to the cache.
	///
	/// When the issuer does not rotate the refresh token, `refresh_token` is carried into the new
	/// credential. A failure leaves the cache untouched; [`token`](Self::token) decides whether to
	/// discard it.
	pub async fn attempt_refresh(
		&self,
		refresh_token: &TokenSecret,
		now: OffsetDateTime,
	) -> Result<CachedCredential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "attempt_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.metrics.record_refresh_attempt();
				self.metrics.record_issuer_call();

				let record = self
					.issuer()
					.refresh(refresh_token, now)
					.await?
					.into_credential(Some(refresh_token.clone()))?;

				self.commit(record.clone());

				Ok(record)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => {
				self.metrics.record_refresh_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}
}
