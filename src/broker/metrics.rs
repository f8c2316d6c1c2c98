// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for cache and issuer activity.
#[derive(Debug, Default)]
pub struct BrokerMetrics {
	cache_hits: AtomicU64,
	issuer_calls: AtomicU64,
	refresh_attempts: AtomicU64,
	refresh_failures: AtomicU64,
	fallbacks: AtomicU64,
	grant_failures: AtomicU64,
}
impl BrokerMetrics {
	/// Returns the number of calls answered from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of token requests sent to the issuer, across both grants.
	pub fn issuer_calls(&self) -> u64 {
		self.issuer_calls.load(Ordering::Relaxed)
	}

	/// Returns the number of `refresh_token` grant attempts.
	pub fn refresh_attempts(&self) -> u64 {
		self.refresh_attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of failed `refresh_token` grants.
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}

	/// Returns how often a failed refresh fell back to the `client_credentials` grant.
	pub fn fallbacks(&self) -> u64 {
		self.fallbacks.load(Ordering::Relaxed)
	}

	/// Returns the number of failed `client_credentials` grants.
	pub fn grant_failures(&self) -> u64 {
		self.grant_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_issuer_call(&self) {
		self.issuer_calls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_attempt(&self) {
		self.refresh_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_failure(&self) {
		self.refresh_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fallback(&self) {
		self.fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_grant_failure(&self) {
		self.grant_failures.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_start_at_zero_and_accumulate() {
		let metrics = BrokerMetrics::default();

		assert_eq!(metrics.issuer_calls(), 0);

		metrics.record_issuer_call();
		metrics.record_issuer_call();
		metrics.record_refresh_attempt();
		metrics.record_refresh_failure();
		metrics.record_fallback();

		assert_eq!(metrics.issuer_calls(), 2);
		assert_eq!(metrics.refresh_attempts(), 1);
		assert_eq!(metrics.refresh_failures(), 1);
		assert_eq!(metrics.fallbacks(), 1);
		assert_eq!(metrics.cache_hits(), 0);
		assert_eq!(metrics.grant_failures(), 0);
	}
}
