//! Demonstrates a broker serving one cached service token to several concurrent API calls,
//! using the default reqwest transport against a local mock issuer.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use token_broker::{
	broker::{ReqwestBroker, TokenBroker},
	config::BrokerConfig,
	ext::BearerAuthExt,
	http::ReqwestHttpClient,
	issuer::ReqwestTransportErrorMapper,
	reqwest::{Client, StatusCode},
};

async fn fetch_contacts(api: &Client, url: &str, broker: &ReqwestBroker) -> Result<StatusCode> {
	let response = api.get(url).bearer_from(broker).await?.send().await?;

	Ok(response.status())
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh\",\"expires_in\":7200}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/contacts").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let config = BrokerConfig::builder(server.url("/oauth/token"))
		.client_id("demo-client")
		.client_secret("super-secret")
		.scope("contacts.read")
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let broker: ReqwestBroker = TokenBroker::with_http_client(
		config,
		http_client.clone(),
		ReqwestTransportErrorMapper,
	);
	let api = http_client.0;
	let contacts_url = server.url("/api/contacts");
	let (first, second) = tokio::join!(
		fetch_contacts(&api, &contacts_url, &broker),
		fetch_contacts(&api, &contacts_url, &broker),
	);

	println!("First call answered with {}.", first?);
	println!("Second call answered with {}.", second?);
	println!("Issuer calls: {}.", broker.metrics().issuer_calls());

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(2).await;

	Ok(())
}
