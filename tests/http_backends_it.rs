#![cfg(feature = "reqwest")]

// crates.io
use httpmock::{Method, prelude::*};
use serde_json::json;
use time::OffsetDateTime;
// self
use single_use_url::{
	audit::{AuditRecord, AuditSink, HttpAuditSink},
	config::{ConfigProvider, HttpConfigProvider, LEDGER_TABLE_PARAMETER, SettingsCell},
	edge::Header,
	error::ConfigError,
	fingerprint::Fingerprint,
	ledger::{HttpLedger, LedgerError, LedgerKey, LedgerTable, PutOutcome, UsageLedger},
	url::Url,
};

fn base(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Failed to parse mock server URL.")
}

fn key() -> LedgerKey {
	let table = LedgerTable::new("url-entries").expect("Table fixture should be valid.");

	LedgerKey::new(table, Fingerprint::digest("/assets/something?X-Nonce=n"))
}

#[tokio::test]
async fn http_ledger_maps_conditional_put_statuses() {
	let server = MockServer::start_async().await;
	let ledger = HttpLedger::new(base(&server, "/ledger")).expect("Failed to build HTTP ledger.");
	let key = key();
	let entry_path = format!("/ledger/url-entries/{}", key.fingerprint.to_hex());
	let mut created = server
		.mock_async(|when, then| {
			when.method(PUT).path(entry_path.as_str()).header("if-none-match", "*");
			then.status(201);
		})
		.await;

	assert_eq!(
		ledger.put_if_absent(&key).await.expect("Created put should succeed."),
		PutOutcome::Created
	);
	created.assert_calls_async(1).await;
	created.delete_async().await;

	let mut conflict = server
		.mock_async(|when, then| {
			when.method(PUT).path(entry_path.as_str());
			then.status(412);
		})
		.await;

	assert_eq!(
		ledger.put_if_absent(&key).await.expect("Conflicting put should succeed."),
		PutOutcome::AlreadyExists
	);
	conflict.delete_async().await;

	let outage = server
		.mock_async(|when, then| {
			when.method(PUT).path(entry_path.as_str());
			then.status(503).header("retry-after", "7");
		})
		.await;
	let err = ledger.put_if_absent(&key).await.expect_err("Outage must surface as an error.");

	match err {
		LedgerError::Backend { message } => {
			assert!(message.contains("status 503 (retry after 7s)"), "unexpected: {message}")
		},
		other => panic!("Expected a backend error, got {other:?}."),
	}

	outage.assert_async().await;
}

#[tokio::test]
async fn http_ledger_existence_checks() {
	let server = MockServer::start_async().await;
	let ledger = HttpLedger::new(base(&server, "/")).expect("Failed to build HTTP ledger.");
	let present = key();
	let absent = LedgerKey::new(present.table.clone(), Fingerprint::digest("/other"));
	let present_path = format!("/url-entries/{}", present.fingerprint.to_hex());
	let absent_path = format!("/url-entries/{}", absent.fingerprint.to_hex());
	let present_mock = server
		.mock_async(|when, then| {
			when.method(Method::HEAD).path(present_path.as_str());
			then.status(200);
		})
		.await;
	let absent_mock = server
		.mock_async(|when, then| {
			when.method(Method::HEAD).path(absent_path.as_str());
			then.status(404);
		})
		.await;

	assert!(ledger.exists(&present).await.expect("Present lookup should succeed."));
	assert!(!ledger.exists(&absent).await.expect("Absent lookup should succeed."));
	present_mock.assert_async().await;
	absent_mock.assert_async().await;
}

#[tokio::test]
async fn http_config_provider_resolves_parameters() {
	let server = MockServer::start_async().await;
	let found = server
		.mock_async(|when, then| {
			when.method(GET).path("/parameters").query_param("name", LEDGER_TABLE_PARAMETER);
			then.status(200).header("content-type", "application/json").body(
				json!({ "name": LEDGER_TABLE_PARAMETER, "value": "url-entries" }).to_string(),
			);
		})
		.await;
	let provider = HttpConfigProvider::new(base(&server, "/parameters"))
		.expect("Failed to build HTTP config provider.");
	let cell = SettingsCell::new(std::sync::Arc::new(provider.clone()));
	let settings = cell.resolve().await.expect("Settings should resolve.");

	assert_eq!(settings.ledger_table.as_str(), "url-entries");
	cell.resolve().await.expect("Cached settings should resolve.");
	found.assert_calls_async(1).await;

	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/parameters").query_param("name", "/missing");
			then.status(404);
		})
		.await;

	assert_eq!(provider.get("/missing").await.expect("Missing lookup should succeed."), None);
	missing.assert_async().await;
}

#[tokio::test]
async fn http_config_provider_surfaces_bad_payloads() {
	let server = MockServer::start_async().await;
	let _broken = server
		.mock_async(|when, then| {
			when.method(GET).path("/parameters");
			then.status(200).body(json!({ "name": 7 }).to_string());
		})
		.await;
	let provider = HttpConfigProvider::new(base(&server, "/parameters"))
		.expect("Failed to build HTTP config provider.");
	let err = provider.get(LEDGER_TABLE_PARAMETER).await.expect_err("Bad payload must fail.");

	assert!(matches!(err, ConfigError::Provider { .. }));
}

#[tokio::test]
async fn http_audit_sink_posts_log_events() {
	let server = MockServer::start_async().await;
	let record = AuditRecord::new(
		"pre modification",
		&[Header::new("Authorization", "Bearer x")],
		OffsetDateTime::now_utc(),
	);
	let expected = json!({
		"logGroupName": "edge-gateway",
		"logStreamName": "origin-request",
		"logEvents": [{
			"message": record.to_json().expect("Record should encode."),
			"timestamp": record.timestamp,
		}],
	});
	let collector = server
		.mock_async(|when, then| {
			when.method(POST).path("/logs").json_body(expected.clone());
			then.status(200);
		})
		.await;
	let sink = HttpAuditSink::new(base(&server, "/logs"), "edge-gateway", "origin-request")
		.expect("Failed to build HTTP audit sink.");

	sink.append(&record).await.expect("Collector should accept the record.");
	collector.assert_async().await;
}
