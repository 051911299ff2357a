// std
use std::sync::Arc;
// crates.io
use time::{Duration, OffsetDateTime};
// self
use single_use_url::{
	config::{LEDGER_TABLE_PARAMETER, MemoryConfigProvider},
	edge::{EdgeOutcome, EdgeRequest},
	error::ErrorKind,
	fingerprint::{self, Fingerprint, FingerprintMode},
	gateway::Gateway,
	ledger::{LedgerError, LedgerFuture, LedgerKey, MemoryLedger, PutOutcome, UsageLedger},
	signer::{HmacUrlSigner, Operation, ResourceKey},
	url::Url,
};

struct UnavailableLedger;
impl UsageLedger for UnavailableLedger {
	fn put_if_absent<'a>(&'a self, _key: &'a LedgerKey) -> LedgerFuture<'a, PutOutcome> {
		Box::pin(async { Err(LedgerError::Backend { message: "table unreachable".into() }) })
	}

	fn exists<'a>(&'a self, _key: &'a LedgerKey) -> LedgerFuture<'a, bool> {
		Box::pin(async { Err(LedgerError::Backend { message: "table unreachable".into() }) })
	}
}

fn signer() -> HmacUrlSigner {
	let base = Url::parse("https://assets.store.test").expect("Failed to parse store URL.");

	HmacUrlSigner::new(base, b"admit-secret").expect("Failed to build signer.")
}

fn gateway(ledger: Arc<dyn UsageLedger>, config: MemoryConfigProvider) -> Gateway {
	let gateway_url = Url::parse("https://edge.gateway.test").expect("Failed to parse gateway URL.");

	Gateway::new(gateway_url, Arc::new(signer()), ledger, Arc::new(config))
		.expect("Failed to build gateway.")
}

fn configured() -> MemoryConfigProvider {
	MemoryConfigProvider::default().with_value(LEDGER_TABLE_PARAMETER, "url-entries")
}

fn key() -> ResourceKey {
	ResourceKey::new("assets/something").expect("Key fixture should be valid.")
}

async fn issued_request(gateway: &Gateway, operation: Operation) -> EdgeRequest {
	let descriptor = gateway.issue(&key(), operation).await.expect("Issuance should succeed.");

	EdgeRequest::from_url(operation.as_method(), &descriptor.modified_url)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_admit_exactly_one() {
	let ledger = Arc::new(MemoryLedger::default());
	let gateway = gateway(ledger.clone(), configured());
	let request = issued_request(&gateway, Operation::Read).await;
	let mut handles = Vec::new();

	for _ in 0..16 {
		let gateway = gateway.clone();
		let request = request.clone();

		handles.push(tokio::spawn(async move { gateway.admit(&request).await }));
	}

	let mut allowed = 0;
	let mut forbidden = 0;

	for handle in handles {
		match handle.await.expect("Admission task should not panic.") {
			Ok(_) => allowed += 1,
			Err(e) if e.kind() == ErrorKind::Forbidden => forbidden += 1,
			Err(e) => panic!("Unexpected admission failure: {e}."),
		}
	}

	assert_eq!(allowed, 1);
	assert_eq!(forbidden, 15);
	assert_eq!(ledger.len(), 1);
	assert_eq!(gateway.metrics.attempts(), 16);
	assert_eq!(gateway.metrics.allowed(), 1);
	assert_eq!(gateway.metrics.forbidden(), 15);
}

#[tokio::test]
async fn consumed_descriptors_stay_forbidden() {
	let gateway = gateway(Arc::new(MemoryLedger::default()), configured());
	let request = issued_request(&gateway, Operation::Read).await;

	assert_eq!(
		gateway.handle_viewer_request(request.clone()).await,
		EdgeOutcome::Forward(request.clone())
	);

	for _ in 0..3 {
		match gateway.handle_viewer_request(request.clone()).await {
			EdgeOutcome::Respond(response) => {
				assert_eq!(response.status, 403);
				assert_eq!(response.body, "Forbidden");
				assert_eq!(response.header("content-type"), Some("text/plain"));
			},
			EdgeOutcome::Forward(_) => panic!("A consumed descriptor must never be forwarded."),
		}
	}
}

#[tokio::test]
async fn ledger_outage_fails_closed() {
	let gateway = gateway(Arc::new(UnavailableLedger), configured());
	let request = issued_request(&gateway, Operation::Read).await;
	let outcome = gateway.handle_viewer_request(request).await;

	assert_eq!(outcome.status(), Some(500));

	if let EdgeOutcome::Respond(response) = outcome {
		assert_eq!(response.body, "Internal Server Error");
		assert_eq!(response.status_description, "InternalServerError");
	}

	assert_eq!(gateway.metrics.failed(), 1);
}

#[tokio::test]
async fn missing_or_forged_fingerprints_are_bad_requests() {
	let gateway = gateway(Arc::new(MemoryLedger::default()), configured());
	let request = issued_request(&gateway, Operation::Read).await;
	let split = fingerprint::split_query_param(&request.query, "hash");
	let stripped = request.clone().with_query(split.remainder.clone());
	let forged = request.clone().with_query(fingerprint::append_query_param(
		Some(&split.remainder),
		"hash",
		&Fingerprint::digest("something else").to_hex(),
	));
	let duplicated =
		request.clone().with_query(format!("{}&hash={}", request.query, split.values[0]));
	let garbled = request.clone().with_query(format!("{}&hash=not-hex", split.remainder));

	for candidate in [stripped, forged, duplicated, garbled] {
		let err =
			gateway.admit(&candidate).await.expect_err("Malformed fingerprint must be denied.");

		assert_eq!(err.kind(), ErrorKind::BadRequest);
	}

	assert_eq!(gateway.metrics.rejected(), 4);
	assert!(gateway.admit(&request).await.is_ok());
}

#[tokio::test]
async fn config_failure_is_internal_and_retried() {
	let ledger = Arc::new(MemoryLedger::default());
	let config = MemoryConfigProvider::default();
	let gateway = gateway(ledger.clone(), config.clone());
	let request = issued_request(&gateway, Operation::Read).await;
	let err = gateway.admit(&request).await.expect_err("Unresolved config must deny.");

	assert_eq!(err.kind(), ErrorKind::InternalError);
	assert!(ledger.is_empty());

	config.set(LEDGER_TABLE_PARAMETER, "url-entries");

	assert!(gateway.admit(&request).await.is_ok());
}

#[tokio::test]
async fn custom_ledger_parameter_is_honored() {
	let config = MemoryConfigProvider::default().with_value("/edge/ledger-table", "entries-v2");
	let gateway = gateway(Arc::new(MemoryLedger::default()), config)
		.with_ledger_parameter("/edge/ledger-table");
	let request = issued_request(&gateway, Operation::Read).await;

	assert!(gateway.admit(&request).await.is_ok());
	assert_eq!(
		gateway.settings.cached().expect("Settings should be cached.").ledger_table.as_str(),
		"entries-v2"
	);
}

#[tokio::test]
async fn recompute_mode_ignores_the_presented_parameter() {
	let gateway = gateway(Arc::new(MemoryLedger::default()), configured())
		.with_fingerprint_mode(FingerprintMode::Recompute);
	let request = issued_request(&gateway, Operation::Read).await;
	let split = fingerprint::split_query_param(&request.query, "hash");
	let bare = request.clone().with_query(split.remainder);
	let fingerprint = gateway.admit(&bare).await.expect("Bare signed URL should be admitted.");

	assert_eq!(fingerprint.to_hex(), split.values[0]);

	let err = gateway.admit(&request).await.expect_err("Same URL with hash is the same use.");

	assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn renamed_fingerprint_parameter_round_trips() {
	let gateway = gateway(Arc::new(MemoryLedger::default()), configured())
		.with_fingerprint_param("usage");
	let request = issued_request(&gateway, Operation::Read).await;

	assert!(request.query.contains("&usage="));
	assert!(gateway.admit(&request).await.is_ok());
}

#[tokio::test]
async fn verifier_rejects_tampered_and_expired_descriptors() {
	let ledger = Arc::new(MemoryLedger::default());
	let gateway = gateway(ledger.clone(), configured()).with_verifier(Arc::new(signer()));
	let request = issued_request(&gateway, Operation::Read).await;
	let wrong_method = EdgeRequest { method: "PUT".into(), ..request.clone() };
	let err = gateway.admit(&wrong_method).await.expect_err("Method mismatch must be denied.");

	assert_eq!(err.kind(), ErrorKind::Forbidden);

	let past = OffsetDateTime::now_utc() - Duration::hours(1);
	let expired = signer()
		.sign_at(&key(), Duration::minutes(5), Operation::Read, past)
		.expect("Backdated signing should succeed.");
	let path = expired.url.path();
	let query = expired.url.query().expect("Signed URL should carry a query.");
	let expired_request = EdgeRequest::new("GET", path).with_query(fingerprint::append_query_param(
		Some(query),
		"hash",
		&Fingerprint::of_request(path, Some(query)).to_hex(),
	));
	let err = gateway.admit(&expired_request).await.expect_err("Expired URL must be denied.");

	assert_eq!(err.kind(), ErrorKind::Forbidden);
	assert!(ledger.is_empty());
	assert!(gateway.admit(&request).await.is_ok());
}
