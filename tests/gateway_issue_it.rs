// std
use std::sync::Arc;
// crates.io
use serde_json::Value;
use time::Duration;
// self
use single_use_url::{
	config::{LEDGER_TABLE_PARAMETER, MemoryConfigProvider},
	edge::{EdgeRequest, EdgeResponse},
	fingerprint::{self, Fingerprint},
	gateway::{Gateway, IssueVariant},
	ledger::MemoryLedger,
	signer::{
		HmacUrlSigner, Operation, ResourceKey, ResourceSigner, SignFuture, SignedUrl, SigningError,
	},
	url::Url,
};

struct OfflineSigner;
impl ResourceSigner for OfflineSigner {
	fn sign<'a>(
		&'a self,
		_key: &'a ResourceKey,
		_validity: Duration,
		_operation: Operation,
	) -> SignFuture<'a> {
		Box::pin(async { Err(SigningError::Backend { message: "store offline".into() }) })
	}
}

struct OpaqueSigner;
impl ResourceSigner for OpaqueSigner {
	fn sign<'a>(
		&'a self,
		_key: &'a ResourceKey,
		_validity: Duration,
		_operation: Operation,
	) -> SignFuture<'a> {
		Box::pin(async {
			let url = Url::parse("data:text/plain,signed").expect("Opaque URL should parse.");

			Ok(SignedUrl { url, expires_at: time::OffsetDateTime::now_utc() })
		})
	}
}

fn gateway_with(signer: Arc<dyn ResourceSigner>) -> (Gateway, Arc<MemoryLedger>) {
	let ledger = Arc::new(MemoryLedger::default());
	let config = MemoryConfigProvider::default().with_value(LEDGER_TABLE_PARAMETER, "url-entries");
	let gateway_url = Url::parse("https://edge.gateway.test").expect("Failed to parse gateway URL.");
	let gateway = Gateway::new(gateway_url, signer, ledger.clone(), Arc::new(config))
		.expect("Failed to build gateway.");

	(gateway, ledger)
}

fn hmac_gateway() -> (Gateway, Arc<MemoryLedger>) {
	let base = Url::parse("https://assets.store.test").expect("Failed to parse store URL.");
	let signer = HmacUrlSigner::new(base, b"issue-secret").expect("Failed to build signer.");

	gateway_with(Arc::new(signer))
}

fn json_body(response: &EdgeResponse) -> Value {
	assert_eq!(response.status, 200);
	assert_eq!(response.header("content-type"), Some("application/json"));

	serde_json::from_str(&response.body).expect("Issuance body should be JSON.")
}

fn url_field(body: &Value, field: &str) -> Url {
	let raw = body[field].as_str().unwrap_or_else(|| panic!("Body should carry `{field}`."));

	Url::parse(raw).expect("Issued URL should parse.")
}

#[tokio::test]
async fn write_issuance_defaults_to_the_sample_key_and_redeems_once() {
	let (gateway, ledger) = hmac_gateway();
	let response = gateway.handle_issue(IssueVariant::Write, "").await;
	let body = json_body(&response);
	let modified = url_field(&body, "modifiedUrl");
	let original = url_field(&body, "originalUrl");

	assert_eq!(modified.host_str(), Some("edge.gateway.test"));
	assert_eq!(original.host_str(), Some("assets.store.test"));
	assert_eq!(modified.path(), "/assets/something");
	assert_eq!(original.path(), "/assets/something");
	assert!(
		original.query().expect("Signed URL should carry a query.").contains("X-Operation=PUT")
	);
	assert!(ledger.is_empty(), "Issuance must not touch the ledger.");

	let split = fingerprint::split_query_param(
		modified.query().expect("Modified URL should carry a query."),
		"hash",
	);

	assert_eq!(Some(split.remainder.as_str()), original.query());
	assert_eq!(
		split.values,
		vec![Fingerprint::of_request(original.path(), original.query()).to_hex()]
	);

	let request = EdgeRequest::from_url("PUT", &modified);

	assert!(gateway.handle_viewer_request(request.clone()).await.is_forward());
	assert_eq!(gateway.handle_viewer_request(request).await.status(), Some(403));
}

#[tokio::test]
async fn write_issuance_honors_an_explicit_key() {
	let (gateway, _) = hmac_gateway();
	let response = gateway.handle_issue(IssueVariant::Write, "key=uploads%2Fphoto.png").await;
	let body = json_body(&response);

	assert_eq!(url_field(&body, "modifiedUrl").path(), "/uploads/photo.png");
}

#[tokio::test]
async fn read_issuance_requires_a_key() {
	let (gateway, _) = hmac_gateway();
	let response = gateway.handle_issue(IssueVariant::Read, "").await;

	assert_eq!(response.status, 400);
	assert_eq!(response.body, "Bad request");
	assert_eq!(response.header("content-type"), Some("text/plain"));
	assert_eq!(response.header("content-encoding"), Some("UTF-8"));

	let response = gateway.handle_issue(IssueVariant::Read, "key=").await;

	assert_eq!(response.status, 400);
}

#[tokio::test]
async fn read_issuance_returns_the_gateway_url() {
	let (gateway, _) = hmac_gateway();
	let response = gateway.handle_issue(IssueVariant::Read, "key=assets%2Freport.pdf").await;
	let body = json_body(&response);
	let url = url_field(&body, "url");

	assert_eq!(url.host_str(), Some("edge.gateway.test"));
	assert_eq!(url.path(), "/assets/report.pdf");
	assert!(gateway.handle_viewer_request(EdgeRequest::from_url("GET", &url)).await.is_forward());
}

#[tokio::test]
async fn invalid_keys_are_bad_requests() {
	let (gateway, _) = hmac_gateway();

	for query in ["key=%2Fetc%2Fpasswd", "key=assets%2F..%2Fsecret", "key=a%20b"] {
		assert_eq!(gateway.handle_issue(IssueVariant::Write, query).await.status, 400);
	}
}

#[tokio::test]
async fn signer_and_integrity_failures_are_internal() {
	let (offline, _) = gateway_with(Arc::new(OfflineSigner));
	let response = offline.handle_issue(IssueVariant::Write, "").await;

	assert_eq!(response.status, 500);
	assert_eq!(response.body, "Internal Server Error");

	let (opaque, _) = gateway_with(Arc::new(OpaqueSigner));
	let key = ResourceKey::new("assets/something").expect("Key fixture should be valid.");
	let err = opaque.issue(&key, Operation::Read).await.expect_err("Opaque URL must fail.");

	assert_eq!(err.kind(), single_use_url::error::ErrorKind::IntegrityError);
	assert_eq!(opaque.handle_issue(IssueVariant::Read, "key=assets%2Fa").await.status, 500);
}

#[tokio::test]
async fn repeated_issuance_yields_distinct_fingerprints() {
	let (gateway, _) = hmac_gateway();
	let key = ResourceKey::new("assets/something").expect("Key fixture should be valid.");
	let first = gateway.issue(&key, Operation::Read).await.expect("First issuance should succeed.");
	let second =
		gateway.issue(&key, Operation::Read).await.expect("Second issuance should succeed.");

	assert_ne!(first.fingerprint, second.fingerprint);
	assert!(first.expires_at > time::OffsetDateTime::now_utc());
}
