//! Demonstrates issuing a single-use upload descriptor with in-memory collaborators, redeeming
//! it twice through the edge handler, and sanitizing the admitted request.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use url::Url;
// self
use single_use_url::{
	audit::MemoryAuditSink,
	config::{LEDGER_TABLE_PARAMETER, MemoryConfigProvider},
	edge::{EdgeOutcome, EdgeRequest},
	gateway::{Gateway, IssueVariant},
	ledger::MemoryLedger,
	signer::HmacUrlSigner,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let signer = HmacUrlSigner::new(Url::parse("https://assets.store.example")?, b"demo-secret")?;
	let config = MemoryConfigProvider::default().with_value(LEDGER_TABLE_PARAMETER, "url-entries");
	let audit = MemoryAuditSink::default();
	let gateway = Gateway::new(
		Url::parse("https://edge.example.com")?,
		Arc::new(signer.clone()),
		Arc::new(MemoryLedger::default()),
		Arc::new(config),
	)?
	.with_verifier(Arc::new(signer))
	.with_audit_sink(Arc::new(audit.clone()));
	let response = gateway.handle_issue(IssueVariant::Write, "").await;

	println!("issue -> {} {}", response.status, response.body);

	let body: serde_json::Value = serde_json::from_str(&response.body)?;
	let modified = Url::parse(body["modifiedUrl"].as_str().unwrap_or_default())?;
	let request =
		EdgeRequest::from_url("PUT", &modified).with_header("Authorization", "Bearer demo-user");

	for attempt in 1..=2 {
		match gateway.handle_viewer_request(request.clone()).await {
			EdgeOutcome::Forward(admitted) => {
				let sanitized = gateway.handle_origin_request(admitted).await;

				println!(
					"attempt {attempt} -> forwarded with headers {:?}",
					sanitized.headers.iter().map(|h| h.name.as_str()).collect::<Vec<_>>()
				);
			},
			EdgeOutcome::Respond(denied) => {
				println!("attempt {attempt} -> {} {}", denied.status, denied.body);
			},
		}
	}

	println!(
		"admission metrics: attempts={} allowed={} forbidden={}; audit records={}",
		gateway.metrics.attempts(),
		gateway.metrics.allowed(),
		gateway.metrics.forbidden(),
		audit.records().len()
	);

	Ok(())
}
