//! One-time signed URLs: issue fingerprinted access links, redeem each exactly once against a
//! conditional-put usage ledger, and scrub credentials before the origin fetch.
//!
//! The crate is runtime-agnostic. Collaborators (storage signer, usage ledger, config provider,
//! audit sink) are injected into a [`gateway::Gateway`] as trait objects; the edge environment
//! feeds it [`edge::EdgeRequest`]s and acts on the returned outcomes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod audit;
pub mod config;
pub mod edge;
pub mod error;
pub mod fingerprint;
pub mod gateway;
#[cfg(feature = "reqwest")] pub mod http;
pub mod ledger;
pub mod obs;
pub mod signer;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		audit::MemoryAuditSink,
		config::{LEDGER_TABLE_PARAMETER, MemoryConfigProvider},
		gateway::Gateway,
		ledger::MemoryLedger,
		signer::HmacUrlSigner,
	};

	/// Table name the test gateway resolves from its config provider.
	pub const TEST_LEDGER_TABLE: &str = "url-entries";

	/// In-memory collaborators behind a test gateway.
	#[derive(Clone, Debug)]
	pub struct TestCollaborators {
		/// Ledger shared with the gateway.
		pub ledger: Arc<MemoryLedger>,
		/// Audit sink shared with the gateway.
		pub audit: MemoryAuditSink,
		/// Config provider shared with the gateway.
		pub config: MemoryConfigProvider,
	}

	/// Builds an HMAC signer for `https://assets.store.test` with a fixed secret.
	pub fn test_signer() -> HmacUrlSigner {
		let base = Url::parse("https://assets.store.test").expect("Failed to parse test store URL.");

		HmacUrlSigner::new(base, b"test-store-secret").expect("Failed to build test signer.")
	}

	/// Constructs a [`Gateway`] at `https://edge.gateway.test` backed entirely by in-memory
	/// collaborators, with the ledger table parameter already published.
	pub fn build_test_gateway() -> (Gateway, TestCollaborators) {
		let ledger = Arc::new(MemoryLedger::default());
		let audit = MemoryAuditSink::default();
		let config =
			MemoryConfigProvider::default().with_value(LEDGER_TABLE_PARAMETER, TEST_LEDGER_TABLE);
		let gateway_url =
			Url::parse("https://edge.gateway.test").expect("Failed to parse test gateway URL.");
		let gateway = Gateway::new(
			gateway_url,
			Arc::new(test_signer()),
			ledger.clone(),
			Arc::new(config.clone()),
		)
		.expect("Failed to build test gateway.")
		.with_audit_sink(Arc::new(audit.clone()));

		(gateway, TestCollaborators { ledger, audit, config })
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
