//! Core pipeline for caribdata.
//!
//! This crate contains:
//! - Catalog loading and validation
//! - The HTTP transport abstraction with retry/backoff/jitter
//! - Source adapters (World Bank, FAOSTAT with its fallback chain, messy
//!   spreadsheet harvesting)
//! - The URL-keyed disk cache and tidy-output writers
//! - The fail-soft build orchestrator

pub mod adapters;
pub mod build;
pub mod cache;
pub mod config;
pub mod countries;
pub mod error;
pub mod http_client;
pub mod messy;
pub mod model;
pub mod retry;
pub mod source;
pub mod tidy;

pub use adapters::{FaostatAdapter, WorldBankAdapter};
pub use build::{BuildSummary, Builder, SourceSummary};
pub use cache::DiskCache;
pub use config::{
    Catalog, FaostatConfig, IndicatorSpec, MessyConfig, MessyItem, ProjectConfig, WorldBankConfig,
};
pub use error::BuildError;
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, RetryingClient,
    ScriptedHttpClient,
};
pub use messy::{MessyFetcher, MessyRun};
pub use model::{DictionaryRow, FaoRow, FreshnessStamp, Manifest, ManifestEntry, WbRow};
pub use retry::{Backoff, RetryConfig};
pub use source::{ErrorRecord, FetchOutcome, Provenance, SourceError, SourceErrorKind};
