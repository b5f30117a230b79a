//! # feedsnap
//!
//! Captures RSS/Atom entries as self-contained static documents.
//!
//! ## Architecture
//!
//! Each run is one sequential pass:
//!
//! ```text
//! Fetcher → Normalizer → DedupLedger → Renderer → Localizer → Store
//! ```
//!
//! - [`fetcher`]: HTTP client used for feeds and page resources
//! - [`normalizer`]: Converts RSS/Atom/JSON feeds into entries
//! - [`store`]: Document and asset directories, plus the dedup ledger
//! - [`renderer`]: Headless Chrome page rendering
//! - [`localizer`]: Downloads images, stylesheets and fonts next to the documents
//! - [`assembler`]: Builds and writes one document per entry
//! - [`pipeline`]: Drives a whole run
//!
//! ## Quick Start
//!
//! ```bash
//! # Capture new entries using ~/.config/feedsnap/config.toml
//! feedsnap
//!
//! # Or with a config file kept next to the site
//! feedsnap --config site/feedsnap.toml
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires the production
/// fetcher, renderer and store into a [`Pipeline`](pipeline::Pipeline).
pub mod app;

/// Document assembly for a single entry.
pub mod assembler;

/// Command-line interface using clap.
pub mod cli;

/// Run configuration loaded from TOML.
pub mod config;

/// Core domain models.
///
/// - [`FeedEntry`](domain::FeedEntry): one item yielded by a feed
/// - [`CapturedDocument`](domain::CapturedDocument): a document ready to write
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for GET requests
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Bounded concurrent fetching
pub mod fetcher;

/// Resource localization: assets, stylesheets and their nested references.
pub mod localizer;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into [`FeedEntry`](domain::FeedEntry) values.
pub mod normalizer;

/// The run driver.
pub mod pipeline;

/// Headless browser rendering.
///
/// - [`Renderer`](renderer::Renderer): Async trait for page navigation
/// - [`ChromeRenderer`](renderer::ChromeRenderer): chromiumoxide implementation
/// - [`RendererConfig`](renderer::RendererConfig): Configuration options
pub mod renderer;

/// Filesystem persistence.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`FsStore`](store::FsStore): Directory-backed implementation
/// - [`DedupLedger`](store::DedupLedger): Captured source URLs
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
