//! # iNat History
//!
//! Recognizes iNaturalist links in chat text and finds the most recent one.
//!
//! ```text
//! HistorySource::recent(limit) ─▶ newest-first messages
//!                                       │  body, then embed URLs
//!                                       ▼
//!                     LinkRecognizers (observation / taxon / .query.)
//!                                       │  first match
//!                                       ▼
//!                ObservationLookup / TaxonLookup ─▶ LastMention
//! ```
//!
//! Link patterns are configuration: [`LinkConfig`] holds regex sources with built-in defaults
//! for inaturalist.org and inaturalist.ca, loadable from JSON or TOML.

mod error;
mod links;
mod tracker;

pub use error::{HistoryError, LinkConfigError, Result};
pub use links::{
    LinkConfig, LinkMatch, LinkRecognizers, DEFAULT_DOT_TAXON, DEFAULT_OBSERVATION_LINK,
    DEFAULT_TAXON_LINK,
};
pub use tracker::{LastMention, LastMentionTracker, DEFAULT_HISTORY_LIMIT};
