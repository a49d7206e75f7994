//! # iNat Search
//!
//! Turns a parsed [`inat_query::CompoundQuery`] into exactly one taxon.
//!
//! ## Resolution cascade
//!
//! ```text
//! subject ids ──get──▶ found? ──────────────────────────────▶ done
//!      │
//!      ▼
//! name search ──▶ banding code ──▶ "phrases" ──▶ rank filters ──▶ in <ancestor> ──▶ pick
//!  (retry w/o                                                        │
//!   rank words)                                              resolved the same way
//! ```
//!
//! Lookups run one at a time in a fixed order, so a deterministic collaborator gives
//! deterministic answers. The first decisive rule wins; `pick` prefers names starting with the
//! searched text, then shorter scientific names, then the collaborator's relevance order.
//!
//! Also here: the ancestor navigator ([`find_ancestor`], [`fetch_ancestor`]), list resolution
//! with relatedness grouping ([`Relatedness`]), and [`StaticTaxonomy`], an in-memory
//! collaborator.

mod ancestor;
mod error;
mod matching;
mod memory;
mod related;
mod resolver;

pub use ancestor::{fetch_ancestor, find_ancestor};
pub use error::{ResolveError, Result};
pub use matching::{banding_code, is_bird, matches_banding_code, matches_phrase, name_starts_with};
pub use memory::StaticTaxonomy;
pub use related::{shared_depth, PairRelatedness, RelatedTaxon, Relatedness};
pub use resolver::{ResolveContext, ResolveOptions, ResolvedTaxon, TaxonResolver};
