//! # iNat Protocol
//!
//! Data model shared by the query parser, the resolver and the last-mention tracker, plus the
//! narrow interfaces of the collaborators they call out to (taxonomy, observations, chat
//! history). Nothing in here talks to the network.

mod lookup;
mod observation;
mod rank;
mod taxon;

pub use lookup::{HistorySource, LookupError, ObservationLookup, TaxonLookup, TaxonSearch};
pub use observation::{HistoryMessage, MessageAuthor, Observation, ObservationId};
pub use rank::{Rank, UnknownRank};
pub use taxon::{EstablishmentMeans, Means, PlaceId, PlaceSummary, Taxon, TaxonId};
