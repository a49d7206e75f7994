use crate::observation::{HistoryMessage, Observation, ObservationId};
use crate::taxon::{PlaceId, Taxon, TaxonId};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by an external collaborator (HTTP error, timeout, bad payload).
///
/// The query core never retries these; they travel up unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Lookup failed: {0}")]
    Failed(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Parameters of a taxonomy search. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonSearch {
    pub ids: Vec<TaxonId>,
    pub name: Option<String>,
    pub ancestor_id: Option<TaxonId>,
    pub place_id: Option<PlaceId>,
}

impl TaxonSearch {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn place(mut self, place_id: Option<PlaceId>) -> Self {
        self.place_id = place_id;
        self
    }
}

/// Remote taxonomy.
#[async_trait]
pub trait TaxonLookup: Send + Sync {
    /// Candidates in the remote service's relevance order.
    async fn search(&self, request: &TaxonSearch) -> Result<Vec<Taxon>, LookupError>;

    /// Full record with ancestors. `Ok(None)` means the id does not exist.
    async fn get(&self, id: TaxonId, place_id: Option<PlaceId>)
        -> Result<Option<Taxon>, LookupError>;
}

#[async_trait]
pub trait ObservationLookup: Send + Sync {
    async fn get_observation(&self, id: ObservationId) -> Result<Option<Observation>, LookupError>;
}

/// Chat history of one channel.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// At most `limit` messages, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<HistoryMessage>, LookupError>;
}
