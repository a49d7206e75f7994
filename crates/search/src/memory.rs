use crate::matching::{banding_code, is_bird};
use async_trait::async_trait;
use inat_protocol::{
    LookupError, Observation, ObservationId, ObservationLookup, PlaceId, Taxon, TaxonId,
    TaxonLookup, TaxonSearch,
};

/// In-memory taxonomy and observation store.
///
/// Stands in for the remote service in the CLI and in tests. Name search keeps insertion order
/// as its relevance order.
#[derive(Debug, Clone, Default)]
pub struct StaticTaxonomy {
    taxa: Vec<Taxon>,
    observations: Vec<Observation>,
}

impl StaticTaxonomy {
    pub fn new(taxa: Vec<Taxon>) -> Self {
        Self {
            taxa,
            observations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_observations(mut self, observations: Vec<Observation>) -> Self {
        self.observations = observations;
        self
    }

    /// Name this taxon matched `query` on, if any.
    ///
    /// Every query word must start some word of a single name. An all-caps four-letter query
    /// also matches a bird by banding code.
    fn matched_name(taxon: &Taxon, query: &str) -> Option<String> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return None;
        }

        let by_words = taxon.names().find(|name| {
            let name_words: Vec<String> = name
                .split(|c: char| c.is_whitespace() || c == '-')
                .map(str::to_lowercase)
                .collect();
            words
                .iter()
                .all(|word| name_words.iter().any(|candidate| candidate.starts_with(word.as_str())))
        });
        if let Some(name) = by_words {
            return Some(name.to_string());
        }

        if query.len() == 4 && query.bytes().all(|b| b.is_ascii_uppercase()) && is_bird(taxon) {
            return taxon
                .common_names
                .iter()
                .find(|name| banding_code(name).as_deref() == Some(query))
                .cloned();
        }
        None
    }

    fn localize(mut taxon: Taxon, place_id: Option<PlaceId>) -> Taxon {
        if let Some(place_id) = place_id {
            if let Some(means) = taxon.means_in(place_id).cloned() {
                taxon.establishment_means = Some(means);
            }
        }
        taxon
    }
}

#[async_trait]
impl TaxonLookup for StaticTaxonomy {
    async fn search(&self, request: &TaxonSearch) -> Result<Vec<Taxon>, LookupError> {
        let in_scope = |taxon: &Taxon| {
            request
                .ancestor_id
                .map_or(true, |ancestor_id| taxon.descends_from(ancestor_id))
        };

        let results: Vec<Taxon> = if !request.ids.is_empty() {
            request
                .ids
                .iter()
                .filter_map(|id| self.taxa.iter().find(|taxon| taxon.id == *id))
                .filter(|&taxon| in_scope(taxon))
                .cloned()
                .collect()
        } else if let Some(query) = request.name.as_deref() {
            self.taxa
                .iter()
                .filter(|&taxon| taxon.is_active && in_scope(taxon))
                .filter_map(|taxon| {
                    let term = Self::matched_name(taxon, query)?;
                    let mut taxon = taxon.clone();
                    taxon.matched_term = Some(term);
                    Some(taxon)
                })
                .collect()
        } else {
            return Err(LookupError::Malformed(
                "search needs ids or a name".to_string(),
            ));
        };

        log::debug!("Static search {:?} matched {} taxa", request, results.len());
        Ok(results
            .into_iter()
            .map(|taxon| Self::localize(taxon, request.place_id))
            .collect())
    }

    async fn get(
        &self,
        id: TaxonId,
        place_id: Option<PlaceId>,
    ) -> Result<Option<Taxon>, LookupError> {
        Ok(self
            .taxa
            .iter()
            .find(|taxon| taxon.id == id)
            .cloned()
            .map(|taxon| Self::localize(taxon, place_id)))
    }
}

#[async_trait]
impl ObservationLookup for StaticTaxonomy {
    async fn get_observation(&self, id: ObservationId) -> Result<Option<Observation>, LookupError> {
        Ok(self.observations.iter().find(|obs| obs.id == id).cloned())
    }
}
