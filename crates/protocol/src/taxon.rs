use crate::rank::Rank;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type TaxonId = u64;
pub type PlaceId = u64;

/// Taxon record as returned by the taxonomy collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Taxon {
    pub id: TaxonId,

    /// Scientific name (e.g. "Ursus americanus")
    pub name: String,

    pub rank: Rank,

    /// Common names, preferred name first
    #[serde(default)]
    pub common_names: Vec<String>,

    /// Name or synonym the remote search matched on, when the record came from a name search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_term: Option<String>,

    /// Ancestors ordered root-to-leaf, not including this taxon.
    #[serde(default)]
    pub ancestors: Vec<Taxon>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub observations_count: u64,

    /// Establishment means in the preferred place, when a place context was supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub establishment_means: Option<EstablishmentMeans>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listed_taxa: Vec<EstablishmentMeans>,
}

fn default_active() -> bool {
    true
}

impl Taxon {
    pub fn new(id: TaxonId, name: impl Into<String>, rank: Rank) -> Self {
        Self {
            id,
            name: name.into(),
            rank,
            common_names: Vec::new(),
            matched_term: None,
            ancestors: Vec::new(),
            is_active: true,
            observations_count: 0,
            establishment_means: None,
            listed_taxa: Vec::new(),
        }
    }

    /// Builder-style: add a common name, most preferred first
    pub fn common_name(mut self, name: impl Into<String>) -> Self {
        self.common_names.push(name.into());
        self
    }

    /// Builder-style: set the root-to-leaf ancestor chain
    pub fn with_ancestors(mut self, ancestors: Vec<Taxon>) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Ancestor ids, root first.
    pub fn ancestor_ids(&self) -> impl Iterator<Item = TaxonId> + '_ {
        self.ancestors.iter().map(|ancestor| ancestor.id)
    }

    /// Ancestor chain including the taxon itself, root first.
    pub fn lineage(&self) -> impl Iterator<Item = &Taxon> + '_ {
        self.ancestors.iter().chain(std::iter::once(self))
    }

    /// True when this taxon is `ancestor_id` or sits below it.
    #[must_use]
    pub fn descends_from(&self, ancestor_id: TaxonId) -> bool {
        self.id == ancestor_id || self.ancestor_ids().any(|id| id == ancestor_id)
    }

    /// Every name a query may match: scientific name, common names, matched term.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.name.as_str())
            .chain(self.common_names.iter().map(String::as_str))
            .chain(self.matched_term.as_deref())
    }

    /// Establishment means for a specific place.
    ///
    /// Place listings win; the preferred-place annotation is used only when it is for the same
    /// place.
    #[must_use]
    pub fn means_in(&self, place_id: PlaceId) -> Option<&EstablishmentMeans> {
        self.listed_taxa
            .iter()
            .find(|means| means.place.id == place_id)
            .or_else(|| {
                self.establishment_means
                    .as_ref()
                    .filter(|means| means.place.id == place_id)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlaceSummary {
    pub id: PlaceId,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Means {
    Native,
    Endemic,
    Introduced,
    Invasive,
    Managed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EstablishmentMeans {
    pub place: PlaceSummary,
    pub means: Means,
}
