use crate::error::{ResolveError, Result};
use inat_protocol::{PlaceId, Rank, Taxon, TaxonLookup};

/// Nearest ancestor of `taxon` at `rank`, or the taxon itself when it already has that rank.
///
/// Ranks at or below the taxon's own level return `None` without walking the chain.
#[must_use]
pub fn find_ancestor(taxon: &Taxon, rank: Rank) -> Option<&Taxon> {
    if taxon.rank == rank {
        return Some(taxon);
    }
    if !rank.is_above(taxon.rank) {
        return None;
    }
    taxon.ancestors.iter().rev().find(|ancestor| ancestor.rank == rank)
}

/// Like [`find_ancestor`], refetching the full record first when `taxon` has no ancestor chain
/// (taxa embedded in observations usually don't). A missing ancestor is [`ResolveError::NotFound`].
pub async fn fetch_ancestor(
    lookup: &dyn TaxonLookup,
    taxon: &Taxon,
    rank: Rank,
    place_id: Option<PlaceId>,
) -> Result<Taxon> {
    let refreshed;
    let full = if taxon.ancestors.is_empty() && taxon.rank != rank && rank.is_above(taxon.rank) {
        log::debug!("Refetching {} ({}) for its ancestors", taxon.name, taxon.id);
        refreshed = lookup.get(taxon.id, place_id).await?;
        refreshed.as_ref().unwrap_or(taxon)
    } else {
        taxon
    };

    find_ancestor(full, rank)
        .cloned()
        .ok_or_else(|| ResolveError::NotFound(format!("{} has no {} ancestor", taxon.name, rank)))
}
