use crate::error::{ResolveError, Result};
use crate::resolver::{ResolveContext, ResolvedTaxon, TaxonResolver};
use inat_protocol::Taxon;
use serde::Serialize;

impl TaxonResolver<'_> {
    /// Resolve a comma-separated list of queries, one after another.
    ///
    /// Blank segments are skipped. The first failing segment aborts the whole list.
    pub async fn resolve_many(
        &self,
        raw: &str,
        context: &ResolveContext,
    ) -> Result<Vec<ResolvedTaxon>> {
        let segments: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        let mut resolved = Vec::with_capacity(segments.len());
        for segment in segments {
            log::debug!("Resolving list segment `{}`", segment);
            resolved.push(self.resolve_text(segment, context).await?);
        }
        Ok(resolved)
    }
}

/// Length of the common root-to-leaf prefix of two lineages (depth of the lowest common
/// ancestor, counting the root as 1).
#[must_use]
pub fn shared_depth(a: &Taxon, b: &Taxon) -> usize {
    a.lineage()
        .zip(b.lineage())
        .take_while(|(left, right)| left.id == right.id)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedTaxon {
    pub resolved: ResolvedTaxon,
    /// Shared depth with the first taxon of the list
    pub shared_depth: usize,
    /// Index in the input list
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairRelatedness {
    pub left: usize,
    pub right: usize,
    pub shared_depth: usize,
}

/// Grouping for "related" output: closest relatives of the first taxon come first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relatedness {
    /// Deepest taxon present in every lineage
    pub common_ancestor: Option<Taxon>,
    pub taxa: Vec<RelatedTaxon>,
    /// Every unordered pair, indexed by input position
    pub pairs: Vec<PairRelatedness>,
}

impl Relatedness {
    pub fn compute(resolved: Vec<ResolvedTaxon>) -> Self {
        let mut pairs = Vec::new();
        for (i, left) in resolved.iter().enumerate() {
            for (j, right) in resolved.iter().enumerate().skip(i + 1) {
                pairs.push(PairRelatedness {
                    left: i,
                    right: j,
                    shared_depth: shared_depth(&left.taxon, &right.taxon),
                });
            }
        }

        let common_ancestor = common_ancestor(resolved.iter().map(|r| &r.taxon));

        let mut taxa: Vec<RelatedTaxon> = match resolved.first().map(|r| r.taxon.clone()) {
            Some(first) => resolved
                .into_iter()
                .enumerate()
                .map(|(position, resolved)| RelatedTaxon {
                    shared_depth: shared_depth(&first, &resolved.taxon),
                    resolved,
                    position,
                })
                .collect(),
            None => Vec::new(),
        };
        // Stable: equally related taxa keep input order.
        taxa.sort_by(|a, b| b.shared_depth.cmp(&a.shared_depth));

        Self {
            common_ancestor,
            taxa,
            pairs,
        }
    }
}

fn common_ancestor<'a>(mut taxa: impl Iterator<Item = &'a Taxon>) -> Option<Taxon> {
    let first = taxa.next()?;
    let mut depth = first.lineage().count();
    for taxon in taxa {
        depth = depth.min(shared_depth(first, taxon));
    }
    let index = depth.checked_sub(1)?;
    first.lineage().nth(index).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inat_protocol::{LookupError, PlaceId, Rank, TaxonId, TaxonLookup, TaxonSearch};
    use pretty_assertions::assert_eq;

    fn chain(ids: &[(TaxonId, &str, Rank)]) -> Vec<Taxon> {
        ids.iter()
            .map(|(id, name, rank)| Taxon::new(*id, *name, *rank))
            .collect()
    }

    fn frogs() -> Vec<Taxon> {
        let hylidae = chain(&[
            (1, "Animalia", Rank::Kingdom),
            (20978, "Amphibia", Rank::Class),
            (20979, "Anura", Rank::Order),
            (19577, "Hylidae", Rank::Family),
        ]);
        vec![
            Taxon::new(24255, "Pseudacris maculata", Rank::Species).with_ancestors(
                [hylidae.clone(), chain(&[(23930, "Pseudacris", Rank::Genus)])].concat(),
            ),
            Taxon::new(24267, "Pseudacris crucifer", Rank::Species).with_ancestors(
                [hylidae.clone(), chain(&[(23930, "Pseudacris", Rank::Genus)])].concat(),
            ),
            Taxon::new(66002, "Lithobates catesbeianus", Rank::Species).with_ancestors(
                [
                    hylidae[..3].to_vec(),
                    chain(&[(20980, "Ranidae", Rank::Family), (60341, "Lithobates", Rank::Genus)]),
                ]
                .concat(),
            ),
            Taxon::new(12727, "Turdus migratorius", Rank::Species).with_ancestors(chain(&[
                (1, "Animalia", Rank::Kingdom),
                (3, "Aves", Rank::Class),
            ])),
        ]
    }

    struct ById(Vec<Taxon>);

    #[async_trait]
    impl TaxonLookup for ById {
        async fn search(
            &self,
            request: &TaxonSearch,
        ) -> std::result::Result<Vec<Taxon>, LookupError> {
            let name = request.name.clone().unwrap_or_default().to_lowercase();
            Ok(self
                .0
                .iter()
                .filter(|t| t.name.to_lowercase().starts_with(&name))
                .cloned()
                .collect())
        }

        async fn get(
            &self,
            id: TaxonId,
            _place_id: Option<PlaceId>,
        ) -> std::result::Result<Option<Taxon>, LookupError> {
            Ok(self.0.iter().find(|t| t.id == id).cloned())
        }
    }

    #[tokio::test]
    async fn related_ids_resolve_independently() {
        let lookup = ById(frogs());
        let resolver = TaxonResolver::new(&lookup);
        let resolved = resolver
            .resolve_many("24255,24267", &ResolveContext::default())
            .await
            .expect("resolved");
        let ids: Vec<TaxonId> = resolved.iter().map(|r| r.taxon.id).collect();
        assert_eq!(ids, vec![24255, 24267]);

        let related = Relatedness::compute(resolved);
        assert_eq!(
            related.pairs,
            vec![PairRelatedness {
                left: 0,
                right: 1,
                shared_depth: 5
            }]
        );
        assert_eq!(related.common_ancestor.map(|t| t.name), Some("Pseudacris".to_string()));
    }

    #[tokio::test]
    async fn resolve_many_fails_fast_and_skips_blanks() {
        let lookup = ById(frogs());
        let resolver = TaxonResolver::new(&lookup);
        let resolved = resolver
            .resolve_many(" 24255 , , turdus ", &ResolveContext::default())
            .await
            .expect("resolved");
        assert_eq!(resolved.len(), 2);

        let err = resolver
            .resolve_many("24255, nothing here, 24267", &ResolveContext::default())
            .await
            .expect_err("second segment fails");
        assert!(matches!(err, ResolveError::NotFound(_)));

        assert_eq!(
            resolver.resolve_many(" , ", &ResolveContext::default()).await,
            Err(ResolveError::EmptyQuery)
        );
    }

    #[test]
    fn orders_by_relatedness_to_first() {
        let resolved: Vec<ResolvedTaxon> = frogs()
            .into_iter()
            .rev()
            .map(|taxon| ResolvedTaxon {
                taxon,
                ancestor: None,
                user: None,
                place: None,
            })
            .collect();
        // Input: robin, bullfrog, spring peeper, boreal chorus frog.
        let first_is_frog: Vec<ResolvedTaxon> = resolved[1..]
            .iter()
            .cloned()
            .chain(std::iter::once(resolved[0].clone()))
            .collect();
        let related = Relatedness::compute(first_is_frog);
        let order: Vec<(usize, usize)> = related
            .taxa
            .iter()
            .map(|t| (t.position, t.shared_depth))
            .collect();
        // bullfrog first (itself), then two Hylidae frogs sharing Anura, then the robin.
        assert_eq!(order, vec![(0, 6), (1, 3), (2, 3), (3, 1)]);
        assert_eq!(related.pairs.len(), 6);
        assert_eq!(related.common_ancestor.map(|t| t.name), Some("Animalia".to_string()));
    }

    #[test]
    fn unrelated_lineages_have_no_common_ancestor() {
        let a = Taxon::new(1, "Animalia", Rank::Kingdom);
        let p = Taxon::new(47126, "Plantae", Rank::Kingdom);
        assert_eq!(shared_depth(&a, &p), 0);
        assert_eq!(common_ancestor([&a, &p].into_iter()), None);
        assert_eq!(common_ancestor([&a].into_iter()), Some(a.clone()));
    }
}
