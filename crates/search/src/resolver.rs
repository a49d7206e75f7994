use crate::error::{ResolveError, Result};
use crate::matching::{matches_banding_code, matches_phrase, name_starts_with};
use inat_protocol::{PlaceId, Taxon, TaxonLookup, TaxonSearch};
use inat_query::{Clause, CompoundQuery, TaxonQuery};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Break remaining ties by relevance order. When off, a tie is [`ResolveError::Ambiguous`].
    pub auto_pick: bool,
    /// Search again without rank keywords when the full text finds nothing.
    pub retry_without_rank_words: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            auto_pick: true,
            retry_without_rank_words: true,
        }
    }
}

/// Per-request context passed through to the taxonomy collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveContext {
    /// Preferred place, for establishment means annotations
    pub place_id: Option<PlaceId>,
}

/// Single taxon picked for a query, with the filters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTaxon {
    pub taxon: Taxon,

    /// Taxon resolved from the `in` clause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestor: Option<Taxon>,

    /// `by` clause text, for observation count annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// `from` clause text, for observation count annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

impl ResolvedTaxon {
    fn new(taxon: Taxon, ancestor: Option<Taxon>, query: &CompoundQuery) -> Self {
        Self {
            taxon,
            ancestor,
            user: query.user_text(),
            place: query.place_text(),
        }
    }
}

/// Picks the single best taxon for a parsed query.
///
/// Lookups are issued one at a time in a fixed order (ids, name search, ancestor clause), so a
/// deterministic collaborator gives deterministic answers. Nothing is cached between calls.
pub struct TaxonResolver<'a> {
    lookup: &'a dyn TaxonLookup,
    options: ResolveOptions,
}

impl<'a> TaxonResolver<'a> {
    pub fn new(lookup: &'a dyn TaxonLookup) -> Self {
        Self {
            lookup,
            options: ResolveOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse and resolve raw query text.
    pub async fn resolve_text(&self, raw: &str, context: &ResolveContext) -> Result<ResolvedTaxon> {
        let query = CompoundQuery::parse(raw)?;
        self.resolve(&query, context).await
    }

    pub async fn resolve(
        &self,
        query: &CompoundQuery,
        context: &ResolveContext,
    ) -> Result<ResolvedTaxon> {
        let subject = query.taxon_query(Clause::Subject);
        if subject.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        if let Some(taxon) = self.lookup_ids(&subject, context).await? {
            log::info!("Resolved `{}` by id to {} ({})", query, taxon.name, taxon.id);
            return Ok(ResolvedTaxon::new(taxon, None, query));
        }

        let (candidates, searched) = self.search_names(&subject, context).await?;

        let ancestor = if query.ancestor.is_empty() {
            None
        } else {
            let bucket = query.taxon_query(Clause::Ancestor);
            Some(self.resolve_bucket(&bucket, context).await?)
        };

        let taxon = self.select(&subject, &searched, candidates, ancestor.as_ref())?;
        log::info!("Resolved `{}` to {} ({})", query, taxon.name, taxon.id);
        Ok(ResolvedTaxon::new(taxon, ancestor, query))
    }

    /// Resolve one bucket on its own, as if it were a query with no other clauses.
    async fn resolve_bucket(&self, bucket: &TaxonQuery, context: &ResolveContext) -> Result<Taxon> {
        if let Some(taxon) = self.lookup_ids(bucket, context).await? {
            return Ok(taxon);
        }
        let (candidates, searched) = self.search_names(bucket, context).await?;
        self.select(bucket, &searched, candidates, None)
    }

    async fn lookup_ids(
        &self,
        bucket: &TaxonQuery,
        context: &ResolveContext,
    ) -> Result<Option<Taxon>> {
        for id in bucket.taxon_ids() {
            log::debug!("Looking up taxon id {}", id);
            if let Some(taxon) = self.lookup.get(id, context.place_id).await? {
                return Ok(Some(taxon));
            }
            log::debug!("No taxon with id {}", id);
        }
        Ok(None)
    }

    /// Returns the candidates and the text that produced them.
    async fn search_names(
        &self,
        bucket: &TaxonQuery,
        context: &ResolveContext,
    ) -> Result<(Vec<Taxon>, String)> {
        let text = bucket.name_text();
        if text.is_empty() {
            let ids: Vec<String> = bucket.taxon_ids().iter().map(u64::to_string).collect();
            return Err(ResolveError::NotFound(format!(
                "no taxon with id {}",
                ids.join(", ")
            )));
        }

        let candidates = self.search(&text, context).await?;
        if candidates.is_empty() && self.options.retry_without_rank_words && bucket.has_rank_words()
        {
            let stripped = bucket.name_text_without_ranks();
            if !stripped.is_empty() && stripped != text {
                log::warn!(
                    "No candidates for `{}`, retrying without rank keywords as `{}`",
                    text,
                    stripped
                );
                let candidates = self.search(&stripped, context).await?;
                return Ok((candidates, stripped));
            }
        }
        Ok((candidates, text))
    }

    async fn search(&self, text: &str, context: &ResolveContext) -> Result<Vec<Taxon>> {
        let request = TaxonSearch::by_name(text).place(context.place_id);
        let candidates = self.lookup.search(&request).await?;
        log::debug!("Name search `{}` returned {} candidates", text, candidates.len());
        Ok(candidates)
    }

    /// Filter and rank candidates; first rule that decides wins.
    fn select(
        &self,
        bucket: &TaxonQuery,
        searched: &str,
        mut candidates: Vec<Taxon>,
        ancestor: Option<&Taxon>,
    ) -> Result<Taxon> {
        if candidates.is_empty() {
            return Err(ResolveError::NotFound(format!("no taxon matches `{searched}`")));
        }

        if let Some(code) = bucket.banding_code() {
            if let Some(pos) = candidates
                .iter()
                .position(|taxon| matches_banding_code(taxon, code))
            {
                log::debug!("Banding code {} matched candidate #{}", code, pos);
                return Ok(candidates.swap_remove(pos));
            }
        }

        let phrases: Vec<&str> = bucket.phrases().collect();
        if !phrases.is_empty() {
            candidates.retain(|taxon| phrases.iter().all(|phrase| matches_phrase(taxon, phrase)));
            log::debug!("{} candidates match quoted phrases", candidates.len());
            if candidates.is_empty() {
                return Err(ResolveError::NotFound(format!(
                    "no exact match for \"{}\"",
                    phrases.join("\", \"")
                )));
            }
        }

        if !bucket.ranks.is_empty() {
            candidates.retain(|taxon| bucket.ranks.contains(&taxon.rank));
            log::debug!("{} candidates match rank filters", candidates.len());
            if candidates.is_empty() {
                let ranks: Vec<&str> = bucket.ranks.iter().map(|rank| rank.as_str()).collect();
                return Err(ResolveError::NotFound(format!(
                    "no {} matches `{searched}`",
                    ranks.join(" or ")
                )));
            }
        }

        if let Some(ancestor) = ancestor {
            candidates.retain(|taxon| taxon.descends_from(ancestor.id));
            log::debug!("{} candidates descend from {}", candidates.len(), ancestor.name);
            if candidates.is_empty() {
                return Err(ResolveError::NotFound(format!(
                    "no match for `{searched}` in {}",
                    ancestor.name
                )));
            }
        }

        self.pick(searched, candidates)
    }

    /// Prefix matches beat substring matches, then shorter scientific names, then relevance.
    fn pick(&self, searched: &str, candidates: Vec<Taxon>) -> Result<Taxon> {
        let key = |taxon: &Taxon| (!name_starts_with(taxon, searched), taxon.name.len());

        if !self.options.auto_pick {
            if let Some(best) = candidates.iter().map(key).min() {
                let tied: Vec<&str> = candidates
                    .iter()
                    .filter(|&taxon| key(taxon) == best)
                    .map(|taxon| taxon.name.as_str())
                    .collect();
                if tied.len() > 1 {
                    return Err(ResolveError::Ambiguous(format!(
                        "`{searched}` matches {}",
                        tied.join(", ")
                    )));
                }
            }
        }

        candidates
            .into_iter()
            .min_by_key(key)
            .ok_or_else(|| ResolveError::NotFound(format!("no taxon matches `{searched}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inat_protocol::{LookupError, Rank, TaxonId};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Returns fixed search results and records every call.
    #[derive(Default)]
    struct ScriptedLookup {
        records: Vec<Taxon>,
        results: Vec<(String, Vec<Taxon>)>,
        calls: Mutex<Vec<String>>,
        fail_search: bool,
    }

    impl ScriptedLookup {
        fn record(mut self, taxon: Taxon) -> Self {
            self.records.push(taxon);
            self
        }

        fn results(mut self, text: &str, taxa: Vec<Taxon>) -> Self {
            self.results.push((text.to_string(), taxa));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl TaxonLookup for ScriptedLookup {
        async fn search(
            &self,
            request: &TaxonSearch,
        ) -> std::result::Result<Vec<Taxon>, LookupError> {
            let name = request.name.clone().unwrap_or_default();
            self.calls.lock().expect("lock").push(format!("search:{name}"));
            if self.fail_search {
                return Err(LookupError::Failed("timed out".to_string()));
            }
            Ok(self
                .results
                .iter()
                .find(|(text, _)| *text == name)
                .map(|(_, taxa)| taxa.clone())
                .unwrap_or_default())
        }

        async fn get(
            &self,
            id: TaxonId,
            _place_id: Option<PlaceId>,
        ) -> std::result::Result<Option<Taxon>, LookupError> {
            self.calls.lock().expect("lock").push(format!("get:{id}"));
            Ok(self.records.iter().find(|t| t.id == id).cloned())
        }
    }

    fn animalia() -> Taxon {
        Taxon::new(1, "Animalia", Rank::Kingdom).common_name("Animals")
    }

    fn plantae() -> Taxon {
        Taxon::new(47126, "Plantae", Rank::Kingdom).common_name("Plants")
    }

    fn aves() -> Taxon {
        Taxon::new(3, "Aves", Rank::Class)
            .common_name("Birds")
            .with_ancestors(vec![animalia()])
    }

    async fn resolve(lookup: &ScriptedLookup, raw: &str) -> Result<ResolvedTaxon> {
        TaxonResolver::new(lookup)
            .resolve_text(raw, &ResolveContext::default())
            .await
    }

    #[tokio::test]
    async fn first_relevance_result_wins_without_filters() {
        let lookup = ScriptedLookup::default().results(
            "warbler",
            vec![
                Taxon::new(145245, "Setophaga", Rank::Genus).common_name("New World Warblers"),
                Taxon::new(7251, "Parulidae", Rank::Family).common_name("New World Warblers"),
            ],
        );
        let resolved = resolve(&lookup, "warbler").await.expect("resolved");
        assert_eq!(resolved.taxon.name, "Setophaga");
    }

    #[tokio::test]
    async fn rank_filter_picks_family_over_genus() {
        let lookup = ScriptedLookup::default().results(
            "bear family",
            vec![
                Taxon::new(41635, "Ursus", Rank::Genus).common_name("bear"),
                Taxon::new(41636, "Ursidae", Rank::Family).common_name("Bear Family"),
            ],
        );
        let resolved = resolve(&lookup, r#""bear" family"#).await.expect("resolved");
        assert_eq!(resolved.taxon.name, "Ursidae");
    }

    #[tokio::test]
    async fn rank_filter_with_no_match_is_not_found() {
        let lookup = ScriptedLookup::default().results(
            "robin species",
            vec![Taxon::new(12716, "Turdus", Rank::Genus).common_name("Robins")],
        );
        let err = resolve(&lookup, "robin species").await.expect_err("no species");
        assert!(matches!(err, ResolveError::NotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn numeric_id_wins_unconditionally() {
        let lookup = ScriptedLookup::default()
            .record(Taxon::new(24255, "Pseudacris maculata", Rank::Species))
            .results("family frog", vec![Taxon::new(20979, "Ranidae", Rank::Family)]);
        let resolved = resolve(&lookup, "family 24255 frog in plants")
            .await
            .expect("resolved");
        assert_eq!(resolved.taxon.id, 24255);
        assert_eq!(lookup.calls(), vec!["get:24255".to_string()]);
    }

    #[tokio::test]
    async fn missing_id_without_names_is_not_found() {
        let lookup = ScriptedLookup::default();
        let err = resolve(&lookup, "999999").await.expect_err("missing");
        assert_eq!(err, ResolveError::NotFound("no taxon with id 999999".to_string()));
    }

    #[tokio::test]
    async fn ancestor_clause_filters_descendants() {
        let plant = Taxon::new(53421, "Prunella", Rank::Genus)
            .common_name("self-heals")
            .with_ancestors(vec![plantae()]);
        let bird = Taxon::new(14881, "Prunella", Rank::Genus)
            .common_name("Accentors")
            .with_ancestors(vec![animalia(), aves()]);
        let lookup = ScriptedLookup::default()
            .results("prunella", vec![plant, bird])
            .results("animals", vec![animalia()]);

        let resolved = resolve(&lookup, "prunella in animals").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 14881);
        assert_eq!(resolved.ancestor.map(|a| a.name), Some("Animalia".to_string()));
        assert_eq!(
            lookup.calls(),
            vec!["search:prunella".to_string(), "search:animals".to_string()]
        );
    }

    #[tokio::test]
    async fn ancestor_clause_with_no_descendant_is_not_found() {
        let plant = Taxon::new(53421, "Prunella", Rank::Genus).with_ancestors(vec![plantae()]);
        let lookup = ScriptedLookup::default()
            .results("prunella", vec![plant])
            .results("animals", vec![animalia()]);
        let err = resolve(&lookup, "prunella in animals").await.expect_err("filtered");
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[tokio::test]
    async fn quoted_phrase_excludes_partial_words() {
        let lookup = ScriptedLookup::default().results(
            "bear",
            vec![
                Taxon::new(51046, "Arctostaphylos uva-ursi", Rank::Species)
                    .common_name("Bearberry"),
                Taxon::new(41638, "Ursus americanus", Rank::Species)
                    .common_name("American Black Bear"),
            ],
        );
        let resolved = resolve(&lookup, "\"bear\"").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 41638);
    }

    #[tokio::test]
    async fn banding_code_beats_relevance() {
        let sparrow = Taxon::new(9184, "Zonotrichia albicollis", Rank::Species)
            .common_name("White-throated Sparrow")
            .with_ancestors(vec![animalia(), aves()]);
        let lookup = ScriptedLookup::default().results(
            "WTSP",
            vec![Taxon::new(1, "Wtspia", Rank::Genus), sparrow],
        );
        let resolved = resolve(&lookup, "WTSP").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 9184);
    }

    #[tokio::test]
    async fn prefix_match_beats_substring_and_shorter_name_breaks_ties() {
        let lookup = ScriptedLookup::default().results(
            "chorus frog",
            vec![
                Taxon::new(1, "Pseudacris triseriata", Rank::Species)
                    .common_name("Western Chorus Frog"),
                Taxon::new(2, "Pseudacris", Rank::Genus).common_name("Chorus Frogs"),
                Taxon::new(3, "Pseudacris maculata", Rank::Species)
                    .common_name("Boreal Chorus Frog"),
            ],
        );
        let resolved = resolve(&lookup, "chorus frog").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 2);

        let lookup = ScriptedLookup::default().results(
            "frog",
            vec![
                Taxon::new(1, "Pseudacris triseriata", Rank::Species)
                    .common_name("Western Chorus Frog"),
                Taxon::new(3, "Rana", Rank::Genus).common_name("Brown Frogs"),
            ],
        );
        let resolved = resolve(&lookup, "frog").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 3);
    }

    #[tokio::test]
    async fn retries_without_rank_words() {
        let lookup = ScriptedLookup::default()
            .results("family bear", vec![])
            .results("bear", vec![Taxon::new(41636, "Ursidae", Rank::Family).common_name("Bears")]);
        let resolved = resolve(&lookup, "family bear").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 41636);
        assert_eq!(
            lookup.calls(),
            vec!["search:family bear".to_string(), "search:bear".to_string()]
        );

        let strict = TaxonResolver::new(&lookup).with_options(ResolveOptions {
            retry_without_rank_words: false,
            ..ResolveOptions::default()
        });
        let err = strict
            .resolve_text("family bear", &ResolveContext::default())
            .await
            .expect_err("no retry");
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[tokio::test]
    async fn strict_mode_reports_ties() {
        let lookup = ScriptedLookup::default().results(
            "warbler",
            vec![
                Taxon::new(145245, "Setophaga", Rank::Genus).common_name("New World Warblers"),
                Taxon::new(7251, "Parulidae", Rank::Family).common_name("New World Warblers"),
            ],
        );
        let resolver = TaxonResolver::new(&lookup).with_options(ResolveOptions {
            auto_pick: false,
            ..ResolveOptions::default()
        });
        let err = resolver
            .resolve_text("warbler", &ResolveContext::default())
            .await
            .expect_err("tie");
        assert!(matches!(err, ResolveError::Ambiguous(_)), "{err:?}");
    }

    #[tokio::test]
    async fn user_and_place_are_carried_not_filtered() {
        let lookup = ScriptedLookup::default().results("birds", vec![aves()]);
        let resolved = resolve(&lookup, "birds by kueda from new york").await.expect("resolved");
        assert_eq!(resolved.taxon.id, 3);
        assert_eq!(resolved.user.as_deref(), Some("kueda"));
        assert_eq!(resolved.place.as_deref(), Some("new york"));
        assert_eq!(lookup.calls(), vec!["search:birds".to_string()]);
    }

    #[tokio::test]
    async fn errors_surface_unchanged() {
        let lookup = ScriptedLookup {
            fail_search: true,
            ..ScriptedLookup::default()
        };
        let err = resolve(&lookup, "birds").await.expect_err("lookup failure");
        assert_eq!(
            err,
            ResolveError::Lookup(LookupError::Failed("timed out".to_string()))
        );
        assert_eq!(resolve(&lookup, "in birds").await, Err(ResolveError::EmptyQuery));
        assert!(matches!(
            resolve(&lookup, "\"birds").await,
            Err(ResolveError::MalformedQuery(_))
        ));
    }
}
