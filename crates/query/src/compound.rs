use crate::error::{QueryError, Result};
use crate::tokenizer::tokenize;
use inat_protocol::{Rank, TaxonId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket a query term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clause {
    /// Terms before any clause keyword
    Subject,
    /// `in <taxon>`
    Ancestor,
    /// `by <user>`
    User,
    /// `from <place>`
    Place,
}

impl Clause {
    /// Clause started by a reserved keyword, if `token` is one (case-insensitive).
    #[must_use]
    pub fn from_keyword(token: &str) -> Option<Clause> {
        match token.to_ascii_lowercase().as_str() {
            "in" => Some(Clause::Ancestor),
            "by" => Some(Clause::User),
            "from" => Some(Clause::Place),
            _ => None,
        }
    }

    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Clause::Subject => None,
            Clause::Ancestor => Some("in"),
            Clause::User => Some("by"),
            Clause::Place => Some("from"),
        }
    }

    /// Only taxon buckets carry rank filters.
    #[must_use]
    pub const fn names_taxa(self) -> bool {
        matches!(self, Clause::Subject | Clause::Ancestor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quoted: bool,
}

impl Term {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    /// Numeric taxon id, for unquoted all-digit terms.
    #[must_use]
    pub fn taxon_id(&self) -> Option<TaxonId> {
        if self.quoted || self.text.is_empty() || !self.text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.text.parse().ok()
    }

    /// Rank named by an unquoted term. Quoting a rank word makes it a plain name.
    #[must_use]
    pub fn rank(&self) -> Option<Rank> {
        if self.quoted {
            return None;
        }
        Rank::from_keyword(&self.text)
    }

    /// Four capital letters, e.g. `WTSP`.
    #[must_use]
    pub fn is_banding_code(&self) -> bool {
        !self.quoted && self.text.len() == 4 && self.text.bytes().all(|b| b.is_ascii_uppercase())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankFilter {
    pub rank: Rank,
    pub clause: Clause,
}

/// `<subject> in <ancestor> by <user> from <place>`, split into buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundQuery {
    pub subject: Vec<Term>,
    pub ancestor: Vec<Term>,
    pub user: Vec<Term>,
    pub place: Vec<Term>,
    pub rank_filters: Vec<RankFilter>,
}

impl CompoundQuery {
    /// Parse free text into clause buckets.
    ///
    /// `in`, `by` and `from` are reserved: they switch the current bucket and never become
    /// terms. Rank keywords stay in their bucket's terms and are also recorded as filters.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut query = Self::default();
        let mut clause = Clause::Subject;

        for token in tokenize(raw)? {
            if let Some(next) = Clause::from_keyword(&token.text) {
                clause = next;
                continue;
            }
            let term = Term {
                text: token.text,
                quoted: token.quoted,
            };
            if clause.names_taxa() {
                if let Some(rank) = term.rank() {
                    query.rank_filters.push(RankFilter { rank, clause });
                }
            }
            query.terms_mut(clause).push(term);
        }

        log::debug!("Parsed query `{}` as {:?}", raw, query);
        Ok(query)
    }

    #[must_use]
    pub fn terms(&self, clause: Clause) -> &[Term] {
        match clause {
            Clause::Subject => &self.subject,
            Clause::Ancestor => &self.ancestor,
            Clause::User => &self.user,
            Clause::Place => &self.place,
        }
    }

    fn terms_mut(&mut self, clause: Clause) -> &mut Vec<Term> {
        match clause {
            Clause::Subject => &mut self.subject,
            Clause::Ancestor => &mut self.ancestor,
            Clause::User => &mut self.user,
            Clause::Place => &mut self.place,
        }
    }

    /// Distinct rank filters of one bucket, in order of appearance.
    #[must_use]
    pub fn ranks(&self, clause: Clause) -> Vec<Rank> {
        let mut ranks = Vec::new();
        for filter in self.rank_filters.iter().filter(|f| f.clause == clause) {
            if !ranks.contains(&filter.rank) {
                ranks.push(filter.rank);
            }
        }
        ranks
    }

    /// Add a rank filter to the subject without adding a term (e.g. the `species` command).
    #[must_use]
    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank_filters.push(RankFilter {
            rank,
            clause: Clause::Subject,
        });
        self
    }

    /// Taxon view of the subject or ancestor bucket.
    #[must_use]
    pub fn taxon_query(&self, clause: Clause) -> TaxonQuery {
        TaxonQuery {
            terms: self.terms(clause).to_vec(),
            ranks: self.ranks(clause),
        }
    }

    #[must_use]
    pub fn user_text(&self) -> Option<String> {
        join_terms(&self.user)
    }

    #[must_use]
    pub fn place_text(&self) -> Option<String> {
        join_terms(&self.place)
    }
}

impl FromStr for CompoundQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CompoundQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for clause in [Clause::Subject, Clause::Ancestor, Clause::User, Clause::Place] {
            let terms = self.terms(clause);
            if terms.is_empty() {
                continue;
            }
            if let Some(keyword) = clause.keyword() {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(keyword)?;
                first = false;
            }
            for term in terms {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{term}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn join_terms(terms: &[Term]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|term| term.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Terms and rank filters of a single taxon bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonQuery {
    pub terms: Vec<Term>,
    pub ranks: Vec<Rank>,
}

impl TaxonQuery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Distinct numeric ids in order of appearance.
    #[must_use]
    pub fn taxon_ids(&self) -> Vec<TaxonId> {
        let mut ids = Vec::new();
        for id in self.terms.iter().filter_map(Term::taxon_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Non-numeric terms joined with spaces: the text sent to the name search.
    #[must_use]
    pub fn name_text(&self) -> String {
        self.join(|term| term.taxon_id().is_none())
    }

    /// Like [`TaxonQuery::name_text`] with rank keywords left out.
    #[must_use]
    pub fn name_text_without_ranks(&self) -> String {
        self.join(|term| term.taxon_id().is_none() && term.rank().is_none())
    }

    #[must_use]
    pub fn has_rank_words(&self) -> bool {
        self.terms.iter().any(|term| term.rank().is_some())
    }

    /// Double-quoted phrases that must match a name exactly.
    pub fn phrases(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms
            .iter()
            .filter(|term| term.quoted)
            .map(|term| term.text.as_str())
    }

    /// First four-letter all-caps term (bird banding code).
    #[must_use]
    pub fn banding_code(&self) -> Option<&str> {
        self.terms
            .iter()
            .find(|term| term.is_banding_code())
            .map(|term| term.text.as_str())
    }

    fn join(&self, keep: impl Fn(&Term) -> bool) -> String {
        self.terms
            .iter()
            .filter(|term| keep(term))
            .map(|term| term.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
