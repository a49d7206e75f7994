use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Taxonomic rank as used by iNaturalist, ordered from most general to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    StateOfMatter,
    Kingdom,
    Phylum,
    Subphylum,
    Superclass,
    Class,
    Subclass,
    Infraclass,
    Superorder,
    Order,
    Suborder,
    Infraorder,
    Parvorder,
    Zoosection,
    Zoosubsection,
    Superfamily,
    Epifamily,
    Family,
    Subfamily,
    Supertribe,
    Tribe,
    Subtribe,
    Genus,
    Genushybrid,
    Subgenus,
    Section,
    Subsection,
    Complex,
    Species,
    Hybrid,
    Subspecies,
    Variety,
    Form,
    Infrahybrid,
}

/// Abbreviations accepted in queries and follow-up commands, on top of the canonical names.
const RANK_ABBREVIATIONS: &[(&str, Rank)] = &[
    ("sp", Rank::Species),
    ("ssp", Rank::Subspecies),
    ("subsp", Rank::Subspecies),
    ("var", Rank::Variety),
    ("gen", Rank::Genus),
    ("subgen", Rank::Subgenus),
    ("sect", Rank::Section),
    ("subsect", Rank::Subsection),
    ("fam", Rank::Family),
    ("subfam", Rank::Subfamily),
    ("superfam", Rank::Superfamily),
    ("ord", Rank::Order),
];

impl Rank {
    pub const ALL: [Rank; 34] = [
        Rank::StateOfMatter,
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Subphylum,
        Rank::Superclass,
        Rank::Class,
        Rank::Subclass,
        Rank::Infraclass,
        Rank::Superorder,
        Rank::Order,
        Rank::Suborder,
        Rank::Infraorder,
        Rank::Parvorder,
        Rank::Zoosection,
        Rank::Zoosubsection,
        Rank::Superfamily,
        Rank::Epifamily,
        Rank::Family,
        Rank::Subfamily,
        Rank::Supertribe,
        Rank::Tribe,
        Rank::Subtribe,
        Rank::Genus,
        Rank::Genushybrid,
        Rank::Subgenus,
        Rank::Section,
        Rank::Subsection,
        Rank::Complex,
        Rank::Species,
        Rank::Hybrid,
        Rank::Subspecies,
        Rank::Variety,
        Rank::Form,
        Rank::Infrahybrid,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Rank::StateOfMatter => "stateofmatter",
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Subphylum => "subphylum",
            Rank::Superclass => "superclass",
            Rank::Class => "class",
            Rank::Subclass => "subclass",
            Rank::Infraclass => "infraclass",
            Rank::Superorder => "superorder",
            Rank::Order => "order",
            Rank::Suborder => "suborder",
            Rank::Infraorder => "infraorder",
            Rank::Parvorder => "parvorder",
            Rank::Zoosection => "zoosection",
            Rank::Zoosubsection => "zoosubsection",
            Rank::Superfamily => "superfamily",
            Rank::Epifamily => "epifamily",
            Rank::Family => "family",
            Rank::Subfamily => "subfamily",
            Rank::Supertribe => "supertribe",
            Rank::Tribe => "tribe",
            Rank::Subtribe => "subtribe",
            Rank::Genus => "genus",
            Rank::Genushybrid => "genushybrid",
            Rank::Subgenus => "subgenus",
            Rank::Section => "section",
            Rank::Subsection => "subsection",
            Rank::Complex => "complex",
            Rank::Species => "species",
            Rank::Hybrid => "hybrid",
            Rank::Subspecies => "subspecies",
            Rank::Variety => "variety",
            Rank::Form => "form",
            Rank::Infrahybrid => "infrahybrid",
        }
    }

    /// Rank level multiplied by ten (parvorder sits at 34.5).
    ///
    /// Higher levels are more general. Hybrids share the level of the rank they hybridise at.
    #[must_use]
    pub const fn level(self) -> u16 {
        match self {
            Rank::StateOfMatter => 1000,
            Rank::Kingdom => 700,
            Rank::Phylum => 600,
            Rank::Subphylum => 570,
            Rank::Superclass => 530,
            Rank::Class => 500,
            Rank::Subclass => 470,
            Rank::Infraclass => 450,
            Rank::Superorder => 430,
            Rank::Order => 400,
            Rank::Suborder => 370,
            Rank::Infraorder => 350,
            Rank::Parvorder => 345,
            Rank::Zoosection => 340,
            Rank::Zoosubsection => 335,
            Rank::Superfamily => 330,
            Rank::Epifamily => 320,
            Rank::Family => 300,
            Rank::Subfamily => 270,
            Rank::Supertribe => 260,
            Rank::Tribe => 250,
            Rank::Subtribe => 240,
            Rank::Genus | Rank::Genushybrid => 200,
            Rank::Subgenus => 150,
            Rank::Section => 130,
            Rank::Subsection => 120,
            Rank::Complex => 110,
            Rank::Species | Rank::Hybrid => 100,
            Rank::Subspecies | Rank::Variety | Rank::Form | Rank::Infrahybrid => 50,
        }
    }

    /// True when `self` is strictly more general than `other`.
    #[must_use]
    pub const fn is_above(self, other: Rank) -> bool {
        self.level() > other.level()
    }

    /// Map a query keyword (canonical name or abbreviation, any case) to its rank.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Rank> {
        let lowered = keyword.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }
        Rank::ALL
            .iter()
            .copied()
            .find(|rank| rank.as_str() == lowered)
            .or_else(|| {
                RANK_ABBREVIATIONS
                    .iter()
                    .find(|(abbrev, _)| *abbrev == lowered)
                    .map(|(_, rank)| *rank)
            })
    }

    /// Every keyword recognised by [`Rank::from_keyword`], canonical names first.
    ///
    /// Front ends register these as command aliases (`family`, `sp`, ...).
    pub fn keywords() -> impl Iterator<Item = &'static str> {
        Rank::ALL
            .iter()
            .map(|rank| rank.as_str())
            .chain(RANK_ABBREVIATIONS.iter().map(|(abbrev, _)| *abbrev))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown rank: {0}")]
pub struct UnknownRank(pub String);

impl FromStr for Rank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::from_keyword(s).ok_or_else(|| UnknownRank(s.to_string()))
    }
}
