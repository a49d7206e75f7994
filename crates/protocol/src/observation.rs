use crate::taxon::Taxon;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type ObservationId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub id: ObservationId,

    /// Community taxon, absent for unidentified observations
    #[serde(default)]
    pub taxon: Option<Taxon>,

    #[serde(default)]
    pub user_login: Option<String>,

    #[serde(default)]
    pub observed_on: Option<String>,

    #[serde(default)]
    pub place_guess: Option<String>,

    #[serde(default)]
    pub quality_grade: Option<String>,
}

impl Observation {
    pub fn new(id: ObservationId) -> Self {
        Self {
            id,
            taxon: None,
            user_login: None,
            observed_on: None,
            place_guess: None,
            quality_grade: None,
        }
    }

    pub fn with_taxon(mut self, taxon: Taxon) -> Self {
        self.taxon = Some(taxon);
        self
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MessageAuthor {
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

/// Read-only view of a chat message, as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryMessage {
    pub id: u64,
    pub author: MessageAuthor,
    #[serde(default)]
    pub content: String,
    /// URLs of embeds attached to the message (bot-rendered previews)
    #[serde(default)]
    pub embed_urls: Vec<String>,
}

impl HistoryMessage {
    pub fn new(id: u64, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            author: MessageAuthor {
                name: author.into(),
                bot: false,
            },
            content: content.into(),
            embed_urls: Vec::new(),
        }
    }

    /// Text fragments to scan for links: the message body, then each embed URL.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.content.as_str()).chain(self.embed_urls.iter().map(String::as_str))
    }
}
