use crate::error::Result;
use crate::links::{LinkMatch, LinkRecognizers};
use inat_protocol::{
    HistoryMessage, HistorySource, Observation, ObservationLookup, Taxon, TaxonLookup,
};
use serde::Serialize;

/// Messages read from a history source when the caller gives no bound.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Most recent link found in a history window.
///
/// The record is `None` when the link points at something that no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LastMention {
    Observation {
        link: LinkMatch,
        message: HistoryMessage,
        observation: Option<Observation>,
    },
    Taxon {
        link: LinkMatch,
        message: HistoryMessage,
        taxon: Option<Taxon>,
    },
}

impl LastMention {
    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            LastMention::Observation { link, .. } | LastMention::Taxon { link, .. } => link.id,
        }
    }

    #[must_use]
    pub fn message(&self) -> &HistoryMessage {
        match self {
            LastMention::Observation { message, .. } | LastMention::Taxon { message, .. } => {
                message
            }
        }
    }

    /// Taxon of the mention: the observation's identification or the linked taxon.
    #[must_use]
    pub fn taxon(&self) -> Option<&Taxon> {
        match self {
            LastMention::Observation { observation, .. } => {
                observation.as_ref().and_then(|obs| obs.taxon.as_ref())
            }
            LastMention::Taxon { taxon, .. } => taxon.as_ref(),
        }
    }
}

/// Finds the newest observation or taxon link in chat history.
///
/// Holds no state between calls: every call rescans the window it is given, so edits and
/// deletions show up on the next call.
#[derive(Debug, Clone, Default)]
pub struct LastMentionTracker {
    links: LinkRecognizers,
}

impl LastMentionTracker {
    pub fn new(links: LinkRecognizers) -> Self {
        Self { links }
    }

    /// Scan newest-first `history` for an observation link and fetch its record.
    pub async fn find_last_observation(
        &self,
        history: &[HistoryMessage],
        lookup: &dyn ObservationLookup,
    ) -> Result<Option<LastMention>> {
        let Some((message, link)) = self.scan(history, |text| self.links.find_observation(text))
        else {
            log::debug!("No observation link in {} messages", history.len());
            return Ok(None);
        };

        log::debug!("Fetching observation {} from message {}", link.id, message.id);
        let observation = lookup.get_observation(link.id).await?;
        if observation.is_none() {
            log::warn!("Observation {} linked in message {} no longer exists", link.id, message.id);
        }
        Ok(Some(LastMention::Observation {
            link,
            message: message.clone(),
            observation,
        }))
    }

    /// Scan newest-first `history` for a taxon link and fetch its record.
    pub async fn find_last_taxon(
        &self,
        history: &[HistoryMessage],
        lookup: &dyn TaxonLookup,
    ) -> Result<Option<LastMention>> {
        let Some((message, link)) = self.scan(history, |text| self.links.find_taxon(text)) else {
            log::debug!("No taxon link in {} messages", history.len());
            return Ok(None);
        };

        log::debug!("Fetching taxon {} from message {}", link.id, message.id);
        let taxon = lookup.get(link.id, None).await?;
        if taxon.is_none() {
            log::warn!("Taxon {} linked in message {} no longer exists", link.id, message.id);
        }
        Ok(Some(LastMention::Taxon {
            link,
            message: message.clone(),
            taxon,
        }))
    }

    /// Read at most `limit` messages from `source`, then [`Self::find_last_observation`].
    pub async fn last_observation_in(
        &self,
        source: &dyn HistorySource,
        limit: usize,
        lookup: &dyn ObservationLookup,
    ) -> Result<Option<LastMention>> {
        let history = read_window(source, limit).await?;
        self.find_last_observation(&history, lookup).await
    }

    /// Read at most `limit` messages from `source`, then [`Self::find_last_taxon`].
    pub async fn last_taxon_in(
        &self,
        source: &dyn HistorySource,
        limit: usize,
        lookup: &dyn TaxonLookup,
    ) -> Result<Option<LastMention>> {
        let history = read_window(source, limit).await?;
        self.find_last_taxon(&history, lookup).await
    }

    // Message body first, then its embeds.
    fn scan<'h>(
        &self,
        history: &'h [HistoryMessage],
        find: impl Fn(&str) -> Option<LinkMatch>,
    ) -> Option<(&'h HistoryMessage, LinkMatch)> {
        history
            .iter()
            .find_map(|message| message.texts().find_map(&find).map(|link| (message, link)))
    }
}

async fn read_window(source: &dyn HistorySource, limit: usize) -> Result<Vec<HistoryMessage>> {
    let mut history = source.recent(limit).await?;
    history.truncate(limit);
    log::debug!("Read {} history messages (limit {})", history.len(), limit);
    Ok(history)
}
