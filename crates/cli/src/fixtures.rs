use anyhow::{Context, Result};
use async_trait::async_trait;
use inat_protocol::{HistoryMessage, HistorySource, LookupError, Observation, Taxon};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a JSON array fixture.
pub fn load<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read {what} from {}", path.display()))?;
    let items: Vec<T> = serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a JSON array of {what}", path.display()))?;
    log::debug!("Loaded {} {what} from {}", items.len(), path.display());
    Ok(items)
}

pub fn load_taxa(path: &Path) -> Result<Vec<Taxon>> {
    load(path, "taxa")
}

pub fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    load(path, "observations")
}

/// Channel history read from a file, newest message first.
pub struct FileHistory {
    messages: Vec<HistoryMessage>,
}

impl FileHistory {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            messages: load(path, "messages")?,
        })
    }
}

#[async_trait]
impl HistorySource for FileHistory {
    async fn recent(&self, limit: usize) -> std::result::Result<Vec<HistoryMessage>, LookupError> {
        Ok(self.messages.iter().take(limit).cloned().collect())
    }
}
