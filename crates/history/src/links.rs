use crate::error::LinkConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_OBSERVATION_LINK: &str =
    r"(?P<url>https?://(?:www\.)?inaturalist\.(?:org|ca)/observations/(?P<id>\d+))";
pub const DEFAULT_TAXON_LINK: &str =
    r"(?P<url>https?://(?:www\.)?inaturalist\.(?:org|ca)/taxa/(?P<id>\d+)(?:-[\w-]+)?)";
/// `.query.` surrounded by whitespace or the ends of the text.
pub const DEFAULT_DOT_TAXON: &str = r"(?:^|\s)\.(?P<query>[^\s.].{2,}?[^\s.])\.(?:\s|$)";

static BUILTIN: Lazy<LinkRecognizers> = Lazy::new(|| {
    LinkRecognizers::from_config(&LinkConfig::default())
        .expect("built-in link patterns are valid")
});

static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<id>\d+)\s*$").expect("valid bare id pattern"));

/// Regex sources for the link recognizers.
///
/// Any field left out of a config file keeps its built-in value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Must define `id`, may define `url`
    pub observation_link: String,
    /// Must define `id`, may define `url`
    pub taxon_link: String,
    /// Must define `query`
    pub dot_taxon: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            observation_link: DEFAULT_OBSERVATION_LINK.to_string(),
            taxon_link: DEFAULT_TAXON_LINK.to_string(),
            dot_taxon: DEFAULT_DOT_TAXON.to_string(),
        }
    }
}

impl LinkConfig {
    /// Parse JSON, falling back to TOML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LinkConfigError> {
        match serde_json::from_slice(bytes) {
            Ok(config) => Ok(config),
            Err(json_err) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| LinkConfigError::Parse(format!("{json_err}; {err}")))?;
                toml::from_str(text).map_err(|toml_err| {
                    LinkConfigError::Parse(format!("{json_err}; TOML parse error: {toml_err}"))
                })
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, LinkConfigError> {
        let bytes = std::fs::read(path).map_err(|source| LinkConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_bytes(&bytes)?;
        log::debug!("Loaded link config from {}", path.display());
        Ok(config)
    }
}

/// Identifier extracted from a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkMatch {
    pub id: u64,
    /// Matched URL text; absent for bare ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Compiled observation, taxon and inline-mention patterns.
#[derive(Debug, Clone)]
pub struct LinkRecognizers {
    observation: Regex,
    taxon: Regex,
    dot_taxon: Regex,
}

impl Default for LinkRecognizers {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl LinkRecognizers {
    pub fn from_config(config: &LinkConfig) -> Result<Self, LinkConfigError> {
        Ok(Self {
            observation: compile("observation_link", &config.observation_link, "id")?,
            taxon: compile("taxon_link", &config.taxon_link, "id")?,
            dot_taxon: compile("dot_taxon", &config.dot_taxon, "query")?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, LinkConfigError> {
        Self::from_config(&LinkConfig::from_file(path)?)
    }

    /// Leftmost observation link in `text`.
    #[must_use]
    pub fn find_observation(&self, text: &str) -> Option<LinkMatch> {
        find_link(&self.observation, text)
    }

    /// Leftmost taxon link in `text`.
    #[must_use]
    pub fn find_taxon(&self, text: &str) -> Option<LinkMatch> {
        find_link(&self.taxon, text)
    }

    /// Observation link, or when `allow_bare_id` is set, text that is only a number.
    #[must_use]
    pub fn match_observation(&self, text: &str, allow_bare_id: bool) -> Option<LinkMatch> {
        if let Some(found) = self.find_observation(text) {
            return Some(found);
        }
        if !allow_bare_id {
            return None;
        }
        let id = BARE_ID.captures(text)?.name("id")?.as_str().parse().ok()?;
        Some(LinkMatch { id, url: None })
    }

    /// Query text of an inline `.query.` mention.
    #[must_use]
    pub fn dot_taxon_query(&self, text: &str) -> Option<String> {
        self.dot_taxon
            .captures(text)
            .and_then(|caps| caps.name("query"))
            .map(|query| query.as_str().to_string())
    }
}

fn compile(
    pattern: &'static str,
    source: &str,
    group: &'static str,
) -> Result<Regex, LinkConfigError> {
    let regex = Regex::new(source)
        .map_err(|source| LinkConfigError::InvalidPattern { pattern, source })?;
    if !regex.capture_names().flatten().any(|name| name == group) {
        return Err(LinkConfigError::MissingGroup { pattern, group });
    }
    Ok(regex)
}

fn find_link(regex: &Regex, text: &str) -> Option<LinkMatch> {
    regex.captures_iter(text).find_map(|caps| {
        let id = caps.name("id")?.as_str().parse().ok()?;
        let url = caps
            .name("url")
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string());
        Some(LinkMatch { id, url })
    })
}
