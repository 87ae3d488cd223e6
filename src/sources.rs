//! Photo sources tried in order until one yields records.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::photo::RawPhotoDescriptor;

/// Body of a description file plus the content type the server reported.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub content_type: Option<String>,
}

/// Retrieves description files from HTTP(S) URLs or the local filesystem.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// A fetcher whose HTTP requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(Self::new(client))
    }

    pub async fn fetch(&self, location: &str) -> Result<Fetched, Error> {
        if is_remote(location) {
            let url = cache_busted(location, unix_millis());
            debug!(%url, "fetching description file");
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| Error::Fetch {
                    location: location.to_string(),
                    source,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    location: location.to_string(),
                    status,
                });
            }
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await.map_err(|source| Error::Fetch {
                location: location.to_string(),
                source,
            })?;
            Ok(Fetched { body, content_type })
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            debug!(path, "reading description file");
            let body = tokio::fs::read_to_string(path).await?;
            Ok(Fetched {
                body,
                content_type: None,
            })
        }
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Append a `_t` query parameter so intermediaries never serve a stale copy.
pub fn cache_busted(url: &str, stamp: u128) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}_t={stamp}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    Json,
    /// `filename|description` per line.
    Text,
}

impl DescriptionFormat {
    pub fn detect(location: &str, content_type: Option<&str>) -> Self {
        let json_type = content_type.is_some_and(|ct| ct.contains("application/json"));
        if json_type || location.to_ascii_lowercase().ends_with(".json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Parse a JSON array of descriptors; anything else yields no photos.
pub fn parse_json(body: &str) -> Result<Vec<RawPhotoDescriptor>, Error> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            warn!(kind = json_kind(&other), "description file JSON is not an array");
            return Ok(Vec::new());
        }
    };
    let mut photos = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawPhotoDescriptor>(item) {
            Ok(raw) => photos.push(raw),
            Err(err) => warn!(index = idx, error = %err, "skipping malformed photo entry"),
        }
    }
    Ok(photos)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Parse `filename|description` lines, prefixing each filename with `folder`.
///
/// The description may itself contain `|`. Blank filenames are skipped.
pub fn parse_text(body: &str, folder: &str) -> Vec<RawPhotoDescriptor> {
    let prefix = if folder.ends_with('/') {
        folder.to_string()
    } else {
        format!("{folder}/")
    };
    body.split('\n')
        .filter_map(|line| {
            let (name, desc) = match line.split_once('|') {
                Some((name, rest)) => (name.trim(), rest.trim()),
                None => (line.trim(), ""),
            };
            if name.is_empty() {
                return None;
            }
            Some(RawPhotoDescriptor {
                img: Some(format!("{prefix}{}", name.trim_start_matches('/'))),
                desc: Some(desc.to_string()),
                time_stamp: None,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum SourceProvider {
    DescriptionFile {
        location: String,
        folder_path: Option<String>,
    },
    Inline(Vec<RawPhotoDescriptor>),
}

impl SourceProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DescriptionFile { .. } => "description_file",
            Self::Inline(_) => "inline",
        }
    }

    pub async fn load(&self, fetcher: &Fetcher) -> Result<Vec<RawPhotoDescriptor>, Error> {
        match self {
            Self::Inline(photos) => Ok(photos.clone()),
            Self::DescriptionFile {
                location,
                folder_path,
            } => {
                let fetched = fetcher.fetch(location).await?;
                match DescriptionFormat::detect(location, fetched.content_type.as_deref()) {
                    DescriptionFormat::Json => parse_json(&fetched.body),
                    DescriptionFormat::Text => {
                        let folder = folder_path
                            .as_deref()
                            .map(str::trim)
                            .filter(|f| !f.is_empty())
                            .ok_or(Error::MissingFolderPath)?;
                        Ok(parse_text(&fetched.body, folder))
                    }
                }
            }
        }
    }
}

/// Sources in preference order: the description file, then the inline list.
pub fn providers(cfg: &Configuration) -> Vec<SourceProvider> {
    let mut chain = Vec::with_capacity(2);
    if let Some(location) = cfg.description_file() {
        chain.push(SourceProvider::DescriptionFile {
            location: location.to_string(),
            folder_path: cfg.folder_path.clone(),
        });
    }
    if !cfg.photos.is_empty() {
        chain.push(SourceProvider::Inline(cfg.photos.clone()));
    }
    chain
}

/// Raw records from the first provider that yields any.
///
/// Fetch and parse failures are logged and the provider counts as empty.
/// Configuration errors stop the chain.
#[instrument(skip_all, fields(providers = chain.len()))]
pub async fn resolve(
    chain: &[SourceProvider],
    fetcher: &Fetcher,
) -> Result<Vec<RawPhotoDescriptor>, Error> {
    for provider in chain {
        match provider.load(fetcher).await {
            Ok(raw) if !raw.is_empty() => {
                info!(source = provider.name(), count = raw.len(), "loaded photos");
                return Ok(raw);
            }
            Ok(_) => debug!(source = provider.name(), "source yielded no photos"),
            Err(err) if err.is_configuration() => return Err(err),
            Err(err) => {
                warn!(source = provider.name(), error = %err, "error loading photos from source")
            }
        }
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_lines_become_prefixed_photos() {
        let photos = parse_text("a.jpg|Sunset\nb.jpg|\n", "/photos");
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].img.as_deref(), Some("/photos/a.jpg"));
        assert_eq!(photos[0].desc.as_deref(), Some("Sunset"));
        assert_eq!(photos[1].img.as_deref(), Some("/photos/b.jpg"));
        assert_eq!(photos[1].desc.as_deref(), Some(""));
    }

    #[test]
    fn text_descriptions_keep_pipes_and_skip_blanks() {
        let photos = parse_text("  \n c.png | one | two \r\n|orphan\nd.png", "/media/");
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].img.as_deref(), Some("/media/c.png"));
        assert_eq!(photos[0].desc.as_deref(), Some("one | two"));
        assert_eq!(photos[1].img.as_deref(), Some("/media/d.png"));
    }

    #[test]
    fn json_non_array_is_empty() {
        assert!(parse_json(r#"{"img":"x.jpg"}"#).unwrap().is_empty());
        assert!(parse_json("not json").is_err());
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            DescriptionFormat::detect("/a/photos.JSON", None),
            DescriptionFormat::Json
        );
        assert_eq!(
            DescriptionFormat::detect("/a/photos.txt", Some("application/json; charset=utf-8")),
            DescriptionFormat::Json
        );
        assert_eq!(
            DescriptionFormat::detect("/a/photos.txt", Some("text/plain")),
            DescriptionFormat::Text
        );
    }

    #[test]
    fn cache_buster_respects_existing_query() {
        assert_eq!(cache_busted("http://h/p.txt", 7), "http://h/p.txt?_t=7");
        assert_eq!(cache_busted("http://h/p.txt?a=1", 7), "http://h/p.txt?a=1&_t=7");
    }
}
