//! Plex Media Server HTTP client.
//!
//! Requests ask for JSON (`Accept: application/json`) and authenticate with
//! the `X-Plex-Token` header. Library sections are looked up by title on
//! every call, so renaming a section on the server only needs a config change.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{CatalogError, CatalogProvider, Category, EpisodeCounts, Item};

/// Library section titles backing each [`Category`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNames {
    /// Section holding movies.
    pub movies: String,
    /// Section holding shows.
    pub shows: String,
}

impl SectionNames {
    /// Section title for `category`.
    pub fn for_category(&self, category: Category) -> &str {
        match category {
            Category::Movies => &self.movies,
            Category::Shows => &self.shows,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    #[serde(default)]
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SectionList {
    #[serde(rename = "Directory", default)]
    directories: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    key: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct MetadataList {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    key: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<u16>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
    #[serde(default)]
    thumb: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    child_count: Option<u32>,
    #[serde(default)]
    leaf_count: Option<u32>,
}

/// [`CatalogProvider`] backed by a Plex Media Server.
#[derive(Clone)]
pub struct PlexClient {
    http: reqwest::Client,
    base: String,
    token: String,
    sections: SectionNames,
}

impl std::fmt::Debug for PlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexClient")
            .field("base", &self.base)
            .field("token", &"[REDACTED]")
            .field("sections", &self.sections)
            .finish()
    }
}

impl PlexClient {
    /// Create a client for the server at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(
        base: &Url,
        token: impl Into<String>,
        sections: SectionNames,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let token = token.into();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut token_value = HeaderValue::from_str(&token)
            .map_err(|_| CatalogError::Malformed("token is not a valid header value".to_owned()))?;
        token_value.set_sensitive(true);
        headers.insert("X-Plex-Token", token_value);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base: base.as_str().trim_end_matches('/').to_owned(),
            token,
            sections,
        })
    }

    /// Section titles this client maps categories to.
    pub fn sections(&self) -> &SectionNames {
        &self.sections
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        page_size: Option<usize>,
    ) -> Result<T, CatalogError> {
        let mut request = self
            .http
            .get(format!("{}{path}", self.base))
            .query(query);
        if let Some(size) = page_size {
            request = request
                .header("X-Plex-Container-Start", "0")
                .header("X-Plex-Container-Size", size.to_string());
        }

        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                path: path.to_owned(),
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(reqwest::Error::without_url)?;
        Ok(envelope.media_container)
    }

    async fn section_key(&self, category: Category) -> Result<String, CatalogError> {
        let wanted = self.sections.for_category(category);
        let list: SectionList = self.get("/library/sections", &[], None).await?;
        list.directories
            .into_iter()
            .find(|section| section.title == wanted)
            .map(|section| section.key)
            .ok_or_else(|| CatalogError::UnknownSection(wanted.to_owned()))
    }

    fn thumb_url(&self, thumb: &str) -> Option<String> {
        let mut url = Url::parse(&format!("{}{thumb}", self.base)).ok()?;
        url.query_pairs_mut().append_pair("X-Plex-Token", &self.token);
        Some(url.into())
    }

    fn to_item(&self, meta: Metadata) -> Item {
        let is_show = meta.kind.as_deref() == Some("show");
        let episodes = is_show.then(|| EpisodeCounts {
            seasons: meta.child_count.unwrap_or(0),
            episodes: meta.leaf_count.unwrap_or(0),
        });
        Item {
            title: meta.title.unwrap_or_default(),
            year: meta.year,
            summary: meta.summary.filter(|s| !s.trim().is_empty()),
            duration_ms: meta.duration,
            thumb_url: meta.thumb.as_deref().and_then(|t| self.thumb_url(t)),
            key: if is_show { details_key(meta.key) } else { meta.key },
            episodes,
        }
    }

    async fn section_items(
        &self,
        category: Category,
        query: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Vec<Item>, CatalogError> {
        let key = self.section_key(category).await?;
        let path = format!("/library/sections/{key}/all");
        let list: MetadataList = self.get(&path, query, limit).await?;

        let mut items: Vec<Item> = list
            .metadata
            .into_iter()
            .map(|meta| self.to_item(meta))
            .collect();
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        debug!(category = category.as_str(), count = items.len(), "catalog query");
        Ok(items)
    }
}

/// Show listings key each entry by its season listing
/// (`/library/metadata/{id}/children`); deep links need the show itself.
fn details_key(mut key: String) -> String {
    if let Some(len) = key.strip_suffix("/children").map(str::len) {
        key.truncate(len);
    }
    key
}

#[async_trait]
impl CatalogProvider for PlexClient {
    async fn list_by_category(&self, category: Category) -> Result<Vec<Item>, CatalogError> {
        self.section_items(category, &[], None).await
    }

    async fn search(
        &self,
        category: Category,
        title: &str,
        year: Option<u16>,
        limit: usize,
    ) -> Result<Vec<Item>, CatalogError> {
        let mut query = vec![("title", title.to_owned())];
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }
        self.section_items(category, &query, Some(limit)).await
    }

    async fn server_id(&self) -> Result<String, CatalogError> {
        let info: ServerInfo = self.get("/", &[], None).await?;
        info.machine_identifier
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CatalogError::Malformed("missing machineIdentifier".to_owned()))
    }
}
