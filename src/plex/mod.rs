//! Media catalog abstraction and the Plex-backed implementation.
//!
//! Command handlers only see [`CatalogProvider`]; [`client::PlexClient`]
//! speaks the Plex Media Server HTTP API.

use async_trait::async_trait;

pub mod client;

pub use client::PlexClient;

/// Library category a command can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Feature films.
    Movies,
    /// Episodic series.
    Shows,
}

impl Category {
    /// Both categories, in the order results are presented.
    pub const ALL: [Category; 2] = [Category::Movies, Category::Shows];

    /// Parse a user-supplied `/listar` argument (`pelis` or `series`).
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg.trim().to_lowercase().as_str() {
            "pelis" => Some(Self::Movies),
            "series" => Some(Self::Shows),
            _ => None,
        }
    }

    /// Stable lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Shows => "shows",
        }
    }
}

/// Season and episode totals for a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeCounts {
    /// Number of seasons.
    pub seasons: u32,
    /// Number of episodes across all seasons.
    pub episodes: u32,
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Display title.
    pub title: String,
    /// Release year.
    pub year: Option<u16>,
    /// Synopsis.
    pub summary: Option<String>,
    /// Runtime in milliseconds (movies).
    pub duration_ms: Option<u64>,
    /// Absolute thumbnail URL, if the item has artwork.
    pub thumb_url: Option<String>,
    /// Server-side metadata key, stable enough to build a deep link.
    pub key: String,
    /// Season/episode totals for shows.
    pub episodes: Option<EpisodeCounts>,
}

impl Item {
    /// Build an item with only a title and key set.
    pub fn new(title: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            summary: None,
            duration_ms: None,
            thumb_url: None,
            key: key.into(),
            episodes: None,
        }
    }
}

/// Errors produced by catalog queries.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Connection failure, timeout, or undecodable body.
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("catalog returned status {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
    },
    /// No library section carries the configured name.
    #[error("no library section named {0:?}")]
    UnknownSection(String),
    /// The catalog answered but the payload is missing data.
    #[error("unexpected catalog response: {0}")]
    Malformed(String),
}

/// Read-only access to the media catalog.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Every item in `category`, in server order.
    async fn list_by_category(&self, category: Category) -> Result<Vec<Item>, CatalogError>;

    /// Items in `category` whose title matches `title`, optionally filtered
    /// by `year`, returning at most `limit` entries.
    async fn search(
        &self,
        category: Category,
        title: &str,
        year: Option<u16>,
        limit: usize,
    ) -> Result<Vec<Item>, CatalogError>;

    /// Every item in `category`, used for fuzzy fallback matching.
    async fn all_items(&self, category: Category) -> Result<Vec<Item>, CatalogError> {
        self.list_by_category(category).await
    }

    /// Identifier of the server, used in deep links.
    async fn server_id(&self) -> Result<String, CatalogError>;
}
