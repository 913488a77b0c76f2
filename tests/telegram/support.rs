//! Test doubles for the transport, image probe, and catalog seams.

#![allow(dead_code, clippy::arithmetic_side_effects)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::types::ChatId;

use plexgram::plex::{CatalogError, CatalogProvider, Category, Item};
use plexgram::reports::ReportLog;
use plexgram::telegram::commands::{BotContext, SearchLimits};
use plexgram::telegram::delivery::{
    Deliverer, ImageError, ImageProbe, Markup, MessageTransport, Photo, TransportError,
};

pub const CHAT: ChatId = ChatId(42);

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Text { text: String, markup: Markup },
    Photo { caption: Option<String> },
}

/// Records every call; optionally fails the call at index `fail_at`.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    attempts: AtomicUsize,
    fail_at: Option<usize>,
}

impl RecordingTransport {
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Text { text, .. } => Some(text),
                Call::Photo { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(attempt) {
            return Err(TransportError("Bad Request: can't parse entities".to_owned()));
        }
        self.calls.lock().expect("lock").push(call);
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_text(
        &self,
        _target: ChatId,
        text: &str,
        markup: Markup,
    ) -> Result<(), TransportError> {
        self.record(Call::Text {
            text: text.to_owned(),
            markup,
        })
    }

    async fn send_photo(
        &self,
        _target: ChatId,
        _photo: &Photo,
        caption: Option<&str>,
        _markup: Markup,
    ) -> Result<(), TransportError> {
        self.record(Call::Photo {
            caption: caption.map(str::to_owned),
        })
    }
}

/// Image probe with a fixed verdict.
pub struct StaticProbe {
    usable: bool,
    pub fetches: AtomicUsize,
}

impl StaticProbe {
    pub fn usable() -> Self {
        Self {
            usable: true,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            usable: false,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageProbe for StaticProbe {
    async fn fetch(&self, _url: &str) -> Result<Photo, ImageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.usable {
            Ok(Photo {
                content_type: "image/jpeg".to_owned(),
                bytes: vec![0xFF, 0xD8, 0xFF],
            })
        } else {
            Err(ImageError::Status(404))
        }
    }
}

/// In-memory catalog that counts every call.
#[derive(Default)]
pub struct MockCatalog {
    pub movies: Vec<Item>,
    pub shows: Vec<Item>,
    pub exact_movies: Vec<Item>,
    pub exact_shows: Vec<Item>,
    pub unavailable: bool,
    pub calls: AtomicUsize,
    pub last_search: Mutex<Option<(String, Option<u16>)>>,
}

impl MockCatalog {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(CatalogError::Status {
                status: 503,
                path: "/library/sections".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogProvider for MockCatalog {
    async fn list_by_category(&self, category: Category) -> Result<Vec<Item>, CatalogError> {
        self.check()?;
        Ok(match category {
            Category::Movies => self.movies.clone(),
            Category::Shows => self.shows.clone(),
        })
    }

    async fn search(
        &self,
        category: Category,
        title: &str,
        year: Option<u16>,
        limit: usize,
    ) -> Result<Vec<Item>, CatalogError> {
        self.check()?;
        *self.last_search.lock().expect("lock") = Some((title.to_owned(), year));
        let hits = match category {
            Category::Movies => &self.exact_movies,
            Category::Shows => &self.exact_shows,
        };
        Ok(hits.iter().take(limit).cloned().collect())
    }

    async fn server_id(&self) -> Result<String, CatalogError> {
        self.check()?;
        Ok("abc123".to_owned())
    }
}

/// Handler context wired to the given doubles.
pub fn context(
    catalog: Arc<MockCatalog>,
    transport: Arc<RecordingTransport>,
    probe: Arc<StaticProbe>,
    reports: Arc<ReportLog>,
) -> BotContext {
    let deliverer = Deliverer::new(transport, probe);
    BotContext::new(catalog, deliverer, reports, SearchLimits::default())
}

/// Check that `text` would parse as MarkdownV2: every reserved character is
/// escaped unless it belongs to a bold pair, a code span, or an inline link.
pub fn check_markdown_v2(text: &str) -> Result<(), String> {
    use plexgram::telegram::markdown::is_reserved;

    #[derive(PartialEq)]
    enum Link {
        None,
        Label,
        Target,
    }

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut bold = false;
    let mut link = Link::None;

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '`' => {
                i += 1;
                while i < chars.len() && chars[i] != '`' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err("unclosed code span".to_owned());
                }
            }
            '*' => bold = !bold,
            '[' if link == Link::None => link = Link::Label,
            ']' if link == Link::Label => {
                if chars.get(i + 1) != Some(&'(') {
                    return Err(format!("link label not followed by target at {i}"));
                }
                i += 1;
                link = Link::Target;
            }
            ')' if link == Link::Target => link = Link::None,
            c if is_reserved(c) => return Err(format!("unescaped {c:?} at {i} in {text:?}")),
            _ => {}
        }
        i += 1;
    }

    if bold {
        return Err("unclosed bold".to_owned());
    }
    if link != Link::None {
        return Err("unclosed link".to_owned());
    }
    Ok(())
}
