//! Outbound delivery: caption vs. standalone message, image validation, chunking.
//!
//! A [`Deliverer`] takes a composed [`EscapedBody`] and an optional thumbnail
//! URL and turns them into an ordered sequence of transport calls:
//!
//! - usable image, body fits a caption: one captioned photo
//! - usable image, body too long for a caption: bare photo, then text chunks
//! - no image or an unusable one: text chunks only
//!
//! Calls run strictly one after another. A failed call stops the sequence and
//! is reported with the number of calls that already went out; nothing is
//! retried or rolled back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use teloxide::types::ChatId;
use tracing::debug;

use crate::telegram::markdown::EscapedBody;

/// Maximum caption length, in characters, attached to a photo.
pub const CAPTION_CEILING: usize = 1024;

/// Maximum length, in characters, of one standalone text message.
pub const MESSAGE_CEILING: usize = 4000;

/// How the transport should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// Telegram MarkdownV2.
    MarkdownV2,
    /// No parse mode; text is shown verbatim.
    Plain,
}

/// An image that passed validation and is ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Declared content type of the response.
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

/// A single send call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("telegram send failed: {0}")]
pub struct TransportError(pub String);

/// Outbound side of the messaging platform.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send a standalone text message.
    async fn send_text(
        &self,
        target: ChatId,
        text: &str,
        markup: Markup,
    ) -> Result<(), TransportError>;

    /// Send a photo, optionally captioned.
    async fn send_photo(
        &self,
        target: ChatId,
        photo: &Photo,
        caption: Option<&str>,
        markup: Markup,
    ) -> Result<(), TransportError>;
}

/// Reasons an image reference cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Connection failure or timeout.
    #[error("image request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("image request returned status {0}")]
    Status(u16),
    /// The response does not declare an image content type.
    #[error("not an image: content type {0:?}")]
    NotAnImage(String),
    /// The image exceeds the upload limit.
    #[error("image larger than {limit} bytes")]
    TooLarge {
        /// Configured byte limit.
        limit: usize,
    },
}

/// Point-in-time image validation.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Fetch `url` and return the image if it is usable.
    async fn fetch(&self, url: &str) -> Result<Photo, ImageError>;
}

/// [`ImageProbe`] backed by a `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpImageProbe {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageProbe {
    /// Default timeout for a validation fetch.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Default upload bound, matching Telegram's photo limit.
    pub const DEFAULT_MAX_BYTES: usize = 10_485_760;

    /// Build a probe whose whole request, body included, is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn fetch(&self, url: &str) -> Result<Photo, ImageError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !content_type.contains("image") {
            return Err(ImageError::NotAnImage(content_type));
        }

        let limit = self.max_bytes;
        if response
            .content_length()
            .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > limit))
        {
            return Err(ImageError::TooLarge { limit });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(reqwest::Error::without_url)? {
            if bytes.len().saturating_add(chunk.len()) > limit {
                return Err(ImageError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Photo {
            content_type,
            bytes,
        })
    }
}

/// What happened to the image part of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOutcome {
    /// No image was offered.
    Absent,
    /// The image failed validation; the body went out as text only.
    Unusable,
    /// The body was sent as the photo's caption.
    Captioned,
    /// The photo went out bare, followed by text chunks.
    Separate,
}

/// Summary of a completed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Image handling.
    pub photo: PhotoOutcome,
    /// Number of standalone text messages sent.
    pub text_parts: usize,
}

impl DeliveryReport {
    /// Total transport calls issued.
    pub fn calls(&self) -> usize {
        let photo_calls = usize::from(matches!(
            self.photo,
            PhotoOutcome::Captioned | PhotoOutcome::Separate
        ));
        self.text_parts.saturating_add(photo_calls)
    }
}

/// A delivery stopped part-way.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// A transport call failed; earlier calls were already delivered.
    #[error("delivery stopped after {sent} of {planned} calls: {source}")]
    Transport {
        /// Calls that succeeded before the failure.
        sent: usize,
        /// Calls the delivery intended to make.
        planned: usize,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
}

/// Split `text` into consecutive slices of at most `max` characters.
///
/// Cuts fall on character boundaries only; words and markup are not
/// considered. A `max` of zero is treated as one.
pub fn chunk_chars(text: &str, max: usize) -> Vec<&str> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0usize;

    for (idx, _) in text.char_indices() {
        if count == max {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count = count.saturating_add(1);
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

enum Step<'a> {
    Photo(&'a Photo, Option<&'a str>),
    Text(&'a str),
}

/// Chooses and executes a delivery strategy for one reply.
#[derive(Clone)]
pub struct Deliverer {
    transport: Arc<dyn MessageTransport>,
    probe: Arc<dyn ImageProbe>,
    caption_ceiling: usize,
    message_ceiling: usize,
}

impl Deliverer {
    /// Create a deliverer using Telegram's ceilings.
    pub fn new(transport: Arc<dyn MessageTransport>, probe: Arc<dyn ImageProbe>) -> Self {
        Self {
            transport,
            probe,
            caption_ceiling: CAPTION_CEILING,
            message_ceiling: MESSAGE_CEILING,
        }
    }

    /// Override both length ceilings.
    pub fn with_ceilings(mut self, caption: usize, message: usize) -> Self {
        self.caption_ceiling = caption;
        self.message_ceiling = message;
        self
    }

    /// The transport this deliverer sends through.
    pub fn transport(&self) -> &dyn MessageTransport {
        self.transport.as_ref()
    }

    /// Deliver `body` to `target`, with `image` if it validates.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Transport`] when any send call fails. Calls
    /// made before the failure are not undone.
    pub async fn deliver(
        &self,
        target: ChatId,
        body: &EscapedBody,
        image: Option<&str>,
    ) -> Result<DeliveryReport, DeliveryError> {
        let photo = match image {
            Some(url) => match self.probe.fetch(url).await {
                Ok(photo) => Some(photo),
                Err(e) => {
                    debug!(chat_id = target.0, error = %e, "image unusable, sending text only");
                    None
                }
            },
            None => None,
        };

        let text = body.as_str();
        let mut steps = Vec::new();
        let outcome = match (&photo, image) {
            (Some(photo), _) if body.char_len() <= self.caption_ceiling => {
                let caption = (!body.is_empty()).then_some(text);
                steps.push(Step::Photo(photo, caption));
                PhotoOutcome::Captioned
            }
            (Some(photo), _) => {
                steps.push(Step::Photo(photo, None));
                PhotoOutcome::Separate
            }
            (None, Some(_)) => PhotoOutcome::Unusable,
            (None, None) => PhotoOutcome::Absent,
        };
        if outcome != PhotoOutcome::Captioned {
            steps.extend(
                chunk_chars(text, self.message_ceiling)
                    .into_iter()
                    .map(Step::Text),
            );
        }

        let planned = steps.len();
        debug!(chat_id = target.0, planned, photo = ?outcome, "delivering reply");

        let mut text_parts = 0usize;
        for (sent, step) in steps.into_iter().enumerate() {
            let result = match step {
                Step::Photo(photo, caption) => {
                    self.transport
                        .send_photo(target, photo, caption, Markup::MarkdownV2)
                        .await
                }
                Step::Text(chunk) => {
                    let result = self
                        .transport
                        .send_text(target, chunk, Markup::MarkdownV2)
                        .await;
                    if result.is_ok() {
                        text_parts = text_parts.saturating_add(1);
                    }
                    result
                }
            };
            result.map_err(|source| DeliveryError::Transport {
                sent,
                planned,
                source,
            })?;
        }

        Ok(DeliveryReport {
            photo: outcome,
            text_parts,
        })
    }
}
