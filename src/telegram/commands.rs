//! Slash command parsing and handlers.
//!
//! Handlers compose replies from catalog data and hand them to the
//! [`Deliverer`]. Failures follow one taxonomy ([`CommandError`]):
//! malformed input and catalog outages are answered in-chat by
//! [`dispatch`]; transport failures are returned for the caller to log.

use std::sync::{Arc, LazyLock};

use regex::{Regex, RegexBuilder};
use teloxide::types::ChatId;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::plex::{CatalogError, CatalogProvider, Category, Item};
use crate::reports::{NoteKind, ReportLog};
use crate::telegram::delivery::{Deliverer, DeliveryError, Markup, TransportError};
use crate::telegram::markdown::EscapedBody;
use crate::telegram::ui;

/// Minimum query length, in characters, accepted by `/buscar`.
pub const MIN_QUERY_CHARS: usize = 3;

static YEAR_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").ok());

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/listar <pelis|series>`
    List(String),
    /// `/buscar <title> [year]`
    Search(String),
    /// `/solicitar <text>`
    Request(String),
    /// `/reportar <text>`
    Report(String),
    /// Anything else.
    Help,
}

impl Command {
    /// Parse message text, stripping any `@botname` suffix from the command.
    pub fn parse(text: &str) -> Self {
        let Some(without_slash) = text.trim_start().strip_prefix('/') else {
            return Self::Help;
        };
        let (full_command, args) = match without_slash.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (without_slash, ""),
        };
        let command = full_command
            .split('@')
            .next()
            .unwrap_or(full_command)
            .to_lowercase();
        let args = args.to_owned();

        match command.as_str() {
            "listar" => Self::List(args),
            "buscar" => Self::Search(args),
            "solicitar" => Self::Request(args),
            "reportar" => Self::Report(args),
            _ => Self::Help,
        }
    }

    /// Plain-text reply used when the catalog fails mid-command.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::List(_) => ui::LIST_FAILED,
            _ => ui::SEARCH_FAILED,
        }
    }
}

/// Title and optional year extracted from a search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Title text with the year removed.
    pub title: String,
    /// Four-digit year, if present.
    pub year: Option<u16>,
}

impl SearchQuery {
    /// Split a free-form query into title and year.
    ///
    /// The first standalone four-digit number becomes the year filter and is
    /// removed from the title.
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        let found = YEAR_PATTERN
            .as_ref()
            .and_then(|re| re.captures(query))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u16>().ok().map(|year| (m.range(), year)));

        match found {
            Some((range, year)) => {
                let mut title = String::with_capacity(query.len());
                title.push_str(&query[..range.start]);
                title.push_str(&query[range.end..]);
                Self {
                    title: title.split_whitespace().collect::<Vec<_>>().join(" "),
                    year: Some(year),
                }
            }
            None => Self {
                title: query.to_owned(),
                year: None,
            },
        }
    }
}

/// Why a command did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Arguments missing or too short; carries the MarkdownV2 usage reply.
    #[error("malformed input")]
    MalformedInput {
        /// Usage text to send back.
        usage: &'static str,
    },
    /// The catalog could not be queried.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),
    /// A multi-part delivery stopped part-way.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    /// A single reply could not be sent.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The report log could not be written.
    #[error("report log: {0:#}")]
    ReportLog(anyhow::Error),
}

/// Result-count bounds for `/buscar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Exact hits per category.
    pub results: usize,
    /// Fuzzy suggestions per category.
    pub suggestions: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            results: 3,
            suggestions: 3,
        }
    }
}

/// Dependencies shared by all handlers.
#[derive(Clone)]
pub struct BotContext {
    catalog: Arc<dyn CatalogProvider>,
    deliverer: Deliverer,
    reports: Arc<ReportLog>,
    limits: SearchLimits,
    server_id: Arc<OnceCell<String>>,
}

impl BotContext {
    /// Assemble a context.
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        deliverer: Deliverer,
        reports: Arc<ReportLog>,
        limits: SearchLimits,
    ) -> Self {
        Self {
            catalog,
            deliverer,
            reports,
            limits,
            server_id: Arc::new(OnceCell::new()),
        }
    }

    /// Pin the server id instead of asking the catalog for it.
    pub fn with_server_id(self, server_id: impl Into<String>) -> Self {
        Self {
            server_id: Arc::new(OnceCell::new_with(Some(server_id.into()))),
            ..self
        }
    }

    /// Server id for deep links, fetched once from the catalog if not pinned.
    async fn server_id(&self) -> Result<&str, CatalogError> {
        self.server_id
            .get_or_try_init(|| self.catalog.server_id())
            .await
            .map(String::as_str)
    }

    async fn reply(&self, chat: ChatId, text: &str, markup: Markup) -> Result<(), CommandError> {
        self.deliverer
            .transport()
            .send_text(chat, text, markup)
            .await
            .map_err(CommandError::from)
    }
}

/// Parse `text`, run the command, and answer recoverable failures in-chat.
///
/// # Errors
///
/// Returns transport failures and report-log failures after any in-chat
/// notice has been attempted; the caller logs them.
pub async fn dispatch(ctx: &BotContext, chat: ChatId, text: &str) -> Result<(), CommandError> {
    let command = Command::parse(text);
    debug!(chat_id = chat.0, command = ?command, "dispatching command");

    match run(ctx, chat, &command).await {
        Ok(()) => Ok(()),
        Err(CommandError::MalformedInput { usage }) => {
            ctx.reply(chat, usage, Markup::MarkdownV2).await
        }
        Err(CommandError::CatalogUnavailable(e)) => {
            warn!(chat_id = chat.0, error = %e, "catalog unavailable");
            ctx.reply(chat, command.failure_message(), Markup::Plain)
                .await
        }
        Err(CommandError::ReportLog(e)) => {
            ctx.reply(chat, ui::NOTE_FAILED, Markup::Plain).await?;
            Err(CommandError::ReportLog(e))
        }
        Err(e) => Err(e),
    }
}

/// Run a parsed command without in-chat error recovery.
///
/// # Errors
///
/// Returns the first failure encountered, classified per [`CommandError`].
pub async fn run(ctx: &BotContext, chat: ChatId, command: &Command) -> Result<(), CommandError> {
    match command {
        Command::List(arg) => handle_list(ctx, chat, arg).await,
        Command::Search(query) => handle_search(ctx, chat, query).await,
        Command::Request(text) => handle_note(ctx, chat, NoteKind::Request, text).await,
        Command::Report(text) => handle_note(ctx, chat, NoteKind::Report, text).await,
        Command::Help => ctx.reply(chat, ui::HELP, Markup::MarkdownV2).await,
    }
}

/// `/listar`: every item of one category, text only.
///
/// # Errors
///
/// See [`run`].
pub async fn handle_list(ctx: &BotContext, chat: ChatId, arg: &str) -> Result<(), CommandError> {
    if arg.trim().is_empty() {
        return Err(CommandError::MalformedInput {
            usage: ui::LIST_USAGE,
        });
    }
    let Some(category) = Category::from_arg(arg) else {
        return Err(CommandError::MalformedInput {
            usage: ui::LIST_UNKNOWN,
        });
    };

    let items = ctx.catalog.list_by_category(category).await?;
    if items.is_empty() {
        return ctx
            .reply(chat, ui::format_empty_section(category), Markup::Plain)
            .await;
    }

    let body = ui::format_listing(category, &items);
    ctx.deliverer.deliver(chat, &body, None).await?;
    Ok(())
}

/// `/buscar`: detail cards for exact hits, or loose suggestions.
///
/// # Errors
///
/// See [`run`].
pub async fn handle_search(
    ctx: &BotContext,
    chat: ChatId,
    query: &str,
) -> Result<(), CommandError> {
    if query.trim().chars().count() < MIN_QUERY_CHARS {
        return Err(CommandError::MalformedInput {
            usage: ui::SEARCH_USAGE,
        });
    }
    let parsed = SearchQuery::parse(query);
    if parsed.title.is_empty() {
        return Err(CommandError::MalformedInput {
            usage: ui::SEARCH_USAGE,
        });
    }

    let limit = ctx.limits.results;
    let movies = ctx
        .catalog
        .search(Category::Movies, &parsed.title, parsed.year, limit)
        .await?;
    let shows = ctx
        .catalog
        .search(Category::Shows, &parsed.title, parsed.year, limit)
        .await?;

    if movies.is_empty() && shows.is_empty() {
        return suggest(ctx, chat, &parsed.title).await;
    }

    let server_id = ctx.server_id().await?;
    let hits = movies
        .iter()
        .map(|item| (Category::Movies, item))
        .chain(shows.iter().map(|item| (Category::Shows, item)));
    for (category, item) in hits {
        let body = ui::format_card(category, item, server_id);
        ctx.deliverer
            .deliver(chat, &body, item.thumb_url.as_deref())
            .await?;
    }
    Ok(())
}

/// Case-insensitive substring match over `items`, keeping at most `limit`.
pub fn loose_matches(items: Vec<Item>, title: &str, limit: usize) -> Vec<Item> {
    let Ok(pattern) = RegexBuilder::new(&regex::escape(title))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter(|item| pattern.is_match(&item.title))
        .take(limit)
        .collect()
}

async fn suggest(ctx: &BotContext, chat: ChatId, title: &str) -> Result<(), CommandError> {
    let limit = ctx.limits.suggestions;
    let movies = loose_matches(ctx.catalog.all_items(Category::Movies).await?, title, limit);
    let shows = loose_matches(ctx.catalog.all_items(Category::Shows).await?, title, limit);

    let body: EscapedBody = if movies.is_empty() && shows.is_empty() {
        ui::format_not_found(title)
    } else {
        ui::format_suggestions(&movies, &shows)
    };
    ctx.deliverer.deliver(chat, &body, None).await?;
    Ok(())
}

/// `/reportar` and `/solicitar`: append to the report log and acknowledge.
///
/// # Errors
///
/// See [`run`].
pub async fn handle_note(
    ctx: &BotContext,
    chat: ChatId,
    kind: NoteKind,
    text: &str,
) -> Result<(), CommandError> {
    let text = text.trim();
    if text.is_empty() {
        let usage = match kind {
            NoteKind::Report => ui::REPORT_USAGE,
            NoteKind::Request => ui::REQUEST_USAGE,
        };
        return Err(CommandError::MalformedInput { usage });
    }

    ctx.reports
        .append(kind, text)
        .await
        .map_err(CommandError::ReportLog)?;

    let ack = ui::format_note_ack(kind, text);
    ctx.deliverer.deliver(chat, &ack, None).await?;
    Ok(())
}
