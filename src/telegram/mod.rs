//! Telegram adapter: MarkdownV2 escaping, reply templates, delivery, commands,
//! and the bot dispatcher.
//!
//! Incoming text messages are parsed into commands and handled one update at
//! a time per chat. Outgoing replies go through [`delivery::Deliverer`], which
//! talks to Telegram via [`TeloxideTransport`].

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::telegram::commands::BotContext;
use crate::telegram::delivery::{Markup, MessageTransport, Photo, TransportError};

pub mod commands;
pub mod delivery;
pub mod markdown;
pub mod ui;

/// Pause before restarting a dispatcher that stopped on its own.
const RESTART_DELAY: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// [`MessageTransport`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TeloxideTransport {
    bot: Bot,
}

impl TeloxideTransport {
    /// Wrap a bot handle.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn parse_mode(markup: Markup) -> Option<ParseMode> {
    match markup {
        Markup::MarkdownV2 => Some(ParseMode::MarkdownV2),
        Markup::Plain => None,
    }
}

#[async_trait]
impl MessageTransport for TeloxideTransport {
    async fn send_text(
        &self,
        target: ChatId,
        text: &str,
        markup: Markup,
    ) -> Result<(), TransportError> {
        let mut req = self.bot.send_message(target, text);
        if let Some(mode) = parse_mode(markup) {
            req = req.parse_mode(mode);
        }
        req.await
            .map(|_| ())
            .map_err(|e| TransportError(e.to_string()))
    }

    async fn send_photo(
        &self,
        target: ChatId,
        photo: &Photo,
        caption: Option<&str>,
        markup: Markup,
    ) -> Result<(), TransportError> {
        let file = InputFile::memory(photo.bytes.clone()).file_name("thumb.jpg");
        let mut req = self.bot.send_photo(target, file);
        if let Some(caption) = caption {
            req = req.caption(caption);
            if let Some(mode) = parse_mode(markup) {
                req = req.parse_mode(mode);
            }
        }
        req.await
            .map(|_| ())
            .map_err(|e| TransportError(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Run the Telegram bot until Ctrl+C.
///
/// The dispatcher long-polls for updates. If it ever returns without a
/// shutdown request it is rebuilt after a short pause. On Ctrl+C, handlers
/// already running finish their current send before the loop exits; a
/// Ctrl+C during the pause stops the bot instead of restarting it.
pub async fn run_telegram(bot: Bot, ctx: BotContext) -> anyhow::Result<()> {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested, finishing in-flight handlers");
            let _ = stop_tx.send(true);
        }
    });

    loop {
        let handler = Update::filter_message().endpoint(handle_message);
        let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
            .dependencies(dptree::deps![ctx.clone()])
            .default_handler(|update| async move {
                debug!(update_id = ?update.id, "ignoring non-message update");
            })
            .build();

        let token = dispatcher.shutdown_token();
        let mut stop = stop_rx.clone();
        let forwarder = tokio::spawn(async move {
            let requested = stop.wait_for(|stopping| *stopping).await.is_ok();
            if requested {
                // Errors only while the dispatcher is idle (not yet polling).
                loop {
                    match token.shutdown() {
                        Ok(done) => break done.await,
                        Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
                    }
                }
            }
        });

        info!("telegram dispatcher starting");
        dispatcher.dispatch().await;
        forwarder.abort();

        let stopping = *stop_rx.borrow();
        if stopping {
            break;
        }
        warn!(
            delay_secs = RESTART_DELAY.as_secs(),
            "telegram dispatcher exited unexpectedly, restarting"
        );
        if !wait_before_restart(&mut stop_rx, RESTART_DELAY).await {
            break;
        }
    }

    signal.abort();
    info!("telegram dispatcher stopped");
    Ok(())
}

/// Sleep for `delay` unless a shutdown arrives first.
///
/// Returns `true` when the dispatcher should be rebuilt.
async fn wait_before_restart(stop: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        Ok(_) = stop.wait_for(|stopping| *stopping) => false,
    }
}

// ---------------------------------------------------------------------------
// Message handler
// ---------------------------------------------------------------------------

/// Handle an incoming Telegram message.
///
/// Non-text messages are ignored. Command failures are logged and never
/// propagated, so one bad command cannot stop the dispatcher.
async fn handle_message(msg: Message, ctx: BotContext) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        debug!(chat_id = msg.chat.id.0, "non-text message ignored");
        return Ok(());
    };

    if let Err(e) = commands::dispatch(&ctx, msg.chat.id, text).await {
        warn!(chat_id = msg.chat.id.0, error = %e, "command failed");
    }
    Ok(())
}
