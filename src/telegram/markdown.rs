//! MarkdownV2 escaping for catalog text.
//!
//! Telegram's MarkdownV2 dialect rejects a message outright when a reserved
//! character appears unescaped outside a markup construct. Catalog strings
//! (titles, synopses, deep links) are escaped one substring at a time and
//! then interpolated into hand-built templates, so the bold markers and link
//! brackets the templates add stay intact.

/// Characters reserved by MarkdownV2, backslash included.
pub const RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
    '!',
];

/// Returns `true` if `c` must be escaped in MarkdownV2 text.
pub fn is_reserved(c: char) -> bool {
    RESERVED.contains(&c)
}

/// Escape every reserved MarkdownV2 character in `raw` with a backslash.
///
/// Apply to substrings before interpolation, never to a finished template.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_reserved(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Wrap escaped `raw` in bold markers.
pub fn bold(raw: &str) -> String {
    format!("*{}*", escape(raw))
}

/// Build an inline link with an escaped label and target.
pub fn link(label: &str, url: &str) -> String {
    format!("[{}]({})", escape(label), escape(url))
}

/// A fully composed MarkdownV2 message body.
///
/// Only built from template text whose catalog parts already went through
/// [`escape`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapedBody(String);

impl EscapedBody {
    /// Wrap text the caller has already assembled as valid MarkdownV2.
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// The body text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, the unit the delivery ceilings are measured in.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Returns `true` when the body has no text.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
