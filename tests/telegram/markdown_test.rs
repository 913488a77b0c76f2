//! Tests for `telegram::markdown` escaping.

use plexgram::telegram::markdown::{escape, is_reserved, EscapedBody, RESERVED};

/// Returns the first reserved character not preceded by an escaping backslash.
fn first_unescaped(text: &str) -> Option<char> {
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if is_reserved(c) {
            return Some(c);
        }
    }
    None
}

#[test]
fn empty_input_escapes_to_empty() {
    assert_eq!(escape(""), "");
}

#[test]
fn plain_text_is_unchanged() {
    assert_eq!(escape("Amelie en Paris"), "Amelie en Paris");
}

#[test]
fn every_reserved_char_is_escaped() {
    let raw: String = RESERVED.iter().collect();
    let escaped = escape(&raw);
    assert_eq!(first_unescaped(&escaped), None);
    assert_eq!(escaped.chars().count(), raw.chars().count() * 2);
}

#[test]
fn catalog_titles_come_out_clean() {
    let titles = [
        "Mission: Impossible - Dead Reckoning Part One",
        "(500) Days of Summer",
        "Ocean's 11!",
        "C:\\Users\\bob",
        "[REC]²",
        "#Alive",
        "Face/Off {director's cut} | 1997 = good ~ maybe > fine + ok",
        "snake_case *bold* `code`",
    ];
    for title in titles {
        let escaped = escape(title);
        assert_eq!(first_unescaped(&escaped), None, "title {title:?} -> {escaped:?}");
    }
}

#[test]
fn escaping_is_not_idempotent() {
    // Escaping twice doubles the backslashes; callers must escape once.
    assert_eq!(escape(&escape(".")), "\\\\\\.");
}

#[test]
fn escaped_body_keeps_markup_verbatim() {
    let body = EscapedBody::from_markup(format!("*{}*", escape("1.5!")));
    assert_eq!(body.as_str(), "*1\\.5\\!*");
    assert_eq!(body.char_len(), 8);
    assert!(EscapedBody::default().is_empty());
}
