//! MarkdownV2 reply templates for catalog results.
//!
//! Every catalog-derived string passes through [`escape`] before it is
//! interpolated; the templates themselves only contribute bold markers,
//! link brackets and pre-escaped punctuation.

use url::form_urlencoded;

use crate::plex::{Category, Item};
use crate::reports::NoteKind;
use crate::telegram::markdown::{bold, escape, link, EscapedBody};

/// Reply to any text that is not a known command.
pub const HELP: &str = "🤖 *Comandos disponibles:*\n\
    🔍 `/listar [pelis o series]`\n\
    🔍 `/buscar [película o serie]`\n\
    📩 `/solicitar [película o serie]`\n\
    ⚠️ `/reportar [problema]`\n";

/// `/listar` without an argument.
pub const LIST_USAGE: &str = "❌ Debes especificar qué listar:\n\
    📽 `/listar pelis` para películas\n\
    📺 `/listar series` para series";

/// `/listar` with an unknown argument.
pub const LIST_UNKNOWN: &str = "❌ Comando incorrecto\\. Usa:\n\
    \\- `/listar pelis` para listar películas\n\
    \\- `/listar series` para listar series";

/// `/buscar` with a query that is too short.
pub const SEARCH_USAGE: &str = "❌ Debes escribir al menos 3 caracteres para buscar\\.\n\
    Ejemplo: `/buscar Batman 2008`";

/// `/reportar` without text.
pub const REPORT_USAGE: &str = "❌ Escribe el problema después de `/reportar`\\.";

/// `/solicitar` without text.
pub const REQUEST_USAGE: &str = "❌ Escribe qué película o serie quieres después de `/solicitar`\\.";

/// Plain-text reply when listing fails on the catalog side.
pub const LIST_FAILED: &str = "❌ Ocurrió un error al obtener la lista de contenidos.";

/// Plain-text reply when searching fails on the catalog side.
pub const SEARCH_FAILED: &str = "❌ Error al conectar con Plex.";

/// Plain-text reply when a report cannot be stored.
pub const NOTE_FAILED: &str = "❌ No se pudo guardar tu mensaje. Inténtalo más tarde.";

const UNKNOWN: &str = "Desconocido";
const NO_SUMMARY: &str = "Sin descripción.";

/// Plex Web deep link to an item.
pub fn web_link(server_id: &str, key: &str) -> String {
    format!(
        "https://app.plex.tv/desktop/#!/server/{server_id}/details?key={}",
        encode_key(key)
    )
}

/// Deep link that opens the item in a Plex app.
pub fn app_link(server_id: &str, key: &str) -> String {
    format!(
        "https://l.plex.tv/desktop#!/server/{server_id}/details?key={}",
        encode_key(key)
    )
}

fn encode_key(key: &str) -> String {
    form_urlencoded::byte_serialize(key.as_bytes()).collect()
}

fn year_label(item: &Item) -> String {
    item.year
        .map_or_else(|| UNKNOWN.to_owned(), |year| year.to_string())
}

fn title_label(item: &Item) -> &str {
    if item.title.trim().is_empty() {
        UNKNOWN
    } else {
        &item.title
    }
}

/// Runtime rounded to the nearest minute.
pub fn format_duration(duration_ms: Option<u64>) -> String {
    match duration_ms {
        Some(ms) if ms > 0 => {
            let minutes = ms.saturating_add(30_000).checked_div(60_000).unwrap_or_default();
            format!("{minutes} min")
        }
        _ => "Desconocida".to_owned(),
    }
}

fn heading(category: Category) -> &'static str {
    match category {
        Category::Movies => "🎬",
        Category::Shows => "📺",
    }
}

/// One line per item under a bold header.
pub fn format_listing(category: Category, items: &[Item]) -> EscapedBody {
    let header = match category {
        Category::Movies => "🎬 *Lista de Películas Disponibles:*",
        Category::Shows => "📺 *Lista de Series Disponibles:*",
    };
    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "📌 {} \\({}\\)",
                escape(title_label(item)),
                escape(&year_label(item))
            )
        })
        .collect();
    EscapedBody::from_markup(format!("{header}\n\n{}", lines.join("\n")))
}

/// Detail card for a search hit.
pub fn format_card(category: Category, item: &Item, server_id: &str) -> EscapedBody {
    let mut lines = vec![
        format!(
            "{} {} \\({}\\)",
            heading(category),
            bold(title_label(item)),
            escape(&year_label(item))
        ),
        format!(
            "📖 {}",
            escape(item.summary.as_deref().unwrap_or(NO_SUMMARY))
        ),
    ];

    match item.episodes {
        Some(counts) => {
            lines.push(format!("📅 Temporadas: {}", counts.seasons));
            lines.push(format!("🎬 Episodios: {}", counts.episodes));
        }
        None => lines.push(format!(
            "⏳ Duración: {}",
            escape(&format_duration(item.duration_ms))
        )),
    }

    lines.push(format!(
        "🔗 {}",
        link("Abrir en Plex Web", &web_link(server_id, &item.key))
    ));
    lines.push(format!(
        "📲 {}",
        link("Abrir en App", &app_link(server_id, &item.key))
    ));

    EscapedBody::from_markup(lines.join("\n"))
}

/// Near-miss suggestions after an empty exact search.
pub fn format_suggestions(movies: &[Item], shows: &[Item]) -> EscapedBody {
    let mut out =
        String::from("⚠️ No encontré exactamente lo que buscas, pero quizás te interese:\n\n");
    for (category, items) in [(Category::Movies, movies), (Category::Shows, shows)] {
        for item in items {
            out.push_str(&format!(
                "{} {} \\({}\\)\n",
                heading(category),
                escape(title_label(item)),
                escape(&year_label(item))
            ));
        }
    }
    EscapedBody::from_markup(out)
}

/// Nothing matched, not even loosely.
pub fn format_not_found(query: &str) -> EscapedBody {
    EscapedBody::from_markup(format!(
        "❌ No encontré nada relacionado con '{}'\\.",
        escape(query)
    ))
}

/// Acknowledge a stored report or request, echoing it back.
pub fn format_note_ack(kind: NoteKind, text: &str) -> EscapedBody {
    let label = match kind {
        NoteKind::Report => "⚠️ Reporte enviado:",
        NoteKind::Request => "📩 Solicitud registrada:",
    };
    EscapedBody::from_markup(format!("{label} {}", escape(text)))
}

/// "Empty section" reply.
pub fn format_empty_section(category: Category) -> &'static str {
    match category {
        Category::Movies => "❌ No hay películas en el servidor.",
        Category::Shows => "❌ No hay series en el servidor.",
    }
}
