//! Markdown to HTML for answer text

use pulldown_cmark::{Event, Options, Parser, html};

/// Render Markdown as an HTML fragment.
///
/// Raw HTML in the source is shown as text rather than passed through.
pub fn render_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
