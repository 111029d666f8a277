//! Serializes a [`Layout`] into a standalone HTML document

use std::fmt::Write;

use crate::layout::{Card, Layout, Panel, PanelBody, PanelRole};

const FONT_STACK: &str = "'Inter', -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif";

/// Styles for elements inside rendered Markdown
const CONTENT_CSS: &str = "\
.md p { margin: 0 0 8px; }
.md pre { background: #f1f5f9; border-radius: 6px; padding: 10px; overflow: hidden; white-space: pre-wrap; }
.md code { font-family: 'JetBrains Mono', Menlo, Consolas, monospace; font-size: 12px; }
.md table { border-collapse: collapse; }
.md th, .md td { border: 1px solid #e2e8f0; padding: 4px 8px; }
.md img { max-width: 100%; }";

/// Render `layout` as a complete HTML page with inline styles
pub fn to_html(layout: &Layout) -> String {
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    out.push_str("body { margin: 0; }\n");
    out.push_str(CONTENT_CSS);
    out.push_str("\n</style>\n</head>\n<body>\n");

    let _ = write!(
        out,
        "<div id=\"export-root\" style=\"width: {}px; padding: {}px; \
         background: linear-gradient(135deg, #f8fafc 0%, #e2e8f0 100%); \
         font-family: {FONT_STACK}; color: #1e293b; border-radius: 16px;\">\n",
        layout.width, layout.padding
    );

    if let Some(header) = &layout.header {
        let _ = writeln!(
            out,
            "<div style=\"font-size: 14px; font-weight: 600; color: #64748b; \
             margin-bottom: 20px; padding-bottom: 12px; border-bottom: 1px solid #cbd5e1;\">{}</div>",
            escape(&header.text)
        );
    }

    for card in &layout.cards {
        push_card(&mut out, card);
    }

    let _ = writeln!(
        out,
        "<div style=\"display: flex; justify-content: space-between; align-items: center; \
         margin-top: 20px; padding-top: 14px; border-top: 1px solid #cbd5e1; \
         font-size: 11px; color: #64748b;\">\
         <span style=\"font-weight: 600;\">{}</span><span>{}</span></div>",
        escape(&layout.footer.brand),
        escape(&layout.footer.date)
    );

    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn push_card(out: &mut String, card: &Card) {
    let (gap, border) = if card.divider {
        ("24px", "1px dashed #cbd5e1")
    } else {
        ("0", "none")
    };
    let _ = writeln!(
        out,
        "<div style=\"display: flex; gap: 24px; align-items: stretch; \
         margin-bottom: {gap}; padding-bottom: {gap}; border-bottom: {border};\">"
    );
    push_panel(out, &card.question);
    push_panel(out, &card.answer);
    out.push_str("</div>\n");
}

fn push_panel(out: &mut String, panel: &Panel) {
    let (sizing, avatar, gradient) = match panel.role {
        PanelRole::User => ("flex: 0 0 240px;", "👤", "#10b981, #059669"),
        PanelRole::Assistant => ("flex: 1; overflow: hidden;", "🤖", "#3b82f6, #8b5cf6"),
    };

    let _ = write!(
        out,
        "<div style=\"{sizing} background: white; border-radius: 12px; padding: 16px; \
         box-shadow: 0 2px 4px rgba(0,0,0,0.05); border: 1px solid #e2e8f0;\">\
         <div style=\"display: flex; align-items: center; gap: 8px; margin-bottom: 12px; \
         padding-bottom: 10px; border-bottom: 1px solid #f1f5f9;\">\
         <div style=\"width: 28px; height: 28px; border-radius: 50%; \
         background: linear-gradient(135deg, {gradient}); display: flex; align-items: center; \
         justify-content: center; color: white; font-size: 12px;\">{avatar}</div>\
         <div style=\"font-weight: 600; font-size: 12px; color: #334155;\">{}</div></div>",
        escape(&panel.title)
    );

    match &panel.body {
        PanelBody::Image { src } => {
            let _ = write!(
                out,
                "<img src=\"{}\" style=\"width: 100%; border-radius: 6px; border: 1px solid #e2e8f0;\">",
                escape(src)
            );
        }
        PanelBody::Placeholder { text } => {
            let _ = write!(
                out,
                "<div style=\"padding: 20px; text-align: center; color: #94a3b8; font-size: 12px; \
                 background: #f8fafc; border-radius: 6px;\">{}</div>",
                escape(text)
            );
        }
        PanelBody::TextBlock { html } => {
            let _ = write!(
                out,
                "<div class=\"md\" style=\"font-size: 13px; line-height: 1.6; color: #334155;\">{html}</div>"
            );
        }
    }

    out.push_str("</div>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ExportOptions, build_layout};
    use chrono::NaiveDate;
    use qsolver_core::HistoryItem;

    fn render(item: &HistoryItem) -> String {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let layout = build_layout(item, &ExportOptions::default(), date, crate::render_markdown);
        to_html(&layout)
    }

    #[test]
    fn test_document_structure() {
        let mut item = HistoryItem::new("data:image/png;base64,AAAA");
        item.current_round_mut().unwrap().ai_response = "**yes**".into();
        item.add_round("");

        let html = render(&item);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("width: 900px; padding: 28px;"));
        assert!(html.contains(">2 rounds</div>"));
        assert!(html.contains("<img src=\"data:image/png;base64,AAAA\""));
        assert!(html.contains(">No screenshot</div>"));
        assert!(html.contains("<strong>yes</strong>"));
        assert_eq!(html.matches("1px dashed #cbd5e1").count(), 1);
        assert!(html.contains("January 2, 2025"));
    }

    #[test]
    fn test_titles_are_escaped() {
        assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
