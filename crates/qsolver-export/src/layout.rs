//! Pure document tree for an exported history item

use chrono::NaiveDate;
use qsolver_core::{HistoryItem, Round};
use serde::{Deserialize, Serialize};

/// Content width of the exported document in CSS pixels
pub const DOCUMENT_WIDTH: u32 = 900;
/// Padding around the document content in CSS pixels
pub const DOCUMENT_PADDING: u32 = 28;
/// Device pixel ratio used when capturing
pub const CAPTURE_SCALE: f32 = 2.0;
/// Branding shown in the footer
pub const DEFAULT_BRAND: &str = "Q-Solver";

/// Geometry and branding of an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub width: u32,
    pub padding: u32,
    pub scale: f32,
    pub brand: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: DOCUMENT_WIDTH,
            padding: DOCUMENT_PADDING,
            scale: CAPTURE_SCALE,
            brand: DEFAULT_BRAND.to_string(),
        }
    }
}

/// Whose side of the exchange a panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelRole {
    User,
    Assistant,
}

/// What a panel shows below its title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelBody {
    /// The screenshot the question was asked about
    Image { src: String },
    /// Shown when a round has no screenshot
    Placeholder { text: String },
    /// Rendered answer HTML
    TextBlock { html: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub role: PanelRole,
    pub title: String,
    pub body: PanelBody,
}

/// One round: question on the left, answer on the right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub question: Panel,
    pub answer: Panel,
    /// Dashed separator below this card
    pub divider: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub brand: String,
    pub date: String,
}

/// The whole export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub width: u32,
    pub padding: u32,
    pub scale: f32,
    pub header: Option<Header>,
    pub cards: Vec<Card>,
    pub footer: Footer,
}

impl Layout {
    /// Width including padding on both sides
    pub fn outer_width(&self) -> u32 {
        self.width + 2 * self.padding
    }
}

/// Build the document tree for `item`.
///
/// `markdown` renders answer text to HTML. The header only appears for
/// multi-round items.
pub fn build_layout(
    item: &HistoryItem,
    options: &ExportOptions,
    date: NaiveDate,
    markdown: impl Fn(&str) -> String,
) -> Layout {
    let rounds = item.rounds();
    let total = rounds.len();

    let header = (total > 1).then(|| Header {
        text: format!("{total} rounds"),
    });

    let cards = rounds
        .iter()
        .enumerate()
        .map(|(i, round)| build_card(round, i, total, &markdown))
        .collect();

    Layout {
        width: options.width,
        padding: options.padding,
        scale: options.scale,
        header,
        cards,
        footer: Footer {
            brand: options.brand.clone(),
            date: date.format("%B %-d, %Y").to_string(),
        },
    }
}

fn build_card(round: &Round, index: usize, total: usize, markdown: &impl Fn(&str) -> String) -> Card {
    let question_body = if round.has_screenshot() {
        PanelBody::Image {
            src: round.user_screenshot.clone(),
        }
    } else {
        PanelBody::Placeholder {
            text: "No screenshot".to_string(),
        }
    };

    Card {
        question: Panel {
            role: PanelRole::User,
            title: format!("Question {}", index + 1),
            body: question_body,
        },
        answer: Panel {
            role: PanelRole::Assistant,
            title: "AI Response".to_string(),
            body: PanelBody::TextBlock {
                html: markdown(&round.ai_response),
            },
        },
        divider: index + 1 < total,
    }
}
