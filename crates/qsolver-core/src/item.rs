//! History items and the rounds they are made of

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator placed between rounds when an item is flattened to text
pub const ROUND_SEPARATOR: &str = "\n\n---\n\n";

/// Number of characters kept by [`HistoryItem::summary`]
const SUMMARY_CHARS: usize = 30;

/// One user-input / AI-output turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Screenshot reference the question came from (empty if none)
    pub user_screenshot: String,
    /// Accumulated chain-of-thought
    pub thinking: String,
    /// Seconds spent thinking
    pub thinking_duration: f64,
    /// Accumulated answer
    pub ai_response: String,
}

impl Round {
    pub fn new(user_screenshot: impl Into<String>) -> Self {
        Self {
            user_screenshot: user_screenshot.into(),
            ..Default::default()
        }
    }

    pub fn has_screenshot(&self) -> bool {
        !self.user_screenshot.is_empty()
    }
}

/// One exchange, possibly spanning several rounds when context is kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: Uuid,
    /// Creation time for display (`HH:MM:SS`)
    pub time: String,
    rounds: Vec<Round>,
}

impl HistoryItem {
    /// Create an item with a single empty round
    pub fn new(user_screenshot: impl Into<String>) -> Self {
        Self::created_at(user_screenshot, Local::now())
    }

    /// Create an item stamped with a given time
    pub fn created_at(user_screenshot: impl Into<String>, time: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: time.format("%H:%M:%S").to_string(),
            rounds: vec![Round::new(user_screenshot)],
        }
    }

    /// Append a new empty round; existing rounds are never touched
    pub fn add_round(&mut self, user_screenshot: impl Into<String>) {
        self.rounds.push(Round::new(user_screenshot));
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// The round currently receiving tokens
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn current_round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.last_mut()
    }

    /// Every answer, in round order
    pub fn full_text(&self) -> String {
        self.rounds
            .iter()
            .map(|r| r.ai_response.as_str())
            .collect::<Vec<_>>()
            .join(ROUND_SEPARATOR)
    }

    /// Short one-line preview of the latest answer
    pub fn summary(&self) -> String {
        let text = self
            .current_round()
            .map(|r| r.ai_response.as_str())
            .unwrap_or_default();
        let head: String = text
            .chars()
            .take(SUMMARY_CHARS)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        format!("{head}...")
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(item: &mut HistoryItem, text: &str) {
        item.current_round_mut().unwrap().ai_response = text.to_string();
    }

    #[test]
    fn test_new_item_has_one_seeded_round() {
        let item = HistoryItem::new("data:image/png;base64,AAAA");
        assert_eq!(item.rounds().len(), 1);
        let round = item.current_round().unwrap();
        assert_eq!(round.user_screenshot, "data:image/png;base64,AAAA");
        assert!(round.thinking.is_empty());
        assert!(round.ai_response.is_empty());
        assert_eq!(round.thinking_duration, 0.0);
    }

    #[test]
    fn test_time_format() {
        let time = Local::now();
        let item = HistoryItem::created_at("", time);
        assert_eq!(item.time, time.format("%H:%M:%S").to_string());
        assert_eq!(item.time.len(), 8);
    }

    #[test]
    fn test_add_round_keeps_existing() {
        let mut item = HistoryItem::new("a");
        answered(&mut item, "first");
        item.add_round("b");

        assert_eq!(item.round_count(), 2);
        assert_eq!(item.rounds()[0].ai_response, "first");
        assert_eq!(item.current_round().unwrap().user_screenshot, "b");
    }

    #[test]
    fn test_full_text_joins_rounds() {
        let mut item = HistoryItem::new("");
        answered(&mut item, "one");
        item.add_round("");
        answered(&mut item, "two");
        assert_eq!(item.full_text(), "one\n\n---\n\ntwo");
    }

    #[test]
    fn test_summary_truncates_and_flattens() {
        let mut item = HistoryItem::new("");
        answered(&mut item, "line one\nline two is quite a bit longer than thirty");
        assert_eq!(item.summary(), "line one line two is quite a b...");
    }

    #[test]
    fn test_summary_counts_characters_not_bytes() {
        let mut item = HistoryItem::new("");
        answered(&mut item, &"解".repeat(40));
        assert_eq!(item.summary(), format!("{}...", "解".repeat(30)));
    }

    #[test]
    fn test_summary_uses_last_round() {
        let mut item = HistoryItem::new("");
        answered(&mut item, "old");
        item.add_round("");
        answered(&mut item, "new");
        assert_eq!(item.summary(), "new...");
    }
}
