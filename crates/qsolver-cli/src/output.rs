//! Plain-text rendering of history and settings for the terminal

use std::io::{self, Write};

use qsolver_core::{History, Round, StreamRouter};
use qsolver_wire::Settings;

/// Longest thinking excerpt shown without `--full`
const THINKING_PREVIEW_CHARS: usize = 200;

/// List items, newest first, marking the active one
pub fn write_history(out: &mut impl Write, history: &History) -> io::Result<()> {
    if history.is_empty() {
        return writeln!(out, "History is empty");
    }

    writeln!(out, "History ({} items)", history.len())?;
    for (i, item) in history.items().iter().enumerate() {
        let marker = if i == history.active_index() { '*' } else { ' ' };
        let rounds = item.round_count();
        let plural = if rounds == 1 { "" } else { "s" };
        writeln!(
            out,
            "{marker} [{i}] {}  {rounds} round{plural}  {}",
            item.time,
            item.summary()
        )?;
    }
    Ok(())
}

/// Print the rounds of one item
pub fn write_rounds(out: &mut impl Write, rounds: &[Round], full: bool) -> io::Result<()> {
    for (i, round) in rounds.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "── Question {} ──", i + 1)?;
        if round.has_screenshot() {
            writeln!(out, "screenshot: {} chars", round.user_screenshot.len())?;
        } else {
            writeln!(out, "screenshot: none")?;
        }

        if !round.thinking.is_empty() {
            writeln!(out, "thinking ({:.1}s):", round.thinking_duration)?;
            if full {
                writeln!(out, "{}", round.thinking)?;
            } else {
                writeln!(out, "{}", preview(&round.thinking))?;
            }
        }

        writeln!(out, "answer:")?;
        writeln!(out, "{}", round.ai_response)?;
    }
    Ok(())
}

/// History list plus the selected item's rounds and any error overlay
pub fn write_session(out: &mut impl Write, router: &StreamRouter, full: bool) -> io::Result<()> {
    write_history(out, router.history())?;
    write_rounds(out, router.current_rounds(), full)?;

    let error = router.error_state();
    if error.show {
        writeln!(out)?;
        writeln!(out, "{} {}: {}", error.icon, error.title, error.desc)?;
        if full {
            writeln!(out, "{}", error.raw_error)?;
        }
    }
    Ok(())
}

pub fn write_settings(out: &mut impl Write, settings: &Settings) -> io::Result<()> {
    let base_url = if settings.base_url.is_empty() {
        "(default)"
    } else {
        settings.base_url.as_str()
    };
    let api_key = settings.masked_api_key();

    writeln!(out, "provider:      {}", settings.provider)?;
    writeln!(out, "model:         {}", settings.model)?;
    writeln!(out, "base URL:      {base_url}")?;
    writeln!(
        out,
        "API key:       {}",
        if api_key.is_empty() { "(not set)" } else { api_key.as_str() }
    )?;
    writeln!(out, "keep context:  {}", settings.keep_context)?;
    writeln!(out, "screenshot:    {:?}", settings.screenshot_mode)?;
    writeln!(
        out,
        "generation:    temperature {} top_p {} top_k {} max_tokens {} thinking_budget {}",
        settings.temperature,
        settings.top_p,
        settings.top_k,
        settings.max_tokens,
        settings.thinking_budget
    )?;
    writeln!(out, "shortcuts:")?;
    for (action, binding) in &settings.shortcuts {
        writeln!(out, "  {action:<12} {}", binding.key_name)?;
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(THINKING_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
