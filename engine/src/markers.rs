//! Extraction of the bracketed sentinels the narrator embeds in its text.
//!
//! Two formats are recognised, and they are a wire contract with the
//! narration service:
//!
//! - `[קיבלת: <emoji> <name_with_underscores>]` for an item pickup
//! - `[COMBAT: <name>:<emoji>:<health>]` for the start of a fight
//!
//! Anything that does not match is left in the text as-is.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const ITEM_KEYWORD: &str = "קיבלת";
pub const COMBAT_KEYWORD: &str = "COMBAT";

static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[{ITEM_KEYWORD}:\s*(\S+)\s+([^\]]+)\]")).expect("valid regex")
});
static COMBAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[{COMBAT_KEYWORD}:\s*([^:]+):([^:]+):(\d+)\]")).expect("valid regex")
});
static COMBAT_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[{COMBAT_KEYWORD}:[^\]]+\]")).expect("valid regex")
});

/// An item pickup as written by the narrator, before it becomes an
/// inventory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub emoji: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatMarker {
    pub enemy_name: String,
    pub enemy_emoji: String,
    pub enemy_health: u32,
}

/// Everything one narrator turn yields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedNarration {
    pub items: Vec<ParsedItem>,
    pub combat: Option<CombatMarker>,
    pub display: String,
}

fn item_from_captures(caps: &Captures<'_>) -> Option<ParsedItem> {
    let name = caps[2].replace('_', " ").trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some(ParsedItem { emoji: caps[1].to_string(), name })
}

/// Every well-formed item marker in `text`, in order of appearance.
pub fn parse_items(text: &str) -> Vec<ParsedItem> {
    ITEM_RE
        .captures_iter(text)
        .filter_map(|caps| item_from_captures(&caps))
        .collect()
}

/// The first combat marker in `text`. Later ones are ignored; a zero or
/// out-of-range health voids the marker.
pub fn parse_combat_marker(text: &str) -> Option<CombatMarker> {
    let caps = COMBAT_RE.captures(text)?;
    let enemy_health: u32 = caps[3].parse().ok()?;
    if enemy_health == 0 {
        return None;
    }
    Some(CombatMarker {
        enemy_name: caps[1].trim().to_string(),
        enemy_emoji: caps[2].trim().to_string(),
        enemy_health,
    })
}

/// Rewrite item markers into an inline acquisition note.
pub fn clean_item_markers(text: &str) -> String {
    ITEM_RE
        .replace_all(text, |caps: &Captures<'_>| match item_from_captures(caps) {
            Some(item) => format!("✨ {ITEM_KEYWORD}: {} {}", item.emoji, item.name),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Drop combat markers entirely; the fight is shown elsewhere.
pub fn clean_combat_markers(text: &str) -> String {
    COMBAT_STRIP_RE.replace_all(text, "").trim().to_string()
}

pub fn clean_markers(text: &str) -> String {
    clean_combat_markers(&clean_item_markers(text))
}

pub fn parse_narration(text: &str) -> ParsedNarration {
    ParsedNarration {
        items: parse_items(text),
        combat: parse_combat_marker(text),
        display: clean_markers(text),
    }
}
