//! Inventory bookkeeping: turning parsed pickups into items, deduplicating
//! them, and consuming healing items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::markers::ParsedItem;

/// Healing items by name fragment. Checked in order, first match wins, so
/// more specific names sit above the shorter names they contain.
pub const HEALING_TABLE: &[(&str, u32)] = &[
    ("שיקוי ריפוי", 30),
    ("שיקוי גדול", 50),
    ("שיקוי", 30),
    ("לחם", 15),
    ("מזון", 15),
    ("פרי", 10),
    ("מים", 10),
    ("תרופה", 25),
    ("עלה רפואי", 20),
    ("צמח מרפא", 20),
];

/// Flavor text by name fragment, same ordering rule as [`HEALING_TABLE`].
pub const DESCRIPTION_TABLE: &[(&str, &str)] = &[
    ("שיקוי ריפוי", "שיקוי קסום אדום-זוהר. מרפא פצעים ומחזיר חיים. (מרפא 30 HP)"),
    ("שיקוי גדול", "שיקוי ריפוי חזק במיוחד! זוהר באור זהוב. (מרפא 50 HP)"),
    ("שיקוי", "שיקוי קסום אדום-זוהר. מרפא פצעים ומחזיר חיים. (מרפא 30 HP)"),
    ("לחם", "לחם טרי ומזין. יחזיר לך כוח ואנרגיה. (מרפא 15 HP)"),
    ("מזון", "מזון מזין שמחזיר כוחות. (מרפא 15 HP)"),
    ("פרי", "פרי טרי ועסיסי. מרענן ומחיה. (מרפא 10 HP)"),
    ("מים", "בקבוק מים נקיים. חיוני להישרדות. (מרפא 10 HP)"),
    ("תרופה", "תרופה רפואית יעילה. מרפאת מחלות ופצעים. (מרפא 25 HP)"),
    ("עלה רפואי", "עלה צמח מרפא נדיר. יש לו תכונות ריפוי. (מרפא 20 HP)"),
    ("צמח מרפא", "צמח בעל תכונות מרפאות מופלאות. (מרפא 20 HP)"),
    ("מפתח", "מפתח מתכת עתיק. נראה שהוא עשוי לפתוח דלת חשובה."),
    ("חרב", "חרב חדה ומבריקה. תגן עליך מפני סכנות."),
    ("ספר", "ספר עתיק מלא בידע. עשוי להכיל מידע חשוב."),
    ("נר", "נר דולק שמאיר בחושך. יעזור לך למצוא את דרכך."),
    ("פנסוט", "פנסוט קסום שמקרין אור רך. מאיר את דרכך בחושך."),
    ("פנס", "פנס חזק. מאיר את הדרך בחושך."),
    ("שקית", "שקית קטנה המכילה משהו מעניין."),
    ("אבן", "אבן מיוחדת הקורנת אור עדין. אולי קסומה?"),
    ("כלי", "כלי שימושי שיכול לעזור בפתרון בעיות."),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub emoji: String,
    pub name: String,
    pub description: String,
    pub acquired_at: DateTime<Utc>,
    #[serde(default)]
    pub is_healing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heal_amount: Option<u32>,
}

impl InventoryItem {
    /// Build a fresh item from a parsed pickup, classifying and describing it.
    pub fn from_parsed(parsed: &ParsedItem) -> Self {
        let heal_amount = heal_amount_for(&parsed.name);
        Self {
            id: Uuid::new_v4().to_string(),
            emoji: parsed.emoji.clone(),
            name: parsed.name.clone(),
            description: describe_item(&parsed.name, &parsed.emoji),
            acquired_at: Utc::now(),
            is_healing: heal_amount.is_some(),
            heal_amount,
        }
    }

    fn same_kind(&self, emoji: &str, name: &str) -> bool {
        self.emoji == emoji && self.name == name
    }
}

/// Heal amount for an item name: either side may contain the other.
pub fn heal_amount_for(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    HEALING_TABLE
        .iter()
        .find(|(pattern, _)| name.contains(pattern) || pattern.contains(name))
        .map(|&(_, amount)| amount)
}

pub fn describe_item(name: &str, emoji: &str) -> String {
    match DESCRIPTION_TABLE.iter().find(|(key, _)| name.contains(key)) {
        Some((_, text)) => format!("{emoji} {text}"),
        None => format!("{emoji} {name} - פריט שנאסף במהלך ההרפתקה."),
    }
}

/// Append new items, dropping any whose (emoji, name) is already held.
/// Items are never stacked.
pub fn merge(current: &[InventoryItem], parsed: &[ParsedItem]) -> Vec<InventoryItem> {
    let mut merged = current.to_vec();
    for item in parsed {
        if merged.iter().any(|held| held.same_kind(&item.emoji, &item.name)) {
            debug!(emoji = %item.emoji, name = %item.name, "duplicate pickup suppressed");
            continue;
        }
        merged.push(InventoryItem::from_parsed(item));
    }
    merged
}

/// A healing item taken out of the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumed {
    pub item: InventoryItem,
    pub heal_amount: u32,
}

/// Remove the healing item `item_id`. Returns `None`, leaving the inventory
/// alone, when the id is unknown or the item does not heal.
pub fn consume(inventory: &mut Vec<InventoryItem>, item_id: &str) -> Option<Consumed> {
    let index = inventory.iter().position(|item| item.id == item_id)?;
    let heal_amount = match &inventory[index] {
        InventoryItem { is_healing: true, heal_amount: Some(amount), .. } if *amount > 0 => *amount,
        _ => return None,
    };
    let item = inventory.remove(index);
    Some(Consumed { item, heal_amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(emoji: &str, name: &str) -> ParsedItem {
        ParsedItem { emoji: emoji.into(), name: name.into() }
    }

    #[test]
    fn healing_classification_follows_table_order() {
        assert_eq!(heal_amount_for("שיקוי ריפוי"), Some(30));
        assert_eq!(heal_amount_for("שיקוי גדול"), Some(50));
        assert_eq!(heal_amount_for("שיקוי קטן"), Some(30));
        assert_eq!(heal_amount_for("לחם טרי"), Some(15));
        assert_eq!(heal_amount_for("מפתח זהב"), None);
    }

    #[test]
    fn short_names_match_in_reverse() {
        // "עלה" is contained in "עלה רפואי".
        assert_eq!(heal_amount_for("עלה"), Some(20));
    }

    #[test]
    fn descriptions_fall_back_to_generic_text() {
        assert!(describe_item("מפתח זהב", "🗝️").starts_with("🗝️ מפתח מתכת עתיק"));
        assert_eq!(
            describe_item("כתר", "👑"),
            "👑 כתר - פריט שנאסף במהלך ההרפתקה."
        );
    }

    #[test]
    fn merge_suppresses_duplicates() {
        let first = merge(&[], &[parsed("🗝️", "מפתח זהב")]);
        let again = merge(&first, &[parsed("🗝️", "מפתח זהב")]);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, first[0].id);

        let other_emoji = merge(&first, &[parsed("🔑", "מפתח זהב")]);
        assert_eq!(other_emoji.len(), 2);
    }

    #[test]
    fn consume_removes_only_healing_items() {
        let mut inventory = merge(&[], &[parsed("🧪", "שיקוי ריפוי"), parsed("🗝️", "מפתח")]);
        let key_id = inventory[1].id.clone();
        assert!(consume(&mut inventory, &key_id).is_none());
        assert!(consume(&mut inventory, "missing").is_none());
        assert_eq!(inventory.len(), 2);

        let potion_id = inventory[0].id.clone();
        let consumed = consume(&mut inventory, &potion_id).unwrap();
        assert_eq!(consumed.heal_amount, 30);
        assert_eq!(consumed.item.name, "שיקוי ריפוי");
        assert_eq!(inventory.len(), 1);
    }
}
