//! The session state and its transitions.
//!
//! Every mutation of a [`Session`] is one of the methods below. They are
//! plain synchronous reducers: the engine drives them from narration events
//! and player input, and the FFI bridge drives them directly on a
//! deserialized session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Dice;
use crate::combat::{self, Combat, CombatAction, CombatReport};
use crate::error::{EngineError, EngineResult};
use crate::inventory::{self, InventoryItem};
use crate::life::heal;
use crate::markers::{self, ParsedNarration};
use crate::narration::{ChatTurn, NarrationError, NarrationRequest, Speaker};

pub const DEFAULT_MAX_HEALTH: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// Framing handed to the narrator on every request.
    pub description: String,
    /// The narrator's opening message.
    pub intro: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Narrator,
    Player,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn narrator(content: impl Into<String>) -> Self {
        Self::new(Role::Narrator, content)
    }

    pub fn player(content: impl Into<String>) -> Self {
        Self::new(Role::Player, content)
    }
}

/// A submitted turn waiting for its narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    /// Id of the empty narrator message that will receive the text.
    pub message_id: String,
    pub request: NarrationRequest,
}

/// What a completed narration changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NarrationOutcome {
    pub parsed: ParsedNarration,
    pub new_items: Vec<InventoryItem>,
    pub combat_started: bool,
}

/// A healing item that was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealReport {
    pub item: InventoryItem,
    /// Health actually restored after capping at the maximum.
    pub restored: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub player_name: String,
    pub selected_scenario: Option<Scenario>,
    pub messages: Vec<Message>,
    pub turn_count: u32,
    pub is_narrator_typing: bool,
    #[serde(default)]
    pub game_started: bool,
    pub inventory: Vec<InventoryItem>,
    pub player_health: u32,
    pub player_max_health: u32,
    pub combat: Option<Combat>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            selected_scenario: None,
            messages: Vec::new(),
            turn_count: 0,
            is_narrator_typing: false,
            game_started: false,
            inventory: Vec::new(),
            player_health: DEFAULT_MAX_HEALTH,
            player_max_health: DEFAULT_MAX_HEALTH,
            combat: None,
        }
    }
}

impl Session {
    /// A fresh play-through opening with the scenario's intro.
    pub fn start(player_name: &str, scenario: &Scenario, max_health: u32) -> Self {
        info!(player = player_name, scenario = %scenario.id, "starting game");
        Self {
            player_name: player_name.to_string(),
            selected_scenario: Some(scenario.clone()),
            messages: vec![Message::narrator(scenario.intro.clone())],
            game_started: true,
            player_health: max_health,
            player_max_health: max_health,
            ..Self::default()
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_started && self.player_health == 0
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// History sent to the narrator: everything after the intro.
    pub fn conversation_history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .skip(1)
            .map(|m| ChatTurn {
                speaker: match m.role {
                    Role::Player => Speaker::Player,
                    Role::Narrator => Speaker::Narrator,
                },
                text: m.content.clone(),
            })
            .collect()
    }

    /// Record the player's text, open an empty narrator message and count the
    /// turn. `text` is expected to be trimmed and non-empty.
    pub fn begin_turn(&mut self, text: &str) -> PendingTurn {
        self.messages.push(Message::player(text));
        let request = NarrationRequest {
            history: self.conversation_history(),
            scenario_context: self
                .selected_scenario
                .as_ref()
                .map(|s| s.description.clone())
                .unwrap_or_default(),
        };

        let placeholder = Message::narrator(String::new());
        let message_id = placeholder.id.clone();
        self.messages.push(placeholder);
        self.turn_count += 1;
        self.is_narrator_typing = true;
        debug!(turn = self.turn_count, %message_id, "turn started");

        PendingTurn { message_id, request }
    }

    /// Append a streamed fragment. Returns false when the message is gone.
    pub fn append_chunk(&mut self, message_id: &str, chunk: &str) -> bool {
        match self.message_mut(message_id) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Settle a finished narration: pick up items, maybe start a fight, and
    /// replace the streamed text with its display form.
    pub fn finish_narration(&mut self, message_id: &str, full_text: &str) -> NarrationOutcome {
        let parsed = markers::parse_narration(full_text);

        if let Some(message) = self.message_mut(message_id) {
            message.content = parsed.display.clone();
        }

        let held = self.inventory.len();
        self.inventory = inventory::merge(&self.inventory, &parsed.items);
        let new_items = self.inventory[held..].to_vec();

        let mut combat_started = false;
        if let Some(marker) = &parsed.combat {
            if self.combat.is_some() {
                debug!(enemy = %marker.enemy_name, "combat marker ignored, a fight is already on");
            } else if self.is_game_over() {
                debug!(enemy = %marker.enemy_name, "combat marker ignored, the game is over");
            } else {
                info!(enemy = %marker.enemy_name, health = marker.enemy_health, "combat started");
                self.combat = Some(Combat::start(
                    &marker.enemy_name,
                    &marker.enemy_emoji,
                    marker.enemy_health,
                ));
                combat_started = true;
            }
        }

        self.is_narrator_typing = false;
        NarrationOutcome { parsed, new_items, combat_started }
    }

    /// Replace the pending narration with an error line. The turn still counts.
    pub fn fail_narration(&mut self, message_id: &str, error: &NarrationError) {
        if let Some(message) = self.message_mut(message_id) {
            message.content = error.display_text();
        }
        self.is_narrator_typing = false;
    }

    /// Run a combat action. The fight is removed once it is decided.
    pub fn resolve_combat_action(
        &mut self,
        action: CombatAction,
        dice: &mut Dice,
    ) -> EngineResult<CombatReport> {
        let combat = self.combat.as_mut().ok_or(EngineError::NoActiveCombat)?;
        let report = combat::resolve(combat, &mut self.player_health, action, dice);
        if let Some(outcome) = report.outcome {
            info!(?outcome, player_hp = self.player_health, "combat over");
            self.combat = None;
        }
        Ok(report)
    }

    /// Use a healing item. `None` when the item is unknown or does not heal,
    /// or the player is already dead.
    pub fn consume_healing_item(&mut self, item_id: &str) -> Option<HealReport> {
        if self.is_game_over() {
            return None;
        }
        let consumed = inventory::consume(&mut self.inventory, item_id)?;
        let before = self.player_health;
        self.player_health = heal(before, consumed.heal_amount, self.player_max_health);
        let restored = self.player_health.saturating_sub(before);

        if let Some(combat) = self.combat.as_mut() {
            combat.log.push(format!(
                "✨ השתמשת ב{} {}! החזרת {restored} נקודות בריאות!",
                consumed.item.emoji, consumed.item.name
            ));
        }
        debug!(item = %consumed.item.name, restored, "healing item used");

        Some(HealReport { item: consumed.item, restored })
    }

    /// Repair invariants on a session read back from storage: nothing can be
    /// streaming, and health stays within bounds.
    pub fn settle_after_restore(&mut self) {
        self.is_narrator_typing = false;
        self.player_health = self.player_health.min(self.player_max_health);
        if let Some(combat) = self.combat.as_mut() {
            combat.enemy_current_health = combat.enemy_current_health.min(combat.enemy_max_health);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::find_scenario;

    fn castle_session() -> Session {
        Session::start("דנה", find_scenario("castle").unwrap(), DEFAULT_MAX_HEALTH)
    }

    #[test]
    fn history_skips_intro_and_placeholder() {
        let mut session = castle_session();
        let pending = session.begin_turn("אני נכנס לטירה");
        assert_eq!(pending.request.history.len(), 1);
        assert_eq!(pending.request.history[0].speaker, Speaker::Player);
        assert_eq!(pending.request.scenario_context, "טירה קסומה המרחפת מעל העננים");
        assert_eq!(session.messages.len(), 3);
        assert!(session.is_narrator_typing);
    }

    #[test]
    fn chunks_append_in_order() {
        let mut session = castle_session();
        let pending = session.begin_turn("הבט סביב");
        assert!(session.append_chunk(&pending.message_id, "אתה "));
        assert!(session.append_chunk(&pending.message_id, "רואה"));
        assert_eq!(session.message(&pending.message_id).unwrap().content, "אתה רואה");
        assert!(!session.append_chunk("msg-missing", "x"));
    }

    #[test]
    fn second_combat_marker_is_ignored_while_fighting() {
        let mut session = castle_session();
        let first = session.begin_turn("תקוף");
        session.finish_narration(&first.message_id, "[COMBAT: זומבי:🧟:20]");
        let second = session.begin_turn("המשך");
        let outcome = session.finish_narration(&second.message_id, "[COMBAT: דרקון:🐉:50]");
        assert!(!outcome.combat_started);
        assert_eq!(session.combat.as_ref().unwrap().enemy_name, "זומבי");
    }

    #[test]
    fn heal_is_capped_and_logged_in_combat() {
        let mut session = castle_session();
        let pending = session.begin_turn("חפש");
        session.finish_narration(
            &pending.message_id,
            "[קיבלת: 🧪 שיקוי_ריפוי] [COMBAT: זומבי:🧟:20]",
        );
        session.player_health = 85;
        let id = session.inventory[0].id.clone();
        let report = session.consume_healing_item(&id).unwrap();
        assert_eq!(report.restored, 15);
        assert_eq!(session.player_health, 100);
        assert!(session.inventory.is_empty());
        let log = &session.combat.as_ref().unwrap().log;
        assert_eq!(log.last().unwrap(), "✨ השתמשת ב🧪 שיקוי ריפוי! החזרת 15 נקודות בריאות!");
    }

    #[test]
    fn a_dead_player_gets_no_new_fight_or_healing() {
        let mut session = castle_session();
        let pending = session.begin_turn("חפש");
        session.finish_narration(&pending.message_id, "[קיבלת: 💊 תרופה]");
        session.player_health = 0;
        assert!(session.is_game_over());

        let after = session.begin_turn("השחקן הובס בקרב נגד זומבי ומת. המשחק הסתיים.");
        let outcome = session.finish_narration(&after.message_id, "החושך יורד. [COMBAT: שד:👹:15]");
        assert!(!outcome.combat_started);
        assert!(session.combat.is_none());
        assert_eq!(session.message(&after.message_id).unwrap().content, "החושך יורד.");

        let id = session.inventory[0].id.clone();
        assert!(session.consume_healing_item(&id).is_none());
        assert_eq!(session.inventory.len(), 1);
        assert_eq!(session.player_health, 0);
    }
}
