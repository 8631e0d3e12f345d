//! Turn-based combat mini-game started by a combat marker.

pub mod actions;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use actions::{enemy_turn, resolve, summary};

/// Damage dealt by the player's attack for a given d20.
pub const CRITICAL_DAMAGE: u32 = 15;
pub const HEAVY_DAMAGE: u32 = 10;
pub const LIGHT_DAMAGE: u32 = 5;
/// Damage the enemy takes when its attack is blocked.
pub const COUNTER_DAMAGE: u32 = 5;
/// Damage the player takes when caught fleeing.
pub const FLEE_PENALTY: u32 = 10;
/// Percent chance that fleeing works.
pub const FLEE_CHANCE: u32 = 70;
pub const ENEMY_MIN_DAMAGE: u32 = 8;
pub const ENEMY_MAX_DAMAGE: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatAction {
    Attack,
    Defend,
    Flee,
}

impl FromStr for CombatAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attack" => Ok(Self::Attack),
            "defend" => Ok(Self::Defend),
            "flee" => Ok(Self::Flee),
            other => Err(format!("unknown combat action '{other}'")),
        }
    }
}

impl fmt::Display for CombatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Attack => "attack",
            Self::Defend => "defend",
            Self::Flee => "flee",
        };
        f.write_str(s)
    }
}

/// How a fight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    EnemyDefeated,
    PlayerDefeated,
    Fled,
}

/// The player's attack, resolved from a single d20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub roll: u32,
    pub damage: u32,
    pub is_critical: bool,
    pub is_hit: bool,
}

/// Damage tiers: 20 crits, 16-19 heavy, 11-15 light, 10 and below misses.
pub fn damage_for_roll(roll: u32) -> AttackRoll {
    let (damage, is_critical) = match roll {
        20.. => (CRITICAL_DAMAGE, true),
        16..=19 => (HEAVY_DAMAGE, false),
        11..=15 => (LIGHT_DAMAGE, false),
        _ => (0, false),
    };
    AttackRoll { roll, damage, is_critical, is_hit: damage > 0 }
}

/// A fight in progress. Its absence from the session means no fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combat {
    pub active: bool,
    pub enemy_name: String,
    pub enemy_emoji: String,
    pub enemy_max_health: u32,
    pub enemy_current_health: u32,
    /// Set by defend; consumed by the next enemy attack.
    pub player_defending: bool,
    pub turn: u32,
    pub log: Vec<String>,
}

impl Combat {
    pub fn start(enemy_name: &str, enemy_emoji: &str, enemy_health: u32) -> Self {
        Self {
            active: true,
            enemy_name: enemy_name.to_string(),
            enemy_emoji: enemy_emoji.to_string(),
            enemy_max_health: enemy_health,
            enemy_current_health: enemy_health,
            player_defending: false,
            turn: 1,
            log: vec![format!("⚔️ קרב התחיל! {enemy_emoji} {enemy_name} מופיע!")],
        }
    }

    /// The last `count` log lines, oldest first.
    pub fn recent_log(&self, count: usize) -> &[String] {
        let start = self.log.len().saturating_sub(count);
        &self.log[start..]
    }

    pub fn enemy_label(&self) -> String {
        format!("{} {}", self.enemy_emoji, self.enemy_name)
    }
}

/// What a single combat action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub action: CombatAction,
    /// Log lines produced by this action, in order.
    pub events: Vec<String>,
    pub outcome: Option<CombatOutcome>,
    /// Text fed back to the narrator when the fight is over.
    pub summary: Option<String>,
}

impl CombatReport {
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}
