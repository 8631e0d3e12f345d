use tracing::debug;

use super::{
    COUNTER_DAMAGE, Combat, CombatAction, CombatOutcome, CombatReport, ENEMY_MAX_DAMAGE,
    ENEMY_MIN_DAMAGE, FLEE_CHANCE, FLEE_PENALTY, damage_for_roll,
};
use crate::Dice;
use crate::life::{apply_damage, is_down};

/// Resolve one player action, including the enemy's reply when it gets one.
/// Every produced line is appended to the combat log and returned in the
/// report. On a terminal outcome the caller is expected to drop `combat`.
pub fn resolve(
    combat: &mut Combat,
    player_health: &mut u32,
    action: CombatAction,
    dice: &mut Dice,
) -> CombatReport {
    let mut events = Vec::new();
    let log = |line: String| events.push(line);
    let outcome = match action {
        CombatAction::Attack => attack(combat, player_health, dice, log),
        CombatAction::Defend => defend(combat, log),
        CombatAction::Flee => flee(combat, player_health, dice, log),
    };
    combat.log.extend(events.iter().cloned());

    debug!(
        %action,
        turn = combat.turn,
        enemy_hp = combat.enemy_current_health,
        player_hp = *player_health,
        ?outcome,
        "combat action resolved"
    );

    CombatReport {
        action,
        events,
        outcome,
        summary: outcome.map(|o| summary(o, &combat.enemy_name, *player_health)),
    }
}

fn attack(
    combat: &mut Combat,
    player_health: &mut u32,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> Option<CombatOutcome> {
    let hit = damage_for_roll(dice.d20());
    combat.enemy_current_health = apply_damage(combat.enemy_current_health, hit.damage);
    log(if hit.is_critical {
        format!("🎯 מכה קריטית! גלגלת {} וגרמת {} נזק!", hit.roll, hit.damage)
    } else if hit.is_hit {
        format!("⚔️ פגעת! גלגלת {} וגרמת {} נזק.", hit.roll, hit.damage)
    } else {
        format!("❌ החטאת! גלגלת {}.", hit.roll)
    });

    if is_down(combat.enemy_current_health) {
        log(victory_line(combat));
        return Some(CombatOutcome::EnemyDefeated);
    }

    let outcome = enemy_turn(combat, player_health, dice, &mut log);
    end_turn(combat);
    outcome
}

fn defend(combat: &mut Combat, mut log: impl FnMut(String)) -> Option<CombatOutcome> {
    combat.player_defending = true;
    log("🛡️ אתה מתגונן! תחסום את המתקפה הבאה ותבצע נגד-מתקפה.".to_string());
    None
}

fn flee(
    combat: &mut Combat,
    player_health: &mut u32,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> Option<CombatOutcome> {
    if dice.percentile() <= FLEE_CHANCE {
        log("🏃 ברחת בהצלחה מהקרב!".to_string());
        return Some(CombatOutcome::Fled);
    }

    *player_health = apply_damage(*player_health, FLEE_PENALTY);
    log(format!("😰 ניסית לברוח אך האויב תפס אותך! ספגת {FLEE_PENALTY} נזק!"));
    if is_down(*player_health) {
        log(defeat_line());
        return Some(CombatOutcome::PlayerDefeated);
    }

    let outcome = enemy_turn(combat, player_health, dice, &mut log);
    end_turn(combat);
    outcome
}

/// The enemy's attack. A defending player blocks it entirely and counters;
/// the counter can finish the enemy off.
pub fn enemy_turn(
    combat: &mut Combat,
    player_health: &mut u32,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> Option<CombatOutcome> {
    if combat.player_defending {
        combat.player_defending = false;
        combat.enemy_current_health = apply_damage(combat.enemy_current_health, COUNTER_DAMAGE);
        log(format!(
            "🛡️ חסמת את המתקפה וביצעת נגד-מתקפה! גרמת {COUNTER_DAMAGE} נזק!"
        ));
        if is_down(combat.enemy_current_health) {
            log(victory_line(combat));
            return Some(CombatOutcome::EnemyDefeated);
        }
        return None;
    }

    let damage = dice.roll(ENEMY_MIN_DAMAGE, ENEMY_MAX_DAMAGE);
    *player_health = apply_damage(*player_health, damage);
    log(format!(
        "💥 {} תקף אותך! ספגת {damage} נזק!",
        combat.enemy_label()
    ));
    if is_down(*player_health) {
        log(defeat_line());
        return Some(CombatOutcome::PlayerDefeated);
    }
    None
}

fn end_turn(combat: &mut Combat) {
    combat.player_defending = false;
    combat.turn += 1;
}

fn victory_line(combat: &Combat) -> String {
    format!("🎉 ניצחת! {} הובס!", combat.enemy_label())
}

fn defeat_line() -> String {
    "💀 הפסדת בקרב! המשחק הסתיים.".to_string()
}

/// The text handed back to the narrator once a fight is over.
pub fn summary(outcome: CombatOutcome, enemy_name: &str, player_health: u32) -> String {
    match outcome {
        CombatOutcome::Fled => {
            format!("השחקן ברח מהקרב עם {enemy_name}. נותרו לו {player_health} נקודות בריאות.")
        }
        CombatOutcome::EnemyDefeated => {
            format!("השחקן ניצח בקרב נגד {enemy_name}! נותרו לו {player_health} נקודות בריאות.")
        }
        CombatOutcome::PlayerDefeated => {
            format!("השחקן הובס בקרב נגד {enemy_name} ומת. המשחק הסתיים.")
        }
    }
}
