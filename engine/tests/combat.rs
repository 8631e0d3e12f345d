use engine::Dice;
use engine::combat::*;
use engine::life::apply_damage;
use proptest::prelude::*;

fn zombie(health: u32) -> Combat {
    Combat::start("זומבי", "🧟", health)
}

#[test]
fn critical_finishes_a_weak_enemy_without_reply() {
    let mut combat = zombie(15);
    let mut hp = 100;
    let report = resolve(&mut combat, &mut hp, CombatAction::Attack, &mut Dice::from_scripted(vec![20]));

    assert_eq!(report.outcome, Some(CombatOutcome::EnemyDefeated));
    assert_eq!(hp, 100);
    assert_eq!(combat.enemy_current_health, 0);
    assert_eq!(
        report.events,
        vec!["🎯 מכה קריטית! גלגלת 20 וגרמת 15 נזק!", "🎉 ניצחת! 🧟 זומבי הובס!"]
    );
    assert_eq!(
        report.summary.as_deref(),
        Some("השחקן ניצח בקרב נגד זומבי! נותרו לו 100 נקודות בריאות.")
    );
}

#[test]
fn a_miss_lets_the_enemy_strike() {
    let mut combat = zombie(20);
    let mut hp = 100;
    let report = resolve(&mut combat, &mut hp, CombatAction::Attack, &mut Dice::from_scripted(vec![7, 11]));

    assert!(report.outcome.is_none());
    assert_eq!(hp, 89);
    assert_eq!(combat.enemy_current_health, 20);
    assert_eq!(combat.turn, 2);
    assert_eq!(report.events[0], "❌ החטאת! גלגלת 7.");
    assert_eq!(report.events[1], "💥 🧟 זומבי תקף אותך! ספגת 11 נזק!");
}

#[test]
fn defend_blocks_and_counters_on_the_next_exchange() {
    let mut combat = zombie(20);
    let mut hp = 100;
    let mut dice = Dice::from_scripted(vec![5]);

    let report = resolve(&mut combat, &mut hp, CombatAction::Defend, &mut dice);
    assert!(report.outcome.is_none());
    assert!(combat.player_defending);
    assert_eq!(combat.turn, 1);

    resolve(&mut combat, &mut hp, CombatAction::Attack, &mut dice);
    assert_eq!(hp, 100);
    assert_eq!(combat.enemy_current_health, 15);
    assert!(!combat.player_defending);
    assert_eq!(combat.turn, 2);
}

#[test]
fn defending_twice_stays_defending() {
    let mut combat = zombie(20);
    let mut hp = 100;
    let mut dice = Dice::from_seed(1);
    resolve(&mut combat, &mut hp, CombatAction::Defend, &mut dice);
    resolve(&mut combat, &mut hp, CombatAction::Defend, &mut dice);
    assert!(combat.player_defending);
    assert_eq!(combat.log.len(), 3);
}

#[test]
fn counter_can_win_the_fight() {
    let mut combat = zombie(5);
    combat.player_defending = true;
    let mut hp = 100;
    let outcome = enemy_turn(&mut combat, &mut hp, &mut Dice::from_seed(3), |_| {});
    assert_eq!(outcome, Some(CombatOutcome::EnemyDefeated));
    assert_eq!(hp, 100);
}

#[test]
fn failed_flee_costs_health_and_an_enemy_turn() {
    let mut combat = zombie(20);
    let mut hp = 100;
    let report = resolve(&mut combat, &mut hp, CombatAction::Flee, &mut Dice::from_scripted(vec![100, 8]));
    assert!(report.outcome.is_none());
    assert_eq!(hp, 82);
    assert_eq!(report.events[0], "😰 ניסית לברוח אך האויב תפס אותך! ספגת 10 נזק!");
}

#[test]
fn failed_flee_can_be_fatal() {
    let mut combat = zombie(20);
    let mut hp = 6;
    let report = resolve(&mut combat, &mut hp, CombatAction::Flee, &mut Dice::from_scripted(vec![95]));
    assert_eq!(report.outcome, Some(CombatOutcome::PlayerDefeated));
    assert_eq!(hp, 0);
    assert_eq!(report.summary.as_deref(), Some("השחקן הובס בקרב נגד זומבי ומת. המשחק הסתיים."));
}

#[test]
fn flee_succeeds_about_seventy_percent_of_the_time() {
    let mut dice = Dice::from_seed(2024);
    let trials = 10_000;
    let fled = (0..trials)
        .filter(|_| {
            let mut combat = zombie(1000);
            let mut hp = 100;
            resolve(&mut combat, &mut hp, CombatAction::Flee, &mut dice).outcome
                == Some(CombatOutcome::Fled)
        })
        .count();
    let rate = fled as f64 / trials as f64;
    assert!((0.67..=0.73).contains(&rate), "flee rate {rate}");
}

proptest! {
    #[test]
    fn health_never_underflows(current in 0u32..200, damage in 0u32..500) {
        let left = apply_damage(current, damage);
        prop_assert!(left <= current);
        prop_assert_eq!(left, current.saturating_sub(damage));
    }

    #[test]
    fn every_roll_lands_in_a_tier(roll in 1u32..=20) {
        let hit = damage_for_roll(roll);
        prop_assert!([0, LIGHT_DAMAGE, HEAVY_DAMAGE, CRITICAL_DAMAGE].contains(&hit.damage));
        prop_assert_eq!(hit.is_critical, roll == 20);
        prop_assert_eq!(hit.is_hit, roll > 10);
    }

    #[test]
    fn seeded_fights_keep_health_in_bounds(seed in any::<u64>(), enemy in 1u32..60) {
        let mut dice = Dice::from_seed(seed);
        let mut combat = zombie(enemy);
        let mut hp = 100;
        for _ in 0..50 {
            let report = resolve(&mut combat, &mut hp, CombatAction::Attack, &mut dice);
            prop_assert!(hp <= 100);
            prop_assert!(combat.enemy_current_health <= enemy);
            if report.is_over() {
                break;
            }
        }
    }
}
