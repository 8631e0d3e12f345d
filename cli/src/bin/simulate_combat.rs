use clap::{Parser, ValueEnum};
use engine::combat::{resolve, Combat, CombatAction, CombatOutcome};
use engine::Dice;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Strategy {
    /// Attack every turn
    Attack,
    /// Defend, then attack into the blocked swing
    DefendAttack,
    /// Attack until health drops below a third, then try to flee
    Cautious,
}

#[derive(Parser)]
#[command(name = "simulate-combat")]
#[command(about = "Monte Carlo sim: many fights against a marker-spawned enemy")]
struct Args {
    /// Enemy starting health, as a combat marker would give it
    #[arg(long, default_value_t = 30)]
    enemy_health: u32,

    /// Player starting health
    #[arg(long, default_value_t = 100)]
    player_health: u32,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Safety cap on actions per trial
    #[arg(long, default_value_t = 100)]
    max_actions: u32,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = Strategy::Attack)]
    strategy: Strategy,
}

fn choose(strategy: Strategy, combat: &Combat, hp: u32, max_hp: u32) -> CombatAction {
    match strategy {
        Strategy::Attack => CombatAction::Attack,
        Strategy::DefendAttack if combat.player_defending => CombatAction::Attack,
        Strategy::DefendAttack => CombatAction::Defend,
        Strategy::Cautious if u64::from(hp) * 3 < u64::from(max_hp) => CombatAction::Flee,
        Strategy::Cautious => CombatAction::Attack,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.enemy_health == 0 {
        anyhow::bail!("--enemy-health must be positive");
    }

    let mut wins = 0u32;
    let mut defeats = 0u32;
    let mut fled = 0u32;
    let mut undecided = 0u32;
    let mut turns_total = 0u64;
    let mut hp_left_on_wins = 0u64;

    for i in 0..args.trials {
        let mut dice = Dice::from_seed(args.seed.wrapping_add(i as u64));
        let mut combat = Combat::start("יריב", "👾", args.enemy_health);
        let mut hp = args.player_health;
        let mut outcome = None;

        for _ in 0..args.max_actions {
            let action = choose(args.strategy, &combat, hp, args.player_health);
            outcome = resolve(&mut combat, &mut hp, action, &mut dice).outcome;
            if outcome.is_some() {
                break;
            }
        }

        turns_total += combat.turn as u64;
        match outcome {
            Some(CombatOutcome::EnemyDefeated) => {
                wins += 1;
                hp_left_on_wins += hp as u64;
            }
            Some(CombatOutcome::PlayerDefeated) => defeats += 1,
            Some(CombatOutcome::Fled) => fled += 1,
            None => undecided += 1,
        }
    }

    let trials_f = args.trials.max(1) as f64;
    let rate = |n: u32| n as f64 / trials_f * 100.0;
    let avg_hp_on_wins = if wins == 0 {
        0.0
    } else {
        hp_left_on_wins as f64 / wins as f64
    };

    println!("simulate-combat results");
    println!("-----------------------");
    println!("trials:             {}", args.trials);
    println!("enemy health:       {}", args.enemy_health);
    println!("player health:      {}", args.player_health);
    println!("strategy:           {:?}", args.strategy);
    println!();
    println!("win rate:           {:.1}%", rate(wins));
    println!("defeat rate:        {:.1}%", rate(defeats));
    println!("flee rate:          {:.1}%", rate(fled));
    println!("undecided:          {}", undecided);
    println!("avg turns:          {:.2}", turns_total as f64 / trials_f);
    println!("avg hp left (wins): {:.2}", avg_hp_on_wins);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cautious_flees_below_a_third_without_overflow() {
        let combat = Combat::start("זומבי", "🧟", 20);
        assert_eq!(choose(Strategy::Cautious, &combat, 34, 100), CombatAction::Attack);
        assert_eq!(choose(Strategy::Cautious, &combat, 33, 100), CombatAction::Flee);
        assert_eq!(choose(Strategy::Cautious, &combat, u32::MAX, u32::MAX), CombatAction::Attack);
        assert_eq!(choose(Strategy::Cautious, &combat, u32::MAX / 2, u32::MAX), CombatAction::Attack);
        assert_eq!(choose(Strategy::Cautious, &combat, u32::MAX / 4, u32::MAX), CombatAction::Flee);
    }
}
