mod config;
mod narrator;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use engine::combat::CombatAction;
use engine::content::{builtin_scenarios, load_scenarios};
use engine::narration::ScriptedNarrator;
use engine::persistence::{self, FileStore};
use engine::{markers, EngineConfig, GameEngine, Role, Scenario};
use indexmap::IndexMap;
use tracing::Level;

use crate::config::AppConfig;
use crate::narrator::OpenAiNarrator;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const OFFLINE_REPLY: &str = "הרוח נושבת והעולם ממתין לצעד הבא שלך. (מצב לא מקוון)\n\nמה תרצה לעשות?";

#[derive(Subcommand)]
enum Cmd {
    /// List the available scenarios
    Scenarios,
    /// Start a new game
    Play {
        /// Player name
        #[arg(long)]
        name: String,
        /// Scenario id (see `scenarios`)
        #[arg(long, default_value = "castle")]
        scenario: String,
        /// Use the built-in offline narrator instead of the API
        #[arg(long, default_value_t = false)]
        offline: bool,
        /// RNG seed for determinism
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Resume the saved game
    Continue {
        #[arg(long, default_value_t = false)]
        offline: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show what is in the save slot
    SaveInfo,
    /// Delete the saved game
    DeleteSave,
    /// Parse narrator text and print the extracted markers as JSON
    Parse {
        text: String,
        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

#[derive(Parser)]
#[command(name = "adventure")]
#[command(about = "Narrated text adventure in the terminal")]
struct Cli {
    /// Config file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the save slot
    #[arg(long, global = true)]
    save_dir: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app = config::load(cli.config.as_deref())?;
    let save_dir = cli
        .save_dir
        .clone()
        .or_else(|| app.save_dir.clone())
        .unwrap_or_else(config::default_save_dir);
    let store = FileStore::new(save_dir);

    match cli.cmd {
        Cmd::Scenarios => {
            for scenario in scenarios(&app)?.values() {
                println!("{:<10} {} {}", scenario.id, scenario.emoji, scenario.name);
            }
        }
        Cmd::Play { name, scenario, offline, seed } => {
            let catalog = scenarios(&app)?;
            let Some(scenario) = catalog.get(&scenario) else {
                bail!("unknown scenario '{scenario}'");
            };
            let name = name.trim();
            if name.is_empty() {
                bail!("player name must not be empty");
            }
            let mut engine = build_engine(&app, seed, offline, store)?;
            engine.start_game(name, scenario);
            play(&mut engine, &mut io::stdin().lock(), &mut io::stdout())?;
        }
        Cmd::Continue { offline, seed } => {
            let mut engine = build_engine(&app, seed, offline, store)?;
            if !engine.load() {
                bail!("no saved game to continue");
            }
            play(&mut engine, &mut io::stdin().lock(), &mut io::stdout())?;
        }
        Cmd::SaveInfo => match persistence::save_info(&store) {
            Some(info) => {
                println!("player:   {}", info.player_name);
                println!("scenario: {}", info.scenario);
                println!("turns:    {}", info.turn_count);
                println!("saved at: {}", info.saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            None => println!("no saved game"),
        },
        Cmd::DeleteSave => {
            persistence::delete_save(&store).context("failed to delete the save")?;
            println!("save deleted");
        }
        Cmd::Parse { text, pretty } => {
            let parsed = markers::parse_narration(&text);
            if pretty {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                println!("{}", serde_json::to_string(&parsed)?);
            }
        }
    }
    Ok(())
}

fn scenarios(app: &AppConfig) -> anyhow::Result<IndexMap<String, Scenario>> {
    match &app.scenarios {
        Some(path) => load_scenarios(path),
        None => Ok(builtin_scenarios().clone()),
    }
}

fn build_engine(
    app: &AppConfig,
    seed: Option<u64>,
    offline: bool,
    store: FileStore,
) -> anyhow::Result<GameEngine> {
    let mut config: EngineConfig = app.engine.clone();
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if offline {
        let narrator = ScriptedNarrator::default().with_fallback(OFFLINE_REPLY);
        return Ok(GameEngine::new(config, narrator, store));
    }
    let narrator = OpenAiNarrator::from_env().map_err(|e| anyhow::anyhow!(e.localized()))?;
    Ok(GameEngine::new(config, narrator, store))
}

fn play(engine: &mut GameEngine, input: &mut impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
    let session = engine.session();
    for message in &session.messages {
        print_message(out, message.role, &message.content)?;
    }
    writeln!(out, "(/help לרשימת פקודות)")?;

    let mut line = String::new();
    loop {
        if engine.session().is_game_over() {
            writeln!(out, "💀 המשחק הסתיים. /new להתחלה מחדש או /quit ליציאה.")?;
        }
        write!(out, "{}> ", prompt_tag(engine))?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let (command, arg) = match text.strip_prefix('/') {
            Some(rest) => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                (parts.next().unwrap_or(""), parts.next().unwrap_or("").trim())
            }
            None => {
                let before = snapshot(engine);
                match engine.submit_player_text(text) {
                    Ok(()) => {
                        stream_until_idle(engine, out)?;
                        print_changes(engine, &before, out)?;
                    }
                    Err(e) => writeln!(out, "⚠️ {e}")?,
                }
                continue;
            }
        };

        match command {
            "quit" | "q" => break,
            "exit" => {
                engine.save_and_exit();
                writeln!(out, "💾 המשחק נשמר. להתראות!")?;
                break;
            }
            "save" => {
                if engine.save() {
                    writeln!(out, "💾 המשחק נשמר.")?;
                } else {
                    writeln!(out, "⚠️ השמירה נכשלה.")?;
                }
            }
            "new" => {
                let session = engine.session().clone();
                let Some(scenario) = session.selected_scenario else {
                    writeln!(out, "⚠️ אין תרחיש פעיל.")?;
                    continue;
                };
                engine.start_game(&session.player_name, &scenario);
                print_message(out, Role::Narrator, &scenario.intro)?;
            }
            "inventory" | "inv" => print_inventory(engine, out)?,
            "status" => print_status(engine, out)?,
            "use" => {
                let item = arg
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| engine.session().inventory.get(i))
                    .map(|item| item.id.clone());
                let Some(item_id) = item else {
                    writeln!(out, "⚠️ מספר פריט לא תקין.")?;
                    continue;
                };
                match engine.consume_healing_item(&item_id) {
                    Some(report) => writeln!(
                        out,
                        "✨ השתמשת ב{} {}! החזרת {} נקודות בריאות!",
                        report.item.emoji, report.item.name, report.restored
                    )?,
                    None => writeln!(out, "⚠️ אי אפשר להשתמש בפריט הזה.")?,
                }
            }
            "attack" | "defend" | "flee" => {
                let action: CombatAction = command.parse().map_err(anyhow::Error::msg)?;
                match engine.submit_combat_action(action) {
                    Ok(report) => {
                        for event in &report.events {
                            writeln!(out, "  {event}")?;
                        }
                        if report.is_over() {
                            let before = snapshot(engine);
                            stream_until_idle(engine, out)?;
                            print_changes(engine, &before, out)?;
                        } else {
                            print_combat(engine, out)?;
                        }
                    }
                    Err(e) => writeln!(out, "⚠️ {e}")?,
                }
            }
            "help" | "h" => print_help(out)?,
            other => writeln!(out, "⚠️ פקודה לא מוכרת: /{other}")?,
        }
    }
    Ok(())
}

fn prompt_tag(engine: &GameEngine) -> String {
    let session = engine.session();
    match &session.combat {
        Some(combat) => format!(
            "⚔️ {} {}/{} | ❤️ {}/{}",
            combat.enemy_label(),
            combat.enemy_current_health,
            combat.enemy_max_health,
            session.player_health,
            session.player_max_health
        ),
        None => format!("❤️ {}/{}", session.player_health, session.player_max_health),
    }
}

fn print_message(out: &mut impl Write, role: Role, content: &str) -> io::Result<()> {
    match role {
        Role::Narrator => writeln!(out, "\n📜 {content}"),
        Role::Player => writeln!(out, "\n🧑 {content}"),
    }
}

struct Snapshot {
    inventory_len: usize,
    in_combat: bool,
}

fn snapshot(engine: &GameEngine) -> Snapshot {
    Snapshot {
        inventory_len: engine.session().inventory.len(),
        in_combat: engine.session().combat.is_some(),
    }
}

/// Print messages as they stream in until the engine has nothing left to do.
/// Streamed text shows raw; once a message settles, its display form is
/// printed again if it differs.
fn stream_until_idle(engine: &mut GameEngine, out: &mut impl Write) -> io::Result<()> {
    let mut seen = engine.session().messages.len();
    // The placeholder of the in-flight turn is already in the session.
    if engine.is_narrating() {
        seen = seen.saturating_sub(1);
    }
    let mut shown = String::new();

    loop {
        let busy = engine.pump();
        let messages = &engine.session().messages;

        while seen < messages.len() {
            let message = &messages[seen];
            let settled = seen + 1 < messages.len() || !engine.is_narrating();
            if message.role == Role::Player {
                print_message(out, Role::Player, &message.content)?;
                seen += 1;
                continue;
            }
            if shown.is_empty() {
                write!(out, "\n📜 ")?;
            }
            if let Some(rest) = message.content.strip_prefix(shown.as_str()) {
                write!(out, "{rest}")?;
                shown.push_str(rest);
            }
            out.flush()?;
            if !settled {
                break;
            }
            if message.content != shown {
                write!(out, "\n📜 {}", message.content)?;
            }
            writeln!(out)?;
            shown.clear();
            seen += 1;
        }

        if !busy {
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn print_changes(engine: &GameEngine, before: &Snapshot, out: &mut impl Write) -> io::Result<()> {
    let session = engine.session();
    for item in session.inventory.iter().skip(before.inventory_len) {
        writeln!(out, "🎒 נוסף לתיק: {} {}", item.emoji, item.name)?;
    }
    if !before.in_combat && session.combat.is_some() {
        print_combat(engine, out)?;
        writeln!(out, "  /attack  /defend  /flee  /use <n>")?;
    }
    Ok(())
}

fn print_combat(engine: &GameEngine, out: &mut impl Write) -> io::Result<()> {
    let Some(combat) = &engine.session().combat else {
        return Ok(());
    };
    writeln!(
        out,
        "⚔️ {} ❤️ {}/{} | תור {}{}",
        combat.enemy_label(),
        combat.enemy_current_health,
        combat.enemy_max_health,
        combat.turn,
        if combat.player_defending { " | 🛡️" } else { "" }
    )?;
    for line in combat.recent_log(engine.config().combat_log_window) {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

fn print_inventory(engine: &GameEngine, out: &mut impl Write) -> io::Result<()> {
    let inventory = &engine.session().inventory;
    if inventory.is_empty() {
        return writeln!(out, "🎒 התיק ריק.");
    }
    for (i, item) in inventory.iter().enumerate() {
        let heal = item.heal_amount.map(|hp| format!(" (+{hp})")).unwrap_or_default();
        writeln!(out, "{:>2}. {} {}{heal}", i + 1, item.emoji, item.name)?;
        writeln!(out, "    {}", item.description)?;
    }
    Ok(())
}

fn print_status(engine: &GameEngine, out: &mut impl Write) -> io::Result<()> {
    let session = engine.session();
    let scenario = session
        .selected_scenario
        .as_ref()
        .map(|s| format!("{} {}", s.emoji, s.name))
        .unwrap_or_default();
    writeln!(out, "🧑 {} | {scenario}", session.player_name)?;
    writeln!(out, "❤️ {}/{}", session.player_health, session.player_max_health)?;
    writeln!(out, "🔁 תור {} | 🎒 {} פריטים", session.turn_count, session.inventory.len())?;
    print_combat(engine, out)
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "/attack /defend /flee   פעולות קרב")?;
    writeln!(out, "/use <n>                שימוש בפריט מרפא")?;
    writeln!(out, "/inventory /status      תיק ומצב")?;
    writeln!(out, "/save /exit             שמירה, שמירה ויציאה")?;
    writeln!(out, "/new /quit              משחק חדש, יציאה")
}
