use std::time::Duration;

use engine::combat::Combat;
use engine::content::find_scenario;
use engine::narration::{Script, ScriptedNarrator};
use engine::persistence::*;
use engine::{EngineConfig, GameEngine, Session};

fn played_session() -> Session {
    let mut session = Session::start("אורי", find_scenario("zombies").unwrap(), 100);
    let turn = session.begin_turn("אני מחפש אוכל");
    session.finish_narration(&turn.message_id, "מצאת משהו. [קיבלת: 🍞 לחם_יבש] [COMBAT: זומבי:🧟:30]");
    session.player_health = 64;
    session
}

#[test]
fn file_store_round_trips_the_whole_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let session = played_session();

    persist(&store, &session).unwrap();
    assert!(dir.path().join(format!("{SAVE_KEY}.json")).exists());

    let restored = restore(&store).unwrap().expect("a saved session");
    assert_eq!(restored, session);
    assert_eq!(restored.inventory[0].acquired_at, session.inventory[0].acquired_at);
    assert_eq!(restored.messages[0].timestamp, session.messages[0].timestamp);
    assert_eq!(restored.combat.as_ref().map(|c| c.enemy_current_health), Some(30));
}

#[test]
fn inventory_without_a_fight_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let mut session = Session::start("אורי", find_scenario("castle").unwrap(), 100);
    let turn = session.begin_turn("אני פותח את הארון");
    session.finish_narration(&turn.message_id, "[קיבלת: 🧪 שיקוי_ריפוי] [קיבלת: 🔦 פנס]");
    assert!(session.combat.is_none());

    persist(&store, &session).unwrap();
    let restored = restore(&store).unwrap().expect("a saved session");
    assert_eq!(restored, session);
    assert!(restored.combat.is_none());
    assert_eq!(restored.inventory.len(), 2);
    assert!(restored.inventory[0].is_healing);
    assert_eq!(restored.inventory[0].heal_amount, Some(30));
    assert_eq!(restored.inventory[1].heal_amount, None);
    assert_eq!(restored.inventory[1].acquired_at, session.inventory[1].acquired_at);
}

#[test]
fn saved_json_uses_camel_case_and_saved_at() {
    let store = MemoryStore::new();
    persist(&store, &played_session()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&store.get(SAVE_KEY).unwrap().unwrap()).unwrap();
    for key in ["playerName", "selectedScenario", "turnCount", "playerHealth", "playerMaxHealth", "savedAt"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["combat"]["enemyCurrentHealth"], 30);
}

#[test]
fn restore_clears_the_typing_flag() {
    let store = MemoryStore::new();
    let mut session = played_session();
    session.begin_turn("עוד צעד");
    assert!(session.is_narrator_typing);
    persist(&store, &session).unwrap();

    let restored = restore(&store).unwrap().unwrap();
    assert!(!restored.is_narrator_typing);
}

#[test]
fn restore_clamps_out_of_range_health() {
    let store = MemoryStore::new();
    let mut session = played_session();
    session.player_health = 250;
    let mut combat = Combat::start("צל", "👤", 10);
    combat.enemy_current_health = 40;
    session.combat = Some(combat);
    persist(&store, &session).unwrap();

    let restored = restore(&store).unwrap().unwrap();
    assert_eq!(restored.player_health, 100);
    assert_eq!(restored.combat.unwrap().enemy_current_health, 10);
}

#[test]
fn save_info_reads_the_header() {
    let store = MemoryStore::new();
    assert!(save_info(&store).is_none());
    persist(&store, &played_session()).unwrap();

    let info = save_info(&store).unwrap();
    assert_eq!(info.player_name, "אורי");
    assert_eq!(info.scenario, "ירושלים בזומבים");
    assert_eq!(info.turn_count, 1);

    delete_save(&store).unwrap();
    assert!(!has_saved_game(&store));
}

#[test]
fn engine_resumes_from_a_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::default().with_seed(1).with_followup_delay(Duration::ZERO);

    let mut first = GameEngine::new(
        config.clone(),
        ScriptedNarrator::new([Script::reply("הרחוב ריק.")]),
        FileStore::new(dir.path()),
    );
    first.start_game("אורי", find_scenario("space").unwrap());
    first.submit_player_text("אני יוצא מהתא").unwrap();
    first.run_until_idle();
    let expected = first.session().clone();

    let mut second = GameEngine::new(config, ScriptedNarrator::default(), FileStore::new(dir.path()));
    assert!(second.has_saved_game());
    assert!(second.load());
    assert_eq!(second.session(), &expected);
}
