#![allow(deprecated)] // Command::cargo_bin

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A temp dir with an empty config file, so tests never read the user's.
fn sandbox() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.yaml"), "seed: 11\nfollowup_delay_ms: 0\n").unwrap();
    dir
}

fn adventure(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("adventure").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("config.yaml"))
        .arg("--save-dir")
        .arg(dir.path().join("saves"))
        .env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn scenarios_lists_the_catalog_in_order() {
    let dir = sandbox();
    adventure(&dir)
        .arg("scenarios")
        .assert()
        .success()
        .stdout(predicate::str::contains("castle").and(predicate::str::contains("המבצר המכושף")))
        .stdout(predicate::str::contains("zombies"));
}

#[test]
fn parse_prints_markers_as_json() {
    let dir = sandbox();
    adventure(&dir)
        .args(["parse", "מצאת אוצר. [קיבלת: 🗝️ מפתח_זהב] [COMBAT: זומבי:🧟:20]"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name":"מפתח זהב""#))
        .stdout(predicate::str::contains(r#""enemyHealth":20"#))
        .stdout(predicate::str::contains(r#""display":"מצאת אוצר. ✨ קיבלת: 🗝️ מפתח זהב""#));
}

#[test]
fn save_info_without_a_save() {
    let dir = sandbox();
    adventure(&dir)
        .arg("save-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("no saved game"));
}

#[test]
fn play_without_credentials_fails_up_front() {
    let dir = sandbox();
    adventure(&dir)
        .args(["play", "--name", "דנה", "--scenario", "space"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn unknown_scenario_is_rejected() {
    let dir = sandbox();
    adventure(&dir)
        .args(["play", "--name", "דנה", "--scenario", "moon", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario"));
}

#[test]
fn offline_game_saves_and_continues() {
    let dir = sandbox();
    adventure(&dir)
        .args(["play", "--name", "דנה", "--scenario", "castle", "--offline"])
        .write_stdin("אני נכנס לטירה\n/status\n/exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("אתה מתעורר על ענן"))
        .stdout(predicate::str::contains("מצב לא מקוון"))
        .stdout(predicate::str::contains("❤️ 100/100"))
        .stdout(predicate::str::contains("המשחק נשמר"));

    adventure(&dir)
        .arg("save-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("דנה"))
        .stdout(predicate::str::contains("turns:    1"));

    adventure(&dir)
        .args(["continue", "--offline"])
        .write_stdin("/inventory\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("אני נכנס לטירה"))
        .stdout(predicate::str::contains("התיק ריק"));

    adventure(&dir).arg("delete-save").assert().success();
    adventure(&dir)
        .args(["continue", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no saved game"));
}

#[test]
fn combat_commands_need_a_fight() {
    let dir = sandbox();
    adventure(&dir)
        .args(["play", "--name", "דנה", "--offline"])
        .write_stdin("/attack\n/use 1\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("no active combat"))
        .stdout(predicate::str::contains("מספר פריט לא תקין"));
}
