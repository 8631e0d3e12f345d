//! JNI bridge for a mobile front end. Every call is stateless: the caller
//! passes the session as JSON and gets back `{"ok":true,"result":...}` or
//! `{"ok":false,"error":"..."}`.

use engine::combat::CombatAction;
use engine::{markers, Dice, Session};
use jni::objects::{JClass, JString};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;
use serde_json::{json, Value};

const VERSION: &str = concat!("adventure-ffi ", env!("CARGO_PKG_VERSION"));

pub fn parse_narration(text: &str) -> Result<Value, String> {
    serde_json::to_value(markers::parse_narration(text)).map_err(|e| e.to_string())
}

fn read_session(session_json: &str) -> Result<Session, String> {
    serde_json::from_str(session_json).map_err(|e| format!("invalid_session: {e}"))
}

pub fn combat_action(session_json: &str, action: &str, seed: u64) -> Result<Value, String> {
    let mut session = read_session(session_json)?;
    let action: CombatAction = action.parse()?;
    let mut dice = Dice::from_seed(seed);
    let report = session
        .resolve_combat_action(action, &mut dice)
        .map_err(|e| e.to_string())?;
    Ok(json!({ "session": session, "report": report }))
}

pub fn consume_item(session_json: &str, item_id: &str) -> Result<Value, String> {
    let mut session = read_session(session_json)?;
    let healed = session
        .consume_healing_item(item_id)
        .ok_or_else(|| format!("item_not_usable: {item_id}"))?;
    Ok(json!({
        "session": session,
        "item": healed.item,
        "restored": healed.restored,
    }))
}

fn respond(env: &JNIEnv, result: Result<Value, String>) -> jstring {
    let payload = match result {
        Ok(value) => json!({ "ok": true, "result": value }),
        Err(e) => json!({ "ok": false, "error": e }),
    };
    match env.new_string(payload.to_string()) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn read_string(env: &mut JNIEnv, s: &JString) -> Result<String, String> {
    env.get_string(s).map(Into::into).map_err(|e| e.to_string())
}

#[no_mangle]
pub extern "system" fn Java_com_adventure_Ffi_version(env: JNIEnv, _class: JClass) -> jstring {
    match env.new_string(VERSION) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_adventure_Ffi_parseNarrationJson(
    mut env: JNIEnv,
    _class: JClass,
    text: JString,
) -> jstring {
    let result = read_string(&mut env, &text).and_then(|text| parse_narration(&text));
    respond(&env, result)
}

#[no_mangle]
pub extern "system" fn Java_com_adventure_Ffi_combatActionJson(
    mut env: JNIEnv,
    _class: JClass,
    session_json: JString,
    action: JString,
    seed: jlong,
) -> jstring {
    let result = read_string(&mut env, &session_json).and_then(|session| {
        let action = read_string(&mut env, &action)?;
        combat_action(&session, &action, seed as u64)
    });
    respond(&env, result)
}

#[no_mangle]
pub extern "system" fn Java_com_adventure_Ffi_consumeItemJson(
    mut env: JNIEnv,
    _class: JClass,
    session_json: JString,
    item_id: JString,
) -> jstring {
    let result = read_string(&mut env, &session_json).and_then(|session| {
        let item_id = read_string(&mut env, &item_id)?;
        consume_item(&session, &item_id)
    });
    respond(&env, result)
}
