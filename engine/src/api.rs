//! The single owner of a play-through.
//!
//! [`GameEngine`] holds the authoritative [`Session`] plus the collaborators
//! it talks to (narrator, save store, dice). Callers submit input, then call
//! [`GameEngine::pump`] from their loop (or [`GameEngine::run_until_idle`])
//! to let streamed narration and queued follow-ups land in the session.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combat::{CombatAction, CombatReport};
use crate::error::{EngineError, EngineResult};
use crate::narration::{NarrationError, NarrationEvent, NarrationStream, Narrator, Poll};
use crate::persistence::{self, SaveInfo, SaveStore};
use crate::session::{DEFAULT_MAX_HEALTH, HealReport, NarrationOutcome, Scenario, Session};
use crate::Dice;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Fixed dice seed; `None` draws from entropy.
    pub seed: Option<u64>,
    pub starting_health: u32,
    /// Pause before a combat summary is sent to the narrator.
    pub followup_delay_ms: u64,
    /// Combat log lines a presentation layer should show.
    pub combat_log_window: usize,
    pub autosave: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            starting_health: DEFAULT_MAX_HEALTH,
            followup_delay_ms: 1000,
            combat_log_window: 3,
            autosave: true,
        }
    }
}

impl EngineConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_followup_delay(mut self, delay: Duration) -> Self {
        self.followup_delay_ms = delay.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn followup_delay(&self) -> Duration {
        Duration::from_millis(self.followup_delay_ms)
    }

    pub fn dice(&self) -> Dice {
        match self.seed {
            Some(seed) => Dice::from_seed(seed),
            None => Dice::from_entropy(),
        }
    }
}

/// The narration currently streaming into the session.
struct InFlight {
    generation: u64,
    message_id: String,
    stream: NarrationStream,
    text: String,
}

/// Text submitted on the player's behalf once `due` has passed.
struct Followup {
    due: Instant,
    text: String,
}

pub struct GameEngine {
    config: EngineConfig,
    session: Session,
    dice: Dice,
    narrator: Box<dyn Narrator>,
    store: Box<dyn SaveStore>,
    /// Bumped whenever the session is replaced; streams opened under an
    /// older generation are never applied.
    generation: u64,
    in_flight: Option<InFlight>,
    followups: VecDeque<Followup>,
}

impl GameEngine {
    pub fn new(
        config: EngineConfig,
        narrator: impl Narrator + 'static,
        store: impl SaveStore + 'static,
    ) -> Self {
        let dice = config.dice();
        Self {
            config,
            session: Session::default(),
            dice,
            narrator: Box::new(narrator),
            store: Box::new(store),
            generation: 0,
            in_flight: None,
            followups: VecDeque::new(),
        }
    }

    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the current state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_narrating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True while a stream or a queued follow-up is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || !self.followups.is_empty()
    }

    /// Drop anything tied to the current session.
    fn supersede(&mut self) {
        self.generation += 1;
        if self.in_flight.take().is_some() {
            debug!(generation = self.generation, "in-flight narration abandoned");
        }
        self.followups.clear();
    }

    pub fn start_game(&mut self, player_name: &str, scenario: &Scenario) {
        self.supersede();
        self.session = Session::start(player_name, scenario, self.config.starting_health);
    }

    /// Send the player's text to the narrator. The reply streams in through
    /// [`pump`](Self::pump). Refused once the player is dead, until
    /// [`start_game`](Self::start_game), [`load`](Self::load) or
    /// [`reset`](Self::reset).
    pub fn submit_player_text(&mut self, text: &str) -> EngineResult<()> {
        if self.session.is_game_over() {
            return Err(EngineError::GameOver);
        }
        self.send_turn(text)
    }

    fn send_turn(&mut self, text: &str) -> EngineResult<()> {
        if !self.session.game_started {
            return Err(EngineError::GameNotStarted);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        if self.in_flight.is_some() {
            return Err(EngineError::NarrationInFlight);
        }

        let pending = self.session.begin_turn(text);
        let stream = self.narrator.narrate(pending.request);
        self.in_flight = Some(InFlight {
            generation: self.generation,
            message_id: pending.message_id,
            stream,
            text: String::new(),
        });
        Ok(())
    }

    /// Resolve a combat action. A finished fight queues its summary for the
    /// narrator after the configured delay.
    pub fn submit_combat_action(&mut self, action: CombatAction) -> EngineResult<CombatReport> {
        let report = self.session.resolve_combat_action(action, &mut self.dice)?;
        if let Some(summary) = &report.summary {
            let due = Instant::now() + self.config.followup_delay();
            debug!(outcome = ?report.outcome, "combat summary queued");
            self.followups.push_back(Followup { due, text: summary.clone() });
        }
        Ok(report)
    }

    /// Use a healing item from the inventory. Unknown or non-healing items
    /// are a no-op.
    pub fn consume_healing_item(&mut self, item_id: &str) -> Option<HealReport> {
        let report = self.session.consume_healing_item(item_id)?;
        self.autosave();
        Some(report)
    }

    /// Apply whatever narration has arrived and dispatch due follow-ups.
    /// Never blocks. Returns whether work is still outstanding.
    pub fn pump(&mut self) -> bool {
        self.drain(false);
        self.dispatch_due_followup(Instant::now());
        self.is_busy()
    }

    /// Block until the in-flight narration and every queued follow-up
    /// (including the narration it triggers) are done.
    pub fn run_until_idle(&mut self) {
        loop {
            if self.in_flight.is_some() {
                self.drain(true);
                continue;
            }
            let Some(due) = self.followups.front().map(|f| f.due) else {
                return;
            };
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
            self.dispatch_due_followup(Instant::now());
        }
    }

    fn drain(&mut self, blocking: bool) {
        while let Some(flight) = &self.in_flight {
            let event = if blocking {
                flight.stream.next_blocking()
            } else {
                match flight.stream.try_next() {
                    Poll::Event(event) => event,
                    Poll::Pending => return,
                }
            };
            self.apply(event);
        }
    }

    fn apply(&mut self, event: NarrationEvent) {
        let Some(flight) = self.in_flight.as_mut() else {
            return;
        };
        if flight.generation != self.generation {
            self.in_flight = None;
            return;
        }

        match event {
            NarrationEvent::Chunk(chunk) => {
                flight.text.push_str(&chunk);
                self.session.append_chunk(&flight.message_id, &chunk);
            }
            NarrationEvent::Done => {
                let Some(flight) = self.in_flight.take() else {
                    return;
                };
                if flight.text.trim().is_empty() {
                    self.fail(&flight.message_id, NarrationError::Generic("empty reply".into()));
                    return;
                }
                let outcome = self.session.finish_narration(&flight.message_id, &flight.text);
                log_outcome(&outcome);
                self.autosave();
            }
            NarrationEvent::Failed(error) => {
                let Some(flight) = self.in_flight.take() else {
                    return;
                };
                self.fail(&flight.message_id, error);
            }
        }
    }

    fn fail(&mut self, message_id: &str, error: NarrationError) {
        warn!(%error, "narration failed");
        self.session.fail_narration(message_id, &error);
        self.autosave();
    }

    fn dispatch_due_followup(&mut self, now: Instant) {
        if self.in_flight.is_some() {
            return;
        }
        if !self.followups.front().is_some_and(|f| f.due <= now) {
            return;
        }
        let Some(followup) = self.followups.pop_front() else {
            return;
        };
        // The game-over summary still goes out after the player has died.
        if let Err(e) = self.send_turn(&followup.text) {
            warn!(error = %e, "follow-up dropped");
        }
    }

    fn autosave(&self) {
        if self.config.autosave && self.session.turn_count > 0 {
            self.save();
        }
    }

    /// Write the session to the save slot. Failures are logged, not raised.
    pub fn save(&self) -> bool {
        match persistence::persist(self.store.as_ref(), &self.session) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save game");
                false
            }
        }
    }

    /// Replace the session with the saved one. Returns false when there is
    /// nothing usable to load, leaving the current session in place.
    pub fn load(&mut self) -> bool {
        match persistence::restore(self.store.as_ref()) {
            Ok(Some(mut session)) => {
                self.supersede();
                session.game_started = true;
                info!(player = %session.player_name, turn = session.turn_count, "game loaded");
                self.session = session;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to load game");
                false
            }
        }
    }

    pub fn save_and_exit(&mut self) {
        self.save();
        info!(player = %self.session.player_name, "saved and exited");
        self.reset();
    }

    /// Back to an empty, not-started session. The save slot is untouched.
    pub fn reset(&mut self) {
        self.supersede();
        self.session = Session::default();
    }

    pub fn has_saved_game(&self) -> bool {
        persistence::has_saved_game(self.store.as_ref())
    }

    pub fn save_info(&self) -> Option<SaveInfo> {
        persistence::save_info(self.store.as_ref())
    }

    pub fn delete_save(&self) {
        if let Err(e) = persistence::delete_save(self.store.as_ref()) {
            warn!(error = %e, "failed to delete save");
        }
    }
}

fn log_outcome(outcome: &NarrationOutcome) {
    for item in &outcome.new_items {
        info!(emoji = %item.emoji, name = %item.name, "item acquired");
    }
    debug!(
        items = outcome.parsed.items.len(),
        combat_started = outcome.combat_started,
        "narration finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.followup_delay(), Duration::from_millis(1000));
        assert_eq!(config.starting_health, 100);
        assert_eq!(config.combat_log_window, 3);
        assert!(config.autosave);
        assert!(config.seed.is_none());
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: EngineConfig = serde_yaml::from_str("seed: 9\nautosave: false\n").unwrap();
        assert_eq!(config.seed, Some(9));
        assert!(!config.autosave);
        assert_eq!(config.followup_delay_ms, 1000);
    }
}
