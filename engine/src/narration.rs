//! The boundary to the text-generation service.
//!
//! A [`Narrator`] answers a [`NarrationRequest`] with a [`NarrationStream`]:
//! the receiving half of a channel that yields text fragments in order and
//! then exactly one terminal event. The producer stops as soon as the stream
//! is dropped, which is how the engine abandons a superseded request.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Player,
    Narrator,
}

/// One line of conversation history as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub history: Vec<ChatTurn>,
    /// Scenario description used as framing for the story.
    pub scenario_context: String,
}

/// Narration failures. None of them is fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationError {
    #[error("missing API credentials")]
    MissingCredentials,

    #[error("the service rejected the credentials")]
    Auth,

    #[error("rate limited by the service")]
    RateLimit,

    #[error("network error: {0}")]
    Network(String),

    #[error("narration failed: {0}")]
    Generic(String),
}

impl NarrationError {
    /// The message shown to the player in place of the narration.
    pub fn localized(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "מפתח API חסר. הוסף את OPENAI_API_KEY ל-.env",
            Self::Auth => "מפתח API לא תקין. אנא בדוק את המפתח ב-.env",
            Self::RateLimit => "חרגת ממכסת הבקשות. נסה שוב בעוד כמה רגעים.",
            Self::Network(_) => "שגיאת רשת. בדוק את החיבור לאינטרנט.",
            Self::Generic(_) => "אירעה שגיאה בשרת הבינה המלאכותית. נסה שוב.",
        }
    }

    pub fn display_text(&self) -> String {
        format!("❌ שגיאה: {}", self.localized())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEvent {
    Chunk(String),
    Done,
    Failed(NarrationError),
}

/// Producer half of a narration channel.
#[derive(Debug, Clone)]
pub struct NarrationSink {
    tx: Sender<NarrationEvent>,
}

impl NarrationSink {
    /// Send a fragment. Returns false once the consumer has gone away, which
    /// the producer should treat as cancellation.
    pub fn chunk(&self, text: impl Into<String>) -> bool {
        self.tx.send(NarrationEvent::Chunk(text.into())).is_ok()
    }

    pub fn finish(self) {
        let _ = self.tx.send(NarrationEvent::Done);
    }

    pub fn fail(self, error: NarrationError) {
        let _ = self.tx.send(NarrationEvent::Failed(error));
    }
}

/// What a non-blocking poll of the stream found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Event(NarrationEvent),
    Pending,
}

/// Consumer half of a narration channel.
#[derive(Debug)]
pub struct NarrationStream {
    rx: Receiver<NarrationEvent>,
}

pub fn channel() -> (NarrationSink, NarrationStream) {
    let (tx, rx) = mpsc::channel();
    (NarrationSink { tx }, NarrationStream { rx })
}

/// A producer that vanishes without a terminal event counts as a failure.
fn hung_up() -> NarrationEvent {
    NarrationEvent::Failed(NarrationError::Generic("stream closed before completion".into()))
}

impl NarrationStream {
    /// A stream that fails immediately, for narrators that cannot start.
    pub fn failed(error: NarrationError) -> Self {
        let (sink, stream) = channel();
        sink.fail(error);
        stream
    }

    pub fn try_next(&self) -> Poll {
        match self.rx.try_recv() {
            Ok(event) => Poll::Event(event),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Disconnected) => Poll::Event(hung_up()),
        }
    }

    /// Block until the next event.
    pub fn next_blocking(&self) -> NarrationEvent {
        self.rx.recv().unwrap_or_else(|_| hung_up())
    }
}

/// Anything that can tell the story.
pub trait Narrator {
    fn narrate(&self, request: NarrationRequest) -> NarrationStream;
}

/// A canned reply for [`ScriptedNarrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Stream these fragments, then complete.
    Reply(Vec<String>),
    /// Fail without producing text.
    Fail(NarrationError),
    /// Keep the stream open; the caller feeds it through
    /// [`ScriptedNarrator::take_held`].
    Hold,
}

impl Script {
    pub fn reply(text: &str) -> Self {
        Self::Reply(vec![text.to_string()])
    }

    /// Split `text` into fragments of at most `size` characters.
    pub fn chunked(text: &str, size: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self::Reply(chars.chunks(size.max(1)).map(|c| c.iter().collect()).collect())
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    scripts: VecDeque<Script>,
    requests: Vec<NarrationRequest>,
    held: Vec<NarrationSink>,
}

/// Offline narrator that replays scripts in order. Once the scripts run out
/// it answers with `fallback`, if one is set, or fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNarrator {
    state: Arc<Mutex<ScriptState>>,
    fallback: Option<String>,
}

impl ScriptedNarrator {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        let narrator = Self::default();
        narrator.lock().scripts.extend(scripts);
        narrator
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    pub fn push(&self, script: Script) {
        self.lock().scripts.push_back(script);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<NarrationRequest> {
        self.lock().requests.clone()
    }

    /// Sinks of streams opened by [`Script::Hold`], oldest first.
    pub fn take_held(&self) -> Vec<NarrationSink> {
        std::mem::take(&mut self.lock().held)
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Narrator for ScriptedNarrator {
    fn narrate(&self, request: NarrationRequest) -> NarrationStream {
        let mut state = self.lock();
        state.requests.push(request);
        let script = state.scripts.pop_front().unwrap_or_else(|| match &self.fallback {
            Some(text) => Script::reply(text),
            None => Script::Fail(NarrationError::Generic("no scripted reply left".into())),
        });

        let (sink, stream) = channel();
        match script {
            Script::Reply(fragments) => {
                for fragment in fragments {
                    sink.chunk(fragment);
                }
                sink.finish();
            }
            Script::Fail(error) => sink.fail(error),
            Script::Hold => state.held.push(sink),
        }
        stream
    }
}
