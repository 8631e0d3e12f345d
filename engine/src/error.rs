use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Reasons the engine refuses an operation. A refused operation leaves the
/// session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("input is empty")]
    EmptyInput,

    #[error("a narration is already in progress")]
    NarrationInFlight,

    #[error("no game has been started")]
    GameNotStarted,

    #[error("no active combat")]
    NoActiveCombat,

    #[error("the game is over")]
    GameOver,
}
