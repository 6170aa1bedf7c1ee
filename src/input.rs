//! Input side seam: the events an input device can deliver and the hook
//! used to re-arm it between conversation turns.

use mockall::automock;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    /// Recognition needed the network and could not reach it.
    #[error("Network error: {0}")]
    Network(String),

    /// The device itself failed, e.g. the microphone is busy or the
    /// recognizer died.
    #[error("Input device error: {0}")]
    Device(String),
}

/// One event from the device feeding the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Intermediate transcription. Never evaluated.
    Partial(String),

    /// Finished utterance; triggers an evaluation.
    Final(String),

    /// Listening ended without an utterance.
    None,

    /// Input acquisition failed.
    Error(InputError),
}

/// Hook back into the input device. When a turn ends with follow-up
/// skills the evaluator calls [`InputSource::request_input`] so the
/// device starts listening for the next utterance.
#[automock]
pub trait InputSource: Send + Sync {
    fn request_input(&self);
}
