//! Output side of an evaluation: the cards a skill can show and the
//! sinks they are rendered into.
//!
//! Sinks are the narrow seam towards the embedding frontend. A speech
//! sink receives plain sentences, a display sink receives [`Renderable`]
//! cards. Both are infallible by contract; transport problems belong to
//! the frontend, not to the evaluation core.

use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Presentation-neutral card emitted towards the display sink. Cards are
/// serializable so embedders can forward them across process boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Renderable {
    /// Single prominent line, typically mirroring the spoken reply.
    Headline { text: String },

    /// Image with a title and a longer description, e.g. a weather icon
    /// with the forecast text.
    DescribedImage {
        title: String,
        description: String,
        /// Identifier the frontend resolves to an actual image, such as
        /// a URL or a resource name.
        image: Option<String>,
    },

    /// Detailed failure report for the current turn.
    ErrorCard { message: String, details: String },

    /// Fixed card telling the user the network is unreachable.
    NetworkErrorCard,
}

/// Receives the sentences a turn speaks.
#[automock]
pub trait SpeechSink: Send + Sync {
    fn speak(&self, sentence: &str);
}

/// Receives the cards a turn displays.
#[automock]
pub trait DisplaySink: Send + Sync {
    fn display(&self, card: Renderable);
}

/// Speech sink that swallows everything, for embedders without audio.
#[derive(Debug, Clone, Default)]
pub struct NothingSpeech;

impl SpeechSink for NothingSpeech {
    fn speak(&self, sentence: &str) {
        debug!(%sentence, "speech output discarded");
    }
}

/// Display counterpart of [`NothingSpeech`].
#[derive(Debug, Clone, Default)]
pub struct NothingDisplay;

impl DisplaySink for NothingDisplay {
    fn display(&self, card: Renderable) {
        debug!(?card, "graphical output discarded");
    }
}
