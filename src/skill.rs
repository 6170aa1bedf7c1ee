//! Skill contract: matching, processing and output generation.
//!
//! A [`Skill`] is one assistance capability, such as weather, timers or
//! search. Matching is a synchronous score over the extracted words;
//! processing is asynchronous and may perform I/O. A successful run
//! produces a [`SkillOutput`] value that carries everything the
//! interactive side needs: what to render and which skills become
//! eligible for the next turn.
//!
//! Skills own their dependencies. There is no context parameter at
//! process time; whatever a skill needs (HTTP client, cached settings)
//! it captures at construction.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::output::{DisplaySink, Renderable, SpeechSink};
use crate::tokenizer::Word;

#[derive(Debug, Error)]
pub enum SkillError {
    /// The skill could not reach a remote service. Reported as a
    /// connectivity problem; the conversation stack is kept so the user
    /// can retry the same turn.
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else that went wrong while processing.
    #[error("Processing error: {0}")]
    Processing(String),
}

pub type SkillResult<T> = Result<T, SkillError>;

/// One assistance capability.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Stable identifier used in logs and the interaction log.
    fn name(&self) -> &str;

    /// How well the words match this skill. Higher wins; the value range
    /// is a private matter between the skills sharing a ranker, and a
    /// zero score still counts as a match.
    fn score(&self, words: &[Word]) -> f64;

    /// Runs the skill against the words it was scored on. May block on
    /// I/O; the evaluator imposes no timeout but may abort the task when
    /// a newer utterance supersedes this one.
    async fn process(&self, words: &[Word]) -> SkillResult<Box<dyn SkillOutput>>;
}

/// Result of a successful [`Skill::process`] run.
pub trait SkillOutput: Send + Sync {
    /// Renders this output into the sinks. Runs on the interactive
    /// section, so implementations must not block.
    fn render(&self, speech: &dyn SpeechSink, display: &dyn DisplaySink);

    /// Skills that become the top candidate batch for the next turn.
    /// Empty means the conversation is over.
    fn followups(&self) -> Vec<Arc<dyn Skill>>;
}

/// Ready-made output for skills that answer with a single sentence: the
/// text is spoken and shown as a headline card.
pub struct HeadlineOutput {
    text: String,
    followups: Vec<Arc<dyn Skill>>,
}

impl HeadlineOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            followups: Vec::new(),
        }
    }

    pub fn with_followups(mut self, followups: Vec<Arc<dyn Skill>>) -> Self {
        self.followups = followups;
        self
    }
}

impl SkillOutput for HeadlineOutput {
    fn render(&self, speech: &dyn SpeechSink, display: &dyn DisplaySink) {
        speech.speak(&self.text);
        display.display(Renderable::Headline {
            text: self.text.clone(),
        });
    }

    fn followups(&self) -> Vec<Arc<dyn Skill>> {
        self.followups.clone()
    }
}
