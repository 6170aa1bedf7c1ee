//! # Aizuchi: Assistant Evaluation Core
//!
//! Aizuchi is the evaluation core of a voice or text assistant. It takes
//! a raw utterance, finds the skill that matches it best, runs that
//! skill and renders the answer, then keeps the conversation going by
//! tracking which skills are eligible for the next turn.
//!
//! ## Evaluation Pipeline
//!
//! ```text
//! Utterance → Tokenizer → SkillRanker::get_best → Skill::process → SkillOutput::render
//! ```
//!
//! Each stage sits behind a narrow trait so embedders can swap the word
//! extraction ([`tokenizer`]), the skills themselves ([`skill`]) and the
//! output devices ([`output`]) without touching the pipeline
//! ([`skill_evaluator`]).
//!
//! ## Conversation Stack
//!
//! Multi-turn conversations are driven by the batch stack in
//! [`skill_ranker`]: a turn that proposes follow-up skills pushes them
//! as a batch on top, and every utterance is still ranked against the
//! whole stack. Users can bail out of a conversation simply by asking
//! for something else that matches better.
//!
//! ## Concurrency
//!
//! At most one evaluation is in flight. A new utterance supersedes the
//! running evaluation: its work is aborted and any late result is
//! discarded before producing side effects. See [`skill_evaluator`] for
//! the mechanism.

pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod skill;
pub mod skill_evaluator;
pub mod skill_ranker;
pub mod tokenizer;

// Re-exports
pub use config::*;
pub use error::*;
pub use input::*;
pub use output::*;
pub use skill::*;
pub use skill_evaluator::*;
pub use skill_ranker::*;
pub use tokenizer::*;
