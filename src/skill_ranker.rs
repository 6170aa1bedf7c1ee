//! Candidate registry and ranking.
//!
//! Skills eligible for the next utterance are organized as a stack of
//! batches. The bottom batch holds the always-available default skills
//! and can never be removed; a conversation turn that proposes
//! follow-ups pushes them as one batch on top. Ranking scans the whole
//! stack and picks the highest score, so a follow-up can lose against a
//! default skill that matches the utterance better.
//!
//! ## Tie-breaking
//!
//! Batches are scanned most-recent-first and skills in the order their
//! batch listed them. A strictly higher score is required to displace
//! the current best, so ties resolve towards the more recently proposed
//! skill, and within a batch towards the earlier position.

use std::iter;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::skill::Skill;
use crate::tokenizer::Word;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RankError {
    /// No batch contains any skill, so nothing could be scored.
    #[error("No skill available to match the input")]
    NoMatch,
}

/// One layer of candidate skills, kept in proposal order.
#[derive(Clone, Default)]
pub struct SkillBatch {
    skills: Vec<Arc<dyn Skill>>,
}

impl SkillBatch {
    pub fn new(skills: Vec<Arc<dyn Skill>>) -> Self {
        Self { skills }
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Names of the contained skills, in proposal order.
    pub fn names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name().to_string()).collect()
    }

    fn best(&self, words: &[Word]) -> Option<(f64, &Arc<dyn Skill>)> {
        let mut best: Option<(f64, &Arc<dyn Skill>)> = None;
        for skill in &self.skills {
            let score = skill.score(words);
            let replaces = match best {
                None => true,
                Some((top, _)) => score > top,
            };
            if replaces {
                best = Some((score, skill));
            }
        }
        best
    }
}

/// Stack of [`SkillBatch`]es with a permanent default batch at the
/// bottom. The most recent batch sits at the end of `batches`.
pub struct SkillRanker {
    default_batch: SkillBatch,
    batches: Vec<SkillBatch>,
}

impl SkillRanker {
    pub fn new(default_skills: Vec<Arc<dyn Skill>>) -> Self {
        Self {
            default_batch: SkillBatch::new(default_skills),
            batches: Vec::new(),
        }
    }

    /// Pushes a batch of follow-up skills on top of the stack. Empty
    /// batches are allowed and simply contribute no candidates.
    pub fn add_batch_to_top(&mut self, skills: Vec<Arc<dyn Skill>>) {
        self.batches.push(SkillBatch::new(skills));
        debug!(depth = self.depth(), "added skill batch to top of stack");
    }

    /// Drops every follow-up batch. The default batch always stays.
    pub fn remove_all_batches(&mut self) {
        self.batches.clear();
        debug!("removed all follow-up batches");
    }

    /// Number of batches on the stack, the default batch included.
    pub fn depth(&self) -> usize {
        self.batches.len() + 1
    }

    /// Stack layout top-first, default batch last. Intended for logs and
    /// assertions, not for ranking decisions.
    pub fn batch_names(&self) -> Vec<Vec<String>> {
        self.batches
            .iter()
            .rev()
            .map(SkillBatch::names)
            .chain(iter::once(self.default_batch.names()))
            .collect()
    }

    /// Scores every skill in every batch against the words and returns
    /// the best match. No threshold is applied; score semantics belong
    /// to the skills.
    pub fn get_best(&self, words: &[Word]) -> Result<Arc<dyn Skill>, RankError> {
        let mut best: Option<(f64, &Arc<dyn Skill>)> = None;
        for batch in self
            .batches
            .iter()
            .rev()
            .chain(iter::once(&self.default_batch))
        {
            if let Some((score, skill)) = batch.best(words) {
                let replaces = match best {
                    None => true,
                    Some((top, _)) => score > top,
                };
                if replaces {
                    best = Some((score, skill));
                }
            }
        }
        match best {
            Some((score, skill)) => {
                debug!(skill = skill.name(), score, "ranked best matching skill");
                Ok(Arc::clone(skill))
            }
            None => Err(RankError::NoMatch),
        }
    }
}
