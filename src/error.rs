//! Error union of the evaluation pipeline and its report classification.

use strum_macros::Display;
use thiserror::Error;

use crate::input::InputError;
use crate::skill::SkillError;
use crate::skill_ranker::RankError;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Ranking error: {0}")]
    Rank(#[from] RankError),

    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// How a failure is reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorClass {
    /// Connectivity problem: tell the user and keep the conversation
    /// stack so the same turn can be retried.
    Network,
    /// Everything else: report and reset to the default skills.
    Generic,
}

impl EvalError {
    /// Classifies the failure for reporting. Connectivity signatures are
    /// explicit variants attached where the failure happened; anything
    /// without one is generic.
    pub fn class(&self) -> ErrorClass {
        match self {
            EvalError::Skill(SkillError::Network(_)) | EvalError::Input(InputError::Network(_)) => {
                ErrorClass::Network
            }
            _ => ErrorClass::Generic,
        }
    }
}
