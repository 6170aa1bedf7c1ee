//! Evaluation pipeline and conversation-continuation state machine.
//!
//! [`SkillEvaluator`] owns one conversation: it receives utterances,
//! matches them against the current skill stack, runs the winning skill
//! off the interactive section and renders the result.
//!
//! ## Evaluation flow
//!
//! ```text
//! Utterance → Tokenizer → SkillRanker::get_best → Skill::process → SkillOutput::render
//! ```
//!
//! Tokenizing, ranking and processing run on a spawned worker task so
//! slow skills never stall the embedder. Rendering and every mutation of
//! the conversation state run on the interactive section described
//! below.
//!
//! ## Single in-flight evaluation
//!
//! Starting an evaluation supersedes the previous one: the running task
//! is aborted and, should it still complete, its result is discarded
//! before any side effect. Supersession is tracked with a generation
//! counter that is bumped before the abort, and every conclusion
//! re-checks the counter under the state lock. An abort only lands at an
//! await point, so the counter check is what makes the discard
//! race-safe.
//!
//! ## Interactive section
//!
//! One `tokio::sync::Mutex` guards the conversation state, i.e. the
//! skill stack and the interaction log. Rendering, the stack update and
//! input re-arming happen while holding it, with no await points in
//! between, so a turn concludes atomically and turn N is fully rendered
//! before turn N+1 concludes.
//!
//! ## Failure reporting
//!
//! Failures split into two report classes. Connectivity problems speak a
//! fixed message and show a network card while keeping the stack, so the
//! user can retry the turn. Everything else resets the stack to the
//! default skills, speaks a fixed message and shows a card carrying the
//! error text.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use strum_macros::Display;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, trace};

use crate::config::EvaluatorConfig;
use crate::error::{ErrorClass, EvalError, EvalResult};
use crate::input::{InputError, InputEvent, InputSource};
use crate::output::{DisplaySink, Renderable, SpeechSink};
use crate::skill::{Skill, SkillOutput};
use crate::skill_ranker::SkillRanker;
use crate::tokenizer::Tokenizer;

/// Where the conversation currently stands, observable through
/// [`SkillEvaluator::phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    /// No evaluation running and no input expected.
    Idle,
    /// An utterance is being tokenized, ranked or processed.
    Evaluating,
    /// The winning skill's output is being rendered.
    Rendering,
    /// A turn ended with follow-ups; the input device was re-armed.
    AwaitingInput,
    /// A failure is being reported.
    Erroring,
}

/// How a concluded turn affected the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Follow-up skills were pushed; the conversation continues.
    Continued,
    /// No follow-ups; the stack was reset to the default skills.
    Ended,
    /// The turn failed and was reported with the given class.
    Failed(ErrorClass),
}

/// One concluded turn, as kept by the interaction log.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    /// What the user said. `None` for failures that happened before an
    /// utterance existed, such as input device errors.
    pub utterance: Option<String>,
    /// The skill that won the ranking, when one was reached.
    pub skill: Option<String>,
    pub outcome: TurnOutcome,
    pub at: DateTime<Utc>,
}

/// Bounded in-memory record of concluded turns, newest last. Superseded
/// evaluations never appear here.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    capacity: usize,
    turns: Vec<TurnRecord>,
}

impl InteractionLog {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: Vec::new(),
        }
    }

    fn record(&mut self, turn: TurnRecord) {
        self.turns.push(turn);
        if self.turns.len() > self.capacity {
            self.turns.remove(0);
        }
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    pub fn latest(&self) -> Option<&TurnRecord> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

struct ConversationState {
    ranker: SkillRanker,
    log: InteractionLog,
}

struct EvaluatorInner {
    config: EvaluatorConfig,
    tokenizer: Arc<dyn Tokenizer>,
    speech: Arc<dyn SpeechSink>,
    display: Arc<dyn DisplaySink>,
    input: Arc<dyn InputSource>,
    state: Mutex<ConversationState>,
    generation: AtomicU64,
    current: Mutex<Option<JoinHandle<()>>>,
    phase_tx: watch::Sender<Phase>,
}

/// Drives one conversation. Cheap to clone; clones share the same
/// conversation state.
pub struct SkillEvaluator {
    inner: Arc<EvaluatorInner>,
}

impl Clone for SkillEvaluator {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl SkillEvaluator {
    pub fn new(
        config: EvaluatorConfig,
        default_skills: Vec<Arc<dyn Skill>>,
        tokenizer: Arc<dyn Tokenizer>,
        speech: Arc<dyn SpeechSink>,
        display: Arc<dyn DisplaySink>,
        input: Arc<dyn InputSource>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(Phase::Idle);
        let log = InteractionLog::new(config.log_capacity);
        Self {
            inner: Arc::new(EvaluatorInner {
                config,
                tokenizer,
                speech,
                display,
                input,
                state: Mutex::new(ConversationState {
                    ranker: SkillRanker::new(default_skills),
                    log,
                }),
                generation: AtomicU64::new(0),
                current: Mutex::new(None),
                phase_tx,
            }),
        }
    }

    /// Starts evaluating an utterance, superseding any evaluation still
    /// in flight. Returns as soon as the work is scheduled.
    #[tracing::instrument(skip(self, utterance), level = "debug")]
    pub async fn evaluate(&self, utterance: &str) {
        let mut current = self.inner.current.lock().await;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // 直前の評価が残っていれば先に破棄する
        if let Some(handle) = current.take() {
            handle.abort();
            debug!(generation, "superseded previous evaluation");
        }
        self.inner.phase_tx.send_replace(Phase::Evaluating);

        let inner = self.inner.clone();
        let text = utterance.to_string();
        let handle = tokio::spawn(async move {
            let result = inner.compute(&text).await;
            inner.conclude(generation, &text, result).await;
        });
        *current = Some(handle);
    }

    /// Aborts the in-flight evaluation, if any, without starting a new
    /// one. A late completion of the aborted work has no effect.
    pub async fn cancel(&self) {
        let mut current = self.inner.current.lock().await;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = current.take() {
            handle.abort();
            debug!("cancelled in-flight evaluation");
        }
        self.inner.phase_tx.send_replace(Phase::Idle);
    }

    /// Feeds one input device event into the pipeline. Only
    /// [`InputEvent::Final`] starts an evaluation.
    pub async fn process_input_event(&self, event: InputEvent) {
        match event {
            InputEvent::Final(text) => self.evaluate(&text).await,
            InputEvent::Partial(text) => trace!(%text, "partial input, not evaluated"),
            InputEvent::None => {
                debug!("listening ended without an utterance");
                self.inner.phase_tx.send_if_modified(|phase| {
                    if *phase == Phase::AwaitingInput {
                        *phase = Phase::Idle;
                        true
                    } else {
                        false
                    }
                });
            }
            InputEvent::Error(err) => self.report_input_error(err).await,
        }
    }

    /// Reports an input acquisition failure exactly like an evaluation
    /// failure. Does not supersede an in-flight evaluation.
    pub async fn report_input_error(&self, err: InputError) {
        let mut state = self.inner.state.lock().await;
        self.inner
            .report_failure(&mut state, None, EvalError::Input(err));
    }

    /// Drives the pipeline from a stream of input events until the
    /// stream ends.
    pub async fn pump<S>(&self, events: S)
    where
        S: Stream<Item = InputEvent>,
    {
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            self.process_input_event(event).await;
        }
    }

    /// Watch channel following the conversation [`Phase`].
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.inner.phase_tx.subscribe()
    }

    /// The phase right now.
    pub fn current_phase(&self) -> Phase {
        *self.inner.phase_tx.borrow()
    }

    /// Snapshot of the recorded turns.
    pub async fn interaction_log(&self) -> InteractionLog {
        self.inner.state.lock().await.log.clone()
    }

    /// Current stack layout, top batch first, default batch last.
    pub async fn batch_names(&self) -> Vec<Vec<String>> {
        self.inner.state.lock().await.ranker.batch_names()
    }
}

impl EvaluatorInner {
    /// Compute phase of one evaluation. Runs on the worker task; only
    /// the read scan of the stack touches the state lock, and the lock
    /// is released again before the skill starts processing.
    async fn compute(&self, utterance: &str) -> EvalResult<(Arc<dyn Skill>, Box<dyn SkillOutput>)> {
        let words = self.tokenizer.tokenize(utterance);
        trace!(words = words.len(), "extracted words");
        let skill = {
            let state = self.state.lock().await;
            state.ranker.get_best(&words)?
        };
        let output = skill.process(&words).await?;
        Ok((skill, output))
    }

    /// Concludes an evaluation on the interactive section. Everything in
    /// here runs under the state lock with no await points, so a
    /// superseding evaluation can neither interleave nor observe a half
    /// finished turn.
    async fn conclude(
        &self,
        generation: u64,
        utterance: &str,
        result: EvalResult<(Arc<dyn Skill>, Box<dyn SkillOutput>)>,
    ) {
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "stale evaluation, discarding result");
            return;
        }
        match result {
            Ok((skill, output)) => {
                self.phase_tx.send_replace(Phase::Rendering);
                output.render(self.speech.as_ref(), self.display.as_ref());
                let followups = output.followups();
                let outcome = if followups.is_empty() {
                    state.ranker.remove_all_batches();
                    self.phase_tx.send_replace(Phase::Idle);
                    TurnOutcome::Ended
                } else {
                    state.ranker.add_batch_to_top(followups);
                    self.phase_tx.send_replace(Phase::AwaitingInput);
                    self.input.request_input();
                    TurnOutcome::Continued
                };
                debug!(skill = skill.name(), ?outcome, "turn concluded");
                state.log.record(TurnRecord {
                    utterance: Some(utterance.to_string()),
                    skill: Some(skill.name().to_string()),
                    outcome,
                    at: Utc::now(),
                });
            }
            Err(err) => self.report_failure(&mut state, Some(utterance), err),
        }
    }

    fn report_failure(
        &self,
        state: &mut ConversationState,
        utterance: Option<&str>,
        err: EvalError,
    ) {
        let class = err.class();
        error!(%err, %class, "turn failed");
        self.phase_tx.send_replace(Phase::Erroring);
        match class {
            ErrorClass::Network => {
                // 接続の問題はスタックを保持したまま報告する
                self.speech.speak(&self.config.network_error_speech);
                self.display.display(Renderable::NetworkErrorCard);
            }
            ErrorClass::Generic => {
                state.ranker.remove_all_batches();
                self.speech.speak(&self.config.generic_error_speech);
                self.display.display(Renderable::ErrorCard {
                    message: self.config.generic_error_speech.clone(),
                    details: err.to_string(),
                });
            }
        }
        state.log.record(TurnRecord {
            utterance: utterance.map(str::to_string),
            skill: None,
            outcome: TurnOutcome::Failed(class),
            at: Utc::now(),
        });
        self.phase_tx.send_replace(Phase::Idle);
    }
}
