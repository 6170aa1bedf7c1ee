//! Multi-turn conversation tests: followup stacks growing, shrinking
//! and surviving network failures.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::time::sleep;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use aizuchi::{
    ErrorClass, EvaluatorConfig, HeadlineOutput, InputSource, NothingDisplay, Phase, Skill,
    SkillError, SkillEvaluator, SkillOutput, SkillResult, SpeechSink, TurnOutcome, Word,
    WordTokenizer,
};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    // tracing_subscriberの初期化
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[derive(Default)]
struct SpeechRecorder {
    lines: Mutex<Vec<String>>,
}

impl SpeechRecorder {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl SpeechSink for SpeechRecorder {
    fn speak(&self, sentence: &str) {
        self.lines.lock().unwrap().push(sentence.to_string());
    }
}

#[derive(Default)]
struct InputRecorder {
    requests: AtomicUsize,
}

impl InputRecorder {
    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl InputSource for InputRecorder {
    fn request_input(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

struct KeywordSkill {
    name: String,
    keyword: String,
    score_value: f64,
    reply: String,
    followups: Vec<Arc<dyn Skill>>,
    fail_next: AtomicBool,
}

impl KeywordSkill {
    fn new(name: &str, keyword: &str, score_value: f64, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            keyword: keyword.to_string(),
            score_value,
            reply: reply.to_string(),
            followups: Vec::new(),
            fail_next: AtomicBool::new(false),
        }
    }

    fn with_followups(mut self, followups: Vec<Arc<dyn Skill>>) -> Self {
        self.followups = followups;
        self
    }

    fn fail_once(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Skill for KeywordSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, words: &[Word]) -> f64 {
        if words.iter().any(|w| w.as_str() == self.keyword) {
            self.score_value
        } else {
            0.0
        }
    }

    async fn process(&self, _words: &[Word]) -> SkillResult<Box<dyn SkillOutput>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SkillError::Network("weather api unreachable".to_string()));
        }
        Ok(Box::new(
            HeadlineOutput::new(self.reply.clone()).with_followups(self.followups.clone()),
        ))
    }
}

fn build(
    default_skills: Vec<Arc<dyn Skill>>,
) -> (SkillEvaluator, Arc<SpeechRecorder>, Arc<InputRecorder>) {
    let speech = Arc::new(SpeechRecorder::default());
    let input = Arc::new(InputRecorder::default());
    let evaluator = SkillEvaluator::new(
        EvaluatorConfig::default(),
        default_skills,
        Arc::new(WordTokenizer::new()),
        speech.clone(),
        Arc::new(NothingDisplay),
        input.clone(),
    );
    (evaluator, speech, input)
}

#[tokio::test]
async fn weather_conversation_flows_through_followups() {
    let detail = Arc::new(KeywordSkill::new(
        "weather_detail",
        "tomorrow",
        0.9,
        "rain tomorrow",
    ));
    let weather = Arc::new(
        KeywordSkill::new("weather", "weather", 1.0, "sunny today")
            .with_followups(vec![detail as Arc<dyn Skill>]),
    );
    let (evaluator, speech, input) = build(vec![weather as Arc<dyn Skill>]);

    evaluator.evaluate("what is the weather").await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(speech.lines(), vec!["sunny today".to_string()]);
    assert_eq!(
        evaluator.batch_names().await,
        vec![
            vec!["weather_detail".to_string()],
            vec!["weather".to_string()]
        ]
    );
    assert_eq!(input.requests(), 1);
    assert_eq!(evaluator.current_phase(), Phase::AwaitingInput);

    evaluator.evaluate("and tomorrow").await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        speech.lines(),
        vec!["sunny today".to_string(), "rain tomorrow".to_string()]
    );
    // フォローアップなしの回答で会話は閉じる
    assert_eq!(
        evaluator.batch_names().await,
        vec![vec!["weather".to_string()]]
    );
    assert_eq!(input.requests(), 1);
    assert_eq!(evaluator.current_phase(), Phase::Idle);

    let outcomes: Vec<TurnOutcome> = evaluator
        .interaction_log()
        .await
        .turns()
        .iter()
        .map(|t| t.outcome)
        .collect();
    assert_eq!(outcomes, vec![TurnOutcome::Continued, TurnOutcome::Ended]);
}

#[tokio::test]
async fn followup_batches_accumulate_until_a_turn_ends() {
    let detail = Arc::new(KeywordSkill::new(
        "weather_detail",
        "tomorrow",
        0.9,
        "rain tomorrow",
    ));
    let weather = Arc::new(
        KeywordSkill::new("weather", "weather", 1.0, "sunny today")
            .with_followups(vec![detail as Arc<dyn Skill>]),
    );
    let (evaluator, _speech, input) = build(vec![weather as Arc<dyn Skill>]);

    // デフォルトの weather は常に届くので、何度でもバッチが積まれる
    evaluator.evaluate("what is the weather").await;
    sleep(Duration::from_millis(100)).await;
    evaluator.evaluate("what is the weather").await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        evaluator.batch_names().await,
        vec![
            vec!["weather_detail".to_string()],
            vec!["weather_detail".to_string()],
            vec!["weather".to_string()]
        ]
    );
    assert_eq!(input.requests(), 2);
}

#[tokio::test]
async fn tied_scores_prefer_the_most_recent_batch() {
    let city_b = Arc::new(KeywordSkill::new("city_b", "weather", 1.0, "b reply"));
    let city_a = Arc::new(
        KeywordSkill::new("city_a", "weather", 1.0, "a reply")
            .with_followups(vec![city_b as Arc<dyn Skill>]),
    );
    let (evaluator, speech, _input) = build(vec![city_a as Arc<dyn Skill>]);

    evaluator.evaluate("what is the weather").await;
    sleep(Duration::from_millis(100)).await;
    evaluator.evaluate("how is the weather").await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        speech.lines(),
        vec!["a reply".to_string(), "b reply".to_string()]
    );
}

#[tokio::test]
async fn a_network_failure_lets_the_user_retry_the_same_question() {
    let detail = Arc::new(KeywordSkill::new(
        "weather_detail",
        "tomorrow",
        0.9,
        "rain tomorrow",
    ));
    detail.fail_once();
    let weather = Arc::new(
        KeywordSkill::new("weather", "weather", 1.0, "sunny today")
            .with_followups(vec![detail.clone() as Arc<dyn Skill>]),
    );
    let (evaluator, speech, _input) = build(vec![weather as Arc<dyn Skill>]);
    let config = EvaluatorConfig::default();

    evaluator.evaluate("what is the weather").await;
    sleep(Duration::from_millis(100)).await;
    evaluator.evaluate("and tomorrow").await;
    sleep(Duration::from_millis(100)).await;

    // ネットワークエラー後もスタックは残っている
    assert_eq!(
        evaluator.batch_names().await,
        vec![
            vec!["weather_detail".to_string()],
            vec!["weather".to_string()]
        ]
    );

    evaluator.evaluate("and tomorrow").await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        speech.lines(),
        vec![
            "sunny today".to_string(),
            config.network_error_speech.clone(),
            "rain tomorrow".to_string()
        ]
    );
    let outcomes: Vec<TurnOutcome> = evaluator
        .interaction_log()
        .await
        .turns()
        .iter()
        .map(|t| t.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            TurnOutcome::Continued,
            TurnOutcome::Failed(ErrorClass::Network),
            TurnOutcome::Ended
        ]
    );
}
