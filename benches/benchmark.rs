use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};

use aizuchi::{
    HeadlineOutput, Skill, SkillOutput, SkillRanker, SkillResult, Tokenizer, Word, WordTokenizer,
};

struct BenchSkill {
    name: String,
    keywords: Vec<Word>,
}

impl BenchSkill {
    fn shared(name: &str, keywords: &[&str]) -> Arc<dyn Skill> {
        Arc::new(Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| Word::new(k)).collect(),
        })
    }
}

#[async_trait]
impl Skill for BenchSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, words: &[Word]) -> f64 {
        self.keywords.iter().filter(|k| words.contains(*k)).count() as f64
    }

    async fn process(&self, _words: &[Word]) -> SkillResult<Box<dyn SkillOutput>> {
        Ok(Box::new(HeadlineOutput::new(self.name.clone())))
    }
}

fn stacked_ranker() -> SkillRanker {
    let mut ranker = SkillRanker::new(vec![
        BenchSkill::shared("weather", &["weather", "rain", "sunny"]),
        BenchSkill::shared("timer", &["timer", "minutes", "seconds"]),
        BenchSkill::shared("calculator", &["plus", "minus", "times"]),
        BenchSkill::shared("lyrics", &["song", "lyrics", "singing"]),
    ]);
    for turn in 0..4 {
        ranker.add_batch_to_top(vec![
            BenchSkill::shared(&format!("followup_yes_{}", turn), &["yes", "sure"]),
            BenchSkill::shared(&format!("followup_no_{}", turn), &["no", "stop"]),
        ]);
    }
    ranker
}

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = WordTokenizer::new();
    c.bench_function("tokenize utterance", |b| {
        b.iter(|| tokenizer.tokenize("What's the weather like in Rome tomorrow morning?"))
    });
}

fn bench_ranking(c: &mut Criterion) {
    let ranker = stacked_ranker();
    let tokenizer = WordTokenizer::new();
    let words = tokenizer.tokenize("will it rain tomorrow or stay sunny");
    c.bench_function("rank stacked batches", |b| {
        b.iter(|| ranker.get_best(&words))
    });
}

// ベンチマークグループの定義
criterion_group!(benches, bench_tokenize, bench_ranking);
criterion_main!(benches);
