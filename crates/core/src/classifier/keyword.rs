//! In-process keyword-overlap classifier.
//!
//! Patterns are reduced to lowercase word sets. An utterance is matched to
//! the intent owning the pattern with the highest Jaccard overlap, and one
//! of that intent's responses is picked at random. Utterances that share no
//! word with any pattern get the fallback reply.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use rand::seq::IndexedRandom;

use super::engine::{ClassifierError, IntentClassifier, TrainingIntent};
use crate::types::DbId;

/// Reply used when no intent matches the utterance.
pub const DEFAULT_FALLBACK_REPLY: &str = "I don't understand.";

struct IntentModel {
    tag: String,
    patterns: Vec<HashSet<String>>,
    responses: Vec<String>,
}

struct NpcModel {
    intents: Vec<IntentModel>,
}

impl NpcModel {
    fn build(intents: &[TrainingIntent]) -> Self {
        let intents = intents
            .iter()
            .filter(|intent| !intent.responses.is_empty())
            .map(|intent| IntentModel {
                tag: intent.tag.clone(),
                patterns: intent
                    .patterns
                    .iter()
                    .map(|p| tokenize(p))
                    .filter(|tokens| !tokens.is_empty())
                    .collect(),
                responses: intent.responses.clone(),
            })
            .filter(|intent| !intent.patterns.is_empty())
            .collect();
        Self { intents }
    }

    /// Best-scoring intent, first one wins on ties. `None` when nothing overlaps.
    fn best_match(&self, tokens: &HashSet<String>) -> Option<(&IntentModel, f64)> {
        let mut best: Option<(&IntentModel, f64)> = None;
        for intent in &self.intents {
            let score = intent
                .patterns
                .iter()
                .map(|pattern| jaccard(tokens, pattern))
                .fold(0.0_f64, f64::max);
            let improves = match best {
                Some((_, top)) => score > top,
                None => true,
            };
            if score > 0.0 && improves {
                best = Some((intent, score));
            }
        }
        best
    }
}

/// Default [`IntentClassifier`] used when no external engine is configured.
pub struct KeywordClassifier {
    models: RwLock<HashMap<DbId, Arc<NpcModel>>>,
    fallback: String,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::with_fallback(DEFAULT_FALLBACK_REPLY)
    }

    pub fn with_fallback(fallback: impl Into<String>) -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            fallback: fallback.into(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn train(&self, npc_id: DbId, intents: &[TrainingIntent]) -> Result<(), ClassifierError> {
        let model = NpcModel::build(intents);
        tracing::debug!(
            npc_id,
            supplied = intents.len(),
            usable = model.intents.len(),
            "Keyword model built",
        );
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(npc_id, Arc::new(model));
        Ok(())
    }

    async fn infer(&self, npc_id: DbId, utterance: &str) -> Result<String, ClassifierError> {
        let model = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&npc_id)
            .cloned()
            .ok_or(ClassifierError::ModelUnavailable { npc_id })?;

        let tokens = tokenize(utterance);
        let Some((intent, score)) = model.best_match(&tokens) else {
            return Ok(self.fallback.clone());
        };

        let reply = intent
            .responses
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| ClassifierError::Inference {
                npc_id,
                reason: format!("intent '{}' has no responses", intent.tag),
            })?;
        tracing::debug!(npc_id, tag = %intent.tag, score, "Utterance classified");
        Ok(reply)
    }

    async fn forget(&self, npc_id: DbId) {
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&npc_id);
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
