//! Follow-up question suggestions, generated off the critical path.
//!
//! Suggestions run as a fire-and-forget task after a generation settles.
//! They are strictly best-effort: any failure is logged at debug level and
//! yields an empty list, never an error surfaced to the conversation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::{LanguageModel, ModelEvent, TurnRequest, WireMessage};

const SUGGESTION_PROMPT: &str = "Suggest three short follow-up questions the \
user might ask next, based on the conversation so far. Reply with one \
question per line and nothing else.";

const MAX_QUESTIONS: usize = 3;

/// A source of follow-up question suggestions.
#[async_trait]
pub trait RelatedQuestionsSource: Send + Sync {
    /// Suggest follow-ups for the given exchange. Failures surface as an
    /// empty list.
    async fn related_questions(&self, user_text: &str, assistant_text: &str) -> Vec<String>;
}

/// Model-backed suggestion source.
pub struct ModelRelatedQuestions {
    model: Arc<dyn LanguageModel>,
}

impl ModelRelatedQuestions {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl RelatedQuestionsSource for ModelRelatedQuestions {
    async fn related_questions(&self, user_text: &str, assistant_text: &str) -> Vec<String> {
        let request = TurnRequest {
            system: SUGGESTION_PROMPT.to_string(),
            messages: vec![
                WireMessage::user_text(user_text),
                WireMessage::assistant(assistant_text, vec![]),
                WireMessage::user_text("What should I ask next?"),
            ],
            tools: vec![],
        };

        let mut stream = match self.model.stream_turn(request).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(error = %e, "related questions unavailable");
                return Vec::new();
            }
        };

        let mut text = String::new();
        while let Some(event) = stream.recv().await {
            match event {
                Ok(ModelEvent::TextDelta(delta)) => text.push_str(&delta),
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "related questions stream failed");
                    return Vec::new();
                }
            }
        }

        parse_questions(&text)
    }
}

/// Spawn suggestion generation without blocking the caller. The handle is
/// returned for callers that want the result; dropping it is fine.
pub fn spawn_related_questions(
    source: Arc<dyn RelatedQuestionsSource>,
    user_text: String,
    assistant_text: String,
) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        source
            .related_questions(&user_text, &assistant_text)
            .await
    })
}

fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(MAX_QUESTIONS)
        .map(str::to_string)
        .collect()
}

/// Remove a leading bullet or `1.` / `1)` enumerator. A bare number that is
/// part of the question itself ("2024 plans?") is left alone.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ModelStream};
    use tokio::sync::mpsc;

    struct FixedModel {
        reply: Option<String>,
    }

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn stream_turn(&self, _request: TurnRequest) -> Result<ModelStream, ModelError> {
            match &self.reply {
                Some(reply) => {
                    let (tx, rx) = mpsc::channel(4);
                    let reply = reply.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(Ok(ModelEvent::TextDelta(reply))).await;
                    });
                    Ok(ModelStream::new(rx))
                }
                None => Err(ModelError::Api {
                    status: 503,
                    body: "down".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn parses_one_question_per_line() {
        let source = ModelRelatedQuestions::new(Arc::new(FixedModel {
            reply: Some("1. What about rain?\n2. Is it humid?\n3. Weekend forecast?\n".into()),
        }));
        let questions = source
            .related_questions("weather in Bangalore", "It is 28C and cloudy.")
            .await;
        assert_eq!(
            questions,
            vec!["What about rain?", "Is it humid?", "Weekend forecast?"]
        );
    }

    #[tokio::test]
    async fn failure_yields_empty_list() {
        let source = ModelRelatedQuestions::new(Arc::new(FixedModel { reply: None }));
        let questions = source.related_questions("hi", "hello").await;
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn spawned_task_resolves_independently() {
        let source: Arc<dyn RelatedQuestionsSource> =
            Arc::new(ModelRelatedQuestions::new(Arc::new(FixedModel {
                reply: Some("Only one?".into()),
            })));
        let handle = spawn_related_questions(source, "q".into(), "a".into());
        let questions = handle.await.unwrap();
        assert_eq!(questions, vec!["Only one?"]);
    }

    #[test]
    fn caps_at_three_questions() {
        let questions = parse_questions("a?\nb?\nc?\nd?\ne?");
        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn strips_enumerators_but_not_leading_numbers() {
        let questions = parse_questions("1. What changed?\n2) Why now?\n- How?\n");
        assert_eq!(questions, vec!["What changed?", "Why now?", "How?"]);

        let questions = parse_questions("2024 plans?\n42 is the answer?");
        assert_eq!(questions, vec!["2024 plans?", "42 is the answer?"]);
    }
}
