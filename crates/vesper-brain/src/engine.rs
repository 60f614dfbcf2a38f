use crate::client::ReasoningClient;
use crate::directive::{parse_control, AssistantDirective};
use crate::history::ConversationHistory;

/// Spoken when the reasoning service is unreachable or returns garbage.
const FALLBACK_REPLIES: &[&str] = &[
    "Sorry, I couldn't think of an answer just now.",
    "I'm having trouble reaching my brain at the moment. Try again in a bit.",
    "Apologies, something went wrong on my end.",
];

/// One completed turn of the conversation.
pub struct Exchange {
    /// Text to speak back to the user.
    pub reply: String,
    /// What the loop should do after speaking.
    pub directive: AssistantDirective,
}

/// Conversation state machine: control phrases, bounded history, and
/// the remote reasoning call with a spoken fallback on failure.
pub struct ConversationEngine {
    client: Box<dyn ReasoningClient>,
    history: ConversationHistory,
    persona: String,
}

impl ConversationEngine {
    pub fn new(client: Box<dyn ReasoningClient>, assistant_name: &str, history_limit: usize) -> Self {
        Self {
            client,
            history: ConversationHistory::new(history_limit),
            persona: build_persona(assistant_name),
        }
    }

    /// Handle one transcribed utterance and produce the spoken reply.
    ///
    /// Control phrases are resolved locally and never reach the remote
    /// service. A reasoning failure keeps the user turn in history so
    /// the next attempt still has it for context.
    pub async fn respond(&mut self, transcript: &str) -> Exchange {
        if let Some(directive) = parse_control(transcript) {
            return match directive {
                AssistantDirective::Shutdown => Exchange {
                    reply: "Goodbye!".into(),
                    directive,
                },
                AssistantDirective::Reset => {
                    self.history.clear();
                    Exchange {
                        reply: "Okay, starting fresh.".into(),
                        directive,
                    }
                }
                AssistantDirective::Continue => unreachable!("parse_control never yields Continue"),
            };
        }

        self.history.push_user(transcript);

        match self.client.complete(&self.persona, &self.history).await {
            Ok(reply) => {
                self.history.push_assistant(&reply);
                Exchange {
                    reply,
                    directive: AssistantDirective::Continue,
                }
            }
            Err(e) => {
                tracing::warn!("Reasoning request failed: {}", e);
                let reply = FALLBACK_REPLIES[fastrand::usize(..FALLBACK_REPLIES.len())];
                Exchange {
                    reply: reply.to_string(),
                    directive: AssistantDirective::Continue,
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

fn build_persona(assistant_name: &str) -> String {
    format!(
        "You are {assistant_name}, a voice assistant. Your replies are read aloud, \
         so answer in one or two short conversational sentences of plain spoken \
         English. No markdown, no lists, no code."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BrainError, ReasoningClient};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubClient {
        calls: Arc<AtomicUsize>,
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl ReasoningClient for StubClient {
        async fn complete(
            &self,
            _system: &str,
            _history: &ConversationHistory,
        ) -> Result<String, BrainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(BrainError::Malformed("stub failure".into())),
            }
        }
    }

    fn engine_with(reply: Result<String, ()>) -> (ConversationEngine, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = StubClient {
            calls: calls.clone(),
            reply,
        };
        (ConversationEngine::new(Box::new(client), "Vesper", 20), calls)
    }

    #[tokio::test]
    async fn success_appends_both_turns() {
        let (mut engine, calls) = engine_with(Ok("It is noon.".into()));
        let exchange = engine.respond("what time is it").await;

        assert_eq!(exchange.reply, "It is noon.");
        assert!(matches!(exchange.directive, AssistantDirective::Continue));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.history().len(), 2);
    }

    #[tokio::test]
    async fn failure_keeps_user_turn_without_assistant_turn() {
        let (mut engine, _) = engine_with(Err(()));
        let exchange = engine.respond("what time is it").await;

        assert!(matches!(exchange.directive, AssistantDirective::Continue));
        assert!(FALLBACK_REPLIES.contains(&exchange.reply.as_str()));
        assert_eq!(engine.history().len(), 1);
        let last = engine.history().last().unwrap();
        assert_eq!(last.text, "what time is it");
    }

    #[tokio::test]
    async fn control_phrase_never_reaches_remote_service() {
        let (mut engine, calls) = engine_with(Ok("unused".into()));
        engine.respond("hello there").await;
        assert_eq!(engine.history().len(), 2);

        let exchange = engine.respond("reset conversation").await;
        assert!(matches!(exchange.directive, AssistantDirective::Reset));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.history().is_empty());

        let exchange = engine.respond("Goodbye.").await;
        assert!(matches!(exchange.directive, AssistantDirective::Shutdown));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
