//! Prompt assembly for a completion round.

use crate::config::AgentConfig;
use crate::core::llm::ChatMessage;

use super::messages::{Role, Utterance};
use super::turn::{CompletionRequest, InteractionKind, ToolExchange};

/// Build the messages for one round.
///
/// Order: system instruction, transcript, the prior tool exchange (assistant
/// tool call followed by its result) if any, then the reminder nudge for
/// `reminder_required` turns.
pub fn build_messages(
    agent: &AgentConfig,
    request: &CompletionRequest,
    prior: Option<&ToolExchange>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.transcript.len() + 4);
    messages.push(ChatMessage::System(agent.system_prompt.clone()));
    messages.extend(request.transcript.iter().map(transcript_message));

    if let Some(exchange) = prior {
        messages.push(ChatMessage::AssistantToolCall {
            id: exchange.invocation_id.clone(),
            name: exchange.name.clone(),
            arguments: exchange.arguments.clone(),
        });
        messages.push(ChatMessage::Tool {
            tool_call_id: exchange.invocation_id.clone(),
            content: exchange.result.clone(),
        });
    }

    if request.kind == InteractionKind::ReminderRequired {
        messages.push(ChatMessage::User(agent.reminder_prompt.clone()));
    }

    messages
}

fn transcript_message(utterance: &Utterance) -> ChatMessage {
    match utterance.role {
        Role::Agent => ChatMessage::Assistant(utterance.content.clone()),
        Role::User | Role::Other => ChatMessage::User(utterance.content.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utterance(role: Role, content: &str) -> Utterance {
        Utterance {
            role,
            content: content.to_string(),
        }
    }

    fn request(kind: InteractionKind) -> CompletionRequest {
        CompletionRequest {
            response_id: 2,
            transcript: vec![
                utterance(Role::Agent, "Hola, ¿en qué puedo ayudarte?"),
                utterance(Role::User, "Quiero una limpieza"),
            ],
            kind,
        }
    }

    #[test]
    fn test_transcript_roles_are_mapped() {
        let agent = AgentConfig::default();
        let messages = build_messages(&agent, &request(InteractionKind::ResponseRequired), None);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ChatMessage::System(agent.system_prompt.clone()));
        assert_eq!(
            messages[1],
            ChatMessage::Assistant("Hola, ¿en qué puedo ayudarte?".into())
        );
        assert_eq!(messages[2], ChatMessage::User("Quiero una limpieza".into()));
    }

    #[test]
    fn test_other_speakers_are_sent_as_user() {
        let agent = AgentConfig::default();
        let request = CompletionRequest {
            response_id: 4,
            transcript: vec![utterance(Role::Other, "Le paso con recepción")],
            kind: InteractionKind::ResponseRequired,
        };

        let messages = build_messages(&agent, &request, None);
        assert_eq!(messages[1], ChatMessage::User("Le paso con recepción".into()));
    }

    #[test]
    fn test_reminder_appends_nudge_last() {
        let agent = AgentConfig::default();
        let messages = build_messages(&agent, &request(InteractionKind::ReminderRequired), None);

        assert_eq!(
            messages.last(),
            Some(&ChatMessage::User(agent.reminder_prompt.clone()))
        );
    }

    #[test]
    fn test_prior_exchange_follows_transcript() {
        let agent = AgentConfig::default();
        let exchange = ToolExchange {
            invocation_id: "call_7".into(),
            name: "check_availability".into(),
            arguments: json!({"date": "2024-05-01"}),
            result: "Hay hueco a las 10".into(),
        };
        let messages = build_messages(
            &agent,
            &request(InteractionKind::ReminderRequired),
            Some(&exchange),
        );

        assert_eq!(messages.len(), 6);
        assert_eq!(
            messages[3],
            ChatMessage::AssistantToolCall {
                id: "call_7".into(),
                name: "check_availability".into(),
                arguments: json!({"date": "2024-05-01"}),
            }
        );
        assert_eq!(
            messages[4],
            ChatMessage::Tool {
                tool_call_id: "call_7".into(),
                content: "Hay hueco a las 10".into(),
            }
        );
        assert!(matches!(messages[5], ChatMessage::User(_)));
    }
}
