use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Any role name the chat template does not understand. Kept verbatim so
    /// the encoder can reject it with the offending name.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(name) => name.as_str(),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a conversation.
///
/// `reasoning` is only meaningful on assistant turns. `None` means reasoning
/// was not tracked separately, in which case the template falls back to any
/// inline `<think>...</think>` block inside `content`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Turn {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(
        default,
        alias = "reasoning_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning: Option<String>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_reasoning(
        content: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            reasoning: Some(reasoning.into()),
        }
    }

    /// Reasoning that was recorded explicitly and is non-empty.
    pub fn explicit_reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecodedCompletion {
    pub visible: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// A decoded completion paired with the counters the model boundary reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssistantReply {
    pub visible: String,
    pub reasoning: String,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl AssistantReply {
    pub fn from_decoded(decoded: DecodedCompletion, usage: TokenUsage) -> Self {
        Self {
            visible: decoded.visible,
            reasoning: decoded.reasoning,
            usage,
            finish_reason: None,
        }
    }

    pub fn to_turn(&self) -> Turn {
        Turn::assistant_with_reasoning(self.visible.clone(), self.reasoning.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub op: Op,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
    UserTurn {
        text: String,
        #[serde(default, skip_serializing_if = "UserTurnOptions::is_empty")]
        options: UserTurnOptions,
    },
    Reset {
        #[serde(default)]
        system_prompt: Option<String>,
    },
    Interrupt,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserTurnOptions {
    #[serde(default)]
    pub thinking_enabled: Option<bool>,
}

impl UserTurnOptions {
    fn is_empty(options: &Self) -> bool {
        options.thinking_enabled.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub msg: EventMsg,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMsg {
    SessionConfigured(SessionConfiguredEvent),
    TaskStarted(TaskStartedEvent),
    TurnComplete(TurnCompleteEvent),
    HistoryReset,
    TurnAborted(TurnAbortedEvent),
    ShutdownComplete,
    Error(ErrorEvent),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SessionConfiguredEvent {
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TaskStartedEvent {
    pub turn_index: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TurnCompleteEvent {
    pub visible: String,
    pub reasoning: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl From<&AssistantReply> for TurnCompleteEvent {
    fn from(reply: &AssistantReply) -> Self {
        Self {
            visible: reply.visible.clone(),
            reasoning: reply.reasoning.clone(),
            input_tokens: reply.usage.input_tokens,
            output_tokens: reply.usage.output_tokens,
            finish_reason: reply.finish_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TurnAbortedEvent {
    pub reason: TurnAbortReason,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnAbortReason {
    UserInterrupt,
    Shutdown,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_accepts_reasoning_content_alias_and_unknown_roles() {
        let turns: Vec<Turn> = serde_json::from_str(
            r#"[
                {"role":"user","content":"hi"},
                {"role":"assistant","content":"hello","reasoning_content":"greet back"},
                {"role":"tool","content":"{}"}
            ]"#,
        )
        .expect("deserialize turns");

        assert_eq!(turns[0], Turn::user("hi"));
        assert_eq!(turns[1], Turn::assistant_with_reasoning("hello", "greet back"));
        assert_eq!(turns[2].role, Role::Other("tool".to_string()));

        let json = serde_json::to_string(&turns[2]).expect("serialize turn");
        assert_eq!(json, r#"{"role":"tool","content":"{}"}"#);
    }

    #[test]
    fn explicit_reasoning_ignores_empty_strings() {
        assert_eq!(Turn::assistant("a").explicit_reasoning(), None);
        assert_eq!(
            Turn::assistant_with_reasoning("a", "").explicit_reasoning(),
            None
        );
        assert_eq!(
            Turn::assistant_with_reasoning("a", "r").explicit_reasoning(),
            Some("r")
        );
    }

    #[test]
    fn op_roundtrip_uses_tagged_variant() {
        let submission = Submission {
            id: "sub-1".to_string(),
            op: Op::UserTurn {
                text: "hello".to_string(),
                options: UserTurnOptions {
                    thinking_enabled: Some(false),
                },
            },
        };

        let json = serde_json::to_string(&submission).expect("serialize submission");
        assert!(json.contains("\"type\":\"user_turn\""));

        let decoded: Submission = serde_json::from_str(&json).expect("deserialize submission");
        assert_eq!(decoded, submission);

        let minimal: Submission =
            serde_json::from_str(r#"{"id":"s","op":{"type":"user_turn","text":"x"}}"#)
                .expect("deserialize minimal submission");
        assert!(matches!(
            minimal.op,
            Op::UserTurn { options, .. } if options == UserTurnOptions::default()
        ));
    }

    #[test]
    fn event_roundtrip_uses_tagged_variant() {
        let reply = AssistantReply {
            visible: "The answer is 4.".to_string(),
            reasoning: "2+2=4".to_string(),
            usage: TokenUsage {
                input_tokens: 12,
                output_tokens: 7,
            },
            finish_reason: Some("stop".to_string()),
        };
        let event = Event {
            id: "sub-1".to_string(),
            msg: EventMsg::TurnComplete(TurnCompleteEvent::from(&reply)),
        };

        let json = serde_json::to_string(&event).expect("serialize event");
        assert!(json.contains("\"type\":\"turn_complete\""));
        assert!(json.contains("\"input_tokens\":12"));

        let decoded: Event = serde_json::from_str(&json).expect("deserialize event");
        assert_eq!(decoded, event);
    }
}
