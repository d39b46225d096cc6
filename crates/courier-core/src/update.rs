//! Update model for the Courier framework.
//!
//! An [`Update`] is one event record received from the remote platform. It
//! carries a monotonically increasing sequence id (`update_id` on the wire,
//! used as the poll cursor) and exactly one payload variant describing what
//! happened. The payload is decoded once at the acquisition boundary into
//! the closed [`UpdatePayload`] enum; everything downstream matches on
//! [`UpdateKind`] and never re-inspects raw JSON.
//!
//! Payload structs are intentionally shallow: they carry just enough
//! structure for routing decisions (which chat, what text). Handlers that
//! need more issue follow-up calls through the injected client handle.

use serde::{Deserialize, Serialize};

// ============================================================================
// Update envelope
// ============================================================================

/// One event record from the remote platform.
///
/// The wire shape is a JSON object with an `update_id` field plus exactly
/// one payload field named after the update kind:
///
/// ```json
/// {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 5, "type": "private"}}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing sequence id, used as the poll cursor.
    #[serde(rename = "update_id")]
    pub id: i64,

    /// The event payload, tagged by kind.
    #[serde(flatten)]
    pub payload: UpdatePayload,
}

impl Update {
    /// Returns the kind discriminant of this update's payload.
    pub fn kind(&self) -> UpdateKind {
        self.payload.kind()
    }

    /// Returns the chat this update originated from, when it has one.
    ///
    /// Inline queries, polls and payment queries are not bound to a chat
    /// and return `None`.
    pub fn chat(&self) -> Option<&Chat> {
        match &self.payload {
            UpdatePayload::Message(m)
            | UpdatePayload::EditedMessage(m)
            | UpdatePayload::ChannelPost(m)
            | UpdatePayload::EditedChannelPost(m) => Some(&m.chat),
            UpdatePayload::CallbackQuery(q) => q.message.as_ref().map(|m| &m.chat),
            UpdatePayload::MyChatMember(u) | UpdatePayload::ChatMember(u) => Some(&u.chat),
            UpdatePayload::ChatJoinRequest(r) => Some(&r.chat),
            UpdatePayload::ChatBoost(b) => Some(&b.chat),
            UpdatePayload::RemovedChatBoost(b) => Some(&b.chat),
            _ => None,
        }
    }

    /// Returns the message text for message-like updates.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            UpdatePayload::Message(m)
            | UpdatePayload::EditedMessage(m)
            | UpdatePayload::ChannelPost(m)
            | UpdatePayload::EditedChannelPost(m) => m.text.as_deref(),
            _ => None,
        }
    }

    /// Returns the user who triggered this update, when known.
    pub fn from(&self) -> Option<&User> {
        match &self.payload {
            UpdatePayload::Message(m)
            | UpdatePayload::EditedMessage(m)
            | UpdatePayload::ChannelPost(m)
            | UpdatePayload::EditedChannelPost(m) => m.from.as_ref(),
            UpdatePayload::InlineQuery(q) => Some(&q.from),
            UpdatePayload::ChosenInlineResult(r) => Some(&r.from),
            UpdatePayload::CallbackQuery(q) => Some(&q.from),
            UpdatePayload::ShippingQuery(q) => Some(&q.from),
            UpdatePayload::PreCheckoutQuery(q) => Some(&q.from),
            UpdatePayload::MyChatMember(u) | UpdatePayload::ChatMember(u) => Some(&u.from),
            UpdatePayload::ChatJoinRequest(r) => Some(&r.from),
            _ => None,
        }
    }
}

// ============================================================================
// Payload variants
// ============================================================================

/// The closed set of event payloads, one variant per update kind.
///
/// On the wire each variant is an object keyed by the snake_case kind name,
/// which is exactly serde's externally tagged representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePayload {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    InlineQuery(InlineQuery),
    ChosenInlineResult(ChosenInlineResult),
    CallbackQuery(CallbackQuery),
    ShippingQuery(ShippingQuery),
    PreCheckoutQuery(PreCheckoutQuery),
    Poll(Poll),
    PollAnswer(PollAnswer),
    MyChatMember(ChatMemberUpdated),
    ChatMember(ChatMemberUpdated),
    ChatJoinRequest(ChatJoinRequest),
    ChatBoost(ChatBoostUpdated),
    RemovedChatBoost(ChatBoostRemoved),
}

impl UpdatePayload {
    /// Returns the kind discriminant of this payload.
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Message(_) => UpdateKind::Message,
            Self::EditedMessage(_) => UpdateKind::EditedMessage,
            Self::ChannelPost(_) => UpdateKind::ChannelPost,
            Self::EditedChannelPost(_) => UpdateKind::EditedChannelPost,
            Self::InlineQuery(_) => UpdateKind::InlineQuery,
            Self::ChosenInlineResult(_) => UpdateKind::ChosenInlineResult,
            Self::CallbackQuery(_) => UpdateKind::CallbackQuery,
            Self::ShippingQuery(_) => UpdateKind::ShippingQuery,
            Self::PreCheckoutQuery(_) => UpdateKind::PreCheckoutQuery,
            Self::Poll(_) => UpdateKind::Poll,
            Self::PollAnswer(_) => UpdateKind::PollAnswer,
            Self::MyChatMember(_) => UpdateKind::MyChatMember,
            Self::ChatMember(_) => UpdateKind::ChatMember,
            Self::ChatJoinRequest(_) => UpdateKind::ChatJoinRequest,
            Self::ChatBoost(_) => UpdateKind::ChatBoost,
            Self::RemovedChatBoost(_) => UpdateKind::RemovedChatBoost,
        }
    }
}

/// Fieldless discriminant for [`UpdatePayload`].
///
/// Used as the router's bucket key and, via [`UpdateKind::as_str`], as the
/// wire value in the allowed-kinds list of a fetch or webhook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    ShippingQuery,
    PreCheckoutQuery,
    Poll,
    PollAnswer,
    MyChatMember,
    ChatMember,
    ChatJoinRequest,
    ChatBoost,
    RemovedChatBoost,
}

impl UpdateKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::InlineQuery => "inline_query",
            Self::ChosenInlineResult => "chosen_inline_result",
            Self::CallbackQuery => "callback_query",
            Self::ShippingQuery => "shipping_query",
            Self::PreCheckoutQuery => "pre_checkout_query",
            Self::Poll => "poll",
            Self::PollAnswer => "poll_answer",
            Self::MyChatMember => "my_chat_member",
            Self::ChatMember => "chat_member",
            Self::ChatJoinRequest => "chat_join_request",
            Self::ChatBoost => "chat_boost",
            Self::RemovedChatBoost => "removed_chat_boost",
        }
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payload structs
// ============================================================================

/// A platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Chat category, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// The chat an update originated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A chat message (also used for edited messages and channel posts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// An incoming inline query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
}

/// An inline result the user picked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
}

/// A callback button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A shipping address confirmation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub invoice_payload: String,
}

/// A pre-checkout confirmation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub total_amount: i64,
    #[serde(default)]
    pub invoice_payload: String,
}

/// A poll state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub is_closed: bool,
}

/// A user changing their vote in a non-anonymous poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollAnswer {
    pub poll_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

/// A change in a member's status within a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: User,
}

/// A request to join a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatJoinRequest {
    pub chat: Chat,
    pub from: User,
}

/// A boost added to a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBoostUpdated {
    pub chat: Chat,
}

/// A boost removed from a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBoostRemoved {
    pub chat: Chat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_message_update() {
        let raw = r#"{
            "update_id": 42,
            "message": {
                "message_id": 7,
                "chat": {"id": 100, "type": "private"},
                "from": {"id": 1, "first_name": "Ada"},
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.id, 42);
        assert_eq!(update.kind(), UpdateKind::Message);
        assert_eq!(update.text(), Some("/start"));
        assert_eq!(update.chat().unwrap().kind, ChatType::Private);
    }

    #[test]
    fn decodes_callback_query_update() {
        let raw = r#"{
            "update_id": 43,
            "callback_query": {
                "id": "abc",
                "from": {"id": 1, "first_name": "Ada"},
                "data": "confirm"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.kind(), UpdateKind::CallbackQuery);
        assert!(update.chat().is_none());
        assert_eq!(update.from().map(|u| u.id), Some(1));
    }

    #[test]
    fn rejects_unknown_payload_tag() {
        let raw = r#"{"update_id": 1, "carrier_pigeon": {}}"#;
        assert!(serde_json::from_str::<Update>(raw).is_err());
    }

    #[test]
    fn serializes_to_wire_shape() {
        let update = Update {
            id: 9,
            payload: UpdatePayload::Message(Message {
                id: 1,
                chat: Chat {
                    id: 5,
                    kind: ChatType::Group,
                    title: None,
                    username: None,
                },
                from: None,
                text: Some("hi".into()),
            }),
        };

        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["update_id"], 9);
        assert_eq!(value["message"]["text"], "hi");
    }

    #[test]
    fn kind_wire_names_round_trip() {
        for kind in [
            UpdateKind::Message,
            UpdateKind::EditedChannelPost,
            UpdateKind::ChatJoinRequest,
            UpdateKind::RemovedChatBoost,
        ] {
            let encoded = serde_json::to_string(&kind).unwrap();
            assert_eq!(encoded, format!("\"{}\"", kind.as_str()));
            let decoded: UpdateKind = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, kind);
        }
    }
}
