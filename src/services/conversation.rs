use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::databases::messages::{Message, MessageStore};
use crate::errors::{ApiError, ApiResult};

pub const UNKNOWN_USER: &str = "Unknown";

/// Latest exchange with one counterpart. Derived per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user_id: Uuid,
    pub username: String,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    pub to: Option<String>,
    pub text: Option<String>,
}

/// Keeps the newest message per counterpart, newest conversation first.
///
/// The input is re-sorted by `(created_at, id)` descending before the scan,
/// so callers need not rely on the store's ordering.
pub fn latest_per_counterpart(user: Uuid, mut messages: Vec<Message>) -> Vec<(Uuid, Message)> {
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter_map(|message| {
            let counterpart = message.counterpart_of(user);
            seen.insert(counterpart).then_some((counterpart, message))
        })
        .collect()
}

pub async fn conversations_for<S>(store: &S, user: Uuid) -> Result<Vec<Conversation>, sqlx::Error>
where
    S: MessageStore + ?Sized,
{
    let messages = store.messages_involving(user).await?;
    let latest = latest_per_counterpart(user, messages);

    let counterparts: Vec<Uuid> = latest.iter().map(|(id, _)| *id).collect();
    let names = store.usernames(&counterparts).await?;

    Ok(latest
        .into_iter()
        .map(|(counterpart, message)| Conversation {
            user_id: counterpart,
            username: names
                .get(&counterpart)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            last_message: message.text,
            updated_at: message.created_at,
        })
        .collect())
}

/// Full history between `user` and `other`, oldest first.
///
/// `other` is taken verbatim from the request path. Anything that is not a
/// user id simply has no messages.
pub async fn thread_with<S>(store: &S, user: Uuid, other: &str) -> Result<Vec<Message>, sqlx::Error>
where
    S: MessageStore + ?Sized,
{
    let Ok(other) = Uuid::parse_str(other.trim()) else {
        return Ok(Vec::new());
    };

    let mut messages = store.messages_between(user, other).await?;
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(messages)
}

pub async fn send_message<S>(store: &S, from: Uuid, request: SendMessageRequest) -> ApiResult<Message>
where
    S: MessageStore + ?Sized,
{
    let (to, text) = match (request.to, request.text) {
        (Some(to), Some(text)) if !to.trim().is_empty() && !text.trim().is_empty() => (to, text),
        _ => return Err(ApiError::validation("Missing fields")),
    };

    let recipient = Uuid::parse_str(to.trim()).map_err(|_| ApiError::not_found("Recipient not found"))?;
    if !store.user_exists(recipient).await? {
        return Err(ApiError::not_found("Recipient not found"));
    }

    Ok(store.insert_message(from, recipient, &text).await?)
}

#[cfg(test)]
pub(crate) mod memory {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::databases::messages::{Message, MessageStore};

    /// In-memory store with a deterministic clock: every insert is one second
    /// after the previous one unless a timestamp is forced.
    #[derive(Default)]
    pub struct MemoryStore {
        users: Mutex<HashMap<Uuid, String>>,
        messages: Mutex<Vec<Message>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_user(&self, name: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.users.lock().unwrap().insert(id, name.to_string());
            id
        }

        pub fn remove_user(&self, id: Uuid) {
            self.users.lock().unwrap().remove(&id);
        }

        pub fn message_count(&self) -> usize {
            self.messages.lock().unwrap().len()
        }

        pub fn push_at(&self, from: Uuid, to: Uuid, text: &str, at: DateTime<Utc>) -> Message {
            let mut messages = self.messages.lock().unwrap();
            let message = Message {
                id: messages.len() as i64 + 1,
                sender: from,
                recipient: to,
                text: text.to_string(),
                created_at: at,
                read: false,
            };
            messages.push(message.clone());
            message
        }

        fn next_timestamp(&self) -> DateTime<Utc> {
            let count = self.messages.lock().unwrap().len() as i64;
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(count)
        }
    }

    #[async_trait]
    impl MessageStore for MemoryStore {
        async fn user_exists(&self, user: Uuid) -> Result<bool, sqlx::Error> {
            Ok(self.users.lock().unwrap().contains_key(&user))
        }

        async fn usernames(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, sqlx::Error> {
            let users = self.users.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| users.get(id).map(|name| (*id, name.clone())))
                .collect())
        }

        async fn insert_message(&self, from: Uuid, to: Uuid, text: &str) -> Result<Message, sqlx::Error> {
            let at = self.next_timestamp();
            Ok(self.push_at(from, to, text, at))
        }

        async fn messages_involving(&self, user: Uuid) -> Result<Vec<Message>, sqlx::Error> {
            let mut found: Vec<Message> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.sender == user || m.recipient == user)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(found)
        }

        async fn messages_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, sqlx::Error> {
            let mut found: Vec<Message> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| (m.sender == a && m.recipient == b) || (m.sender == b && m.recipient == a))
                .cloned()
                .collect();
            found.sort_by(|x, y| x.created_at.cmp(&y.created_at).then(x.id.cmp(&y.id)));
            Ok(found)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use chrono::{Duration, TimeZone};

    fn request(to: Uuid, text: &str) -> SendMessageRequest {
        SendMessageRequest {
            to: Some(to.to_string()),
            text: Some(text.to_string()),
        }
    }

    #[actix_web::test]
    async fn reply_becomes_last_message_and_thread_keeps_order() {
        let store = MemoryStore::new();
        let a = store.add_user("alice");
        let b = store.add_user("bob");

        send_message(&store, a, request(b, "hi")).await.unwrap();
        send_message(&store, b, request(a, "hello back")).await.unwrap();

        let conversations = conversations_for(&store, a).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].user_id, b);
        assert_eq!(conversations[0].username, "bob");
        assert_eq!(conversations[0].last_message, "hello back");

        let thread = thread_with(&store, a, &b.to_string()).await.unwrap();
        let texts: Vec<&str> = thread.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["hi", "hello back"]);
    }

    #[actix_web::test]
    async fn one_entry_per_counterpart_in_recency_order() {
        let store = MemoryStore::new();
        let me = store.add_user("me");
        let b = store.add_user("b");
        let c = store.add_user("c");
        let d = store.add_user("d");

        send_message(&store, me, request(b, "to b 1")).await.unwrap();
        send_message(&store, c, request(me, "from c 1")).await.unwrap();
        send_message(&store, me, request(d, "to d 1")).await.unwrap();
        send_message(&store, b, request(me, "from b 2")).await.unwrap();
        send_message(&store, me, request(c, "to c 2")).await.unwrap();
        // unrelated traffic must not show up
        send_message(&store, b, request(c, "b to c")).await.unwrap();

        let conversations = conversations_for(&store, me).await.unwrap();
        let summary: Vec<(Uuid, &str)> = conversations
            .iter()
            .map(|c| (c.user_id, c.last_message.as_str()))
            .collect();
        assert_eq!(summary, [(c, "to c 2"), (b, "from b 2"), (d, "to d 1")]);

        assert!(conversations
            .windows(2)
            .all(|pair| pair[0].updated_at >= pair[1].updated_at));
    }

    #[actix_web::test]
    async fn no_messages_means_no_conversations() {
        let store = MemoryStore::new();
        let loner = store.add_user("loner");
        assert!(conversations_for(&store, loner).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn deleted_counterpart_gets_placeholder_name() {
        let store = MemoryStore::new();
        let a = store.add_user("alice");
        let gone = store.add_user("gone");
        let b = store.add_user("bob");

        send_message(&store, gone, request(a, "bye")).await.unwrap();
        send_message(&store, b, request(a, "hey")).await.unwrap();
        store.remove_user(gone);

        let conversations = conversations_for(&store, a).await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].username, "bob");
        assert_eq!(conversations[1].user_id, gone);
        assert_eq!(conversations[1].username, UNKNOWN_USER);
    }

    #[test]
    fn dedup_sorts_its_input_first() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let message = |id: i64, offset: i64, text: &str| Message {
            id,
            sender: me,
            recipient: other,
            text: text.to_string(),
            created_at: base + Duration::minutes(offset),
            read: false,
        };

        // oldest first, the opposite of what the scan expects
        let input = vec![message(1, 0, "old"), message(2, 5, "middle"), message(3, 10, "new")];
        let latest = latest_per_counterpart(me, input);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].1.text, "new");
    }

    #[test]
    fn equal_timestamps_fall_back_to_insert_order() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let message = |id: i64, text: &str| Message {
            id,
            sender: other,
            recipient: me,
            text: text.to_string(),
            created_at: at,
            read: false,
        };

        let latest = latest_per_counterpart(me, vec![message(7, "first"), message(8, "second")]);
        assert_eq!(latest[0].1.text, "second");
    }

    #[actix_web::test]
    async fn thread_contains_only_the_pair() {
        let store = MemoryStore::new();
        let a = store.add_user("a");
        let b = store.add_user("b");
        let c = store.add_user("c");

        send_message(&store, a, request(b, "m1")).await.unwrap();
        send_message(&store, a, request(c, "not for b")).await.unwrap();
        send_message(&store, b, request(a, "m2")).await.unwrap();
        send_message(&store, c, request(b, "c to b")).await.unwrap();
        send_message(&store, a, request(b, "m3")).await.unwrap();

        let thread = thread_with(&store, b, &a.to_string()).await.unwrap();
        let texts: Vec<&str> = thread.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["m1", "m2", "m3"]);
    }

    #[actix_web::test]
    async fn thread_with_unknown_or_malformed_id_is_empty() {
        let store = MemoryStore::new();
        let a = store.add_user("a");

        assert!(thread_with(&store, a, "not-a-user").await.unwrap().is_empty());
        assert!(thread_with(&store, a, &Uuid::new_v4().to_string()).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_recipient_is_not_found_and_stores_nothing() {
        let store = MemoryStore::new();
        let a = store.add_user("a");

        let err = send_message(&store, a, request(Uuid::new_v4(), "hello?")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg == "Recipient not found"));

        let malformed = SendMessageRequest {
            to: Some("12345".to_string()),
            text: Some("hello?".to_string()),
        };
        let err = send_message(&store, a, malformed).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        assert_eq!(store.message_count(), 0);
    }

    #[actix_web::test]
    async fn missing_fields_are_rejected() {
        let store = MemoryStore::new();
        let a = store.add_user("a");
        let b = store.add_user("b");

        let cases = [
            SendMessageRequest { to: None, text: Some("hi".to_string()) },
            SendMessageRequest { to: Some(b.to_string()), text: None },
            SendMessageRequest { to: Some(b.to_string()), text: Some("   ".to_string()) },
            SendMessageRequest::default(),
        ];
        for case in cases {
            let err = send_message(&store, a, case).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(ref msg) if msg == "Missing fields"));
        }
        assert_eq!(store.message_count(), 0);
    }

    #[actix_web::test]
    async fn repeated_sends_create_duplicates() {
        let store = MemoryStore::new();
        let a = store.add_user("a");
        let b = store.add_user("b");

        let first = send_message(&store, a, request(b, "same")).await.unwrap();
        let second = send_message(&store, a, request(b, "same")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.created_at < second.created_at);
        assert!(!second.read);
        assert_eq!(thread_with(&store, a, &b.to_string()).await.unwrap().len(), 2);
    }

    #[test]
    fn message_serializes_with_wire_names() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let value = serde_json::to_value(Message {
            id: 1,
            sender: from,
            recipient: to,
            text: "hi".to_string(),
            created_at: at,
            read: false,
        })
        .unwrap();

        assert_eq!(value["from"], from.to_string());
        assert_eq!(value["to"], to.to_string());
        assert_eq!(value["createdAt"], "2024-05-01T12:00:00Z");
        assert_eq!(value["read"], false);
    }

    #[test]
    fn conversation_serializes_with_wire_names() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let counterpart = Uuid::new_v4();
        let value = serde_json::to_value(Conversation {
            user_id: counterpart,
            username: "bob".to_string(),
            last_message: "hello back".to_string(),
            updated_at: at,
        })
        .unwrap();

        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["lastMessage", "updatedAt", "userId", "username"]);
        assert_eq!(value["userId"], counterpart.to_string());
        assert_eq!(value["username"], "bob");
        assert_eq!(value["lastMessage"], "hello back");
        assert_eq!(value["updatedAt"], "2024-05-01T12:00:00Z");
    }
}
