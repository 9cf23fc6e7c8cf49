//! CloudEvents-style envelope shared by inbound and outbound events.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConversationId, EventId};

/// Envelope wrapping every event that crosses the service boundary.
///
/// Inbound producers are not required to send every attribute, so all
/// metadata fields fall back to defaults on decode. Only `data` is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudEvent<T> {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub source: String,

    #[serde(rename = "type", default)]
    pub event_type: String,

    /// RFC 3339 timestamp. Kept as text because upstream producers disagree
    /// on the exact format.
    #[serde(default)]
    pub time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,

    pub data: T,
}

impl<T> CloudEvent<T> {
    /// Wraps `data` in a fresh envelope with a new id and the current time.
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: T) -> Self {
        Self {
            id: EventId::new().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            traceparent: None,
            conversation_id: None,
            data,
        }
    }

    /// Sets the W3C trace-propagation header value.
    pub fn with_traceparent(mut self, traceparent: Option<String>) -> Self {
        self.traceparent = traceparent;
        self
    }

    /// Tags the envelope with the order conversation it belongs to.
    pub fn with_conversation_id(mut self, conversation_id: Option<ConversationId>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    /// Maps the payload, keeping all envelope attributes.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CloudEvent<U> {
        CloudEvent {
            id: self.id,
            source: self.source,
            event_type: self.event_type,
            time: self.time,
            traceparent: self.traceparent,
            conversation_id: self.conversation_id,
            data: f(self.data),
        }
    }

    /// Fallible [`Self::map`].
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<CloudEvent<U>, E> {
        let data = f(self.data)?;
        Ok(CloudEvent {
            id: self.id,
            source: self.source,
            event_type: self.event_type,
            time: self.time,
            traceparent: self.traceparent,
            conversation_id: self.conversation_id,
            data,
        })
    }
}
