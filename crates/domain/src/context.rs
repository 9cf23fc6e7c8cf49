//! Request-scoped context passed explicitly to every operation.

use common::ConversationId;
use uuid::Uuid;

/// Per-message (or per-request) context.
///
/// Carries the trace identity of the unit of work and the correlation data
/// it was triggered with. Outbound events take their `traceparent` from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    trace_id: String,
    span_id: String,
    conversation_id: Option<ConversationId>,
    message_id: Option<String>,
}

impl RequestContext {
    /// Starts a new trace.
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
            conversation_id: None,
            message_id: None,
        }
    }

    /// Continues the trace of an upstream W3C `traceparent` header.
    ///
    /// Falls back to a new trace when the header is missing or malformed.
    pub fn from_traceparent(traceparent: Option<&str>) -> Self {
        match traceparent.and_then(parse_trace_id) {
            Some(trace_id) => Self {
                trace_id,
                ..Self::new()
            },
            None => {
                if let Some(raw) = traceparent {
                    tracing::debug!(traceparent = raw, "ignoring malformed traceparent");
                }
                Self::new()
            }
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: Option<ConversationId>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// W3C `traceparent` value identifying this unit of work.
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-01", self.trace_id, self.span_id)
    }

    /// Span covering the unit of work, carrying its correlation fields.
    pub fn span(&self, name: &'static str) -> tracing::Span {
        tracing::info_span!(
            "request",
            operation = name,
            trace_id = %self.trace_id,
            conversation_id = self.conversation_id.as_ref().map(|c| c.as_str()),
            message_id = self.message_id.as_deref(),
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn new_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

fn parse_trace_id(traceparent: &str) -> Option<String> {
    let mut parts = traceparent.trim().split('-');
    let _version = parts.next().filter(|v| v.len() == 2)?;
    let trace_id = parts.next().filter(|t| is_hex(t, 32))?;
    let _parent = parts.next().filter(|p| is_hex(p, 16))?;
    let _flags = parts.next().filter(|f| f.len() == 2)?;
    if trace_id.bytes().all(|b| b == b'0') {
        return None;
    }
    Some(trace_id.to_ascii_lowercase())
}

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}
