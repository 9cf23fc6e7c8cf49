//! Event publisher that wraps events in CloudEvent envelopes and keeps them
//! in memory.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::{CloudEvent, ConversationId};

use crate::context::RequestContext;
use crate::events::{DomainEvent, InventoryEvent};
use crate::ports::EventPublisher;

#[derive(Debug, Default)]
struct PublisherState {
    published: Vec<CloudEvent<serde_json::Value>>,
    fail_on_publish: bool,
}

/// In-memory event bus.
///
/// Every accepted event is kept in publication order. Failures are logged and
/// swallowed, matching the fire-and-forget contract of [`EventPublisher`].
#[derive(Debug, Clone)]
pub struct InMemoryEventPublisher {
    source: String,
    bus_name: String,
    state: Arc<RwLock<PublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates a publisher emitting with source `<env>.inventory`.
    pub fn new(env: &str, bus_name: impl Into<String>) -> Self {
        Self {
            source: format!("{env}.inventory"),
            bus_name: bus_name.into(),
            state: Arc::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    /// Makes every subsequent publish fail until reset.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_publish = fail;
    }

    /// Envelopes accepted so far, oldest first.
    pub fn published(&self) -> Vec<CloudEvent<serde_json::Value>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .clone()
    }

    /// Type strings of the envelopes accepted so far, oldest first.
    pub fn published_types(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(
        &self,
        ctx: &RequestContext,
        event: InventoryEvent,
        conversation_id: Option<&ConversationId>,
    ) {
        let event_type = event.event_type();

        let data = match event.payload() {
            Ok(data) => data,
            Err(error) => {
                tracing::error!(event_type, %error, "failed to serialize event payload");
                return;
            }
        };

        let envelope = CloudEvent::new(event_type, self.source.as_str(), data)
            .with_traceparent(Some(ctx.traceparent()))
            .with_conversation_id(conversation_id.cloned());

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_publish {
            tracing::error!(
                event_type,
                event_id = %envelope.id,
                bus = %self.bus_name,
                "failed to publish event"
            );
            return;
        }

        tracing::info!(
            event_type,
            event_id = %envelope.id,
            bus = %self.bus_name,
            "published event"
        );
        state.published.push(envelope);
    }
}
