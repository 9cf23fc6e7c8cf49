//! Batch processing of queue messages with per-message failure reporting.

use std::time::Instant;

use common::CloudEvent;
use domain::{
    EventPublisher, InventoryItemRepository, OrderCache, ProductCatalogue, RequestContext,
};
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::error::{AclError, Result};
use crate::events::{ORDER_COMPLETED_V1, ORDER_CREATED_V1, PRODUCT_CREATED_V1};
use crate::handler::ExternalEventHandler;
use crate::message::{BatchResponse, BusMessage, QueueMessage};
use crate::state::MessageState;

/// Processes queue batches one message at a time.
///
/// A failing message never fails the batch: it is listed in the
/// [`BatchResponse`] so only that message is redelivered.
pub struct BatchProcessor<R, C, P, K> {
    handler: ExternalEventHandler<R, C, P, K>,
}

impl<R, C, P, K> Clone for BatchProcessor<R, C, P, K> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<R, C, P, K> BatchProcessor<R, C, P, K>
where
    R: InventoryItemRepository,
    C: OrderCache,
    P: EventPublisher,
    K: ProductCatalogue,
{
    pub fn new(handler: ExternalEventHandler<R, C, P, K>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &ExternalEventHandler<R, C, P, K> {
        &self.handler
    }

    /// Processes every message and returns those that must be redelivered.
    #[tracing::instrument(skip_all, fields(batch_size = messages.len()))]
    pub async fn process_batch(&self, messages: &[QueueMessage]) -> BatchResponse {
        let started = Instant::now();
        let mut response = BatchResponse::default();

        for message in messages {
            let state = self.process_message(message).await;
            if state.is_failure() {
                response.push_failure(message.message_id.as_str());
            }
        }

        metrics::counter!("acl_batch_item_failures_total")
            .increment(response.batch_item_failures.len() as u64);
        metrics::histogram!("acl_batch_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            failures = response.batch_item_failures.len(),
            "batch processed"
        );
        response
    }

    /// Runs one message through the state machine and returns its final state.
    pub async fn process_message(&self, message: &QueueMessage) -> MessageState {
        let mut state = MessageState::Received;

        let envelope = match serde_json::from_str::<BusMessage<serde_json::Value>>(&message.body)
        {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::error!(message_id = %message.message_id, %error, "undecodable message");
                advance(&mut state, MessageState::RetryableFailure);
                record_message("unknown", state);
                return state;
            }
        };

        let detail_type = envelope.detail_type;
        let detail = envelope.detail;
        let ctx = RequestContext::from_traceparent(detail.traceparent.as_deref())
            .with_conversation_id(detail.conversation_id.clone())
            .with_message_id(message.message_id.as_str());
        let span = ctx.span("acl.message");

        async {
            let result = self.dispatch(&ctx, &detail_type, detail, &mut state).await;
            let next = match result {
                Ok(()) => MessageState::Succeeded,
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        detail_type = %detail_type,
                        error = %err,
                        "message will be redelivered"
                    );
                    MessageState::RetryableFailure
                }
                Err(err) => {
                    tracing::warn!(detail_type = %detail_type, error = %err, "message skipped");
                    MessageState::Skipped
                }
            };
            advance(&mut state, next);
            record_message(&detail_type, state);
        }
        .instrument(span)
        .await;

        state
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext,
        detail_type: &str,
        detail: CloudEvent<serde_json::Value>,
        state: &mut MessageState,
    ) -> Result<()> {
        match detail_type {
            PRODUCT_CREATED_V1 => {
                let event = decode(detail)?;
                advance(state, MessageState::Decoded);
                advance(state, MessageState::Dispatched);
                self.handler.handle_product_created_v1(ctx, event).await
            }
            ORDER_CREATED_V1 => {
                let event = decode(detail)?;
                advance(state, MessageState::Decoded);
                advance(state, MessageState::Dispatched);
                self.handler.handle_order_created_v1(ctx, event).await
            }
            ORDER_COMPLETED_V1 => {
                let event = decode(detail)?;
                advance(state, MessageState::Decoded);
                advance(state, MessageState::Dispatched);
                self.handler.handle_order_completed_v1(ctx, event).await
            }
            other => Err(AclError::UnknownEventType(other.to_string())),
        }
    }
}

fn decode<T: DeserializeOwned>(detail: CloudEvent<serde_json::Value>) -> Result<CloudEvent<T>> {
    Ok(detail.try_map(serde_json::from_value)?)
}

fn advance(state: &mut MessageState, next: MessageState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal message transition {state} -> {next}"
    );
    tracing::trace!(from = %state, to = %next, "message state");
    *state = next;
}

fn record_message(detail_type: &str, state: MessageState) {
    metrics::counter!(
        "acl_messages_total",
        "detail_type" => detail_type.to_string(),
        "outcome" => state.as_str()
    )
    .increment(1);
}
