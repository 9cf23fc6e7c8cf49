//! Local stand-in for the queue trigger.

use std::sync::Arc;

use acl::{BatchResponse, QueueMessage};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /events — process a batch of queue messages.
///
/// Answers 200 for any well-formed batch; failed messages are listed in the
/// body.
#[tracing::instrument(skip_all)]
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<QueueMessage>>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(messages) = body?;
    Ok(Json(state.processor.process_batch(&messages).await))
}
