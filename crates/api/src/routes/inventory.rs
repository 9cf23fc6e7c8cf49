//! Synchronous inventory query and update endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::ProductId;
use domain::{HandlerResponse, InventoryItemDto, UpdateStockRequest};
use tracing::Instrument;

use crate::error::ApiError;
use crate::routes::request_context;
use crate::state::AppState;

/// GET /inventory/{product_id} — load the inventory item of a product.
#[tracing::instrument(skip(state, headers))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Result<Json<HandlerResponse<InventoryItemDto>>, ApiError> {
    let ctx = request_context(&headers);
    let item = state
        .service
        .with_product_id(&ctx, &ProductId::new(product_id))
        .instrument(ctx.span("inventory.get"))
        .await?;

    Ok(Json(HandlerResponse::ok(InventoryItemDto::from(&item))))
}

/// POST /inventory — set the stock level of a product.
#[tracing::instrument(skip_all)]
pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<UpdateStockRequest>, JsonRejection>,
) -> Result<Json<HandlerResponse<InventoryItemDto>>, ApiError> {
    let Json(req) = body?;
    let ctx = request_context(&headers);
    let item = state
        .service
        .update_stock(&ctx, &req)
        .instrument(ctx.span("inventory.update_stock"))
        .await?;

    Ok(Json(HandlerResponse::ok(InventoryItemDto::from(&item))))
}

/// POST /inventory/refresh — announce catalogue products with no inventory item.
#[tracing::instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<HandlerResponse<Vec<ProductId>>>, ApiError> {
    let ctx = request_context(&headers);
    let added = state
        .service
        .refresh_product_cache(&ctx)
        .instrument(ctx.span("inventory.refresh"))
        .await?;

    Ok(Json(HandlerResponse::ok(added)))
}
