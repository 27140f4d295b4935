use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Utc;
use serde_json::json;

use stockroom_core::{ExpectedVersion, ItemId, ReservationId};
use stockroom_inventory::{ItemFields, ItemFilter, NewLayaway};

use crate::app::dto::{self, ItemView};
use crate::app::errors;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(list_items).post(create_item))
        .route("/inventory/stats", get(stats))
        .route(
            "/inventory/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/inventory/:id/layaway", post(add_layaway))
        .route("/inventory/:id/layaway/:layaway_id", delete(remove_layaway))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::InventoryQuery>,
) -> Response {
    let filter = ItemFilter::from(query);
    match services.list_items(principal.principal(), &filter).await {
        Ok(items) => errors::ok(json!({ "items": dto::items_to_views(&items) })),
        Err(e) => e.into_response(),
    }
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.dashboard_stats(principal.principal()).await {
        Ok(stats) => errors::ok(json!({ "stats": stats })),
        Err(e) => e.into_response(),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<ItemFields>, JsonRejection>,
) -> Response {
    let Json(fields) = match body {
        Ok(b) => b,
        Err(rej) => return errors::body_rejection(rej),
    };

    match services
        .create_item(principal.principal(), &fields, Utc::now())
        .await
    {
        Ok(item) => errors::created(json!({ "item": ItemView::from(&item) })),
        Err(e) => e.into_response(),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_item(principal.principal(), id).await {
        Ok(item) => errors::ok(json!({ "item": ItemView::from(&item) })),
        Err(e) => e.into_response(),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
) -> Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return errors::body_rejection(rej),
    };

    let expected = body
        .version
        .map(ExpectedVersion::Exact)
        .unwrap_or(ExpectedVersion::Any);

    match services
        .update_item(principal.principal(), id, &body.fields, expected, Utc::now())
        .await
    {
        Ok(item) => errors::ok(json!({ "item": ItemView::from(&item) })),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_item(principal.principal(), id).await {
        Ok(()) => errors::ok(json!({ "message": "Item deleted successfully" })),
        Err(e) => e.into_response(),
    }
}

pub async fn add_layaway(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<NewLayaway>, JsonRejection>,
) -> Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(request) = match body {
        Ok(b) => b,
        Err(rej) => return errors::body_rejection(rej),
    };

    match services
        .add_layaway(principal.principal(), id, &request, Utc::now())
        .await
    {
        Ok((item, layaway)) => errors::created(json!({
            "item": ItemView::from(&item),
            "layaway": layaway,
        })),
        Err(e) => e.into_response(),
    }
}

pub async fn remove_layaway(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, layaway_id)): Path<(String, String)>,
) -> Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let layaway_id: ReservationId = match parse_id(&layaway_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .remove_layaway(principal.principal(), id, layaway_id, Utc::now())
        .await
    {
        Ok(item) => errors::ok(json!({
            "item": ItemView::from(&item),
            "message": "Layaway reservation removed",
        })),
        Err(e) => e.into_response(),
    }
}
