//! Vendors and warehouses: built-in defaults plus per-user custom entries.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Map, Value};

use stockroom_inventory::CatalogKind;

use crate::app::dto::{CatalogEntryRequest, CatalogView};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
}

pub async fn list_vendors(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    list(&services, &principal, CatalogKind::Vendor).await
}

pub async fn create_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CatalogEntryRequest>, JsonRejection>,
) -> Response {
    create(&services, &principal, CatalogKind::Vendor, body).await
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    list(&services, &principal, CatalogKind::Warehouse).await
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CatalogEntryRequest>, JsonRejection>,
) -> Response {
    create(&services, &principal, CatalogKind::Warehouse, body).await
}

async fn list(services: &AppServices, principal: &PrincipalContext, kind: CatalogKind) -> Response {
    match services.list_catalog(principal.principal(), kind).await {
        Ok(listings) => {
            let views: Vec<CatalogView> = listings.into_iter().map(CatalogView::from).collect();
            errors::ok(keyed(format!("{}s", kind.as_str()), views))
        }
        Err(e) => e.into_response(),
    }
}

async fn create(
    services: &AppServices,
    principal: &PrincipalContext,
    kind: CatalogKind,
    body: Result<Json<CatalogEntryRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return errors::body_rejection(rej),
    };

    match services
        .create_catalog_entry(principal.principal(), kind, body.name.as_deref())
        .await
    {
        Ok(entry) => errors::created(keyed(kind.as_str().to_string(), CatalogView::from(&entry))),
        Err(e) => e.into_response(),
    }
}

/// `{"<key>": value}`
fn keyed(key: String, value: impl serde::Serialize) -> Value {
    let mut map = Map::new();
    map.insert(key, serde_json::to_value(value).unwrap_or(Value::Null));
    Value::Object(map)
}
