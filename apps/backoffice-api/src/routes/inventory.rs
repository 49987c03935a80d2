//! Items, stock movements, and inventory valuation (`manage_inventory`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use salon_core::{Item, ItemPurchase, ItemUsage, Money, Page, PermissionKind};
use salon_db::{ItemFilter, ItemPurchaseFilter, ItemUsageFilter, NewItem, NewItemPurchase, NewItemUsage};
use serde::{Deserialize, Serialize};

use super::{authorize, exchange_rate, today, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/salons/{salon_id}/items", get(list_items).post(create_item))
        .route(
            "/api/salons/{salon_id}/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route(
            "/api/salons/{salon_id}/items/{id}/average-price",
            get(average_price),
        )
        .route("/api/salons/{salon_id}/items/{id}/value", get(item_value))
        .route("/api/salons/{salon_id}/inventory/value", get(inventory_value))
        .route(
            "/api/salons/{salon_id}/item-usages",
            get(list_usages).post(create_usage),
        )
        .route(
            "/api/salons/{salon_id}/item-usages/{id}",
            get(get_usage).delete(delete_usage),
        )
        .route(
            "/api/salons/{salon_id}/item-purchases",
            get(list_purchases).post(create_purchase),
        )
        .route(
            "/api/salons/{salon_id}/item-purchases/{id}",
            get(get_purchase).delete(delete_purchase),
        )
}

#[derive(Debug, Serialize)]
pub struct AmountResponse {
    pub amount_cents: i64,
}

impl From<Money> for AmountResponse {
    fn from(m: Money) -> Self {
        AmountResponse { amount_cents: m.cents() }
    }
}

// =============================================================================
// Items
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub name: Option<String>,
    pub hairstyle_id: Option<String>,
    /// Low-stock view: items with at most this many units.
    pub max_stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub price_cents: i64,
    pub currency_id: Option<String>,
    pub exchange_rate: Option<String>,
    #[serde(default)]
    pub current_stock: i64,
    /// Hairstyles the item is used for.
    #[serde(default)]
    pub purposes: Vec<String>,
}

impl ItemRequest {
    fn into_new(self) -> ApiResult<NewItem> {
        Ok(NewItem {
            name: self.name,
            price: Money::from_cents(self.price_cents),
            currency_id: self.currency_id,
            exchange_rate: exchange_rate(self.exchange_rate.as_deref())?,
            current_stock: self.current_stock,
            purposes: self.purposes,
        })
    }
}

async fn list_items(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<ItemQuery>,
) -> ApiResult<Json<Page<Item>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let filter = ItemFilter {
        name: q.name,
        hairstyle_id: q.hairstyle_id,
        max_stock: q.max_stock,
    };
    let items = state
        .db
        .items()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(items))
}

async fn create_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<ItemRequest>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let item = state.db.items().create(&salon_id, req.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Item>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    Ok(Json(state.db.items().get(&salon_id, &id).await?))
}

async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<ItemRequest>,
) -> ApiResult<Json<Item>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    Ok(Json(
        state.db.items().update(&salon_id, &id, req.into_new()?).await?,
    ))
}

async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    state.db.items().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn average_price(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<AmountResponse>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let average = state.db.items().average_purchase_price(&salon_id, &id).await?;
    Ok(Json(average.into()))
}

/// Stock on hand valued at the item's price.
async fn item_value(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<AmountResponse>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let item = state.db.items().get(&salon_id, &id).await?;
    Ok(Json(item.total_value()?.into()))
}

async fn inventory_value(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
) -> ApiResult<Json<AmountResponse>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    Ok(Json(state.db.items().inventory_value(&salon_id).await?.into()))
}

// =============================================================================
// Usages
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub item_id: Option<String>,
    pub barber_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUsage {
    pub item_id: String,
    pub shave_id: Option<String>,
    pub barber_id: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub note: String,
}

async fn list_usages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<UsageQuery>,
) -> ApiResult<Json<Page<ItemUsage>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let filter = ItemUsageFilter {
        item_id: q.item_id,
        barber_id: q.barber_id,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let usages = state
        .db
        .item_usages()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(usages))
}

async fn create_usage(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateUsage>,
) -> ApiResult<(StatusCode, Json<ItemUsage>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let usage = state
        .db
        .item_usages()
        .create(
            &salon_id,
            NewItemUsage {
                item_id: req.item_id,
                shave_id: req.shave_id,
                barber_id: req.barber_id,
                quantity: req.quantity,
                note: req.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(usage)))
}

async fn get_usage(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<ItemUsage>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    Ok(Json(state.db.item_usages().get(&salon_id, &id).await?))
}

async fn delete_usage(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    state.db.item_usages().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseQuery {
    pub item_id: Option<String>,
    pub supplier: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchase {
    pub item_id: String,
    pub quantity: i64,
    /// Unit price in the purchase currency.
    pub purchase_price_cents: i64,
    pub currency_id: Option<String>,
    pub exchange_rate: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub supplier: String,
    pub cash_register_id: String,
}

async fn list_purchases(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<PurchaseQuery>,
) -> ApiResult<Json<Page<ItemPurchase>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let filter = ItemPurchaseFilter {
        item_id: q.item_id,
        supplier: q.supplier,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let purchases = state
        .db
        .item_purchases()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(purchases))
}

async fn create_purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreatePurchase>,
) -> ApiResult<(StatusCode, Json<ItemPurchase>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    let purchase = state
        .db
        .item_purchases()
        .create(
            &salon_id,
            NewItemPurchase {
                item_id: req.item_id,
                quantity: req.quantity,
                purchase_price: Money::from_cents(req.purchase_price_cents),
                currency_id: req.currency_id,
                exchange_rate: exchange_rate(req.exchange_rate.as_deref())?,
                purchase_date: req.purchase_date.unwrap_or_else(today),
                supplier: req.supplier,
                cash_register_id: req.cash_register_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

async fn get_purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<ItemPurchase>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    Ok(Json(state.db.item_purchases().get(&salon_id, &id).await?))
}

async fn delete_purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageInventory).await?;
    state.db.item_purchases().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
