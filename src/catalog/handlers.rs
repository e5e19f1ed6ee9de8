use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AdminUser,
    catalog::{
        dto::{
            CategoryRequest, CategoryResponse, LowStockQuery, LowStockResponse, ProductCreate,
            ProductListResponse, ProductUpdate, ProductView, SerialsRequest, SerialsResponse,
            StockResponse,
        },
        repo_types::{Category, ProductRow},
        serials, services,
    },
    error::{ApiError, ApiResult},
    pagination::PageQuery,
    state::AppState,
    validation::{ApiPath, ApiQuery, ValidatedJson},
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/categories/:id/products", get(list_category_products))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/low-stock", get(low_stock))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/stock", get(get_stock))
        .route(
            "/products/:id/serials",
            get(get_serials).post(add_serials).delete(remove_serials),
        )
}

async fn load_product(state: &AppState, id: i32) -> ApiResult<ProductRow> {
    state
        .catalog
        .find_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

// --- categories ---

#[instrument(skip(state, _admin))]
pub async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.list_categories().await?))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidatedJson(payload): ValidatedJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = services::create_category(state.catalog.as_ref(), &payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, _admin))]
pub async fn get_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<CategoryResponse<Category>>> {
    let category = state
        .catalog
        .find_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    Ok(Json(CategoryResponse { category }))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    let category = services::update_category(state.catalog.as_ref(), id, &payload).await?;
    Ok(Json(category))
}

#[instrument(skip(state, _admin))]
pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<StatusCode> {
    services::delete_category(state.catalog.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_category_products(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<ProductListResponse>> {
    if state.catalog.find_category(id).await?.is_none() {
        return Err(ApiError::not_found("Category not found"));
    }
    let (rows, total) = state
        .catalog
        .list_products(Some(id), page.limit(), page.offset())
        .await?;
    Ok(Json(ProductListResponse {
        products: rows.iter().map(ProductView::public).collect(),
        pagination: page.meta(total),
    }))
}

// --- products ---

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<ProductListResponse>> {
    let (rows, total) = state
        .catalog
        .list_products(None, page.limit(), page.offset())
        .await?;
    Ok(Json(ProductListResponse {
        products: rows.iter().map(ProductView::public).collect(),
        pagination: page.meta(total),
    }))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<ProductView>> {
    let product = load_product(&state, id).await?;
    Ok(Json(ProductView::public(&product)))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidatedJson(payload): ValidatedJson<ProductCreate>,
) -> ApiResult<(StatusCode, Json<ProductView>)> {
    let product = services::create_product(state.catalog.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(ProductView::with_serials(&product))))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<ProductUpdate>,
) -> ApiResult<Json<ProductView>> {
    let product = services::update_product(state.catalog.as_ref(), id, payload).await?;
    Ok(Json(ProductView::with_serials(&product)))
}

#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<StatusCode> {
    if !state.catalog.delete_product(id).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    tracing::info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- inventory ---

#[instrument(skip(state))]
pub async fn get_stock(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<StockResponse>> {
    let product = load_product(&state, id).await?;
    Ok(Json(StockResponse {
        product_id: product.id,
        stock_count: serials::count(&product.serials),
        product_name: product.header,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn get_serials(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<SerialsResponse>> {
    let product = load_product(&state, id).await?;
    Ok(Json(SerialsResponse::new(&product, None)))
}

#[instrument(skip(state, _admin, payload))]
pub async fn add_serials(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<SerialsRequest>,
) -> ApiResult<Json<SerialsResponse>> {
    let product = services::add_serials(state.catalog.as_ref(), id, payload.serials.items()).await?;
    Ok(Json(SerialsResponse::new(
        &product,
        Some("Serials added successfully"),
    )))
}

#[instrument(skip(state, _admin, payload))]
pub async fn remove_serials(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<SerialsRequest>,
) -> ApiResult<Json<SerialsResponse>> {
    let product =
        services::remove_serials(state.catalog.as_ref(), id, payload.serials.items()).await?;
    Ok(Json(SerialsResponse::new(
        &product,
        Some("Serials removed successfully"),
    )))
}

#[instrument(skip(state, _admin))]
pub async fn low_stock(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(q): ApiQuery<LowStockQuery>,
) -> ApiResult<Json<LowStockResponse>> {
    let (rows, threshold) = services::low_stock(state.catalog.as_ref(), q.threshold).await?;
    Ok(Json(LowStockResponse {
        count: rows.len(),
        products: rows.iter().map(ProductView::public).collect(),
        threshold,
    }))
}
