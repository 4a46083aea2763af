mod auth;
mod db;
mod error;
mod models;
mod orders;
mod promotions;
mod query;
mod returns;
mod validation;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    middleware::RequireRole,
    repository::{TokenRepository, UserRepository},
    token::TokenService,
    AuthService,
};
use error::ApiError;
use models::{CreateProduct, Product, UpdateProduct};
use orders::{OrderItemsRepository, OrderService, OrdersRepository, ProductRepository};
use promotions::PromotionsEngine;
use query::{QueryParams, QueryValidator};
use returns::{ReturnService, ReturnsRepository};
use validator::Validate;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        create_product,
        get_products,
        get_product_by_id,
        update_product,
        delete_product,
    ),
    components(
        schemas(Product, CreateProduct, UpdateProduct)
    ),
    tags(
        (name = "products", description = "Product catalog endpoints")
    ),
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = "RESTful storefront backend: catalog, checkout, promotions, coins, returns",
        contact(
            name = "API Support",
            email = "support@storefront.example"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth_service: Arc<AuthService>,
    pub promotions: Arc<PromotionsEngine>,
    pub order_service: OrderService,
    pub order_items_repo: OrderItemsRepository,
    pub return_service: ReturnService,
}

impl AppState {
    /// Wire all services over one pool
    pub fn build(db: PgPool, jwt_secret: String) -> Self {
        let auth_service = Arc::new(AuthService::new(
            UserRepository::new(db.clone()),
            TokenRepository::new(db.clone()),
            TokenService::new(jwt_secret),
        ));
        let promotions = Arc::new(PromotionsEngine::new(db.clone()));
        let orders_repo = OrdersRepository::new(db.clone());
        let order_items_repo = OrderItemsRepository::new(db.clone());
        let order_service = OrderService::new(
            orders_repo.clone(),
            order_items_repo.clone(),
            ProductRepository::new(db.clone()),
            promotions.clone(),
        );
        let return_service = ReturnService::new(
            ReturnsRepository::new(db.clone()),
            orders_repo,
            promotions.clone(),
        );

        Self {
            db,
            auth_service,
            promotions,
            order_service,
            order_items_repo,
            return_service,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, category, description, price, image_url, stock, specifications, created_at, updated_at";

/// Handler for POST /api/admin/products
/// Creates a new catalog product (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Price must be a positive number"})),
        (status = 409, description = "Duplicate product name", body = String, example = json!({"error": "Product already exists"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "products"
)]
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    tracing::debug!("Creating new product: {}", payload.name);

    payload.validate()?;

    if db::check_duplicate_product(&state.db, &payload.name).await? {
        tracing::warn!("Attempt to create duplicate product: {}", payload.name);
        return Err(ApiError::Conflict {
            message: format!("Product with name '{}' already exists", payload.name),
        });
    }

    let query = format!(
        "INSERT INTO products (name, category, description, price, image_url, stock, specifications) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
        PRODUCT_COLUMNS
    );
    let product = sqlx::query_as::<_, Product>(&query)
        .bind(&payload.name)
        .bind(&payload.category)
        .bind(&payload.description)
        .bind(payload.price)
        .bind(&payload.image_url)
        .bind(payload.stock)
        .bind(&payload.specifications)
        .fetch_one(&state.db)
        .await?;

    tracing::info!("Successfully created product with id: {}", product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for GET /api/products
/// Lists products with search, filtering, sorting, and pagination
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "List of products", body = Vec<Product>),
        (status = 400, description = "Invalid query parameters", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "products"
)]
async fn get_products(
    Query(params): Query<QueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    tracing::debug!("Fetching products with query parameters: {:?}", params);

    let validated =
        QueryValidator::validate(params).map_err(|e| ApiError::BadRequest(e.message))?;

    let mut builder = query::SQLQueryBuilder::new();

    if let Some(search) = validated.search {
        builder.add_search_filter(&search);
    }
    if let Some(category) = validated.category {
        builder.add_category_filter(&category);
    }
    builder.add_price_range(validated.min_price, validated.max_price);

    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }
    builder.set_pagination(validated.page, validated.limit);

    let (query_str, params) = builder.build();

    let mut query = sqlx::query_as::<_, Product>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let products = query.fetch_all(&state.db).await?;

    tracing::debug!("Query returned {} products", products.len());
    Ok(Json(products))
}

/// Handler for GET /api/products/:id
/// Retrieves a specific product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found", body = String, example = json!({"error": "Product with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "products"
)]
async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>, ApiError> {
    tracing::debug!("Fetching product with id: {}", id);

    let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&query)
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Product with id {} not found", id);
            ApiError::NotFound {
                resource: "Product".to_string(),
                id: id.to_string(),
            }
        })?;

    tracing::debug!("Successfully retrieved product: {}", product.name);
    Ok(Json(product))
}

/// Handler for PUT /api/admin/products/:id
/// Updates an existing product (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, description = "Invalid input data", body = String),
        (status = 404, description = "Product not found", body = String),
        (status = 409, description = "Duplicate product name", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "products"
)]
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    tracing::debug!("Updating product with id: {}", id);

    payload.validate()?;

    // A transaction keeps the duplicate check and the update atomic
    let mut tx = state.db.begin().await?;

    let select = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    let existing = sqlx::query_as::<_, Product>(&select)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Product with id {} not found for update", id);
            ApiError::NotFound {
                resource: "Product".to_string(),
                id: id.to_string(),
            }
        })?;

    if let Some(ref new_name) = payload.name {
        if new_name != &existing.name {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE name = $1 AND id != $2)",
            )
            .bind(new_name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                tracing::warn!(
                    "Attempt to update product {} to duplicate name: {}",
                    id,
                    new_name
                );
                return Err(ApiError::Conflict {
                    message: format!("Product with name '{}' already exists", new_name),
                });
            }
        }
    }

    let update = format!(
        "UPDATE products SET name = $1, category = $2, description = $3, price = $4, \
         image_url = $5, stock = $6, specifications = $7, updated_at = NOW() \
         WHERE id = $8 RETURNING {}",
        PRODUCT_COLUMNS
    );
    let updated_product = sqlx::query_as::<_, Product>(&update)
        .bind(payload.name.unwrap_or(existing.name))
        .bind(payload.category.unwrap_or(existing.category))
        .bind(payload.description.unwrap_or(existing.description))
        .bind(payload.price.unwrap_or(existing.price))
        .bind(payload.image_url.unwrap_or(existing.image_url))
        .bind(payload.stock.unwrap_or(existing.stock))
        .bind(payload.specifications.unwrap_or(existing.specifications))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated product with id: {}", id);
    Ok(Json(updated_product))
}

/// Handler for DELETE /api/admin/products/:id
/// Deletes a product (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 404, description = "Product not found", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "products"
)]
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting product with id: {}", id);

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("Product with id {} not found for deletion", id);
        return Err(ApiError::NotFound {
            resource: "Product".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted product with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Admin surface; every route sits behind the role guard
    let admin_routes = Router::new()
        .route("/api/admin/products", post(create_product))
        .route(
            "/api/admin/products/:id",
            put(update_product).delete(delete_product),
        )
        .route(
            "/api/admin/coupons",
            get(promotions::handlers::list_coupons_handler)
                .post(promotions::handlers::create_coupon_handler),
        )
        .route(
            "/api/admin/coupons/:id",
            put(promotions::handlers::update_coupon_handler)
                .delete(promotions::handlers::delete_coupon_handler),
        )
        .route(
            "/api/admin/discounts",
            get(promotions::handlers::list_discounts_handler)
                .post(promotions::handlers::create_discount_handler),
        )
        .route(
            "/api/admin/discounts/:id",
            put(promotions::handlers::update_discount_handler)
                .delete(promotions::handlers::delete_discount_handler),
        )
        .route(
            "/api/admin/coin-rules",
            get(promotions::handlers::get_coin_rules_handler)
                .put(promotions::handlers::update_coin_rules_handler),
        )
        .route(
            "/api/admin/orders/:order_id/status",
            patch(orders::handlers::update_order_status_handler),
        )
        .route(
            "/api/admin/orders/:order_id/payment",
            patch(orders::handlers::update_payment_status_handler),
        )
        .route(
            "/api/admin/returns",
            get(returns::handlers::list_returns_handler),
        )
        .route(
            "/api/admin/returns/:id",
            patch(returns::handlers::resolve_return_handler),
        )
        .route(
            "/api/admin/promotions/metrics",
            get(promotions::handlers::promotion_metrics_handler),
        )
        .layer(middleware::from_fn(
            |req: axum::extract::Request, next: middleware::Next| async move {
                RequireRole::admin().middleware(req, next).await
            },
        ));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Catalog
        .route("/api/products", get(get_products))
        .route("/api/products/:id", get(get_product_by_id))
        // Auth
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/me", get(auth::me_handler))
        // Promotions storefront surface
        .route(
            "/api/coupons/available",
            get(promotions::handlers::available_coupons_handler),
        )
        .route(
            "/api/coupons/validate",
            post(promotions::handlers::validate_coupon_handler),
        )
        .route(
            "/api/discounts/available",
            get(promotions::handlers::available_discounts_handler),
        )
        .route(
            "/api/discounts/validate",
            post(promotions::handlers::validate_discount_handler),
        )
        // Coins
        .route("/api/coins", get(promotions::handlers::coin_balance_handler))
        .route(
            "/api/coins/transactions",
            get(promotions::handlers::coin_transactions_handler),
        )
        .route("/api/coins/quote", post(promotions::handlers::coin_quote_handler))
        // Orders
        .route(
            "/api/orders",
            post(orders::handlers::create_order_handler)
                .get(orders::handlers::get_order_history_handler),
        )
        .route(
            "/api/orders/:order_id",
            get(orders::handlers::get_order_by_id_handler),
        )
        // Returns
        .route(
            "/api/returns",
            post(returns::handlers::create_return_handler)
                .get(returns::handlers::get_user_returns_handler),
        )
        .merge(admin_routes)
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Storefront API - Starting...");

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set in environment");
    let jwt_secret = std::env::var("JWT_SECRET")
        .expect("JWT_SECRET must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let state = AppState::build(db_pool, jwt_secret);

    // Pre-load promotion configuration so first requests stay warm
    if let Err(e) = state.promotions.warm_cache().await {
        tracing::warn!("Failed to warm promotions cache: {}", e);
    }

    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Storefront API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

#[cfg(test)]
mod tests;
