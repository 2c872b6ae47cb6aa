//! 应用层：路由组装

pub mod product;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::config::AppConfig;
use crate::core::middleware::{api_key_middleware, request_logging_middleware, API_KEY_HEADER};
use product::{handler, AppState, ProductService, ProductStore};

/// multipart 编码的额外开销
const MULTIPART_OVERHEAD: usize = 64 * 1024;

impl AppState {
    pub fn new(store: Arc<dyn ProductStore>, config: &AppConfig) -> Self {
        Self {
            product_service: ProductService::new(store, config.limits.max_image_bytes),
            max_csv_bytes: config.limits.max_csv_bytes,
        }
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(_) => {
            warn!("Invalid CORS origin {:?}, CORS disabled", origin);
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)]),
    )
}

/// 创建路由，所有接口挂在 `/api/v1` 下
pub fn router(state: AppState, config: &AppConfig) -> Router {
    let products = Router::new()
        .route(
            "/products",
            get(handler::list_products)
                .post(handler::create_product)
                .layer(DefaultBodyLimit::max(config.limits.json_body_limit)),
        )
        .route(
            "/products/import",
            post(handler::import_products).layer(DefaultBodyLimit::max(
                config.limits.max_csv_bytes + MULTIPART_OVERHEAD,
            )),
        )
        .route("/products/:id", get(handler::get_product));

    // route_layer 只作用于之前注册的路由，健康检查不需要认证
    let v1 = match &config.auth.api_key {
        Some(key) => products.route_layer(middleware::from_fn_with_state(
            Arc::<str>::from(key.as_str()),
            api_key_middleware,
        )),
        None => {
            warn!("No API key configured, product routes are unauthenticated");
            products
        }
    }
    .route("/up", get(handler::up));

    let app = Router::new()
        .nest("/api/v1", v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(middleware::from_fn(request_logging_middleware)),
        );

    let app = match cors_layer(&config.server.cors_origin) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.with_state(state)
}
