//! 产品处理器

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{info, warn};

use super::{
    model::{ImportReport, Product},
    service::ProductService,
    validation::ProductInput,
};
use crate::core::{
    error::CoreError,
    response::{ApiResponse, PageQuery, Paginated},
};

/// 上传表单中 CSV 文件所在的字段名
pub const UPLOAD_FIELD: &str = "file";

/// JSON 结构不符合产品字段类型时返回的固定消息
pub const INVALID_PRODUCT_BODY: &str = "request body is not a valid product";

#[derive(Clone)]
pub struct AppState {
    pub product_service: ProductService,
    pub max_csv_bytes: usize,
}

pub async fn up() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Everything is up and running!" }))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paginated<Product>>>, CoreError> {
    let page = state.product_service.list_products(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    let product = state.product_service.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), CoreError> {
    let Json(input) = payload.map_err(json_rejection)?;

    let product = state.product_service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

pub async fn import_products(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>, CoreError> {
    let upload = read_csv_upload(&mut multipart, state.max_csv_bytes).await?;
    info!("Received CSV upload of {} bytes", upload.len());

    let report = state.product_service.import_csv(&upload).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// 反序列化器的原始报错只写日志，不回显给客户端
fn json_rejection(rejection: JsonRejection) -> CoreError {
    match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => CoreError::PayloadTooLarge(rejection.body_text()),
        StatusCode::UNPROCESSABLE_ENTITY => {
            warn!("Rejected product body: {}", rejection.body_text());
            CoreError::Validation(vec![INVALID_PRODUCT_BODY.to_string()])
        }
        _ => CoreError::BadRequest(rejection.body_text()),
    }
}

fn is_csv(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/csv"))
}

fn multipart_error(err: MultipartError) -> CoreError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => CoreError::PayloadTooLarge(err.body_text()),
        _ => CoreError::BadRequest(err.body_text()),
    }
}

/// 上传边界：只接受 `text/csv`，并在进入流水线前检查文件大小
async fn read_csv_upload(multipart: &mut Multipart, max_bytes: usize) -> Result<Bytes, CoreError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        if !is_csv(field.content_type()) {
            return Err(CoreError::BadRequest("uploaded file is not CSV".to_string()));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_bytes {
            return Err(CoreError::PayloadTooLarge(format!(
                "CSV file exceeds {}MB",
                max_bytes / (1024 * 1024)
            )));
        }
        return Ok(bytes);
    }

    Err(CoreError::BadRequest("no file uploaded".to_string()))
}
