use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{
    multipart::{MultipartForm, Part},
    TestServer,
};
use serde_json::{json, Value};
use tag_products::{
    app::{
        self,
        product::{
            AppState, ImportReport, MemoryProductStore, NewProduct, Product, ProductStore,
            StoreError,
        },
    },
    config::{AppConfig, StorageBackend},
    core::response::{ApiResponse, Paginated},
};

const API_KEY: &str = "test-key";
const DESCRIPTION: &str = "Produto resistente e ideal para uso diário";

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config.auth.api_key = Some(API_KEY.to_string());
    config
}

fn server_with(store: Arc<dyn ProductStore>, config: AppConfig) -> TestServer {
    let state = AppState::new(store, &config);
    TestServer::new(app::router(state, &config)).unwrap()
}

fn test_server() -> TestServer {
    server_with(Arc::new(MemoryProductStore::new()), test_config())
}

fn api_key() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_static(API_KEY),
    )
}

fn csv_form(content: String, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content.into_bytes())
            .file_name("products.csv")
            .mime_type(mime),
    )
}

fn csv_rows(rows: &[&str]) -> String {
    let mut content = String::from("name,price,description,image\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    content
}

async fn list_all(server: &TestServer) -> Vec<Product> {
    let (name, value) = api_key();
    let response = server.get("/api/v1/products").add_header(name, value).await;
    response.assert_status_ok();
    response
        .json::<ApiResponse<Paginated<Product>>>()
        .data
        .items
}

/// 每次调用都失败的存储
struct UnavailableStore;

#[async_trait]
impl ProductStore for UnavailableStore {
    async fn create(&self, _product: NewProduct) -> Result<Product, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn create_batch(&self, _products: Vec<NewProduct>) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _id: i64) -> Result<Option<Product>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_health_check_needs_no_key() {
    let server = test_server();

    let response = server.get("/api/v1/up").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["message"], "Everything is up and running!");
}

#[tokio::test]
async fn test_products_require_api_key() {
    let server = test_server();

    let response = server.get("/api/v1/products").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/v1/products")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("wrong"),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_get_product() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "name": "Garrafa térmica",
            "price": 59.9,
            "description": DESCRIPTION,
            "image": "aGVsbG8gd29ybGQ="
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let created = response.json::<ApiResponse<Product>>().data;
    assert_eq!(created.name, "Garrafa térmica");
    assert_eq!(created.price, 59.9);
    assert_eq!(created.image.as_deref(), Some("aGVsbG8gd29ybGQ="));

    let response = server
        .get(&format!("/api/v1/products/{}", created.id))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<ApiResponse<Product>>().data, created);

    assert_eq!(list_all(&server).await, vec![created]);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products")
        .add_header(name, value)
        .json(&json!({
            "name": "ab",
            "price": "15",
            "description": "curta"
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!([
            "name must be between 3 and 50 characters",
            "price must be a number",
            "description must be between 30 and 255 characters"
        ])
    );
    assert!(list_all(&server).await.is_empty());
}

#[tokio::test]
async fn test_get_missing_product() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .get("/api/v1/products/999")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_persists_all_rows_in_order() {
    let server = test_server();
    let (name, value) = api_key();
    let rows = [
        format!("Mesa,150.00,{},", DESCRIPTION),
        format!("Cadeira,80,{},", DESCRIPTION),
        format!("Sofá,1200.5,{},", DESCRIPTION),
    ];
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form(csv_rows(&rows), "text/csv"))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<ApiResponse<ImportReport>>().data,
        ImportReport { imported: 3 }
    );

    let products = list_all(&server).await;
    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Mesa", "Cadeira", "Sofá"]);
    assert_eq!(products[2].price, 1200.5);
    assert!(products.iter().all(|p| p.image.is_none()));
}

#[tokio::test]
async fn test_import_rejects_whole_batch_on_row_error() {
    let server = test_server();
    let (name, value) = api_key();
    let rows = [
        format!("Mesa,150,{},", DESCRIPTION),
        format!("Cadeira,80,{},", DESCRIPTION),
        format!("Lu,abc,{},", DESCRIPTION),
        format!("Sofá,1200,{},", DESCRIPTION),
        "Banco,9.99,curta,".to_string(),
    ];
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form(csv_rows(&rows), "text/csv"))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!([
            "Error on line 4: name, price",
            "Error on line 6: price, description"
        ])
    );
    assert!(list_all(&server).await.is_empty());
}

#[tokio::test]
async fn test_import_rejects_non_csv_upload() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form(csv_rows(&[]), "application/json"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["message"], "uploaded file is not CSV");
}

#[tokio::test]
async fn test_import_without_file() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(MultipartForm::new().add_text("note", "nothing here"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["message"], "no file uploaded");
}

#[tokio::test]
async fn test_import_with_missing_columns_is_a_generic_server_error() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form("name,cost\nMesa,150\n".to_string(), "text/csv"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["message"], "internal server error");
    assert!(body.get("errors").is_none());
    assert!(list_all(&server).await.is_empty());
}

#[tokio::test]
async fn test_import_with_malformed_line_hides_parser_detail() {
    let server = test_server();
    let (name, value) = api_key();
    let content = format!("name,price,description\nMesa,150,{}\nbroken,line\n", DESCRIPTION);

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form(content, "text/csv"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let text = response.text();
    assert!(!text.contains("malformed CSV"));
    assert!(!text.contains("line 3"));

    let body: Value = response.json();
    assert_eq!(body["message"], "internal server error");
    assert!(body.get("errors").is_none());
    assert!(list_all(&server).await.is_empty());
}

#[tokio::test]
async fn test_import_over_size_limit() {
    let mut config = test_config();
    config.limits.max_csv_bytes = 64;
    let server = server_with(Arc::new(MemoryProductStore::new()), config);
    let (name, value) = api_key();
    let row = format!("Mesa,150,{},", DESCRIPTION);

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form(csv_rows(&[row.as_str()]), "text/csv"))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_store_failure_is_a_generic_server_error() {
    let server = server_with(Arc::new(UnavailableStore), test_config());
    let (name, value) = api_key();
    let row = format!("Mesa,150,{},", DESCRIPTION);

    let response = server
        .post("/api/v1/products/import")
        .add_header(name, value)
        .multipart(csv_form(csv_rows(&[row.as_str()]), "text/csv"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["message"], "internal server error");
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_create_store_failure_is_a_generic_server_error() {
    let server = server_with(Arc::new(UnavailableStore), test_config());
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products")
        .add_header(name, value)
        .json(&json!({
            "name": "Garrafa térmica",
            "price": 59.9,
            "description": DESCRIPTION
        }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let text = response.text();
    assert!(!text.contains("connection refused"));

    let body: Value = response.json();
    assert_eq!(body["message"], "internal server error");
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_create_with_wrongly_typed_field_uses_fixed_message() {
    let server = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/api/v1/products")
        .add_header(name, value)
        .json(&json!({
            "name": 123,
            "price": 59.9,
            "description": DESCRIPTION
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(body["errors"], json!(["request body is not a valid product"]));
    assert!(!response.text().contains("invalid type"));
    assert!(list_all(&server).await.is_empty());
}

#[tokio::test]
async fn test_list_pagination() {
    let server = test_server();
    let (name, value) = api_key();
    let rows: Vec<String> = (1..=5)
        .map(|i| format!("Produto {},{},{},", i, 10 + i, DESCRIPTION))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    server
        .post("/api/v1/products/import")
        .add_header(name.clone(), value.clone())
        .multipart(csv_form(csv_rows(&rows), "text/csv"))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/v1/products?page=2&limit=2")
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    let page = response.json::<ApiResponse<Paginated<Product>>>().data;
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Produto 3", "Produto 4"]);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);
}
