//! 产品目录：字段校验、CSV 导入、存储与 HTTP 处理器

pub mod csv_rows;
pub mod handler;
pub mod import;
pub mod model;
pub mod service;
pub mod store;
pub mod validation;

pub use handler::AppState;
pub use model::{ImportReport, NewProduct, Product};
pub use service::ProductService;
pub use store::{MemoryProductStore, ProductStore, StoreError};
