//! 产品业务服务

use std::sync::Arc;

use tracing::info;

use super::import::{ImportError, ImportPipeline};
use super::model::{ImportReport, Product};
use super::store::{ProductStore, StoreError};
use super::validation::{check_image_size, validate_product, ProductInput};
use crate::core::error::CoreError;
use crate::core::response::{PageQuery, Paginated};

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::InternalServerError(err.to_string())
    }
}

impl From<ImportError> for CoreError {
    fn from(err: ImportError) -> Self {
        match err {
            // 解码失败与持久化失败一样只返回通用错误，细节写入日志
            ImportError::Decode(e) => CoreError::InternalServerError(e.to_string()),
            ImportError::Rejected(rows) => {
                CoreError::Validation(rows.iter().map(ToString::to_string).collect())
            }
            ImportError::PersistFailed(e) => CoreError::InternalServerError(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    pipeline: ImportPipeline,
    max_image_bytes: usize,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>, max_image_bytes: usize) -> Self {
        Self {
            pipeline: ImportPipeline::new(store.clone()),
            store,
            max_image_bytes,
        }
    }

    pub async fn list_products(&self, query: &PageQuery) -> Result<Paginated<Product>, CoreError> {
        let products = self.store.list().await?;
        Ok(Paginated::from_items(products, query))
    }

    pub async fn get_product(&self, id: i64) -> Result<Product, CoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("product {} not found", id)))
    }

    /// 单条创建：字段校验通过后再检查图片解码大小
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CoreError> {
        let product = validate_product(input).map_err(|violations| {
            CoreError::Validation(violations.into_iter().map(|v| v.message).collect())
        })?;

        if let Some(image) = &product.image {
            check_image_size(image, self.max_image_bytes)
                .map_err(|v| CoreError::Validation(vec![v.message]))?;
        }

        let product = self.store.create(product).await?;
        info!("Created product: {} ({})", product.name, product.id);
        Ok(product)
    }

    pub async fn import_csv(&self, bytes: &[u8]) -> Result<ImportReport, CoreError> {
        Ok(self.pipeline.run(bytes).await?)
    }
}
