//! 产品存储抽象
//!
//! 业务层只依赖 [`ProductStore`]；PostgreSQL 实现见 `infrastructure::database`，
//! 内存实现用于本地运行和测试。

use async_trait::async_trait;
use std::sync::Mutex;

use super::model::{NewProduct, Product};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(String),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// 写入一条记录并返回分配了 id 的产品
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// 原子地写入一批记录：要么全部成功，要么全部不写入
    async fn create_batch(&self, products: Vec<NewProduct>) -> Result<u64, StoreError>;

    /// 按 id 升序返回所有产品
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Product>, StoreError>;
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    products: Vec<Product>,
}

/// 内存存储
#[derive(Default)]
pub struct MemoryProductStore {
    state: Mutex<MemoryState>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl MemoryState {
    fn insert(&mut self, product: NewProduct) -> Product {
        self.last_id += 1;
        let product = product.into_product(self.last_id, chrono::Utc::now());
        self.products.push(product.clone());
        product
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        Ok(self.lock()?.insert(product))
    }

    async fn create_batch(&self, products: Vec<NewProduct>) -> Result<u64, StoreError> {
        // 整批在同一次加锁内完成，其它请求看不到中间状态
        let mut state = self.lock()?;
        let count = products.len() as u64;
        for product in products {
            state.insert(product);
        }
        Ok(count)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.lock()?.products.clone())
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.lock()?.products.iter().find(|p| p.id == id).cloned())
    }
}
