//! 产品数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已持久化的产品，`id` 由存储层分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 通过校验、等待写入的产品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub image: Option<String>,
}

impl NewProduct {
    pub fn into_product(self, id: i64, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            description: self.description,
            image: self.image,
            created_at,
        }
    }
}

/// CSV 导入成功后的确认信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: u64,
}
