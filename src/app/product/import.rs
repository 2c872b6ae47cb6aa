//! CSV 批量导入流水线
//!
//! 流程：`Decoding -> (逐行校验并累积错误) -> Rejected | Persisting -> Persisted | PersistFailed`。
//! 先完整扫描所有行，再决定是否写入；写入只调用一次 `create_batch`，
//! 因此靠后的行校验失败时，前面的行不可能已经落库。

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::csv_rows::{decode_rows, DecodeError};
use super::model::{ImportReport, NewProduct};
use super::store::{ProductStore, StoreError};
use super::validation::{validate_product, ProductInput};

/// 某一行的校验失败，`fields` 按字段顺序列出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub fields: Vec<&'static str>,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on line {}: {}", self.line, self.fields.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{} row(s) failed validation", .0.len())]
    Rejected(Vec<RowError>),
    #[error("failed to persist import batch: {0}")]
    PersistFailed(#[source] StoreError),
}

/// 解码并校验全部行，不触碰存储
pub fn validate_rows(bytes: &[u8]) -> Result<Vec<NewProduct>, ImportError> {
    let mut accepted = Vec::new();
    let mut errors = Vec::new();

    for row in decode_rows(bytes)? {
        let row = row?;
        match validate_product(ProductInput::from_csv_row(&row)) {
            Ok(product) => accepted.push(product),
            Err(violations) => {
                let mut fields: Vec<&'static str> = violations.iter().map(|v| v.field).collect();
                fields.dedup();
                errors.push(RowError {
                    line: row.line,
                    fields,
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(ImportError::Rejected(errors));
    }

    Ok(accepted)
}

#[derive(Clone)]
pub struct ImportPipeline {
    store: Arc<dyn ProductStore>,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, bytes: &[u8]) -> Result<ImportReport, ImportError> {
        let products = match validate_rows(bytes) {
            Ok(products) => products,
            Err(ImportError::Rejected(errors)) => {
                warn!("CSV import rejected: {} invalid row(s)", errors.len());
                return Err(ImportError::Rejected(errors));
            }
            Err(err) => {
                warn!("CSV import could not be decoded: {}", err);
                return Err(err);
            }
        };

        if products.is_empty() {
            info!("CSV import contained no rows");
            return Ok(ImportReport { imported: 0 });
        }

        let rows = products.len();
        let imported = self
            .store
            .create_batch(products)
            .await
            .map_err(ImportError::PersistFailed)?;

        info!("CSV import persisted {} of {} row(s)", imported, rows);
        Ok(ImportReport { imported })
    }
}
