//! 核心响应处理模块

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API 响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub request_id: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            request_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// 分页信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

// 分页响应
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

const MAX_PAGE_SIZE: u32 = 100;

impl PaginationInfo {
    /// 根据总数和查询参数计算分页信息。
    ///
    /// 未指定 `limit` 时整个列表作为一页（超过 `u32::MAX` 时取上限）。
    pub fn new(total: u64, query: &PageQuery) -> Self {
        let page = query.page.unwrap_or(1).max(1);
        let limit = match query.limit {
            Some(limit) => limit.clamp(1, MAX_PAGE_SIZE),
            None => u32::try_from(total).unwrap_or(u32::MAX).max(1),
        };

        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }

    /// 当前页第一条记录的下标
    pub fn offset(&self) -> usize {
        let offset = u64::from(self.page - 1).saturating_mul(u64::from(self.limit));
        usize::try_from(offset).unwrap_or(usize::MAX)
    }
}

impl<T> Paginated<T> {
    /// 对已排序的完整列表分页，超出范围的页返回空列表。
    pub fn from_items(all: Vec<T>, query: &PageQuery) -> Self {
        let pagination = PaginationInfo::new(all.len() as u64, query);
        let items: Vec<T> = all
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .collect();

        Self { items, pagination }
    }
}
