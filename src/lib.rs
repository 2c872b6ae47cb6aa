//! # TagProducts 产品目录服务
//!
//! 提供产品的列表、单条创建与 CSV 批量导入接口：
//! - `app`：路由、处理器与产品业务（校验、CSV 解码、导入流水线、存储抽象）
//! - `core`：统一错误、响应结构与中间件
//! - `infrastructure`：数据库与日志
//! - `config`：配置加载

pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;
