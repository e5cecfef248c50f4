//! 服务模块
//!
//! - [`http`] - HTTP 路由组装与服务

pub mod http;
