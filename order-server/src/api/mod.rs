//! HTTP API 模块
//!
//! | 模块 | 路径 | 说明 |
//! |------|------|------|
//! | [`orders`] | /api/order | 订单查询 |
//! | [`health`] | /health, /health/detailed | 健康检查 |
//! | [`index`] | / | 查询页面 |

pub mod health;
pub mod index;
pub mod orders;
