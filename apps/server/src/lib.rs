//! MotionScore 的 Web 服务与管理命令行.
//!
//! - [`app`]: axum 路由, 登录会话和评分接口;
//! - [`cli`]: `motscore` 命令行的子命令实现.

pub mod app;
pub mod cli;
