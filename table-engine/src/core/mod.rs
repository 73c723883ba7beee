//! 核心模块 - 配置、状态和错误定义
//!
//! - [`Config`] - 引擎配置
//! - [`EngineState`] - 运行状态
//! - [`ServerError`] - 启动错误

pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use state::EngineState;
