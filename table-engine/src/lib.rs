//! Table Engine - 桌台会话生命周期与拓扑引擎
//!
//! # 架构概述
//!
//! 跟踪每张桌台的当前会话 (空闲、点餐、制作中、待结账、已预订…)，
//! 并在合并、拆分、换桌、预订/取消时保持会话、预订与订单状态一致。
//!
//! # 模块结构
//!
//! ```text
//! table-engine/src/
//! ├── core/          # 配置、状态、错误
//! ├── sessions/      # 会话存储、状态机、拓扑操作
//! └── utils/         # 日志
//! ```

pub mod core;
pub mod sessions;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, EngineState, ServerError};
pub use sessions::{
    InvariantViolation, ManagerError, SessionStorage, SessionsManager, StorageError,
};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env、确保工作目录存在、初始化日志
pub fn setup_environment() -> core::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }

    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(config)
}
