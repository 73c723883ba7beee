use std::sync::Arc;

use super::{Config, Result};
use crate::sessions::SessionsManager;

/// 引擎运行状态 - 配置 + 会话管理器
#[derive(Clone, Debug)]
pub struct EngineState {
    pub config: Config,
    sessions: Arc<SessionsManager>,
}

impl EngineState {
    /// 打开数据库并修复缺失的开放会话
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let path = config.session_db_path();
        let manager = SessionsManager::open(&path)?
            .with_default_reservation_minutes(config.default_reservation_minutes);

        let repaired = manager.repair_open_sessions()?;
        if repaired > 0 {
            tracing::warn!(repaired, "Tables were missing an open session, FREE sessions created");
        }
        tracing::info!(path = %path.display(), epoch = %manager.epoch(), "Session store ready");

        Ok(Self {
            config: config.clone(),
            sessions: Arc::new(manager),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionsManager> {
        &self.sessions
    }
}
