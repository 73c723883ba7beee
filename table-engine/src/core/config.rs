use shared::session::MAX_RESERVATION_MINUTES;
use std::path::PathBuf;

/// 引擎配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/crab/tables | 工作目录 |
/// | SESSION_DB_FILE | sessions.redb | 会话数据库文件名 (相对 WORK_DIR) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，设置后按天滚动写文件 |
/// | ENVIRONMENT | development | 运行环境 |
/// | DEFAULT_RESERVATION_MINUTES | 90 | 预订默认时长(分钟)，上限 1440 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/tables LOG_LEVEL=debug cargo run -p table-engine
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放数据库与日志
    pub work_dir: String,
    /// redb 文件名
    pub session_db_file: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// reserve_table 未给出时长时使用
    pub default_reservation_minutes: i64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/crab/tables".into()),
            session_db_file: std::env::var("SESSION_DB_FILE")
                .unwrap_or_else(|_| "sessions.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            default_reservation_minutes: std::env::var("DEFAULT_RESERVATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|m: &i64| (1..=MAX_RESERVATION_MINUTES).contains(m))
                .unwrap_or(90),
        }
    }

    /// 使用自定义工作目录
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 会话数据库完整路径
    pub fn session_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.session_db_file)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
