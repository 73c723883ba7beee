use std::collections::BTreeMap;

use table_engine::{EngineState, setup_environment};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    let config = setup_environment()?;

    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Table engine starting..."
    );

    // 2. 打开会话存储并修复缺失的开放会话
    let state = EngineState::initialize(&config)?;
    let sessions = state.sessions();

    // 3. 不变量检查
    let violations = sessions.check_invariants()?;
    for violation in &violations {
        tracing::error!(%violation, "Invariant violation");
    }

    // 4. 按场所汇总
    let mut venues: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    for table in sessions.storage().list_tables()? {
        let entry = venues.entry(table.venue_id).or_default();
        entry.0 += 1;
        let busy = sessions
            .open_session(table.id)?
            .is_some_and(|s| s.status != shared::models::SessionStatus::Free);
        if busy {
            entry.1 += 1;
        }
    }
    for (venue_id, (tables, busy)) in &venues {
        tracing::info!(venue_id, tables, busy, "Venue summary");
    }

    tracing::info!(
        venues = venues.len(),
        violations = violations.len(),
        sequence = sessions.get_current_sequence()?,
        "Table engine ready"
    );

    if violations.is_empty() {
        Ok(())
    } else {
        Err(format!("{} invariant violation(s) found", violations.len()).into())
    }
}
