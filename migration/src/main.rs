use sea_orm_migration::prelude::*;
use std::env;

/// 独立迁移入口
///
/// 与服务进程保持同一套约定：未显式给出 `DATABASE_URL` 时，
/// 连接串由 `MIRROR_DB_PATH` 推导（缺省 data/mirror.db）。
#[tokio::main]
async fn main() {
    if env::var("DATABASE_URL").is_err() {
        let db_path =
            env::var("MIRROR_DB_PATH").unwrap_or_else(|_| "data/mirror.db".to_string());
        unsafe {
            env::set_var("DATABASE_URL", format!("sqlite://{db_path}"));
        }
    }
    cli::run_cli(migration::Migrator).await;
}
