// ==========================================
// 工数管理系统 - 主入口
// ==========================================
// 子命令:
// - serve: 启动 HTTP 服务（默认）
// - import: 工数一括导入（.xlsx / .csv）
// - config: 全局配置写入
// - holiday: 公司休日登记/删除
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use kousu_management::app::{get_default_db_path, router, AppState};
use kousu_management::{i18n, logging};

#[derive(Debug, Parser)]
#[command(name = "kousu-management", version, about = "工数管理系统")]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, env = "KOUSU_DB_PATH", global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 启动 HTTP 服务
    Serve {
        #[arg(long, env = "KOUSU_BIND", default_value = "127.0.0.1:8000")]
        bind: String,
    },
    /// 工数一括导入
    Import {
        /// 导入文件（.xlsx / .csv）
        file: PathBuf,
        /// 以该员工身份执行（权限判定用）
        #[arg(long = "as")]
        employee_id: String,
    },
    /// 写入全局配置
    Config { key: String, value: String },
    /// 登记/删除公司休日
    Holiday {
        date: NaiveDate,
        #[arg(required_unless_present = "delete")]
        name: Option<String>,
        #[arg(long)]
        delete: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    i18n::init_from_env();

    let cli = Cli::parse();

    tracing::info!("==================================================");
    tracing::info!("{} 系统版本: {}", kousu_management::APP_NAME, kousu_management::VERSION);
    tracing::info!("==================================================");

    let db_path = cli.db_path.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match cli.command.unwrap_or(Command::Serve {
        bind: "127.0.0.1:8000".to_string(),
    }) {
        Command::Serve { bind } => serve(state, &bind).await,
        Command::Import { file, employee_id } => {
            let viewer = state.organization_api.resolve_viewer(&employee_id)?;
            let summary = state
                .workload_importer
                .import_file(&file, &viewer)
                .with_context(|| format!("导入失败: {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Config { key, value } => {
            state.config_manager.set_global_config_value(&key, &value)?;
            tracing::info!(key = %key, value = %value, "配置已更新");
            Ok(())
        }
        Command::Holiday { date, name, delete } => {
            if delete {
                state.holiday_repo.delete(date)?;
                tracing::info!(date = %date, "公司休日已删除");
                return Ok(());
            }
            let name = name.unwrap_or_default();
            state.holiday_repo.upsert(date, &name)?;
            tracing::info!(date = %date, name = %name, "公司休日已登记");
            Ok(())
        }
    }
}

async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("无法监听 {}", bind))?;
    tracing::info!("HTTP 服务启动: http://{}", bind);
    axum::serve(listener, app).await?;
    tracing::info!("HTTP 服务已退出");
    Ok(())
}
