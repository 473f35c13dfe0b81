use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

use service::{runtime, ClassCatalog, RegistrationService, RosterFileStore, StoreOptions};

/// Open the store and catalog from configuration and report current rosters.
async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    runtime::ensure_env(&cfg.store.path, &cfg.catalog.path).await?;

    let options = StoreOptions::from_config(&cfg.store)?;
    let store = RosterFileStore::open(&cfg.store.path, options)?;
    let catalog = Arc::new(ClassCatalog::load(&cfg.catalog.path).await);
    let svc = RegistrationService::new(store.clone(), catalog.clone());

    let overview = svc.overview().await?;
    let settings = catalog.settings();
    if !settings.school_name.is_empty() {
        println!("{} - {}", settings.school_name, settings.event_title);
    }
    for grade in &overview.grades {
        println!("{}", grade.grade);
        for class in &grade.classes {
            info!(event = "roster", grade = %grade.grade, class = %class.name, count = class.count, "class roster");
            println!("  {:<24} {:>4}", class.name, class.count);
        }
    }
    if !overview.unlisted.is_empty() {
        println!("not in catalog");
        for class in &overview.unlisted {
            println!("  {:<24} {:>4}", class.name, class.count);
        }
    }
    println!("total: {}", overview.total_students);
    info!(event = "summary", path = %store.path().display(), total = overview.total_students, "roster summary");
    Ok(())
}

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / CONFIG_PATH 等环境变量生效
    dotenv().ok();

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "roster", event = "config_invalid", error = %e, "invalid configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(cfg.logging.json);

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "roster", event = "panic", %run_id, pid, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "roster", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(service = "roster", event = "start", %run_id, pid, version, store = %cfg.store.path, "roster report starting");

    match rt.block_on(run(cfg)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(service = "roster", event = "run_failed", %run_id, error = %e, "roster report failed");
            std::process::ExitCode::FAILURE
        }
    }
}
