use clap::Parser;
use pytchbuild::core::watcher::watch_repository;
use pytchbuild::domain::ports::ConfigProvider;
use pytchbuild::utils::{logger, report::report_error, validation::Validate};
use pytchbuild::{BuildEngine, LocalStorage, TutorialPipeline, WatchConfig};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let mut config = WatchConfig::parse();

    logger::init_cli_logger(config.compile.common.verbose);
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.resolve().and_then(|_| config.validate()) {
        report_error("Configuration validation failed", &e);
        std::process::exit(e.exit_code());
    }

    let git_dir = match git2::Repository::open(config.compile.repository_path()) {
        Ok(repo) => repo.path().to_path_buf(),
        Err(e) => {
            let e = pytchbuild::BuildError::from(e);
            report_error("Cannot open repository", &e);
            std::process::exit(e.exit_code());
        }
    };

    let compile_config = config.compile.clone();
    let rebuild = || {
        let engine = BuildEngine::new(TutorialPipeline::new(
            LocalStorage::default(),
            compile_config.clone(),
        ));
        async move {
            match engine.run().await {
                Ok(output_path) => println!("✅ Tutorial compiled to {}", output_path),
                // Keep watching; the next commit may fix it.
                Err(e) => report_error("Rebuild failed", &e),
            }
        }
    };

    let debounce = Duration::from_millis(config.debounce_ms());
    if let Err(e) = watch_repository(git_dir, debounce, rebuild).await {
        report_error("Watching repository failed", &e);
        std::process::exit(e.exit_code());
    }
}
