use clap::Parser;
use pytchbuild::domain::ports::GatherSettings;
use pytchbuild::utils::{logger, report::report_error, validation::Validate};
use pytchbuild::{BuildEngine, CollectionPipeline, GatherConfig, LocalStorage};

#[tokio::main]
async fn main() {
    let mut config = GatherConfig::parse();

    logger::init_cli_logger(config.common.verbose);
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.resolve().and_then(|_| config.validate()) {
        report_error("Configuration validation failed", &e);
        std::process::exit(e.exit_code());
    }

    if config.make_release() {
        tracing::info!("Will record a release on branch '{}'", config.releases_branch());
    }

    let pipeline = CollectionPipeline::new(LocalStorage::default(), config);
    let engine = BuildEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Tutorials gathered into {}", output_path);
        }
        Err(e) => {
            report_error("Gathering tutorials failed", &e);
            std::process::exit(e.exit_code());
        }
    }
}
