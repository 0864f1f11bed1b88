use clap::Parser;
use pytchbuild::utils::{logger, report::report_error, validation::Validate};
use pytchbuild::{BuildEngine, CompileConfig, LocalStorage, TutorialPipeline};

#[tokio::main]
async fn main() {
    let mut config = CompileConfig::parse();

    logger::init_cli_logger(config.common.verbose);
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.resolve().and_then(|_| config.validate()) {
        report_error("Configuration validation failed", &e);
        std::process::exit(e.exit_code());
    }

    let pipeline = TutorialPipeline::new(LocalStorage::default(), config);
    let engine = BuildEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Tutorial compiled to {}", output_path);
        }
        Err(e) => {
            report_error("Tutorial compilation failed", &e);
            std::process::exit(e.exit_code());
        }
    }
}
