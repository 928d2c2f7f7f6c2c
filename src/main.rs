use clap::Parser;
use std::path::Path;

use relog::{
    Result, artifacts, cli,
    collector::CollectorConfig,
    forge::github::GithubForge,
    generator::Generator,
    oracle::gemini::GeminiOracle,
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("relog")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = cli::Args::parse();

    initialize_logger(args.debug)?;

    let generator_config = args.generator_config()?;
    let remote_config = args.remote_config()?;
    let api_key = args.google_api_key()?;

    let forge = GithubForge::new(remote_config.clone())?;
    let oracle = GeminiOracle::new(api_key);

    let generator = Generator::new(
        generator_config,
        remote_config,
        CollectorConfig::default(),
        &forge,
        &oracle,
    );

    let output = generator.generate().await?;

    artifacts::save(Path::new("."), &output, &args.release).await?;

    if let Some(path) = &args.output {
        tokio::fs::write(path, &output.changelog).await?;
        log::info!("changelog written to {}", path);
    } else {
        print!("{}", output.changelog);
    }

    Ok(())
}
