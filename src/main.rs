use anyhow::{Context, Result};
use clap::Parser;
use docktrim::cli::{Cli, OutputFormat};
use docktrim::config::TrimConfig;
use docktrim::engine::DockerCli;
use docktrim::invoke::HttpInvoker;
use docktrim::session::Session;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to trace
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<TrimConfig> {
    let mut config = match &args.config {
        Some(path) => TrimConfig::from_file(path)?,
        None => TrimConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate().context("Invalid command-line settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let engine = DockerCli::new(config.engine.clone());
    let invoker = HttpInvoker::new(config.invoke_url(), config.invoke_timeout());

    let session = Session::new(&engine, &invoker, config);
    let report = session
        .run(&args.image)
        .with_context(|| format!("Failed to trim image '{}'", args.image))?;

    match args.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}
