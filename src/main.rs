use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use polytl::cli::commands::{models, providers, render, translate};
use polytl::cli::{Args, Command};
use polytl::config::ResolveOptions;
use polytl::output::{self, OutputConfig};
use polytl::translation::print_languages;

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("polytl={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 2)
        .with_ansi(!output::is_no_color())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    output::init(OutputConfig::from_flags(args.quiet));
    init_logging(args.verbose);

    match args.command {
        Some(Command::Languages) => print_languages(),
        Some(Command::Providers { provider }) => {
            providers::print_providers(provider.as_deref())?;
        }
        Some(Command::Models { provider }) => {
            models::print_models(provider).await?;
        }
        Some(Command::Render { file }) => render::run_render(file.as_deref())?,
        None => {
            let options = translate::TranslateOptions {
                file: args.file,
                resolve: ResolveOptions {
                    to: args.to,
                    from: args.from,
                    provider: args.provider,
                    models: args.models,
                    concurrency: args.concurrency,
                },
                format: args.format,
                html: args.html,
            };
            let results = translate::run_translate(options).await?;
            if !results.iter().any(|r| r.is_done()) {
                std::process::exit(exitcode::UNAVAILABLE);
            }
        }
    }

    Ok(())
}
