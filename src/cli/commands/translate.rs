//! Translation command handler.

use anyhow::{Result, bail};
use futures_util::{StreamExt, stream};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::config::{ConfigManager, ResolveOptions, ResolvedConfig, resolve_config};
use crate::input::{InputReader, LONG_INPUT_CHARS};
use crate::status;
use crate::translation::{
    JobEvents, JobResult, JobSpec, ModelCatalog, Scheduler, TranslationClient, TranslationJob,
    TranslationRequest, language_name, validate_language,
};
use crate::ui::{Spinner, Style};
use crate::view::{ResultView, html_report, text_report};

pub struct TranslateOptions {
    pub file: Option<PathBuf>,
    pub resolve: ResolveOptions,
    pub format: OutputFormat,
    pub html: Option<PathBuf>,
}

/// Translates the input with every configured model and prints the results.
///
/// Individual model failures are part of the returned results, not errors.
pub async fn run_translate(options: TranslateOptions) -> Result<Vec<JobResult>> {
    let config_file = ConfigManager::new().load_or_default()?;
    let config = resolve_config(&options.resolve, &config_file)?;

    validate_language(&config.target_language)?;
    if let Some(from) = &config.source_language {
        validate_language(from)?;
    }

    let source_text = InputReader::read(options.file.as_deref())?;
    if source_text.trim().is_empty() {
        bail!("Input is empty");
    }
    let chars = source_text.chars().count();
    if chars > LONG_INPUT_CHARS {
        status!(
            "{} input is {chars} characters long; long texts may be cut short by some models",
            Style::warning("Note:")
        );
    }

    let request = Arc::new(TranslationRequest {
        source_text,
        source_language: config
            .source_language
            .as_deref()
            .map(|code| language_name(code).to_string()),
        target_language: language_name(&config.target_language).to_string(),
    });

    let specs = job_specs(&config, &request);
    let catalog = lookup_models(&specs).await;

    let (jobs, receivers): (Vec<TranslationJob>, Vec<JobEvents>) =
        specs.into_iter().map(TranslationJob::new).unzip();
    let cards = jobs
        .iter()
        .zip(&config.targets)
        .map(|(job, target)| JobResult::pending(job.model(), &target.provider_name))
        .collect();

    let mut view = ResultView::new(page_title(&config), cards, options.html.clone());
    let scheduler = Scheduler::new(config.concurrency);

    let mut events = stream::select_all(
        receivers
            .into_iter()
            .enumerate()
            .map(|(index, rx)| rx.map(move |event| (index, event))),
    );
    let pump = async {
        while let Some((index, event)) = events.next().await {
            view.apply(index, event)?;
        }
        anyhow::Ok(())
    };

    let (results, pumped) = tokio::join!(scheduler.run(jobs, &catalog), pump);
    pumped?;
    tracing::debug!(peak = scheduler.peak_in_flight(), "all jobs finished");

    view.finish();
    view.write_page(true)?;
    print_results(&results, options.format)?;

    let succeeded = results.iter().filter(|r| r.is_done()).count();
    status!(
        "{}",
        Style::secondary(format!("{succeeded}/{} translations succeeded", results.len()))
    );
    if let Some(path) = &options.html {
        status!("{} {}", Style::success("Wrote"), path.display());
    }

    Ok(results)
}

fn job_specs(config: &ResolvedConfig, request: &Arc<TranslationRequest>) -> Vec<JobSpec> {
    let http = reqwest::Client::new();
    config
        .targets
        .iter()
        .map(|target| JobSpec {
            client: TranslationClient::new(
                target.kind,
                target.endpoint.clone(),
                target.api_key.clone(),
            )
            .with_http_client(http.clone()),
            provider_name: target.provider_name.clone(),
            model: target.model.clone(),
            request: Arc::clone(request),
        })
        .collect()
}

async fn lookup_models(specs: &[JobSpec]) -> ModelCatalog {
    let spinner = Spinner::new("Looking up models...");
    let targets: Vec<(&TranslationClient, &str)> = specs
        .iter()
        .map(|spec| (&spec.client, spec.model.as_str()))
        .collect();
    let mut catalog = ModelCatalog::new();
    catalog.refresh(&targets).await;
    spinner.stop();
    catalog
}

fn page_title(config: &ResolvedConfig) -> String {
    let to = language_name(&config.target_language);
    match config.source_language.as_deref() {
        Some(from) => format!("{} → {to}", language_name(from)),
        None => format!("→ {to}"),
    }
}

fn print_results(results: &[JobResult], format: OutputFormat) -> Result<()> {
    let report = match format {
        OutputFormat::Text => text_report(results),
        OutputFormat::Html => html_report(results),
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{report}")?;
    stdout.flush()?;
    Ok(())
}
