// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_ingest::{
    ChainData, CommandLineInput, ConversionPipeline, ConvertConfig, FetcherConfig, FileExporter,
    JsonTreeRenderer, ManifestStore, NotionHttpClient, NotionId, NotionRepository,
    PageReferenceManifestBuilder, PageReferenceManifestStore, PipelineConfig, StdoutExporter, Task,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Sets up logging configuration.
///
/// Console output goes to stderr so `--pipe` keeps stdout clean.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("notion-ingest.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn connect(config: &PipelineConfig) -> anyhow::Result<Arc<dyn NotionRepository>> {
    let client = match &config.api_base_url {
        Some(base) => {
            log::info!("Using Notion API at {}", base);
            NotionHttpClient::with_base_url(&config.api_key, base.clone())?
        }
        None => NotionHttpClient::new(&config.api_key)?,
    };
    Ok(Arc::new(client))
}

/// Runs the conversion chain for one document.
async fn convert(
    client: Arc<dyn NotionRepository>,
    fetcher: FetcherConfig,
    manifest_dir: &Path,
    settings: &ConvertConfig,
) -> anyhow::Result<()> {
    let renderer = if settings.pretty {
        JsonTreeRenderer::pretty()
    } else {
        JsonTreeRenderer::new()
    };

    let mut builder = ConversionPipeline::builder(client)
        .configure_fetcher(fetcher)
        .manifest_dir(manifest_dir)
        .with_renderer(Arc::new(renderer));
    if let Some(media) = settings.media_strategy() {
        builder = builder.media(media);
    }
    if let Some(references) = settings.page_references() {
        builder = builder.with_page_references(references);
    }
    if settings.pipe {
        builder = builder.with_exporter(Arc::new(StdoutExporter));
    }
    if let Some(path) = &settings.output_file {
        builder = builder.with_exporter(Arc::new(FileExporter::new(path)));
    }

    let pipeline = builder.build().context("Invalid pipeline configuration")?;
    log::info!("Stages: {}", pipeline.stage_names().join(" -> "));

    let data = pipeline
        .convert(settings.document.as_str())
        .await
        .with_context(|| format!("Conversion of {} failed", settings.document))?;

    report_conversion(&data, settings);
    Ok(())
}

/// Prints a short summary unless stdout carries the document.
fn report_conversion(data: &ChainData, settings: &ConvertConfig) {
    if let Some(errors) = data.metadata.get("exportErrors") {
        eprintln!("Some exporters failed: {}", errors);
    }
    if settings.pipe {
        return;
    }

    if let Ok(document) = data.document() {
        println!(
            "Fetched {} nodes ({} listing calls).",
            document.node_count(),
            document.stats.listing_calls
        );
    }
    if let Some(path) = &data.manifests.media {
        println!("Media manifest: {}", path.display());
    }
    if let Some(path) = &data.manifests.page_references {
        println!("Page-reference manifest: {}", path.display());
    }
    match &settings.output_file {
        Some(path) => println!("Saved to {}", path.display()),
        None => println!("Rendered (no output file or --pipe requested)."),
    }
}

/// Crawls a workspace root and records every document's URL property.
async fn index(
    client: Arc<dyn NotionRepository>,
    fetcher: FetcherConfig,
    manifest_dir: &Path,
    root: &NotionId,
    url_property: &str,
) -> anyhow::Result<()> {
    let mut store = PageReferenceManifestStore::new(manifest_dir);
    store.initialize().await?;
    store.load().await?;

    let builder = PageReferenceManifestBuilder::new(client, fetcher, url_property);
    let report = builder
        .build(root, &mut store)
        .await
        .with_context(|| format!("Indexing {} failed", root))?;

    for (id, reason) in &report.skipped {
        eprintln!("Skipped {}: {}", id, reason);
    }
    println!(
        "Scanned {} documents, recorded {} URLs.",
        report.documents_scanned, report.recorded
    );
    if let Some(path) = store.manifest_path() {
        println!("Page-reference manifest: {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).map_err(|e| anyhow::anyhow!("Logging setup failed: {}", e))?;

    let config = PipelineConfig::resolve(cli)?;
    let client = connect(&config)?;

    match &config.task {
        Task::Convert(settings) => {
            convert(client, config.fetcher.clone(), &config.manifest_dir, settings).await
        }
        Task::Index { root, url_property } => {
            index(
                client,
                config.fetcher.clone(),
                &config.manifest_dir,
                root,
                url_property,
            )
            .await
        }
    }
}
