// src/config.rs
use crate::api::FetcherConfig;
use crate::constants::DEFAULT_MANIFEST_DIR;
use crate::error::AppError;
use crate::media::{DownloadConfig, PathTransform};
use crate::page_reference::PageReferenceConfig;
use crate::pipeline::MediaStrategyConfig;
use crate::types::{ApiKey, NotionId};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Root directory for media and page-reference manifests
    #[arg(long, global = true)]
    pub manifest_dir: Option<PathBuf>,

    /// Number of fetch tasks dispatched concurrently
    #[arg(long, global = true, default_value_t = crate::constants::DEFAULT_FETCH_BATCH_SIZE)]
    pub batch_size: usize,

    /// Maximum Notion API requests per second
    #[arg(long, global = true, default_value_t = crate::constants::DEFAULT_MAX_REQUESTS_PER_SECOND)]
    pub rate_limit: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a document, process its media and links, and render it
    Convert(ConvertArgs),
    /// Record the URL property of a document and all nested documents
    Index(IndexArgs),
}

/// How media references are materialized.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaMode {
    /// Leave media untouched and skip the media manifest
    None,
    /// Keep provider URLs but track them in the manifest
    Direct,
    /// Save assets to a local directory
    Download,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Notion page URL or ID (e.g., "https://www.notion.so/...")
    pub notion_input: String,

    /// Output file for the rendered document
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,

    /// Pipe mode - print the rendered document to stdout
    #[arg(short = 'p', long, default_value_t = false)]
    pub pipe: bool,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Fetch discussion comments
    #[arg(long, default_value_t = false)]
    pub comments: bool,

    /// Skip retrieving the document's properties
    #[arg(long = "no-properties", default_value_t = false)]
    pub no_properties: bool,

    /// Also retrieve properties of nested child pages
    #[arg(long, default_value_t = false)]
    pub child_page_properties: bool,

    /// Media strategy
    #[arg(long, value_enum, default_value_t = MediaMode::None)]
    pub media: MediaMode,

    /// Directory downloaded media is written to
    #[arg(long)]
    pub media_dir: Option<PathBuf>,

    /// Prefix replacing the media directory in rewritten URLs
    #[arg(long)]
    pub media_url_prefix: Option<String>,

    /// Leave externally hosted media alone
    #[arg(long, default_value_t = false)]
    pub preserve_external_urls: bool,

    /// Fail the run when a media asset cannot be processed
    #[arg(long, default_value_t = false)]
    pub strict_media: bool,

    /// Property holding each document's public URL; enables link rewriting
    #[arg(long)]
    pub url_property: Option<String>,

    /// Base URL joined with stored paths when rewriting links
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Notion page URL or ID of the workspace root to index
    pub notion_input: String,

    /// Property holding each document's public URL
    #[arg(long, default_value = "URL")]
    pub url_property: String,
}

/// Resolved settings for `convert`.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub document: NotionId,
    pub output_file: Option<PathBuf>,
    pub pipe: bool,
    pub pretty: bool,
    pub media: MediaMode,
    pub media_dir: Option<PathBuf>,
    pub media_url_prefix: Option<String>,
    pub preserve_external_urls: bool,
    pub fail_forward: bool,
    pub url_property: Option<String>,
    pub base_url: Option<String>,
}

impl ConvertConfig {
    /// The media strategy to install, if any.
    pub fn media_strategy(&self) -> Option<MediaStrategyConfig> {
        match self.media {
            MediaMode::None => None,
            MediaMode::Direct => Some(MediaStrategyConfig::Direct),
            MediaMode::Download => {
                let mut config = DownloadConfig {
                    output_dir: self.media_dir.clone(),
                    transform_path: None,
                    preserve_external_urls: self.preserve_external_urls,
                    fail_forward: self.fail_forward,
                };
                if let (Some(dir), Some(prefix)) = (&self.media_dir, &self.media_url_prefix) {
                    config.transform_path = Some(prefix_transform(dir, prefix));
                }
                Some(MediaStrategyConfig::Download(config))
            }
        }
    }

    /// Link rewriting settings, enabled by a URL property.
    pub fn page_references(&self) -> Option<PageReferenceConfig> {
        let property = self.url_property.as_ref()?;
        let mut config = PageReferenceConfig::default().with_url_property(property.clone());
        if let Some(base) = &self.base_url {
            config = config.with_base_url(base.clone());
        }
        Some(config)
    }
}

/// Replaces the leading `dir` of a local path with `prefix`.
fn prefix_transform(dir: &std::path::Path, prefix: &str) -> PathTransform {
    let dir = dir.to_string_lossy().trim_end_matches('/').to_string();
    let prefix = prefix.trim_end_matches('/').to_string();
    Arc::new(move |path: &str| match path.strip_prefix(dir.as_str()) {
        Some(rest) => format!("{}/{}", prefix, rest.trim_start_matches('/')),
        None => path.to_string(),
    })
}

/// What the binary was asked to do.
#[derive(Debug, Clone)]
pub enum Task {
    Convert(ConvertConfig),
    Index { root: NotionId, url_property: String },
}

/// Resolved configuration, validated and ready to drive a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: ApiKey,
    /// Overrides the Notion API root, e.g. for a local mock.
    pub api_base_url: Option<String>,
    pub verbose: bool,
    pub manifest_dir: PathBuf,
    pub fetcher: FetcherConfig,
    pub task: Task,
}

impl PipelineConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let api_key_str = std::env::var("NOTION_API_KEY").map_err(|_| {
            AppError::MissingConfiguration(
                "NOTION_API_KEY environment variable not set".to_string(),
            )
        })?;
        let api_key = ApiKey::new(api_key_str)?;
        let api_base_url = std::env::var("NOTION_API_BASE_URL").ok();
        Self::from_parts(cli, api_key, api_base_url)
    }

    /// Resolution without touching the environment.
    pub fn from_parts(
        cli: CommandLineInput,
        api_key: ApiKey,
        api_base_url: Option<String>,
    ) -> Result<Self, AppError> {
        if cli.batch_size == 0 {
            return Err(AppError::MissingConfiguration(
                "--batch-size must be at least 1".to_string(),
            ));
        }
        if cli.rate_limit == 0 {
            return Err(AppError::MissingConfiguration(
                "--rate-limit must be at least 1".to_string(),
            ));
        }

        let mut fetcher = FetcherConfig {
            batch_size: cli.batch_size,
            max_requests_per_second: cli.rate_limit,
            ..FetcherConfig::default()
        };

        let task = match cli.command {
            Command::Convert(args) => {
                fetcher.fetch_comments = args.comments;
                fetcher.fetch_page_properties = !args.no_properties || args.url_property.is_some();
                fetcher.fetch_child_page_properties = args.child_page_properties;
                if args.media == MediaMode::Download && args.media_dir.is_none() {
                    return Err(AppError::MissingConfiguration(
                        "--media download requires --media-dir".to_string(),
                    ));
                }
                Task::Convert(ConvertConfig {
                    document: NotionId::parse(&args.notion_input)?,
                    output_file: args.output_file,
                    pipe: args.pipe,
                    pretty: args.pretty,
                    media: args.media,
                    media_dir: args.media_dir,
                    media_url_prefix: args.media_url_prefix,
                    preserve_external_urls: args.preserve_external_urls,
                    fail_forward: !args.strict_media,
                    url_property: args.url_property,
                    base_url: args.base_url,
                })
            }
            Command::Index(args) => Task::Index {
                root: NotionId::parse(&args.notion_input)?,
                url_property: args.url_property,
            },
        };

        Ok(PipelineConfig {
            api_key,
            api_base_url,
            verbose: cli.verbose,
            manifest_dir: cli
                .manifest_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_DIR)),
            fetcher,
            task,
        })
    }
}
