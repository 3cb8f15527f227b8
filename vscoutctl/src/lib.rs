use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use vscout_core::{
    load_vscout_config, resolve_channel, CatalogError, ChannelInputParser, ChannelRecord,
    FetchOutcome, FetchRequest, IdeaRecord, IdentifierError, IngestError, Ingestor, NewChannel,
    SqliteCatalogStore, SystemClock, VideoRecord, VscoutConfig, YouTubeDataApi, YouTubeError,
    YouTubeSection,
};

pub mod commands;

use commands::{ChannelAddArgs, ChannelRmArgs, FetchArgs, IdeaAddArgs, IdeaRmArgs};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] vscout_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Identifier(#[from] IdentifierError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("ingestion error: {0}")]
    Ingest(#[from] IngestError),
    #[error("youtube error: {0}")]
    YouTube(#[from] YouTubeError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("required resource missing: {0}")]
    MissingResource(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "vscout command-line control interface", long_about = None)]
pub struct Cli {
    /// Path to the main vscout.toml
    #[arg(long, default_value = "configs/vscout.toml")]
    pub config: PathBuf,
    /// Override path for catalog.sqlite
    #[arg(long)]
    pub catalog_db: Option<PathBuf>,
    /// Override the YouTube Data API key from the config
    #[arg(long)]
    pub api_key: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the catalog database and schema
    Init,
    /// Tracked-channel operations
    #[command(subcommand)]
    Channel(ChannelCommands),
    /// Run one ingestion cycle for a channel
    Fetch(FetchArgs),
    /// Saved-idea operations
    #[command(subcommand)]
    Idea(IdeaCommands),
}

#[derive(Subcommand, Debug)]
pub enum ChannelCommands {
    /// Resolve a channel URL or id and start tracking it
    Add(ChannelAddArgs),
    /// List tracked channels, newest first
    List,
    /// Stop tracking a channel (cascades to videos and ideas)
    Rm(ChannelRmArgs),
}

#[derive(Subcommand, Debug)]
pub enum IdeaCommands {
    /// Save a stored video as an idea
    Add(IdeaAddArgs),
    /// List saved ideas, newest first
    List,
    /// Discard a saved idea
    Rm(IdeaRmArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Init => {
            let ack = context.init()?;
            render(&ack, cli.format)?;
        }
        Commands::Channel(ChannelCommands::Add(args)) => {
            let channel = context.channel_add(args)?;
            render(&channel, cli.format)?;
        }
        Commands::Channel(ChannelCommands::List) => {
            let channels = context.channel_list()?;
            render(&channels, cli.format)?;
        }
        Commands::Channel(ChannelCommands::Rm(args)) => {
            let ack = context.channel_rm(args)?;
            render(&ack, cli.format)?;
        }
        Commands::Fetch(args) => {
            let outcome = context.fetch(args)?;
            render(&outcome, cli.format)?;
        }
        Commands::Idea(IdeaCommands::Add(args)) => {
            let idea = context.idea_add(args)?;
            render(&idea, cli.format)?;
        }
        Commands::Idea(IdeaCommands::List) => {
            let ideas = context.idea_list()?;
            render(&ideas, cli.format)?;
        }
        Commands::Idea(IdeaCommands::Rm(args)) => {
            let ack = context.idea_rm(args)?;
            render(&ack, cli.format)?;
        }
    }

    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct AppContext {
    config: VscoutConfig,
    catalog_path: PathBuf,
    store: SqliteCatalogStore,
    api_key_override: Option<String>,
    runtime: tokio::runtime::Runtime,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = load_vscout_config(&cli.config)?;
        let catalog_path = cli
            .catalog_db
            .clone()
            .unwrap_or_else(|| config.catalog_db_path());
        let store = SqliteCatalogStore::new(&catalog_path)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            catalog_path,
            store,
            api_key_override: cli.api_key.clone(),
            runtime,
        })
    }

    fn youtube_section(&self) -> YouTubeSection {
        let mut section = self.config.youtube.clone();
        if let Some(key) = &self.api_key_override {
            section.api_key = key.clone();
        }
        section
    }

    fn platform(&self) -> Result<YouTubeDataApi> {
        Ok(YouTubeDataApi::new(&self.youtube_section())?)
    }

    fn init(&self) -> Result<Ack> {
        if let Some(parent) = self.catalog_path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.store.initialize()?;
        Ok(Ack::new(format!(
            "catalog ready at {}",
            self.catalog_path.display()
        )))
    }

    fn channel_add(&self, args: &ChannelAddArgs) -> Result<ChannelRecord> {
        let identifier = ChannelInputParser::new().parse(&args.input)?;
        let platform = self.platform()?;
        let profile = self
            .runtime
            .block_on(resolve_channel(&platform, &identifier))?;
        let record = self.store.add_channel(
            &NewChannel {
                youtube_id: profile.channel_id,
                name: profile.title,
                thumbnail_url: profile.thumbnail_url,
                subscriber_count: profile.subscriber_count,
            },
            Utc::now(),
        )?;
        Ok(record)
    }

    fn channel_list(&self) -> Result<Vec<ChannelRecord>> {
        Ok(self.store.list_channels()?)
    }

    fn channel_rm(&self, args: &ChannelRmArgs) -> Result<Ack> {
        self.store.remove_channel(&args.id)?;
        Ok(Ack::new(format!("channel {} removed", args.id)))
    }

    fn fetch(&self, args: &FetchArgs) -> Result<FetchOutcome> {
        let channel = match self.store.channel(&args.channel)? {
            Some(record) => record,
            None => self
                .store
                .channel_by_external_id(&args.channel)?
                .ok_or_else(|| AppError::MissingResource(format!("channel {}", args.channel)))?,
        };

        let ingestor = Ingestor::new(
            self.store.clone(),
            Arc::new(self.platform()?),
            Arc::new(SystemClock),
        );
        let request = FetchRequest {
            channel_key: channel.id,
            external_id: channel.youtube_id,
            force_refresh: args.force,
        };
        Ok(self.runtime.block_on(ingestor.fetch_channel_videos(&request))?)
    }

    fn idea_add(&self, args: &IdeaAddArgs) -> Result<IdeaRecord> {
        Ok(self
            .store
            .save_idea(&args.video, args.note.as_deref(), Utc::now())?)
    }

    fn idea_list(&self) -> Result<Vec<IdeaRecord>> {
        Ok(self.store.list_ideas()?)
    }

    fn idea_rm(&self, args: &IdeaRmArgs) -> Result<Ack> {
        self.store.remove_idea(&args.id)?;
        Ok(Ack::new(format!("idea {} removed", args.id)))
    }
}

impl DisplayFallback for Ack {
    fn display(&self) -> String {
        self.message.clone()
    }
}

impl DisplayFallback for ChannelRecord {
    fn display(&self) -> String {
        let subscribers = self
            .subscriber_count
            .map(|count| format!("{count} subscribers"))
            .unwrap_or_else(|| "subscribers hidden".to_string());
        format!(
            "{}  {}  {}  ({})",
            self.id, self.youtube_id, self.name, subscribers
        )
    }
}

impl DisplayFallback for Vec<ChannelRecord> {
    fn display(&self) -> String {
        if self.is_empty() {
            return "no channels tracked".to_string();
        }
        self.iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for FetchOutcome {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "{} video(s), cached={}, fetched_at={}",
            self.videos.len(),
            self.cached,
            self.fetched_at.format("%Y-%m-%d %H:%M:%S")
        )];
        for video in &self.videos {
            lines.push(format_video_line(video));
        }
        lines.join("\n")
    }
}

impl DisplayFallback for IdeaRecord {
    fn display(&self) -> String {
        format!(
            "{}  video={}  {}",
            self.id,
            self.video_id,
            self.note.as_deref().unwrap_or("-")
        )
    }
}

impl DisplayFallback for Vec<IdeaRecord> {
    fn display(&self) -> String {
        if self.is_empty() {
            return "no ideas saved".to_string();
        }
        self.iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn format_video_line(video: &VideoRecord) -> String {
    format!(
        "{}  {}  {}  {} views  {}  [{}]",
        video.id,
        video.published_at.format("%Y-%m-%d"),
        format_duration(video.duration_seconds),
        video.view_count,
        video.title,
        video.youtube_id
    )
}

fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes:02}m{secs:02}s")
    } else {
        format!("{minutes}m{secs:02}s")
    }
}
