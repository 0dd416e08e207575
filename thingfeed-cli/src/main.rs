//! CLI for the thingfeed ThingSpeak client.
//!
//! Provides commands for reading channel feeds, building chart data and
//! managing TalkBack command queues.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thingfeed::chart::{ChartConfig, LineChartLoader};
use thingfeed::client::{ClientConfig, DEFAULT_BASE_URL, ThingSpeakClient};
use thingfeed::model::Channel;
use thingfeed::query::{FeedQuery, PublicChannelQuery, Timescale};
use thingfeed::talkback::TalkBack;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// thingfeed — ThingSpeak channel reader and chart builder.
#[derive(Parser)]
#[command(name = "thingfeed", version, about)]
struct Cli {
    /// API root URL.
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print entries of a channel.
    Feed {
        /// Channel ID.
        channel_id: u64,

        #[command(flatten)]
        query: QueryArgs,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Print entries of one field of a channel.
    Field {
        /// Channel ID.
        channel_id: u64,

        /// Field number (1-8).
        field: u32,

        #[command(flatten)]
        query: QueryArgs,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Print a single entry (the latest unless --entry-id is given).
    Entry {
        /// Channel ID.
        channel_id: u64,

        /// Entry ID to fetch.
        #[arg(long)]
        entry_id: Option<u64>,

        #[command(flatten)]
        query: QueryArgs,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Print status updates of a channel.
    Status {
        /// Channel ID.
        channel_id: u64,

        #[command(flatten)]
        query: QueryArgs,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// List public channels.
    Channels {
        /// Page number.
        #[arg(long)]
        page: Option<u32>,

        /// Only channels with this tag.
        #[arg(long)]
        tag: Option<String>,

        /// Only channels owned by this user.
        #[arg(long)]
        username: Option<String>,

        /// Latitude of the search centre.
        #[arg(long, requires_all = ["longitude", "distance"])]
        latitude: Option<f64>,

        /// Longitude of the search centre.
        #[arg(long, requires_all = ["latitude", "distance"])]
        longitude: Option<f64>,

        /// Search radius in kilometres.
        #[arg(long, requires_all = ["latitude", "longitude"])]
        distance: Option<f64>,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// List the channels of an account.
    MyChannels {
        /// User API key.
        #[arg(long)]
        api_key: String,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Build line chart data for one field.
    Chart {
        /// Channel ID.
        channel_id: u64,

        /// Field number (1-8).
        field: u32,

        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        chart: ChartArgs,

        /// Output format.
        #[arg(long, default_value = "summary")]
        format: ChartFormat,
    },

    /// Manage a TalkBack command queue.
    Talkback {
        /// TalkBack ID.
        talkback_id: u64,

        /// TalkBack API key.
        #[arg(long)]
        api_key: String,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        #[command(subcommand)]
        action: TalkBackAction,
    },
}

/// TalkBack queue operations.
#[derive(Subcommand)]
enum TalkBackAction {
    /// List queued commands.
    List,
    /// Queue a command.
    Add {
        /// Command text.
        command: String,
        /// Queue position.
        #[arg(long)]
        position: Option<u32>,
    },
    /// Show one command.
    Get {
        /// Command ID.
        command_id: u64,
    },
    /// Replace a command's text and position.
    Update {
        /// Command ID.
        command_id: u64,
        /// New command text.
        command: String,
        /// New queue position.
        #[arg(long)]
        position: Option<u32>,
    },
    /// Move the first command with the given text.
    Move {
        /// Command text to look for.
        command: String,
        /// New queue position.
        #[arg(long)]
        position: Option<u32>,
    },
    /// Pop and show the next command.
    Execute,
    /// Show the last executed command.
    Last,
    /// Delete one command.
    Delete {
        /// Command ID.
        command_id: u64,
    },
    /// Delete every command.
    Clear,
}

/// Feed selection flags shared by the read commands.
#[derive(Args)]
struct QueryArgs {
    /// Read API key for private channels.
    #[arg(long)]
    api_key: Option<String>,

    /// Number of entries to return.
    #[arg(long)]
    results: Option<u32>,

    /// Days of history to include.
    #[arg(long)]
    days: Option<u32>,

    /// Earliest entry time (RFC 3339).
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Latest entry time (RFC 3339).
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Timezone identifier for returned timestamps.
    #[arg(long)]
    timezone: Option<String>,

    /// Thinning window in minutes (10, 15, 20, 30, 60, 240, 720, 1440) or "daily".
    #[arg(long)]
    timescale: Option<Timescale>,
}

impl QueryArgs {
    fn to_query(&self) -> FeedQuery {
        let mut query = FeedQuery::new();
        if let Some(api_key) = &self.api_key {
            query = query.with_api_key(api_key.clone());
        }
        if let Some(results) = self.results {
            query = query.with_results(results);
        }
        if let Some(days) = self.days {
            query = query.with_days(days);
        }
        if let Some(start) = self.start {
            query = query.with_start(start);
        }
        if let Some(end) = self.end {
            query = query.with_end(end);
        }
        if let Some(timezone) = &self.timezone {
            query = query.with_timezone(timezone.clone());
        }
        if let Some(timescale) = self.timescale {
            query = query.with_timescale(timescale);
        }
        query
    }
}

/// Chart settings; flags override the config file.
#[derive(Args)]
struct ChartArgs {
    /// JSON file with chart settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// strftime pattern for date labels.
    #[arg(long)]
    date_format: Option<String>,

    /// Minutes between date labels.
    #[arg(long)]
    date_interval: Option<u32>,

    /// Step between value labels.
    #[arg(long)]
    value_interval: Option<f64>,

    /// UTC offset for date labels, in minutes.
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Start of the default viewport (RFC 3339).
    #[arg(long)]
    chart_start: Option<DateTime<Utc>>,

    /// End of the default viewport (RFC 3339).
    #[arg(long)]
    chart_end: Option<DateTime<Utc>>,

    /// Draw the line as a spline.
    #[arg(long)]
    spline: bool,

    /// Fill the area under the line.
    #[arg(long)]
    filled: bool,

    /// Line color as #RRGGBB.
    #[arg(long)]
    line_color: Option<String>,

    /// Axis label color as #RRGGBB.
    #[arg(long)]
    axis_color: Option<String>,
}

impl ChartArgs {
    fn to_config(&self) -> Result<ChartConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => read_chart_config(path)?,
            None => ChartConfig::default(),
        };
        if let Some(format) = &self.date_format {
            config = config.with_date_label_format(format.clone());
        }
        if let Some(minutes) = self.date_interval {
            config = config.with_date_tick_interval_minutes(minutes);
        }
        if let Some(interval) = self.value_interval {
            config = config.with_value_tick_interval(interval);
        }
        if let Some(minutes) = self.utc_offset {
            config = config.with_label_utc_offset_minutes(minutes);
        }
        if let Some(start) = self.chart_start {
            config = config.with_chart_start(start);
        }
        if let Some(end) = self.chart_end {
            config = config.with_chart_end(end);
        }
        if self.spline {
            config = config.with_spline(true);
        }
        if self.filled {
            config = config.with_filled(true);
        }
        if let Some(color) = &self.line_color {
            config = config.with_line_color(color.clone());
        }
        if let Some(color) = &self.axis_color {
            config = config.with_axis_color(color.clone());
        }
        Ok(config)
    }
}

/// Output format for records.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// Pretty-printed JSON.
    Json,
}

/// Output format for chart data.
#[derive(Clone, Copy, ValueEnum)]
enum ChartFormat {
    /// Human-readable overview.
    Summary,
    /// The full chart as JSON.
    Json,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult {
    let client = ThingSpeakClient::new(
        ClientConfig::new(cli.base_url).with_timeout(Duration::from_secs(cli.timeout)),
    )?;
    tracing::debug!(base_url = client.base_url(), "client ready");

    match cli.command {
        Commands::Feed {
            channel_id,
            query,
            format,
        } => {
            let feed = client.channel_feed(channel_id, &query.to_query()).await?;
            print_records(&feed.feeds, format)
        }
        Commands::Field {
            channel_id,
            field,
            query,
            format,
        } => {
            let feed = client
                .field_feed(channel_id, field, &query.to_query())
                .await?;
            print_records(&feed.feeds, format)
        }
        Commands::Entry {
            channel_id,
            entry_id,
            query,
            format,
        } => {
            let query = query.to_query();
            let entry = match entry_id {
                Some(entry_id) => client.entry(channel_id, entry_id, &query).await?,
                None => client.last_entry(channel_id, &query).await?,
            };
            print_records(std::slice::from_ref(&entry), format)
        }
        Commands::Status {
            channel_id,
            query,
            format,
        } => {
            let updates = client
                .status_updates(channel_id, &query.to_query())
                .await?;
            print_records(&updates.feeds, format)
        }
        Commands::Channels {
            page,
            tag,
            username,
            latitude,
            longitude,
            distance,
            format,
        } => {
            let mut query = PublicChannelQuery::new();
            if let Some(page) = page {
                query = query.with_page(page);
            }
            if let Some(tag) = tag {
                query = query.with_tag(tag);
            }
            if let Some(username) = username {
                query = query.with_username(username);
            }
            if let (Some(lat), Some(lon), Some(dist)) = (latitude, longitude, distance) {
                query = query.with_location(lat, lon, dist);
            }
            let page = client.public_channels(&query).await?;
            if let (OutputFormat::Csv, Some(pagination)) = (format, page.pagination) {
                println!(
                    "# page={}, per_page={}, total={}",
                    pagination.current_page, pagination.per_page, pagination.total_entries
                );
            }
            print_channels(&page.channels, format)
        }
        Commands::MyChannels { api_key, format } => {
            let channels = client.my_channels(&api_key).await?;
            print_channels(&channels, format)
        }
        Commands::Chart {
            channel_id,
            field,
            query,
            chart,
            format,
        } => cmd_chart(client, channel_id, field, &query, &chart, format).await,
        Commands::Talkback {
            talkback_id,
            api_key,
            format,
            action,
        } => cmd_talkback(TalkBack::new(client, talkback_id, api_key), action, format).await,
    }
}

/// Implements `thingfeed chart <channel_id> <field>`.
async fn cmd_chart(
    client: ThingSpeakClient,
    channel_id: u64,
    field: u32,
    query: &QueryArgs,
    chart_args: &ChartArgs,
    format: ChartFormat,
) -> CliResult {
    let loader = LineChartLoader::new(client, chart_args.to_config()?);
    let chart = loader.load(channel_id, field, &query.to_query()).await?;

    match format {
        ChartFormat::Json => println!("{}", serde_json::to_string_pretty(&chart)?),
        ChartFormat::Summary => {
            println!("Chart: {} (channel {}, {})", chart.title, chart.channel_id, chart.field);
            println!("  Reference time: {}", chart.reference_time.to_rfc3339());
            println!("  Points: {}", chart.points.len());
            println!("  Values: min={}, max={}", chart.min_value, chart.max_value);

            let labels: Vec<_> = chart.value_axis.ticks.iter().map(|t| t.label.as_str()).collect();
            println!("  {} ticks: {}", chart.value_axis.name, labels.join(" "));
            let labels: Vec<_> = chart.date_axis.ticks.iter().map(|t| t.label.as_str()).collect();
            println!("  {} ticks: {}", chart.date_axis.name, labels.join(" "));

            for (name, viewport) in [
                ("Max viewport", chart.max_viewport),
                ("Default viewport", chart.default_viewport),
            ] {
                println!(
                    "  {name}: left={}ms, right={}ms, bottom={}, top={}",
                    viewport.left, viewport.right, viewport.bottom, viewport.top
                );
            }
        }
    }
    Ok(())
}

/// Implements `thingfeed talkback <id> <action>`.
async fn cmd_talkback(talkback: TalkBack, action: TalkBackAction, format: OutputFormat) -> CliResult {
    let commands = match action {
        TalkBackAction::List => talkback.list_commands().await?,
        TalkBackAction::Add { command, position } => {
            vec![talkback.add_command(&command, position).await?]
        }
        TalkBackAction::Get { command_id } => vec![talkback.command(command_id).await?],
        TalkBackAction::Update {
            command_id,
            command,
            position,
        } => vec![talkback.update_command(command_id, &command, position).await?],
        TalkBackAction::Move { command, position } => {
            vec![talkback.update_command_by_string(&command, position).await?]
        }
        TalkBackAction::Execute => vec![talkback.execute_next().await?],
        TalkBackAction::Last => vec![talkback.last_executed().await?],
        TalkBackAction::Delete { command_id } => vec![talkback.delete_command(command_id).await?],
        TalkBackAction::Clear => talkback.delete_all_commands().await?,
    };
    print_records(&commands, format)
}

/// Prints records as pretty JSON or as CSV with a header row.
fn print_records<S: Serialize>(records: &[S], format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => std::io::stdout().write_all(&csv_bytes(records)?)?,
    }
    Ok(())
}

fn print_channels(channels: &[Channel], format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => print_records(channels, format),
        OutputFormat::Csv => {
            let rows: Vec<_> = channels.iter().map(ChannelRow::from).collect();
            print_records(&rows, format)
        }
    }
}

/// Flat CSV view of a channel; tags are joined with `;`.
#[derive(Serialize)]
struct ChannelRow<'a> {
    id: u64,
    name: Option<&'a str>,
    username: Option<&'a str>,
    last_entry_id: Option<u64>,
    tags: String,
}

impl<'a> From<&'a Channel> for ChannelRow<'a> {
    fn from(channel: &'a Channel) -> Self {
        let tags: Vec<_> = channel.tags.iter().map(|t| t.name.as_str()).collect();
        Self {
            id: channel.id,
            name: channel.name.as_deref(),
            username: channel.username.as_deref(),
            last_entry_id: channel.last_entry_id,
            tags: tags.join(";"),
        }
    }
}

fn csv_bytes<S: Serialize>(
    rows: impl IntoIterator<Item = S>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(writer.into_inner()?)
}

/// Reads chart settings from a JSON file; missing keys take their defaults.
fn read_chart_config(path: &Path) -> Result<ChartConfig, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read chart config '{}': {e}", path.display()))?;
    let config: ChartConfig = serde_json::from_str(&data)
        .map_err(|e| format!("invalid chart config '{}': {e}", path.display()))?;
    Ok(config)
}
