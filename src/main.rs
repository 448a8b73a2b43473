use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::process;

use ga4_report::client::AnalyticsClient;
use ga4_report::config::{init_config, Config};
use ga4_report::display::{DisplayManager, OutputFormat};
use ga4_report::logging;
use ga4_report::presets;
use ga4_report::query::{DateRange, OrderClause, QuerySpec};
use ga4_report::reporter::AnalyticsReporter;
use ga4_report::state::{resolve_property, PropertyState};
use ga4_report::view::{Filter, SortKey, ViewState};

#[derive(Parser)]
#[command(name = "ga4-report")]
#[command(about = "Command-line reporting for Google Analytics 4 properties")]
#[command(version)]
struct Cli {
    /// Output format: table, json or csv
    #[arg(long, global = true)]
    format: Option<String>,
    /// Property id to query instead of the selected one
    #[arg(long, global = true)]
    property: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD, today, yesterday or NdaysAgo)
    #[arg(long)]
    start: Option<String>,
    /// End date (YYYY-MM-DD, today, yesterday or NdaysAgo)
    #[arg(long)]
    end: Option<String>,
    /// Maximum rows requested from the API
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Args)]
struct ViewArgs {
    /// Sort by column, e.g. sessions:desc (repeatable, applied in order)
    #[arg(long = "sort")]
    sort: Vec<String>,
    /// Filter rows, e.g. sessions>=10 or pagePath~blog (repeatable)
    #[arg(long = "filter")]
    filter: Vec<String>,
    /// Page to show, starting at 1
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Rows per page, 0 for all
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// List properties visible to the access token
    Properties,
    /// Remember a property for later commands
    Select {
        /// Property id (123456 or properties/123456)
        property: String,
        /// Display name to remember alongside the id
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the selected property
    Current,
    /// Forget the selected property
    Clear,
    /// Run an ad-hoc report
    Query {
        /// Comma separated dimensions
        #[arg(long, short, default_value = "")]
        dimensions: String,
        /// Comma separated metrics
        #[arg(long, short)]
        metrics: String,
        /// Server-side ordering, e.g. sessions:desc (repeatable)
        #[arg(long = "order")]
        order: Vec<String>,
        /// Row offset for server-side paging
        #[arg(long)]
        offset: Option<u64>,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Run a preset report
    Preset {
        /// Preset name, see `presets`
        name: String,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// List preset reports
    Presets,
    /// List derived dimensions and their sources
    Dimensions,
    /// Show entry pages with page-level flow ratios
    Flow {
        /// Number of pages to show
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("json"));

    let config = match init_config() {
        Ok(config) => config,
        Err(e) => handle_error(e, json),
    };
    let guard = logging::init_logging(config);

    let result = run(cli, config).await;
    drop(guard);

    if let Err(e) = result {
        handle_error(e, json);
    }
}

async fn run(cli: Cli, config: &Config) -> Result<()> {
    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()?;
    let display_manager = DisplayManager::new(config.output.json_pretty);
    let state_file = &config.paths.state_file;

    match cli.command {
        Commands::Dimensions => print!("{}", display_manager.render_dimensions()),
        Commands::Presets => print!("{}", display_manager.render_presets(presets::all())),
        Commands::Select { property, name } => {
            let state = PropertyState::new(&property, name)?;
            state.save(state_file)?;
            println!("✅ Selected property {}", state.property_id.bright_white().bold());
        }
        Commands::Current => match PropertyState::load(state_file)? {
            Some(state) => println!(
                "{} {} (selected {})",
                state.property_id.bright_white().bold(),
                state.display_name.unwrap_or_default().bright_cyan(),
                state.selected_at.format("%Y-%m-%d %H:%M")
            ),
            None => println!("No property selected."),
        },
        Commands::Clear => {
            if PropertyState::clear(state_file)? {
                println!("Property selection cleared.");
            } else {
                println!("No property selected.");
            }
        }
        Commands::Properties => {
            let reporter = build_reporter(config, display_manager)?;
            print!("{}", reporter.list_properties(format).await?);
        }
        Commands::Query {
            dimensions,
            metrics,
            order,
            offset,
            range,
            view,
        } => {
            let mut query = QuerySpec::new(QuerySpec::parse_list(&dimensions), QuerySpec::parse_list(&metrics));
            query.date_range = date_range(&range, config)?;
            query.limit = Some(range.limit.unwrap_or(config.query.default_limit));
            query.offset = offset;
            query.order_bys = order
                .iter()
                .map(|o| OrderClause::parse(o))
                .collect::<Result<_>>()?;
            query.validate()?;

            let view = view_state(&view, config)?;
            view.check_columns(&query.columns())?;
            let property = resolve_property(cli.property.as_deref(), state_file)?;
            let reporter = build_reporter(config, display_manager)?;
            print!("{}", reporter.run_query(&property, &query, &view, format).await?);
        }
        Commands::Preset { name, range, view } => {
            let preset = presets::find(&name)
                .ok_or_else(|| anyhow!("Unknown preset '{}'. Run `ga4-report presets` to list them", name))?;
            let limit = range.limit.unwrap_or(config.query.default_limit);
            let query = preset.to_query(date_range(&range, config)?, Some(limit));

            let view = view_state(&view, config)?;
            view.check_columns(&query.columns())?;
            let property = resolve_property(cli.property.as_deref(), state_file)?;
            let reporter = build_reporter(config, display_manager)?;
            print!("{}", reporter.run_query(&property, &query, &view, format).await?);
        }
        Commands::Flow { top, range } => {
            let range = date_range(&range, config)?;
            let property = resolve_property(cli.property.as_deref(), state_file)?;
            let reporter = build_reporter(config, display_manager)?;
            print!("{}", reporter.run_flow(&property, range, top, format).await?);
        }
    }

    Ok(())
}

fn build_reporter(config: &Config, display_manager: DisplayManager) -> Result<AnalyticsReporter> {
    let client = AnalyticsClient::from_config(&config.api)?;
    Ok(AnalyticsReporter::new(client, display_manager))
}

fn date_range(range: &RangeArgs, config: &Config) -> Result<DateRange> {
    DateRange::parse(
        range.start.as_deref().unwrap_or(&config.query.default_start_date),
        range.end.as_deref().unwrap_or(&config.query.default_end_date),
    )
}

fn view_state(args: &ViewArgs, config: &Config) -> Result<ViewState> {
    Ok(ViewState {
        sort: args
            .sort
            .iter()
            .map(|s| SortKey::parse(s))
            .collect::<Result<_>>()?,
        filters: args
            .filter
            .iter()
            .map(|f| Filter::parse(f))
            .collect::<Result<_>>()?,
        page_size: args.page_size.unwrap_or(config.output.page_size),
        page: args.page,
    })
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
