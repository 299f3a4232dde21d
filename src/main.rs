use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use bitflow::config::Config;
use bitflow::fetch::{fetch_and_score, score_response};
use bitflow::scoring::{calculate_score, Scale, ScoreEngine};
use bitflow::service::cache::{clear_cache, get_cache_path, CacheConfig};
use bitflow::service::{create_client, DateRange, PredictResponse, PredictionClient};
use bitflow::session::Session;
use bitflow::{output, stderr_buffer};

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_INVALID_METRIC: i32 = 5;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Score card for the selected model followed by the ranking
    #[default]
    Card,
    /// Ranking of every model
    Table,
    /// Tab-separated values, one model per line
    Tsv,
    /// JSON array, one object per model
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Request predictions for a date range and grade every model
    Predict {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Model shown on the score card (defaults to config, then RandomForest)
        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Card)]
        format: OutputFormat,

        /// Re-run the request on an interval, e.g. "10m"
        #[arg(long, value_parser = humantime::parse_duration)]
        watch: Option<Duration>,
    },
    /// Grade a single MAE / MAPE pair without contacting the service
    Score {
        #[arg(long, allow_negative_numbers = true)]
        mae: f64,

        /// MAPE in percent
        #[arg(long, allow_negative_numbers = true)]
        mape: f64,

        /// Override the configured scale (crypto or large)
        #[arg(long, value_parser = bitflow::config::init::parse_scale)]
        scale: Option<Scale>,
    },
    /// List the chart images the service renders for a date range
    Charts {
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// Open every chart in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Create a config file
    Init {
        /// Write the built-in defaults without prompting
        #[arg(long)]
        defaults: bool,

        /// Overwrite an existing config file (with --defaults)
        #[arg(long)]
        force: bool,
    },
    /// Remove cached prediction results
    ClearCache,
}

#[derive(Parser, Debug)]
#[command(name = "bitflow")]
#[command(about = "Grade Bitcoin price-prediction models by MAE and MAPE", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/bitflow/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bypass the result cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.clone().map(PathBuf::from);

    match cli.command {
        Commands::Init { defaults, force } => {
            let result = if defaults {
                bitflow::config::init::write_default_config(config_path, force)
                    .map(|path| println!("Config written to {}", path.display()))
            } else {
                bitflow::config::init::run_init_wizard(config_path)
            };
            if let Err(e) = result {
                eprintln!("Init failed: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        }
        Commands::ClearCache => {
            let cache_path = get_cache_path();
            if let Err(e) = clear_cache(&cache_path) {
                eprintln!("Failed to clear cache: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            println!("Cache cleared: {}", cache_path.display());
        }
        Commands::Score { mae, mape, scale } => {
            let config = load_config_or_exit(config_path, cli.verbose);
            let engine = match scale {
                Some(scale) => {
                    let weights = config
                        .scoring
                        .as_ref()
                        .and_then(|s| s.weights)
                        .unwrap_or_default();
                    ScoreEngine::for_scale(scale, weights)
                }
                None => build_engine_or_exit(&config),
            };

            let result = match calculate_score(mae, mape, &engine) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_INVALID_METRIC);
                }
            };

            println!("{}\t{}", result.grade, output::format_score(result.score));
            if cli.verbose {
                eprintln!("{}", output::format_breakdown(&result));
            }
        }
        Commands::Predict {
            start,
            end,
            model,
            format,
            watch,
        } => {
            let config = load_config_or_exit(config_path, cli.verbose);
            let engine = build_engine_or_exit(&config);
            let range = parse_range_or_exit(&start, &end);
            let client = create_client_or_exit(&config);
            let cache_config = CacheConfig::new(!cli.no_cache);

            let selected = model.unwrap_or_else(|| config.default_model().to_string());
            let mut session = Session::new(selected);
            if let Err(e) = session.set_range(range) {
                eprintln!("{}", e);
                std::process::exit(EXIT_CONFIG);
            }

            let use_colors = output::should_use_colors();

            match watch {
                None => {
                    let start_time = Instant::now();
                    if !refresh(&mut session, &client, &engine, &cache_config, cli.verbose).await {
                        std::process::exit(EXIT_NETWORK);
                    }
                    render(&session, format, use_colors, cli.verbose);
                    if cli.verbose {
                        eprintln!();
                        eprintln!(
                            "Total: {} models in {:?}",
                            session.models().len(),
                            start_time.elapsed()
                        );
                    }
                }
                Some(interval) => loop {
                    // Hold diagnostics back so they print after the refreshed output
                    stderr_buffer::activate();
                    let ok =
                        refresh(&mut session, &client, &engine, &cache_config, cli.verbose).await;
                    let messages = stderr_buffer::drain();

                    if ok || !session.models().is_empty() {
                        render(&session, format, use_colors, cli.verbose);
                    }
                    for msg in messages {
                        eprintln!("{}", msg);
                    }
                    if let Some(status) = watch_status(&session) {
                        eprintln!("{}", status);
                    }
                    if cli.verbose {
                        eprintln!(
                            "Next refresh in {}",
                            humantime::format_duration(interval)
                        );
                    }
                    println!();
                    tokio::time::sleep(interval).await;
                },
            }
        }
        Commands::Charts { start, end, open } => {
            let config = load_config_or_exit(config_path, cli.verbose);
            let engine = build_engine_or_exit(&config);
            let range = parse_range_or_exit(&start, &end);
            let client = create_client_or_exit(&config);

            if cli.verbose {
                eprintln!("Requesting charts for {} from {}", range, client.base_url());
            }

            let plot = match client.predict_plot(&range).await {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Error fetching charts: {:#}", e);
                    std::process::exit(EXIT_NETWORK);
                }
            };

            let charts: Vec<(&str, String)> = plot
                .charts()
                .into_iter()
                .map(|(label, path)| (label, client.chart_url(path)))
                .collect();

            if charts.is_empty() {
                println!("No charts returned for {}", range);
            }
            for (label, url) in &charts {
                println!("{}\t{}", label, url);
            }

            if cli.verbose {
                let response = PredictResponse {
                    results: plot.results.clone(),
                };
                let (models, _) = score_response(&response, &engine);
                eprintln!();
                eprintln!("{}", output::format_ranking_table(&models, false));
            }

            if open {
                if let Err(e) = bitflow::browser::open_charts(&charts) {
                    eprintln!("Failed to open browser: {:#}", e);
                    std::process::exit(EXIT_NETWORK);
                }
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

fn load_config_or_exit(path: Option<PathBuf>, verbose: bool) -> Config {
    let config = match bitflow::config::load_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if verbose {
        eprintln!("Prediction service: {}", config.service.base_url);
        eprintln!("Default model: {}", config.default_model());
    }

    // Validate scoring config at startup
    let effective_scoring = config.scoring.clone().unwrap_or_default();
    if let Err(errors) = bitflow::scoring::validate_scoring(&effective_scoring) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    config
}

fn build_engine_or_exit(config: &Config) -> ScoreEngine {
    let scoring = config.scoring.clone().unwrap_or_default();
    match ScoreEngine::from_config(&scoring) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Scoring config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn parse_range_or_exit(start: &str, end: &str) -> DateRange {
    match DateRange::parse(start, end) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid date range: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn create_client_or_exit(config: &Config) -> PredictionClient {
    match create_client(&config.service) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create prediction client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    }
}

/// One request cycle through the session. Returns false when the request
/// failed and no cached results could stand in.
async fn refresh(
    session: &mut Session,
    client: &PredictionClient,
    engine: &ScoreEngine,
    cache_config: &CacheConfig,
    verbose: bool,
) -> bool {
    if let Err(e) = session.begin_request() {
        eprintln!("{}", e);
        return false;
    }
    let fetched = match session.range().copied() {
        Some(range) => fetch_and_score(client, &range, engine, cache_config, verbose).await,
        None => Err(anyhow::anyhow!("No date range selected")),
    };

    let (ok, applied) = match fetched {
        Ok(outcome) => (true, session.apply_response(outcome)),
        Err(e) => (false, session.apply_failure(&e)),
    };
    if let Err(e) = applied {
        eprintln!("{}", e);
        return false;
    }
    ok
}

/// Status line shown under each `--watch` refresh
fn watch_status(session: &Session) -> Option<String> {
    let updated = session
        .last_updated()?
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S");
    Some(match session.last_error() {
        Some(error) => format!("Refresh failed ({}); showing results from {}", error, updated),
        None => format!("Updated {}", updated),
    })
}

fn render(session: &Session, format: OutputFormat, use_colors: bool, verbose: bool) {
    let models = session.models();

    match format {
        OutputFormat::Card => {
            match session.selected() {
                Some(model) => {
                    println!("{}", output::format_score_card(model, use_colors));
                    if verbose {
                        eprintln!("{}", output::format_breakdown(&model.result));
                    }
                }
                None => eprintln!(
                    "Model '{}' returned no results for this range",
                    session.selected_model
                ),
            }
            println!();
            println!("{}", output::format_ranking_table(models, use_colors));
        }
        OutputFormat::Table => println!("{}", output::format_ranking_table(models, use_colors)),
        OutputFormat::Tsv => {
            if !models.is_empty() {
                println!("{}", output::format_tsv(models));
            }
        }
        OutputFormat::Json => match output::format_json(models) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize results: {:#}", e),
        },
    }

    if let Some(fetched_at) = session.stale_since() {
        let range = session
            .results_range()
            .map(|r| r.to_string())
            .unwrap_or_default();
        eprintln!(
            "Showing cached results for {} from {} (service unreachable)",
            range,
            fetched_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
}

