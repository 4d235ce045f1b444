//! Command-line interface for the stock signal engine

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use signal_engine::{Analyzer, EngineConfig, Screener, ScreeningResult, StockAnalysis, Universe};
use signal_utils::{LoggingConfig, init_tracing_with};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "signal-cli")]
#[command(about = "Technical and sentiment signals for stocks", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// History range to fetch (3mo, 6mo, ytd, 1y, 2y, 5y, 10y, max)
    #[arg(long, global = true, default_value = "1y")]
    range: String,

    /// Print the raw JSON result instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Seconds to wait for news sentiment before scoring it neutral
    #[arg(long, global = true, default_value_t = 15)]
    sentiment_timeout_secs: u64,

    /// Log at info level instead of warn
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single ticker
    Analyze {
        /// Ticker symbol, e.g. AAPL
        ticker: String,
    },
    /// Rank a universe by attractiveness
    Screen {
        /// `sp500`, `nasdaq100`, or a comma-separated list of tickers
        universe: Universe,

        /// Number of top stocks to report
        #[arg(long, default_value_t = 10)]
        top_n: usize,

        /// Symbols analyzed concurrently
        #[arg(long, default_value_t = 8)]
        concurrency: usize,

        /// Per-symbol timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Cache fetched history for this many seconds
        #[arg(long)]
        cache_ttl_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing_with(&LoggingConfig::from_env(if args.verbose { "info" } else { "warn" }));

    let builder = EngineConfig::builder()
        .with_env_api_key()
        .history_range(args.range.as_str())
        .sentiment_timeout(Duration::from_secs(args.sentiment_timeout_secs));

    match args.command {
        Command::Analyze { ticker } => {
            let config = builder.build().context("invalid configuration")?;
            let analyzer = Analyzer::from_config(&config)?;

            info!("Analyzing {}", ticker);
            let analysis = analyzer
                .analyze(&ticker.trim().to_ascii_uppercase())
                .await
                .with_context(|| format!("analysis of {ticker} failed"))?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_analysis(&analysis);
            }
        }
        Command::Screen {
            universe,
            top_n,
            concurrency,
            timeout_secs,
            cache_ttl_secs,
        } => {
            let mut builder = builder
                .top_n(top_n)
                .max_concurrency(concurrency)
                .symbol_timeout(Duration::from_secs(timeout_secs));
            if let Some(ttl) = cache_ttl_secs {
                builder = builder.cache_ttl(Duration::from_secs(ttl));
            }
            let config = builder.build().context("invalid configuration")?;

            let screener = Screener::from_config(&config)?;
            let result = screener.screen(&universe).await;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_screening(&universe, &result);
            }
        }
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn print_analysis(analysis: &StockAnalysis) {
    let rec = &analysis.recommendation;
    println!(
        "{} ({})  close {:.2}",
        analysis.ticker, analysis.company_info.name, analysis.latest_data.close
    );
    println!(
        "{}  confidence {:.1}  technical {:.1}  sentiment {:.1}  combined {:.1}",
        rec.label, rec.confidence, rec.technical_score, rec.sentiment_score, rec.combined_score
    );
    println!("{}\n", rec.description);

    let mut signals = Table::new();
    signals.load_preset(UTF8_FULL).set_header(vec!["Indicator", "Signal"]);
    for (id, label) in &analysis.technical_analysis.signals {
        signals.add_row(vec![id.name().to_string(), label.to_string()]);
    }
    println!("{signals}");

    if let Some(targets) = &analysis.price_targets {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Stop loss", "Target 1", "Target 2", "Risk/reward"]);
        table.add_row(vec![
            format!("{:.2}", targets.stop_loss),
            format!("{:.2}", targets.target1),
            format!("{:.2}", targets.target2),
            fmt_opt(targets.risk_reward_ratio),
        ]);
        println!("{table}");
    }

    if !analysis.support_resistance.is_empty() {
        let mut levels = Table::new();
        levels
            .load_preset(UTF8_FULL)
            .set_header(vec!["Level", "Type", "Strength"]);
        for level in &analysis.support_resistance {
            levels.add_row(vec![
                format!("{:.2}", level.price),
                format!("{:?}", level.kind),
                level.strength.to_string(),
            ]);
        }
        println!("{levels}");
    }

    if !analysis.sentiment_analysis.articles.is_empty() {
        println!(
            "News sentiment: {} ({:.1})",
            analysis.sentiment_analysis.description, analysis.sentiment_analysis.score
        );
        for article in &analysis.sentiment_analysis.articles {
            println!("  {:+.2}  {}  [{}]", article.sentiment, article.title, article.source);
        }
    }
}

fn print_screening(universe: &Universe, result: &ScreeningResult) {
    println!(
        "{}: {} analyzed, {} failed",
        universe,
        result.total_analyzed,
        result.failed_symbols.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "#", "Symbol", "Price", "Signal", "Combined", "Momentum 20d", "52w pos", "Vol ratio",
        "Score",
    ]);
    for (rank, stock) in result.top_stocks.iter().enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            stock.symbol.clone(),
            format!("{:.2}", stock.current_price),
            stock.recommendation.to_string(),
            format!("{:.1}", stock.combined_score),
            format!("{:+.1}%", stock.momentum_20d),
            format!("{:.0}%", stock.price_position_52w),
            format!("{:.2}", stock.volume_ratio),
            format!("{:.1}", stock.attractiveness_score),
        ]);
    }
    println!("{table}");

    if !result.failed_symbols.is_empty() {
        println!("Failed: {}", result.failed_symbols.join(", "));
    }
}
