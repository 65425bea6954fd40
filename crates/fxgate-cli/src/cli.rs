//! CLI argument definitions for fxgate.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `currencies` | List supported currencies |
//! | `latest` | Latest rates for a base currency |
//! | `convert` | Convert between two currencies |
//! | `history` | Paginated daily rates for a date range |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--provider` | `frankfurter` | Rate provider name |
//! | `--config` | none | JSON settings file (also `FXGATE_CONFIG`) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--log-json` | `false` | Emit logs as JSON lines on stderr |
//! | `--timeout-ms` | from settings | Upstream request timeout in ms |
//!
//! # Examples
//!
//! ```bash
//! fxgate latest --base usd --pretty
//! fxgate convert --from EUR --to GBP --amount 250
//! fxgate history --start 2024-01-01 --end 2024-01-31 --page 2 --page-size 10
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

/// Exchange rates with caching and upstream resilience.
#[derive(Debug, Parser)]
#[command(
    name = "fxgate",
    author,
    version,
    about = "Exchange rates with caching and upstream resilience"
)]
pub struct Cli {
    /// Rate provider to resolve.
    #[arg(long, global = true, default_value = "frankfurter")]
    pub provider: String,

    /// JSON settings file. Falls back to `FXGATE_CONFIG`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines on stderr. The filter comes from `RUST_LOG`.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    /// Upstream request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List supported currencies with display names.
    Currencies,

    /// Latest rates relative to a base currency.
    ///
    /// # Examples
    ///
    ///   fxgate latest
    ///   fxgate latest --base usd
    Latest(LatestArgs),

    /// Convert from one currency to another at the latest rate.
    ///
    /// # Examples
    ///
    ///   fxgate convert --from EUR --to USD
    ///   fxgate convert --from EUR --to USD --amount 120.50
    Convert(ConvertArgs),

    /// Daily rates over a date range, newest first, one page at a time.
    ///
    /// # Examples
    ///
    ///   fxgate history --start 2024-01-01 --end 2024-01-31
    ///   fxgate history --start 2024-01-01 --end 2024-01-31 --base USD --page 2
    History(HistoryArgs),
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Currencies => "currencies",
            Self::Latest(_) => "latest",
            Self::Convert(_) => "convert",
            Self::History(_) => "history",
        }
    }
}

#[derive(Debug, Args)]
pub struct LatestArgs {
    /// Base currency (ISO 4217 code).
    #[arg(long, default_value = "EUR")]
    pub base: String,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Currency to convert from.
    #[arg(long)]
    pub from: String,

    /// Currency to convert to.
    #[arg(long)]
    pub to: String,

    /// Amount of the source currency. Defaults to one unit.
    #[arg(long)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// First date of the range (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last date of the range (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,

    /// Base currency.
    #[arg(long, default_value = "EUR")]
    pub base: String,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Dates per page. Defaults to the configured page size and is clamped
    /// to the configured maximum.
    #[arg(long)]
    pub page_size: Option<u32>,
}
