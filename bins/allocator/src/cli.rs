//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use seamline_core::YearMonth;
use seamline_core::allocation::OrderFinancials;
use seamline_shared::OutputFormat;

/// Accrual allocation of order totals across calendar months.
#[derive(Debug, Parser)]
#[command(name = "allocator", version, about)]
pub struct Cli {
    /// Output format. Defaults to `[output] format` from config.
    #[arg(long, global = true, value_enum)]
    pub format: Option<FormatArg>,

    /// `tracing` filter directive, e.g. `seamline=debug`.
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Output format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Single-line JSON.
    Json,
    /// Indented JSON.
    Pretty,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Self::Json,
            FormatArg::Pretty => Self::Pretty,
        }
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every calendar month touched by a service period.
    Span(PeriodArgs),

    /// Propose an allocation plan for a service period.
    Prorate {
        #[command(flatten)]
        period: PeriodArgs,
        /// Split equally instead of by service days.
        #[arg(long)]
        even: bool,
    },

    /// Normalize the stored allocation of one or more order documents.
    Normalize {
        /// Order JSON files.
        #[arg(required = true)]
        orders: Vec<PathBuf>,
        #[command(flatten)]
        totals: TotalsArgs,
    },

    /// Merge duplicate months in an order's stored allocation.
    Dedupe {
        /// Order JSON file.
        order: PathBuf,
    },

    /// Build a new allocation from a plan file.
    Build {
        /// JSON array of `{ year, month, percentage }`.
        plan: PathBuf,
        #[command(flatten)]
        totals: TotalsArgs,
        /// Refuse plans that do not sum to 100.
        #[arg(long)]
        strict: bool,
    },

    /// Slice orders for one reporting month.
    Partial {
        /// JSON array of `{ order, totals, payment }`.
        orders: PathBuf,
        /// Reporting month, `YYYY-MM`.
        #[arg(long)]
        target: YearMonth,
    },
}

/// Service period bounds.
#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// First service day (ISO-8601 date or timestamp).
    #[arg(long)]
    pub start: String,
    /// Last service day (ISO-8601 date or timestamp).
    #[arg(long)]
    pub end: String,
}

/// Order totals.
#[derive(Debug, Args)]
pub struct TotalsArgs {
    /// Total revenue.
    #[arg(long)]
    pub revenue: Decimal,
    /// Total cost.
    #[arg(long)]
    pub cost: Decimal,
    /// Total profit. Defaults to revenue minus cost.
    #[arg(long)]
    pub profit: Option<Decimal>,
}

impl From<&TotalsArgs> for OrderFinancials {
    fn from(args: &TotalsArgs) -> Self {
        Self {
            revenue: args.revenue,
            cost: args.cost,
            profit: args.profit,
        }
    }
}
