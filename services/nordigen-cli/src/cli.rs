//! Command line definitions

use clap::{Parser, Subcommand};

/// Client for the GoCardless Bank Account Data (Nordigen) API
#[derive(Debug, Parser)]
#[command(name = "nordigen", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (falls back to CONFIG_PATH, then nordigen.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List institutions in a country
    Institutions {
        /// ISO 3166 two-letter country code
        country: String,
    },
    /// Show one institution
    Institution { id: String },
    /// Create an end user agreement
    Agreement {
        institution_id: String,
        /// Days of transaction history to request
        max_historical_days: Option<u32>,
    },
    /// List requisitions (first page)
    Requisitions,
    /// Show one requisition
    Requisition { id: String },
    /// Create a requisition
    CreateRequisition {
        /// URL the end user returns to after authorizing
        redirect: String,
        reference: String,
        /// End user agreement to attach
        agreement: Option<String>,
    },
    /// Create a bank authorization link for a requisition
    Link {
        requisition_id: String,
        aspsp_id: String,
    },
    /// Account metadata
    Account { id: String },
    /// Account balances
    Balances { id: String },
    /// Account details
    Details { id: String },
    /// Booked and pending transactions
    Transactions { id: String },
    /// Keep credentials fresh until interrupted
    Watch,
}
