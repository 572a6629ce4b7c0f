//! CLI command definitions.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Sync tracked packages with the package list
    Reconcile,

    /// Run one trigger cycle
    Trigger {
        /// Maximum number of candidate packages
        #[arg(short, long, conflicts_with = "ids")]
        limit: Option<u32>,

        /// Trigger these packages instead of selecting candidates
        #[arg(long = "id", value_name = "PACKAGE_ID")]
        ids: Vec<String>,
    },

    /// Delete stale build records
    Trim,

    /// Print the missing build cells of a package as JSON
    Missing {
        /// Package ID
        package_id: String,
    },

    /// Reconcile and trigger on a schedule until interrupted
    Run,

    /// Apply database migrations
    Migrate,
}
