use clap::{Parser, Subcommand};

/// Command-line interface definition for fieldsync
#[derive(Parser)]
#[command(
    name = "fieldsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline-first field data capture: queue attendance and palm activities locally and sync them when the network returns",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Override the remote API base URL
    #[arg(global = true, long = "api-url")]
    pub api_url: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the configuration and the local store
    Init,

    /// Record an employee check-in
    Checkin {
        /// Employee identifier
        employee: String,

        #[arg(long = "at", help = "Check-in time (RFC 3339, 'YYYY-MM-DD HH:MM' or 'HH:MM'); default now")]
        at: Option<String>,

        #[arg(
            long = "verified-by",
            default_value = "fingerprint",
            help = "Verification method: fingerprint, pin, supervisor"
        )]
        verified_by: String,
    },

    /// Record an employee check-out
    Checkout {
        /// Employee identifier
        employee: String,

        #[arg(long = "at", help = "Check-out time; default now")]
        at: Option<String>,
    },

    /// Record a palm activity
    Activity {
        #[arg(long = "palm", help = "Palm code (RP-<block>-<seq>) or palm UUID")]
        palm: String,

        #[arg(long = "type", help = "Activity type, e.g. PRUNING or fertiliser")]
        activity_type: String,

        #[arg(long = "worker", help = "Worker identifier")]
        worker: String,

        #[arg(long = "date", help = "Activity time; default now")]
        date: Option<String>,

        #[arg(long = "notes")]
        notes: Option<String>,

        #[arg(long = "lat", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long = "lon", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[arg(
            long = "detail",
            value_name = "KEY=VALUE",
            help = "Extra detail field; repeatable"
        )]
        details: Vec<String>,
    },

    /// Run one sync pass now
    Sync,

    /// Show connectivity, pending counts and last sync
    Status,

    /// Inspect or clear the local queues
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Manage the palm reference cache
    Palms {
        #[command(subcommand)]
        action: PalmsAction,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Keep syncing in the background; reads `online`, `offline`, `visible` from stdin
    Watch,
}

#[derive(Subcommand)]
pub enum QueueAction {
    /// List queued records
    List {
        #[arg(long = "kind", help = "activity or attendance; default both")]
        kind: Option<String>,

        #[arg(long = "pending", help = "Only records not yet synced")]
        pending: bool,
    },

    /// Delete every record of one kind
    Clear {
        #[arg(long = "kind", help = "activity or attendance")]
        kind: String,
    },
}

#[derive(Subcommand)]
pub enum PalmsAction {
    /// Download all palms into the local cache
    Refresh,

    /// Look up one palm by QR code (cache first)
    Show { qr_code: String },

    /// Empty the palm cache
    Clear,
}
