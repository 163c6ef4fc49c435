//! Command-line arguments.

use clap::{Parser, Subcommand};

/// Top-level arguments.
#[derive(Parser)]
#[command(name = "session-token")]
#[command(about = "Issue, verify, rotate and revoke session tokens")]
#[command(version)]
pub struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Operations on tokens and the revocation ledger.
#[derive(Subcommand)]
pub enum Commands {
    /// Issue a token pair for a subject
    Issue(IdentityArgs),
    /// Verify an access token
    VerifyAccess {
        /// Access token
        token: String,
    },
    /// Verify a refresh token, including its revocation state
    VerifyRefresh {
        /// Refresh token
        token: String,
    },
    /// Revoke a refresh token by its jti
    Revoke {
        /// Token identifier
        jti: String,
    },
    /// Exchange a refresh token for a new pair
    Rotate {
        /// Refresh token to exchange
        refresh_token: String,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Show ledger state for a jti
    Inspect {
        /// Token identifier
        jti: String,
    },
}

/// Identity carried into a new pair.
#[derive(clap::Args)]
pub struct IdentityArgs {
    /// Subject (user id)
    #[arg(long)]
    pub subject: String,
    /// Email claim
    #[arg(long)]
    pub email: Option<String>,
    /// Role claim
    #[arg(long)]
    pub role: Option<String>,
}
