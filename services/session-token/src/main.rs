//! Operator CLI for the session token service.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use serde_json::json;
use session_common::{LedgerClient, init_tracing};
use session_token::jwt::{AccessClaims, RefreshClaims};
use session_token::{Config, TokenError, TokenLifecycleService, TokenPair};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Result of a subcommand, printed as JSON.
#[derive(Serialize)]
#[serde(untagged)]
enum Output {
    Pair(TokenPair),
    Access(AccessClaims),
    Refresh(RefreshClaims),
    Revoked {
        jti: String,
        revoked: bool,
    },
    Inspection {
        jti: String,
        revoked: bool,
        issued_to: Option<String>,
        ledger_circuit: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::from_env().context("loading configuration")?;
    init_tracing(&config.tracing)?;

    info!(redis_url = %config.redis_url, namespace = %config.ledger.namespace, "Connecting revocation ledger");
    let client = LedgerClient::connect_redis(config.ledger, &config.redis_url)
        .await
        .context("connecting to redis")?;

    let service = TokenLifecycleService::builder(config.token)
        .ledger(Arc::new(client))
        .build()?;

    match run(&service, cli.command).await {
        Ok(output) => {
            let rendered = serde_json::to_string_pretty(&output).context("rendering output")?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "Command failed");
            let output = json!({ "error": e.code(), "message": e.to_string() });
            println!("{}", serde_json::to_string_pretty(&output).context("rendering error")?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(service: &TokenLifecycleService, command: Commands) -> Result<Output, TokenError> {
    let output = match command {
        Commands::Issue(identity) => Output::Pair(
            service
                .issue(&identity.subject, identity.email.as_deref(), identity.role.as_deref())
                .await?,
        ),
        Commands::VerifyAccess { token } => Output::Access(service.verify_access(&token)?),
        Commands::VerifyRefresh { token } => Output::Refresh(service.verify_refresh(&token).await?),
        Commands::Revoke { jti } => {
            service.revoke(&jti).await?;
            Output::Revoked { jti, revoked: true }
        }
        Commands::Rotate {
            refresh_token,
            identity,
        } => Output::Pair(
            service
                .rotate(
                    &refresh_token,
                    &identity.subject,
                    identity.email.as_deref(),
                    identity.role.as_deref(),
                )
                .await?,
        ),
        Commands::Inspect { jti } => {
            let revoked = service.is_revoked(&jti).await?;
            let issued_to = service.issued_owner(&jti).await?;
            Output::Inspection {
                jti,
                revoked,
                issued_to,
                ledger_circuit: format!("{:?}", service.ledger_circuit_state().await),
            }
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_renders_untagged() {
        let pair = Output::Pair(TokenPair::new("a.b.c".into(), "d.e.f".into(), 42));
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["access_token"], "a.b.c");
        assert_eq!(json["token_type"], "Bearer");

        let revoked = Output::Revoked { jti: "abc".into(), revoked: true };
        assert_eq!(
            serde_json::to_value(&revoked).unwrap(),
            json!({ "jti": "abc", "revoked": true })
        );
    }

    #[test]
    fn test_inspection_reports_missing_owner_as_null() {
        let inspection = Output::Inspection {
            jti: "abc".into(),
            revoked: false,
            issued_to: None,
            ledger_circuit: "Closed".into(),
        };
        let json = serde_json::to_value(&inspection).unwrap();
        assert!(json["issued_to"].is_null());
        assert_eq!(json["ledger_circuit"], "Closed");
    }
}
