//! GOV.UK Pay webhook tool
//!
//! Signs, verifies and processes webhook bodies with the secrets configured
//! in the environment. Useful for replaying deliveries and for checking a
//! deployment's secrets.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use govpay_webhooks::config::{GovpayConfig, SecretScope};
use govpay_webhooks::metrics::global_metrics;
use govpay_webhooks::webhook::{LoggingHandler, ResourceKind, SignatureVerifier, WebhookProcessor};

/// GOV.UK Pay webhook tool
#[derive(Parser, Debug)]
#[command(name = "govpay-webhook")]
#[command(version)]
#[command(about = "Sign, verify and process GOV.UK Pay webhook bodies")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the Pay-Signature a body would carry
    Sign {
        /// Body file, or `-` for stdin
        #[arg(short, long)]
        body: PathBuf,

        /// Secret scope to sign with
        #[arg(short, long, value_enum, default_value = "front-office")]
        scope: ScopeArg,
    },

    /// Check a body against a Pay-Signature
    Verify {
        /// Body file, or `-` for stdin
        #[arg(short, long)]
        body: PathBuf,

        /// Value of the Pay-Signature header
        #[arg(short, long)]
        signature: String,
    },

    /// Authenticate and validate a webhook, printing the extracted record
    Process {
        /// Resource kind: payment or refund
        #[arg(short, long)]
        kind: ResourceKind,

        /// Body file, or `-` for stdin
        #[arg(short, long)]
        body: PathBuf,

        /// Value of the Pay-Signature header
        #[arg(short, long)]
        signature: Option<String>,

        /// Status last recorded for the resource
        #[arg(short, long)]
        previous_status: Option<String>,

        /// Print metrics in Prometheus format afterwards
        #[arg(long)]
        metrics: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    FrontOffice,
    BackOffice,
}

impl From<ScopeArg> for SecretScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::FrontOffice => SecretScope::FrontOffice,
            ScopeArg::BackOffice => SecretScope::BackOffice,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = GovpayConfig::from_env().context("loading Govpay configuration")?;

    match args.command {
        Command::Sign { body, scope } => {
            let body = read_body(&body)?;
            let verifier = SignatureVerifier::new(config.webhook_secrets);
            let digest = verifier.digest(scope.into(), &body)?;
            println!("{digest}");
            Ok(ExitCode::SUCCESS)
        }

        Command::Verify { body, signature } => {
            let body = read_body(&body)?;
            let processor = WebhookProcessor::new(&config);
            let outcome = processor.authenticate(&body, Some(signature.as_str()));

            let (report, code) = match outcome {
                Ok(scope) => (json!({ "valid": true, "scope": scope.as_str() }), ExitCode::SUCCESS),
                Err(e) => (
                    json!({ "valid": false, "error": e.kind().as_str(), "message": e.to_string() }),
                    ExitCode::FAILURE,
                ),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(code)
        }

        Command::Process {
            kind,
            body,
            signature,
            previous_status,
            metrics,
        } => {
            let body = read_body(&body)?;
            let processor = WebhookProcessor::new(&config);

            let outcome = processor.process_with(
                kind,
                &body,
                signature.as_deref(),
                previous_status.as_deref(),
                &LoggingHandler,
            );

            let code = match outcome {
                Ok(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let report = json!({ "error": e.kind().as_str(), "message": e.to_string() });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    ExitCode::FAILURE
                }
            };

            if metrics {
                eprint!("{}", global_metrics().to_prometheus_format());
            }
            Ok(code)
        }
    }
}

fn read_body(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        io::stdin()
            .read_to_end(&mut body)
            .context("reading body from stdin")?;
        return Ok(body);
    }
    fs::read(path).with_context(|| format!("reading body from {}", path.display()))
}
