//! apex-authz - command-line front end for the authorization engine
//!
//! Loads an engine config, builds the policy tree and answers single
//! authorization questions. Exit status of `check` is 0 for allow, 1 for deny
//! and 2 when no decision could be made.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use apex_authz::config::EngineConfig;
use apex_authz::policy::{AuthContext, Permission, Policy};
use apex_authz::registry::PolicyRegistry;
use apex_authz::telemetry::init_logging;
use apex_authz::PolicyError;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI Structure
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Parser)]
#[command(
    name = "apex-authz",
    version,
    about = "Apex authorization engine",
    long_about = "Evaluate RBAC/ABAC policy trees built from a TOML, YAML or JSON config file.",
    propagate_version = true
)]
struct Cli {
    /// Configuration file path (falls back to APEX_AUTHZ__* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask whether a subject may perform a permission on a resource
    Check {
        /// Subject (user or agent) identifier
        subject: String,

        /// Permission, e.g. tool:execute
        permission: String,

        /// Resource identifier
        resource: String,

        /// Request attribute as key=value (repeatable)
        #[arg(short, long = "attr", value_parser = parse_attribute)]
        attrs: Vec<(String, String)>,

        /// Request tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Request ID to carry into audit records
        #[arg(long)]
        request_id: Option<String>,

        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Build the configured policy tree and report what it contains
    Validate,

    /// List registered policy factories
    List,
}

fn parse_attribute(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        bail!("attribute key must not be empty");
    }
    Ok((key.to_string(), value.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════════════════

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            if let Some(policy_error) = e.downcast_ref::<PolicyError>() {
                policy_error.log();
            }
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let registry = PolicyRegistry::with_builtins();

    match cli.command {
        Commands::List => {
            list(&registry, cli.format);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let (config, policy) = load_engine(cli.config.as_deref(), cli.verbose, &registry)?;
            validate(&config, &policy, cli.format);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            subject,
            permission,
            resource,
            attrs,
            tags,
            request_id,
            at,
        } => {
            let (_, policy) = load_engine(cli.config.as_deref(), cli.verbose, &registry)?;

            let mut ctx = match request_id {
                Some(id) => AuthContext::with_request_id(id),
                None => AuthContext::new(),
            };
            for (key, value) in attrs {
                ctx = ctx.with_attribute(key, value);
            }
            for tag in tags {
                ctx = ctx.with_tag(tag);
            }
            if let Some(at) = at {
                ctx = ctx.at(at);
            }

            let permission = Permission::new(permission);
            let result = policy.authorize(&ctx, &subject, &permission, &resource);
            Ok(report_decision(&ctx, &subject, &permission, &resource, result, cli.format))
        }
    }
}

/// Load config, start logging and build the policy tree.
fn load_engine(
    path: Option<&Path>,
    verbose: bool,
    registry: &PolicyRegistry,
) -> Result<(EngineConfig, Arc<dyn Policy>)> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::load().context("failed to load config from environment")?,
    };
    if verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging)?;

    let policy = config.build_policy(registry)?;
    Ok((config, policy))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn report_decision(
    ctx: &AuthContext,
    subject: &str,
    permission: &Permission,
    resource: &str,
    result: apex_authz::Result<bool>,
    format: OutputFormat,
) -> ExitCode {
    let (label, code) = match &result {
        Ok(true) => ("ALLOW", 0),
        Ok(false) => ("DENY", 1),
        Err(_) => ("ERROR", 2),
    };

    match format {
        OutputFormat::Json => {
            let mut out = json!({
                "request_id": ctx.request_id,
                "subject": subject,
                "permission": permission,
                "resource": resource,
                "decision": label.to_lowercase(),
            });
            if let Err(e) = &result {
                out["error"] = json!(e.to_string());
                out["error_code"] = json!(e.code().numeric_code());
            }
            println!("{out}");
        }
        OutputFormat::Text => {
            let styled = match code {
                0 => label.green().bold(),
                1 => label.red().bold(),
                _ => label.yellow().bold(),
            };
            println!("{styled} {subject} {permission} {resource}");
            if let Err(e) = &result {
                println!("  {} [{}] {}", "reason:".dimmed(), e.code(), e);
            }
        }
    }

    ExitCode::from(code)
}

fn validate(config: &EngineConfig, policy: &Arc<dyn Policy>, format: OutputFormat) {
    let kinds: Vec<&str> = config.policies.iter().map(|p| p.kind.as_str()).collect();

    match format {
        OutputFormat::Json => {
            let out = json!({
                "root": policy.name(),
                "mode": config.root.mode.as_str(),
                "audit": config.audit.enabled,
                "policies": kinds,
            });
            println!("{out}");
        }
        OutputFormat::Text => {
            println!("{} configuration is valid", "✓".green().bold());
            println!("  {:<10} {}", "root:".bold(), policy.name());
            println!("  {:<10} {}", "mode:".bold(), config.root.mode);
            println!("  {:<10} {}", "audit:".bold(), config.audit.enabled);
            println!("  {:<10} {}", "policies:".bold(), kinds.len());
            for (i, kind) in kinds.iter().enumerate() {
                println!("    {}. {}", i + 1, kind.cyan());
            }
        }
    }
}

fn list(registry: &PolicyRegistry, format: OutputFormat) {
    let names = registry.list();
    match format {
        OutputFormat::Json => println!("{}", json!(names)),
        OutputFormat::Text => {
            for name in names {
                println!("{}", name.cyan());
            }
        }
    }
}
