//! Project Access CLI
//!
//! Resolves effective project access against a directory loaded from configuration.

use clap::{Parser, Subcommand};
use project_access::{
    access_control::{BatchResolution, BatchResolver, EffectiveAccess, SubjectId},
    admin::{self, OverrideEditor},
    config::{AppConfig, LogFormat, load_config},
    metrics::ResolutionMetrics,
    presentation::{self, RoleNameLookup},
    store::InMemoryStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Project Access - effective permission resolution for projects
#[derive(Parser, Debug)]
#[command(name = "project-access")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "PROJECT_ACCESS_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error), overrides logging.level
    #[arg(long, env = "PROJECT_ACCESS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON logs regardless of logging.format
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve effective access of subjects on a project
    Resolve {
        #[arg(short, long)]
        project: i64,

        /// Subjects as user:<id> or group:<id>; defaults to every known subject
        #[arg(short, long = "subject")]
        subjects: Vec<SubjectId>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Print resolution metrics after the run
        #[arg(long)]
        stats: bool,
    },
    /// Expand a group's access to its members
    Expand {
        #[arg(short, long)]
        project: i64,

        #[arg(short, long)]
        group: i64,

        #[arg(long)]
        json: bool,
    },
    /// Delete inconsistent override rows on a project, including rows of
    /// subjects missing from the directory
    Heal {
        #[arg(short, long)]
        project: i64,
    },
    /// Validate the configuration and exit
    Check,
}

#[derive(Serialize)]
struct ResolvedRow {
    subject: String,
    #[serde(flatten)]
    access: EffectiveAccess,
    label: String,
}

fn init_logging(args: &Args, config: &AppConfig) {
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = args.json_logs || config.logging.format == LogFormat::Json;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn rows(resolution: &BatchResolution, roles: &impl RoleNameLookup) -> Vec<ResolvedRow> {
    resolution
        .sorted()
        .into_iter()
        .map(|(subject, access)| ResolvedRow {
            subject: subject.to_string(),
            access: *access,
            label: presentation::format(access, roles),
        })
        .collect()
}

fn print_rows(rows: &[ResolvedRow], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    println!("{:<24} {:<14} {:<8} LABEL", "SUBJECT", "ACCESS", "SOURCE");
    for row in rows {
        println!(
            "{:<24} {:<14} {:<8} {}",
            row.subject, row.access.access_type, row.access.source, row.label
        );
    }
    Ok(())
}

async fn subjects_or_all(store: &InMemoryStore, subjects: Vec<SubjectId>) -> Vec<SubjectId> {
    if subjects.is_empty() {
        store.all_subjects().await
    } else {
        subjects
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    init_logging(&args, &config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        projects = config.directory.projects.len(),
        overrides = config.directory.overrides.len(),
        "Loaded access directory"
    );

    let store = Arc::new(
        InMemoryStore::from_config(&config.directory)
            .inspect_err(|e| error!(error = %e, "Failed to build access store"))?,
    );
    let metrics = Arc::new(ResolutionMetrics::new());
    let resolver =
        BatchResolver::from_config(store.clone(), &config.resolver).with_metrics(metrics.clone());
    let editor = OverrideEditor::new(store.clone());
    let roles = store.role_names().await;

    match args.command {
        Command::Resolve {
            project,
            subjects,
            json,
            stats,
        } => {
            let subjects = subjects_or_all(&store, subjects).await;
            let resolution = resolver.resolve_many(project, subjects).await?;

            if !resolution.diagnostics.is_empty() {
                warn!(
                    project,
                    count = resolution.diagnostics.len(),
                    "Inconsistent access records found"
                );
                if config.resolver.heal_inconsistencies {
                    let removed = editor.heal(&resolution.diagnostics).await?;
                    info!(project, removed, "Healed inconsistent overrides");
                }
            }

            print_rows(&rows(&resolution, &roles), json)?;

            if stats {
                eprintln!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);
            }
        }
        Command::Expand {
            project,
            group,
            json,
        } => {
            let expansion = resolver.expand_group(project, group).await?;
            let rows: Vec<ResolvedRow> = expansion
                .members
                .iter()
                .map(|(user, access)| ResolvedRow {
                    subject: SubjectId::user(user.as_str()).to_string(),
                    access: *access,
                    label: presentation::format(access, &roles),
                })
                .collect();

            if !json {
                println!(
                    "group:{} -> {}",
                    group,
                    presentation::format(&expansion.group_access, &roles)
                );
            }
            print_rows(&rows, json)?;
        }
        Command::Heal { project } => {
            let rows = store.project_overrides(project).await;
            let diagnostics = admin::scan_overrides(project, &rows);
            for diagnostic in &diagnostics {
                warn!(error = %diagnostic, "Inconsistent override");
            }
            let removed = editor.heal(&diagnostics).await?;
            println!(
                "Removed {} inconsistent override(s) on project {}",
                removed, project
            );
        }
        Command::Check => {
            println!(
                "Configuration OK: {} project(s), {} user(s), {} group(s), {} override(s)",
                config.directory.projects.len(),
                config.directory.users.len(),
                config.directory.groups.len(),
                config.directory.overrides.len()
            );
        }
    }

    Ok(())
}
