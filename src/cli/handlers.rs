//! Subcommand handlers
//!
//! Each handler maps its result onto a process exit code; errors print to
//! stderr and exit non-zero, per the container entry contract.

use super::commands::{BuildArgs, PlanArgs, SuperviseArgs};
use super::output::{render_plan, render_report, OutputFormat};
use crate::config::BuildConfig;
use crate::error::SuperviseError;
use crate::fs::RealFileSystem;
use crate::manifest::WorkspaceSet;
use crate::output::{BuildReport, ImagePlan};
use crate::pipeline::{BuildContext, PipelineOrchestrator};
use crate::progress::LoggingHandler;
use crate::supervise::{resolve_port_from_env, ProbeParams, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

fn repo_path(arg: &Option<PathBuf>) -> PathBuf {
    arg.clone()
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    let result = (|| {
        let config = BuildConfig::from_env()?;
        let workspaces = WorkspaceSet::discover(&RealFileSystem, &repo_path(&args.repository_path))?;
        let plan = ImagePlan::compute(&workspaces, &config)?;
        plan.validate()?;
        render_plan(&plan, OutputFormat::from(args.format))
    })();

    match result {
        Ok(rendered) => {
            println!("{}", rendered);
            0
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Plan failed");
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_build(args: &BuildArgs) -> i32 {
    let config = match BuildConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let repo = repo_path(&args.repository_path);
    let work_dir = args
        .work_dir
        .clone()
        .unwrap_or_else(|| args.output.join("work"));

    let mut context = BuildContext::with_defaults(config, repo, work_dir, args.output.clone());
    context.progress = Arc::new(LoggingHandler);

    match PipelineOrchestrator::new().execute(&context).await {
        Ok(image) => {
            let report = BuildReport::from(&image);
            match render_report(&report, OutputFormat::from(args.format)) {
                Ok(rendered) => {
                    println!("{}", rendered);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    1
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_supervise(args: &SuperviseArgs) -> i32 {
    let result = supervise(args).await;
    // run() only returns on failure; a clean Ok would still mean the
    // long-lived process stopped, which the entry contract forbids.
    match result {
        Ok(()) => 1,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                SuperviseError::ProcessExited { status } if status > 0 => status,
                _ => 1,
            }
        }
    }
}

async fn supervise(args: &SuperviseArgs) -> Result<(), SuperviseError> {
    let port = resolve_port_from_env()?;
    let params = ProbeParams {
        interval: Duration::from_secs(args.probe_interval),
        timeout: Duration::from_secs(args.probe_timeout),
        grace_period: Duration::from_secs(args.grace_period),
        failure_threshold: args.retries,
    };
    let drop_to = args.user.as_deref().map(parse_identity).transpose()?;

    let supervisor = Supervisor::new(args.command.clone(), port, params, drop_to)?;
    supervisor.run().await
}

/// Parse a `uid:gid` pair
fn parse_identity(raw: &str) -> Result<(u32, u32), SuperviseError> {
    let invalid = || SuperviseError::InvalidProbeParams(format!("invalid --user '{}'", raw));
    let (uid, gid) = raw.split_once(':').ok_or_else(invalid)?;
    Ok((
        uid.parse().map_err(|_| invalid())?,
        gid.parse().map_err(|_| invalid())?,
    ))
}
