mod store;
mod verify;

use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use nodefleet_api::prelude::*;
use serde::Serialize;
use store::DeploymentSource;
use tracing_subscriber::prelude::*;

/// Everything a command needs to evaluate deployments consistently.
struct Env {
    config: LifecycleConfig,
    overrides: LaunchOverrides,
    now: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = std::env::var("COMMAND").context("Missing COMMAND env var")?;
    match command.as_str() {
        "dashboard" => {
            let env = load_env()?;
            let source = DeploymentSource::from_env()?;
            log_dashboard(&env, &source).await?;
        }
        "network" => {
            let env = load_env()?;
            let source = DeploymentSource::from_env()?;
            log_network(&env, &source).await?;
        }
        "check" => {
            let env = load_env()?;
            let source = DeploymentSource::from_env()?;
            log_check(&env, &source).await?;
        }
        "verify" => {
            run_verify()?;
        }
        other => anyhow::bail!("Invalid command: {other}"),
    };
    Ok(())
}

/// Load settings and sample the clock once. `NOW` pins the evaluation instant.
fn load_env() -> Result<Env, anyhow::Error> {
    let settings = match std::env::var("SETTINGS") {
        Ok(path) => Settings::load(path)?,
        Err(_) => Settings::default(),
    };
    let config = settings.lifecycle_config()?;
    let overrides = settings.overrides().clone();

    let clock: Box<dyn Clock> = match std::env::var("NOW") {
        Ok(now) => Box::new(FixedClock(parse_instant(&now).context("Invalid NOW")?)),
        Err(_) => Box::new(SystemClock),
    };
    let now = clock.now();
    tracing::debug!(
        rate = config.rate_per_day_per_node,
        overrides = overrides.len(),
        %now,
        "evaluation environment ready"
    );
    Ok(Env {
        config,
        overrides,
        now,
    })
}

fn json_output() -> bool {
    matches!(std::env::var("FORMAT").as_deref(), Ok("json"))
}

#[derive(Serialize)]
struct Report<'a> {
    now: DateTime<Utc>,
    nodes: Vec<NodeRow<'a>>,
    totals: Aggregate,
}

async fn log_dashboard(env: &Env, source: &DeploymentSource) -> Result<(), anyhow::Error> {
    let wallet = std::env::var("WALLET").context("Missing WALLET env var")?;
    if !source.has_deployments(&wallet).await? {
        println!("Wallet {} has no deployments.", wallet);
        return Ok(());
    }
    let deployments = source.deployments_by_wallet(&wallet).await?;
    let rows = evaluate(&deployments, &env.overrides, &env.config, env.now)?;
    let totals = aggregate(&deployments, &env.overrides, &env.config, env.now)?;
    if json_output() {
        return print_json(env, rows, totals);
    }
    println!("Dashboard");
    println!("  Wallet: {}", wallet);
    println!("  As of: {}", env.now.to_rfc3339());
    print_rows(&rows);
    print_totals(&totals);
    Ok(())
}

async fn log_network(env: &Env, source: &DeploymentSource) -> Result<(), anyhow::Error> {
    let deployments = source.all_deployments().await?;
    let rows = evaluate(&deployments, &env.overrides, &env.config, env.now)?;
    let totals = aggregate(&deployments, &env.overrides, &env.config, env.now)?;
    if json_output() {
        return print_json(env, rows, totals);
    }
    println!("Live nodes");
    println!("  As of: {}", env.now.to_rfc3339());
    print_rows(&rows);
    print_totals(&totals);
    Ok(())
}

async fn log_check(env: &Env, source: &DeploymentSource) -> Result<(), anyhow::Error> {
    let ids = parse_ids(&std::env::var("IDS").context("Missing IDS env var")?)?;
    let deployments = source.deployments_by_ids(&ids).await?;
    if deployments.is_empty() {
        println!("No deployments found with IDs {:?}.", ids);
        return Ok(());
    }
    for deployment in &deployments {
        let lifecycle = compute_lifecycle(deployment, &env.overrides, &env.config, env.now)?;
        println!();
        println!("Deployment #{}", deployment.id);
        println!("----------------------------------------");
        println!("Wallet:           {}", deployment.wallet_address);
        println!("Nodes:            {}", deployment.node_count);
        println!("Created:          {}", deployment.created_at.to_rfc3339());
        if lifecycle.overridden {
            println!(
                "Start Date:       {} (clamped to launch override)",
                lifecycle.start.to_rfc3339()
            );
        } else {
            println!("Start Date:       {}", lifecycle.start.to_rfc3339());
        }
        println!(
            "Effective Start:  {} (+{})",
            lifecycle.effective_start.to_rfc3339(),
            format_duration(env.config.activation_delay)
        );
        println!(
            "Completion Date:  {} (+{})",
            lifecycle.completion_instant.to_rfc3339(),
            format_duration(env.config.lifecycle_duration)
        );
        println!("Current Status:   {}", lifecycle.status);
        println!("Earnings:         ${:.2}", lifecycle.earnings);
        if lifecycle.is_earning() {
            println!(
                "Time Remaining:   {:.2} days",
                lifecycle.time_remaining_days(env.now)
            );
        }
    }
    Ok(())
}

fn run_verify() -> Result<(), anyhow::Error> {
    println!(
        "Running lifecycle verification (reference time: {})",
        verify::REFERENCE_NOW
    );
    println!();
    let outcomes = verify::run()?;
    let mut failures = 0;
    for outcome in &outcomes {
        let passed = outcome.passed();
        println!("[{}] {}", if passed { "PASS" } else { "FAIL" }, outcome.name);
        if !passed {
            failures += 1;
            println!(
                "   Expected status: {}, got: {}",
                outcome.expected_status, outcome.result.status
            );
            println!(
                "   Expected earnings: {:.2}, got: {:.2}",
                outcome.expected_earnings, outcome.result.earnings
            );
            println!("   Details: {:?}", outcome.result);
        }
    }
    println!();
    println!("{} passed, {} failed", outcomes.len() - failures, failures);
    if failures > 0 {
        anyhow::bail!("{failures} verification scenario(s) failed");
    }
    Ok(())
}

fn print_rows(rows: &[NodeRow<'_>]) {
    println!();
    println!(
        "  {:<6} {:<12} {:>6} {:<13} {:>14}",
        "ID", "Start", "Nodes", "Status", "Earnings"
    );
    for row in rows {
        println!(
            "  {:<6} {:<12} {:>6} {:<13} {:>14}",
            format!("#{}", row.deployment.id),
            row.lifecycle.start.format("%Y-%m-%d").to_string(),
            format!("{}x", row.deployment.node_count),
            row.lifecycle.status.to_string(),
            format!("${:.2}", row.lifecycle.earnings),
        );
    }
}

fn print_totals(totals: &Aggregate) {
    println!();
    println!("  Total nodes: {}", totals.total_nodes);
    println!("  Total earnings: ${:.2}", totals.total_earnings);
}

fn print_json(env: &Env, nodes: Vec<NodeRow<'_>>, totals: Aggregate) -> Result<(), anyhow::Error> {
    let report = Report {
        now: env.now,
        nodes,
        totals,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_ids(s: &str) -> Result<Vec<u64>, anyhow::Error> {
    s.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            u64::from_str(id.trim_start_matches('#')).with_context(|| format!("Invalid id {id:?}"))
        })
        .collect()
}

fn format_duration(delta: TimeDelta) -> String {
    if delta.num_days() > 1 && delta.num_hours() % 24 == 0 {
        format!("{} days", delta.num_days())
    } else {
        format!("{}h", delta.num_hours())
    }
}
