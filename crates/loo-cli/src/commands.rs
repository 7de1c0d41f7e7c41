use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

use loo_server::{LooServer, ServerConfig};
use loo_stats::{Counters, Proportion, Proportions, StatsConfig, StatsService};
use loo_store::{DurableLooStore, HistoryReport, HistoryValidator, WalConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Verify(args) => cmd_verify(&args.data_dir, cli.format),
        Command::Stats(args) => cmd_stats(&args.data_dir, cli.format),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(&args)?;
    println!(
        "{} Toilet Map server on {} ({})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        match &config.data_dir {
            Some(dir) => format!("data: {}", dir.display()),
            None => "in-memory".to_string(),
        }
    );
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(LooServer::new(config).serve())?;
    info!("shutdown complete");
    Ok(())
}

/// Config file (if any) with command-line overrides applied.
fn serve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_store(dir: &Path) -> anyhow::Result<DurableLooStore> {
    if !dir.is_dir() {
        bail!("data directory {} does not exist", dir.display());
    }
    debug!(dir = %dir.display(), "opening durable store");
    DurableLooStore::open(dir, WalConfig::default())
        .with_context(|| format!("opening store in {}", dir.display()))
}

fn verify(dir: &Path) -> anyhow::Result<Vec<HistoryReport>> {
    let store = open_store(dir)?;
    let reports = HistoryValidator::validate_all(&store)?;
    store.close()?;
    Ok(reports)
}

fn cmd_verify(dir: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let reports = verify(dir)?;
    let broken: Vec<&HistoryReport> = reports.iter().filter(|r| !r.is_valid()).collect();

    match format {
        OutputFormat::Json => {
            let out: Vec<_> = broken
                .iter()
                .map(|r| {
                    json!({
                        "loo": r.loo.to_string(),
                        "reports": r.report_count,
                        "violations": r.violations.iter().map(|v| json!({
                            "report": v.report.map(|id| id.to_string()),
                            "kind": format!("{:?}", v.kind),
                            "description": v.description,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "loos": reports.len(), "invalid": out }))?
            );
        }
        OutputFormat::Text => {
            for report in &broken {
                println!("{} loo {}", "✗".red().bold(), report.loo.to_string().yellow());
                for v in &report.violations {
                    let at = v.report.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
                    println!("  {:?} at {}: {}", v.kind, at.dimmed(), v.description);
                }
            }
            if broken.is_empty() {
                println!("{} Report history verified", "✓".green().bold());
            }
            let total: u64 = reports.iter().map(|r| r.report_count).sum();
            println!("  Loos: {}", reports.len().to_string().bold());
            println!("  Reports: {}", total.to_string().bold());
        }
    }

    if !broken.is_empty() {
        bail!("{} loo(s) failed verification", broken.len());
    }
    Ok(())
}

fn collect_stats(dir: &Path) -> anyhow::Result<(Counters, Proportions)> {
    let store = Arc::new(open_store(dir)?);
    let service = StatsService::new(Arc::clone(&store), StatsConfig::default());
    let counters = service.counters()?;
    let proportions = service.proportions()?;
    drop(service);
    if let Ok(store) = Arc::try_unwrap(store) {
        store.close()?;
    }
    Ok((counters, proportions))
}

fn cmd_stats(dir: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let (counters, proportions) = collect_stats(dir)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "counters": counters,
                "proportions": proportions,
            }))?
        ),
        OutputFormat::Text => {
            println!("{}", "Counters".bold());
            println!("  Total loos:        {}", counters.total_loos);
            println!("  Active loos:       {}", counters.active_loos.to_string().green());
            println!("  Inactive loos:     {}", counters.inactive_loos.to_string().red());
            println!("  Reports:           {}", counters.total_reports);
            println!("  Removal reports:   {}", counters.removal_reports);
            println!("  Multiple reports:  {}", counters.multiple_reports);
            println!("  Contributors:      {}", counters.contributors);
            println!("{}", "Proportions".bold());
            print_family("Active", &proportions.active_loos);
            print_family("Public", &proportions.public_loos);
            print_family("Baby changing", &proportions.baby_changing);
            print_family("Accessible", &proportions.accessible_loos);
        }
    }
    Ok(())
}

fn print_family(label: &str, buckets: &[Proportion]) {
    let parts: Vec<String> = buckets
        .iter()
        .map(|p| format!("{} {}", p.name, p.value.to_string().cyan()))
        .collect();
    println!("  {:<14} {}", format!("{label}:"), parts.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use loo_server::{Identity, QueryFacade, StoreHandle};
    use loo_types::{Location, LooProperties, RemovalInput, ReportInput, REPORT_PERMISSION};

    fn seed(dir: &Path) {
        let config = ServerConfig {
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        };
        let handle = StoreHandle::open(&config).unwrap();
        let facade = QueryFacade::new(handle.shared(), &config);
        let alice = Identity::user("alice").with_permission(REPORT_PERMISSION);

        let mut ids = Vec::new();
        for (name, lat) in [("North", 51.6), ("South", 51.4)] {
            let input = ReportInput::new_loo(
                Location::new(lat, -0.1),
                LooProperties {
                    name: Some(name.into()),
                    ..Default::default()
                },
            );
            let response = facade.submit_report(input, &alice);
            assert!(response.success, "{}", response.message);
            ids.push(response.loo.unwrap().id);
        }
        let removed = facade.submit_removal_report(RemovalInput::new(ids[1], "Closed"), &alice);
        assert!(removed.success, "{}", removed.message);

        drop(facade);
        handle.close().unwrap();
    }

    #[test]
    fn verify_accepts_history_written_by_the_server() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let reports = verify(dir.path()).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(HistoryReport::is_valid));
        assert_eq!(reports.iter().map(|r| r.report_count).sum::<u64>(), 3);
    }

    #[test]
    fn stats_read_back_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (counters, proportions) = collect_stats(dir.path()).unwrap();
        assert_eq!(counters.total_loos, 2);
        assert_eq!(counters.active_loos, 1);
        assert_eq!(counters.removal_reports, 1);
        assert_eq!(counters.contributors, 1);
        assert_eq!(proportions.active_loos[0].value, 1);
    }

    #[test]
    fn missing_data_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(verify(&missing).is_err());
        assert!(cmd_stats(&missing, OutputFormat::Text).is_err());
    }

    #[test]
    fn serve_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toiletmap.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:4000\"\nread_only = true\n").unwrap();

        let config = serve_config(&ServeArgs {
            config: Some(path),
            bind: Some("0.0.0.0:8080".parse().unwrap()),
            data_dir: Some(dir.path().to_path_buf()),
        })
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<std::net::SocketAddr>().unwrap());
        assert_eq!(config.data_dir.as_deref(), Some(dir.path()));
        assert!(config.read_only);
    }
}
