// src/main.rs
// =============================================================================
// Entry point of the link-audit CLI.
//
// What happens here:
// 1. Parse command-line arguments and set up logging
// 2. Resolve the config (CLI flags > config file > defaults)
// 3. Load the page and run the requested audits
// 4. Print results and exit (0 = all healthy, 1 = failing links, 2 = error)
//
// All the checking logic lives in the library; this file only wires it up
// and formats the output.
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, GlobalArgs, Preset};
use link_audit::checker::{verify_navigation, NavigationCheck, NAVIGATION_SELECTOR};
use link_audit::{
    AuditConfig, AuditReport, Auditor, HtmlPage, LinkCheckResult, LinkStatus, Page,
    ReqwestProber, Scope,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so `--json` output on stdout stays machine-readable
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "link_audit=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli.global)?;
    let json = cli.global.json;

    let code = match cli.command {
        Commands::Page { url, max_links } => {
            run_audits(&url, &config, &[(Scope::Page, max_links)], json).await?
        }
        Commands::Section {
            url,
            preset,
            selector,
            max_links,
        } => {
            let scope = match (preset, selector) {
                (Some(preset), _) => preset.scope(),
                (None, Some(selector)) => Scope::Section(selector),
                (None, None) => anyhow::bail!("pass either --preset or --selector"),
            };
            run_audits(&url, &config, &[(scope, max_links)], json).await?
        }
        Commands::Suite { url } => {
            let audits = [
                (Scope::Page, None),
                (Preset::Header.scope(), None),
                (Preset::Footer.scope(), None),
                (Preset::Category.scope(), None),
            ];
            run_audits(&url, &config, &audits, json).await?
        }
        Commands::Nav { url, limit } => run_navigation(&url, &config, limit, json).await?,
    };

    Ok(code)
}

fn load_config(global: &GlobalArgs) -> Result<AuditConfig> {
    let mut config = match &global.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };

    if let Some(concurrency) = global.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout_ms) = global.timeout_ms {
        config.probe_timeout_ms = timeout_ms;
    }

    Ok(config)
}

// Loads `url` into a page that shares the prober's HTTP client
async fn open_page(url: &str, prober: &ReqwestProber, json: bool) -> Result<HtmlPage> {
    let url = Url::parse(url).with_context(|| format!("invalid URL '{}'", url))?;

    let page = HtmlPage::new(prober.client().clone());
    page.navigate(&url).await?;

    if let Some(status) = page.status() {
        if !(200..400).contains(&status) && !json {
            println!("⚠️  Page answered HTTP {}; checking the links it serves anyway", status);
        }
    }

    Ok(page)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeOutput<'a> {
    scope: String,
    broken_count: usize,
    results: &'a [LinkCheckResult],
}

async fn run_audits(
    url: &str,
    config: &AuditConfig,
    audits: &[(Scope, Option<usize>)],
    json: bool,
) -> Result<i32> {
    if !json {
        println!("🔍 Checking links on: {}", url);
    }

    let prober = ReqwestProber::new(config).context("building HTTP client")?;
    let page = open_page(url, &prober, json).await?;
    let auditor = Auditor::new(&page, &prober, config);

    let mut reports: Vec<(&Scope, AuditReport)> = Vec::new();
    let mut failures = Vec::new();

    for (scope, max_links) in audits {
        if !json {
            println!("\n🌐 Checking {}...\n", scope);
        }

        match auditor.assert_healthy(scope, *max_links).await {
            Ok(report) => {
                if !json {
                    print_table(&report);
                }
                reports.push((scope, report));
            }
            Err(error) => {
                // A failing audit still has a report; anything else is fatal
                let report = match error.report() {
                    Some(report) => report.clone(),
                    None => return Err(error.into()),
                };
                if !json {
                    print_table(&report);
                }
                failures.push(error.to_string());
                reports.push((scope, report));
            }
        }
    }

    if json {
        let output: Vec<ScopeOutput> = reports
            .iter()
            .map(|(scope, report)| ScopeOutput {
                scope: scope.to_string(),
                broken_count: report.broken_count(),
                results: &report.results,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for failure in &failures {
            eprintln!("\n❌ {}", failure);
        }
    }

    Ok(if failures.is_empty() { 0 } else { 1 })
}

async fn run_navigation(url: &str, config: &AuditConfig, limit: usize, json: bool) -> Result<i32> {
    let prober = ReqwestProber::new(config).context("building HTTP client")?;
    let page = open_page(url, &prober, json).await?;

    let checks = verify_navigation(&page, NAVIGATION_SELECTOR, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&checks)?);
    } else {
        println!("🧭 Following navigation links on: {}\n", page.current_url());
        print_navigation(&checks);
    }

    if checks.is_empty() {
        eprintln!("❌ No navigation links found");
        return Ok(1);
    }

    let failed = checks.iter().filter(|check| !check.ok).count();
    Ok(if failed > 0 { 1 } else { 0 })
}

// Prints results as a human-readable table in the terminal
fn print_table(report: &AuditReport) {
    println!("{:<30} {:<60} {:<12} {:<30}", "TEXT", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(135));

    for result in &report.results {
        let message = match (result.status_code, &result.error) {
            (Some(code), Some(error)) => format!("HTTP {} - {}", code, error),
            (Some(code), None) => format!("HTTP {}", code),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };

        println!(
            "{:<30} {:<60} {:<12} {:<30}",
            truncate(&result.text, 30),
            truncate(&result.url, 60),
            format_status(result.status),
            message
        );
    }

    println!();

    let broken = report.broken_count();
    println!("📊 Summary:");
    println!("   ✅ OK: {}", report.len() - broken);
    println!("   ❌ Failing: {}", broken);
    println!("   📋 Total: {}", report.len());
}

fn print_navigation(checks: &[NavigationCheck]) {
    for check in checks {
        let icon = if check.ok { "✅" } else { "❌" };
        let landed = check.landed_url.as_deref().unwrap_or("-");
        let note = check.error.as_deref().unwrap_or("");
        println!("{} {:<40} -> {:<60} {}", icon, truncate(&check.href, 40), landed, note);
    }
}

// Cuts long cells down to `width` characters, ending in "..."
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn format_status(status: LinkStatus) -> String {
    match status {
        LinkStatus::Ok => "✅ OK".to_string(),
        LinkStatus::Broken => "❌ BROKEN".to_string(),
        LinkStatus::Timeout => "⏱️  TIMEOUT".to_string(),
        LinkStatus::Error => "⚠️  ERROR".to_string(),
    }
}
