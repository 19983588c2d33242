//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    feed: CheckResult,
    translate: CheckResult,
    discord: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        feed: CheckResult::error("Not checked"),
        translate: CheckResult::error("Not checked"),
        discord: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.feed = check_feed(config);
        report.translate = check_translate(config);
        report.discord = check_discord(config);
    }

    let any_error = [
        &report.config,
        &report.feed,
        &report.translate,
        &report.discord,
    ]
    .iter()
    .any(|c| c.is_error());
    report.overall = if any_error { "error" } else { "ok" }.to_string();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if any_error {
        anyhow::bail!("Doctor found problems");
    }
    Ok(())
}

fn check_feed(config: &AppConfig) -> CheckResult {
    match config.feed.source.trim() {
        "rss" => {
            if config.feed.rss.mirrors.is_empty() {
                CheckResult::error("RSS feed selected but no mirrors configured")
            } else {
                CheckResult::ok(format!(
                    "RSS feed with {} mirror(s)",
                    config.feed.rss.mirrors.len()
                ))
            }
        }
        "timeline" => {
            let env = &config.feed.timeline.bearer_token_env;
            if std::env::var(env).is_ok() {
                CheckResult::ok(format!(
                    "Timeline feed for @{}",
                    config.feed.timeline.username
                ))
            } else {
                CheckResult::error(format!("Timeline feed selected but {} is not set", env))
            }
        }
        other => CheckResult::error(format!("Invalid feed source: {}", other)),
    }
}

fn check_translate(config: &AppConfig) -> CheckResult {
    match config.translate.mode.trim() {
        "google" => {
            if config.translate.api_key_env.is_empty() {
                CheckResult::warn("Inline translation without an API key (unofficial endpoint)")
            } else if std::env::var(&config.translate.api_key_env).is_ok() {
                CheckResult::ok("Inline translation with API key")
            } else {
                CheckResult::error(format!(
                    "Translation api_key_env {} is not set",
                    config.translate.api_key_env
                ))
            }
        }
        "links" => CheckResult::ok("Translator links (no network)"),
        other => CheckResult::error(format!("Invalid translate mode: {}", other)),
    }
}

fn check_discord(config: &AppConfig) -> CheckResult {
    if std::env::var(&config.discord.token_env).is_err() {
        return CheckResult::error(format!("{} is not set", config.discord.token_env));
    }
    match config.resolve_channel_id() {
        Ok(id) => CheckResult::ok(format!("Token set, channel id {}", id)),
        Err(e) => CheckResult::error(format!("Token set, but: {}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    let rows = [
        ("config", &report.config),
        ("feed", &report.feed),
        ("translate", &report.translate),
        ("discord", &report.discord),
    ];
    for (name, check) in rows {
        println!("{:>10}  [{}]  {}", name, check.status, check.message);
    }
    println!();
    println!("overall: {}", report.overall);
}
