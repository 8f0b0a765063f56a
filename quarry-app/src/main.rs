use anyhow::{Context, Result};
use clap::Parser;
use quarry_common::observability::{LogConfig, LogFormat, init_logging};
use quarry_config::{QuarryConfig, QuarryConfigLoader};
use quarry_research::{SessionContext, TurnOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use tether::{Tether, build_interactive, build_orchestrator, resolve_model};
use tokio::sync::mpsc;
mod tether;

/// Search the web, read the top pages and get one summarized answer.
#[derive(Debug, Parser)]
#[command(name = "quarry", version)]
struct Cli {
    /// YAML config file. Defaults to ./quarry.yaml, then the user config dir.
    #[arg(short, long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,

    /// Model to start with; must be listed under `llm.models`.
    #[arg(short, long)]
    model: Option<String>,

    /// Answer one question on stdout and exit instead of opening the terminal UI.
    #[arg(short, long, value_name = "QUESTION")]
    query: Option<String>,

    /// Write logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration with secrets redacted and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let (loader, config_file) = QuarryConfigLoader::new().with_discovered_file(cli.config.as_deref());
    let cfg: QuarryConfig = loader.load().with_context(|| match &config_file {
        Some(path) => format!("loading {}", path.display()),
        None => "loading built-in configuration".to_string(),
    })?;

    if cli.print_config {
        print!("{}", cfg.redacted_yaml()?);
        return Ok(ExitCode::SUCCESS);
    }

    // 2) Logging: the terminal UI owns stdout/stderr, headless runs mirror to stderr.
    let headless = cli.query.is_some();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::from_name(&cfg.logging.format)
    };
    let log_path = init_logging(LogConfig {
        app_name: "quarry",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: headless,
        format,
        default_filter: cfg.logging.level.clone(),
    })?;
    tracing::info!(
        config = ?config_file,
        log = %log_path.display(),
        provider = %cfg.llm.provider,
        "quarry.start"
    );

    let model = resolve_model(&cfg, cli.model.as_deref())?;

    match cli.query {
        Some(query) => run_headless(&cfg, &model, &query).await,
        None => {
            let mut tether = Tether::new();
            build_interactive(&mut tether, &cfg, model)?;
            tether.run().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One fresh turn; progress goes to stderr, the result to stdout.
async fn run_headless(cfg: &QuarryConfig, model: &str, query: &str) -> Result<ExitCode> {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let orchestrator = build_orchestrator(cfg, progress_tx)?;
    let progress = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            eprintln!("{event}");
        }
    });

    let mut session = SessionContext::new();
    let outcome = orchestrator.submit(&mut session, query, model).await;
    // Closes the progress channel.
    drop(orchestrator);
    let _ = progress.await;

    print!("{}", headless_output(&outcome));
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn headless_output(outcome: &TurnOutcome) -> String {
    let mut out = format!("{}\n", outcome.banner());
    if let Some(text) = outcome.text() {
        out.push('\n');
        out.push_str(text);
        out.push('\n');
    }
    if let TurnOutcome::Report { sources, degraded, .. } = outcome {
        if !sources.is_empty() {
            out.push_str("\nSources:\n");
            for source in sources {
                out.push_str(&format!("- {} <{}>\n", source.title, source.link));
            }
        }
        if *degraded > 0 {
            out.push_str(&format!(
                "\n{degraded} source summary(ies) unavailable due to model errors.\n"
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use quarry_research::SearchResult;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    #[serial_test::serial]
    fn flags_parse() {
        temp_env::with_var_unset("QUARRY_CONFIG", || {
            let cli = Cli::try_parse_from([
                "quarry",
                "--model",
                "gemini-1.5-flash",
                "-q",
                "latest news on fusion",
                "--log-json",
            ])
            .unwrap();
            assert_eq!(cli.model.as_deref(), Some("gemini-1.5-flash"));
            assert_eq!(cli.query.as_deref(), Some("latest news on fusion"));
            assert!(cli.log_json);
            assert!(!cli.print_config);
            assert!(cli.config.is_none());
        });
    }

    #[test]
    #[serial_test::serial]
    fn config_path_falls_back_to_env() {
        temp_env::with_var("QUARRY_CONFIG", Some("/etc/quarry.yaml"), || {
            let cli = Cli::try_parse_from(["quarry"]).unwrap();
            assert_eq!(cli.config, Some(PathBuf::from("/etc/quarry.yaml")));
        });
    }

    #[test]
    fn report_prints_banner_text_and_sources() {
        let out = headless_output(&TurnOutcome::Report {
            report: "Fusion is still experimental.".into(),
            sources: vec![SearchResult {
                title: "ITER".into(),
                link: "https://iter.org".into(),
                snippet: String::new(),
            }],
            degraded: 0,
        });
        assert_eq!(
            out,
            "Final Research Summary\n\nFusion is still experimental.\n\nSources:\n- ITER <https://iter.org>\n"
        );
    }

    #[test]
    fn failures_print_only_the_banner() {
        let out = headless_output(&TurnOutcome::NoUsableSummaries);
        assert_eq!(out, "No usable summaries could be created.\n");
    }
}
