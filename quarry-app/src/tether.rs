use anyhow::{Context, Result, bail};
use quarry_actors::{ResearchActor, ResearchHandle, builder::Builder};
use quarry_config::QuarryConfig;
use quarry_llm::LlmClientSpec;
use quarry_research::{LeadWordDetector, Orchestrator, PipelineSettings, Progress};
use quarry_tui::{TuiActor, spawn_progress_feeder, spawn_tui_feeders};
use quarry_web::scraper::WebScraper;
use quarry_web::serper::SerperClient;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};

const RESEARCH_MAILBOX: usize = 64;
const TUI_MAILBOX: usize = 256;

pub struct Tether {
    builder: Builder,
}

impl Tether {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
        }
    }

    pub fn builder_mut(&mut self) -> &mut Builder {
        &mut self.builder
    }

    pub async fn run(self) -> Result<()> {
        self.builder.run_until_ctrl_c().await
    }
}

/// The model to start with: `requested` if given, else `llm.default_model`,
/// else the first configured model.
pub fn resolve_model(cfg: &QuarryConfig, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(name) if cfg.llm.models.iter().any(|m| m == name) => Ok(name.to_string()),
        Some(name) => bail!(
            "model `{name}` is not configured; choose one of {}",
            cfg.llm.models.join(", ")
        ),
        None => cfg
            .llm
            .selected_model()
            .map(str::to_string)
            .context("llm.models is empty"),
    }
}

pub fn llm_spec(cfg: &QuarryConfig) -> LlmClientSpec {
    let mut spec = LlmClientSpec::new(cfg.llm.provider, cfg.llm.api_key());
    spec.endpoint = cfg.llm.endpoint.clone();
    spec.timeout = cfg.llm.timeout();
    spec
}

/// Search, scrape and model clients wired from config. Missing API keys
/// are reported by the first turn that needs them.
pub fn build_orchestrator(
    cfg: &QuarryConfig,
    progress: UnboundedSender<Progress>,
) -> Result<Orchestrator> {
    let search = SerperClient::with_base_url(
        &cfg.search.endpoint,
        cfg.search.api_key(),
        cfg.search.timeout(),
    )?
    .with_result_count(cfg.search.num_results);
    let scraper = WebScraper::new(cfg.scraper.timeout())?;

    if cfg.search.api_key().is_none() {
        tracing::warn!("search.api_key is not set; searches will fail");
    }
    if cfg.llm.api_key().is_none() {
        tracing::warn!(provider = %cfg.llm.provider, "llm.api_key is not set; model calls will fail");
    }

    Ok(
        Orchestrator::new(Arc::new(search), Arc::new(scraper), Arc::new(llm_spec(cfg)))
            .with_settings(PipelineSettings {
                max_sources: cfg.research.max_sources,
                content_prefix_chars: cfg.research.content_prefix_chars,
            })
            .with_followup_detector(LeadWordDetector::new(cfg.research.followup_max_words))
            .with_progress(progress),
    )
}

pub fn build_interactive(t: &mut Tether, cfg: &QuarryConfig, model: String) -> Result<()> {
    let b = t.builder_mut();
    let shutdown = b.shutdown_handle();

    let r_research = b.reserve::<ResearchActor>("research:main", RESEARCH_MAILBOX);
    // ui (start last)
    let r_tui = b.reserve::<TuiActor>("tui:main", TUI_MAILBOX);

    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let research = ResearchActor::new(
        build_orchestrator(cfg, progress_tx)?,
        cfg.llm.models.clone(),
        model.clone(),
        cfg.export.dir.clone(),
    )?;
    let handle = ResearchHandle::new(r_research.addr());
    b.start_reserved(r_research, research);

    let tui_addr = r_tui.addr();
    let tui = TuiActor::new(handle, model, shutdown.clone())?;
    b.start_reserved(r_tui, tui);

    spawn_tui_feeders(tui_addr.clone(), shutdown.clone());
    spawn_progress_feeder(tui_addr, progress_rx, shutdown);
    Ok(())
}
