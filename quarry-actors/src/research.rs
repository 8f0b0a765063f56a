//! The actor that owns a research session.
//!
//! Every turn runs inside the actor's message handler, so submissions are
//! processed one at a time in arrival order and the [`SessionContext`] is
//! never shared. Front ends talk to it through a [`ResearchHandle`].

use crate::actor::{Actor, Addr, Context};
use anyhow::{anyhow, ensure, Result};
use async_trait::async_trait;
use quarry_common::QuarryError;
use quarry_research::{ChatEntry, Orchestrator, SessionContext, TurnOutcome};
use std::path::PathBuf;
use tokio::sync::oneshot;

/// One finished submission.
#[derive(Debug, Clone)]
pub struct Turn {
    pub query: String,
    pub model: String,
    pub outcome: TurnOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMenu {
    pub selected: String,
    pub available: Vec<String>,
}

pub enum ResearchMsg {
    Submit {
        query: String,
        reply: oneshot::Sender<Turn>,
    },
    /// Forget the session; the selected model stays.
    Clear { reply: oneshot::Sender<()> },
    /// Write the latest report; `dir` overrides the configured export dir.
    Export {
        dir: Option<PathBuf>,
        reply: oneshot::Sender<quarry_common::Result<PathBuf>>,
    },
    SelectModel {
        model: String,
        reply: oneshot::Sender<quarry_common::Result<ModelMenu>>,
    },
    Models { reply: oneshot::Sender<ModelMenu> },
    History {
        reply: oneshot::Sender<Vec<ChatEntry>>,
    },
}

pub struct ResearchActor {
    orchestrator: Orchestrator,
    session: SessionContext,
    models: Vec<String>,
    selected: String,
    export_dir: PathBuf,
}

impl ResearchActor {
    pub fn new(
        orchestrator: Orchestrator,
        models: Vec<String>,
        selected: impl Into<String>,
        export_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let selected = selected.into();
        ensure!(
            models.contains(&selected),
            "model `{selected}` is not one of {}",
            models.join(", ")
        );
        Ok(Self {
            orchestrator,
            session: SessionContext::new(),
            models,
            selected,
            export_dir: export_dir.into(),
        })
    }

    fn menu(&self) -> ModelMenu {
        ModelMenu {
            selected: self.selected.clone(),
            available: self.models.clone(),
        }
    }

    fn select(&mut self, model: &str) -> quarry_common::Result<ModelMenu> {
        if !self.models.iter().any(|m| m == model) {
            return Err(QuarryError::Config(format!(
                "unknown model `{model}`; choose one of {}",
                self.models.join(", ")
            )));
        }
        if self.selected != model {
            tracing::info!(target: "quarry-actors", from = %self.selected, to = %model, "research.model.selected");
            self.selected = model.to_string();
        }
        Ok(self.menu())
    }
}

#[async_trait]
impl Actor for ResearchActor {
    type Msg = ResearchMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        // A dropped reply receiver just means the caller went away.
        match msg {
            ResearchMsg::Submit { query, reply } => {
                let model = self.selected.clone();
                let outcome = self
                    .orchestrator
                    .submit(&mut self.session, &query, &model)
                    .await;
                let _ = reply.send(Turn {
                    query,
                    model,
                    outcome,
                });
            }
            ResearchMsg::Clear { reply } => {
                self.session.reset();
                tracing::info!(target: "quarry-actors", "research.session.cleared");
                let _ = reply.send(());
            }
            ResearchMsg::Export { dir, reply } => {
                let dir = dir.unwrap_or_else(|| self.export_dir.clone());
                let result = self.session.export_latest(&dir);
                match &result {
                    Ok(path) => {
                        tracing::info!(target: "quarry-actors", path = %path.display(), "research.export.written")
                    }
                    Err(e) => tracing::warn!(target: "quarry-actors", error = %e, "research.export.failed"),
                }
                let _ = reply.send(result);
            }
            ResearchMsg::SelectModel { model, reply } => {
                let _ = reply.send(self.select(model.trim()));
            }
            ResearchMsg::Models { reply } => {
                let _ = reply.send(self.menu());
            }
            ResearchMsg::History { reply } => {
                let _ = reply.send(self.session.history().to_vec());
            }
        }
        Ok(())
    }
}

/// Request/response wrapper around `Addr<ResearchActor>`.
#[derive(Clone)]
pub struct ResearchHandle {
    addr: Addr<ResearchActor>,
}

impl ResearchHandle {
    pub fn new(addr: Addr<ResearchActor>) -> Self {
        Self { addr }
    }

    async fn ask<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> ResearchMsg) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.addr
            .send(make(tx))
            .await
            .map_err(|_| anyhow!("research actor has stopped"))?;
        rx.await
            .map_err(|_| anyhow!("research actor dropped the request"))
    }

    pub async fn submit(&self, query: impl Into<String>) -> Result<Turn> {
        let query = query.into();
        self.ask(|reply| ResearchMsg::Submit { query, reply }).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.ask(|reply| ResearchMsg::Clear { reply }).await
    }

    pub async fn export(&self, dir: Option<PathBuf>) -> Result<PathBuf> {
        Ok(self.ask(|reply| ResearchMsg::Export { dir, reply }).await??)
    }

    pub async fn select_model(&self, model: impl Into<String>) -> Result<ModelMenu> {
        let model = model.into();
        Ok(self
            .ask(|reply| ResearchMsg::SelectModel { model, reply })
            .await??)
    }

    pub async fn models(&self) -> Result<ModelMenu> {
        self.ask(|reply| ResearchMsg::Models { reply }).await
    }

    pub async fn history(&self) -> Result<Vec<ChatEntry>> {
        self.ask(|reply| ResearchMsg::History { reply }).await
    }
}
