//! Task tracking and shutdown signalling for a set of actors.
//!
//! Actors subscribe to the broadcast channel for cooperative shutdown, and the
//! `JoinSet` makes sure every tracked task is awaited during teardown. The
//! first task error is returned from [`ActorSystem::graceful_shutdown`].
use anyhow::Result;
use tokio::{sync::broadcast, task::JoinSet};

#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn signal(&self) {
        // No subscribers left means everything already stopped.
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

pub struct ActorSystem {
    joinset: JoinSet<Result<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            joinset: JoinSet::new(),
            shutdown_tx,
        }
    }

    pub fn shutdown_notifier(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn track(&mut self, fut: impl std::future::Future<Output = Result<()>> + Send + 'static) {
        self.joinset.spawn(fut);
    }

    pub fn tracked(&self) -> usize {
        self.joinset.len()
    }

    pub async fn graceful_shutdown(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        while let Some(res) = self.joinset.join_next().await {
            res??;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_waits_for_tracked_tasks() {
        let mut sys = ActorSystem::new();
        let mut rx = sys.shutdown_notifier();
        sys.track(async move {
            rx.recv().await?;
            Ok(())
        });
        assert_eq!(sys.tracked(), 1);
        sys.graceful_shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn task_errors_surface_on_shutdown() {
        let mut sys = ActorSystem::new();
        sys.track(async { anyhow::bail!("terminal restore failed") });
        let err = sys.graceful_shutdown().await.unwrap_err();
        assert!(err.to_string().contains("terminal restore failed"));
    }
}
