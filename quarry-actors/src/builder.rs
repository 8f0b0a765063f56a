use crate::actor::{spawn_actor_reserved, Actor, Reserved};
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;
use tokio::sync::broadcast;

/// Wires actors together and owns their tasks until shutdown.
pub struct Builder {
    sys: ActorSystem,
    // Subscribed up front so a signal sent before `run_until_ctrl_c` is not lost.
    shutdown_rx: broadcast::Receiver<()>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        let sys = ActorSystem::new();
        let shutdown_rx = sys.shutdown_notifier();
        Self {
            sys,
            shutdown_rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Reserve a named mailbox; hand out its `Addr` before the actor starts.
    pub fn reserve<A: Actor>(&self, name: &str, mailbox: usize) -> Reserved<A> {
        spawn_actor_reserved::<A>(name, mailbox)
    }

    /// Start a previously reserved actor and track its task.
    pub fn start_reserved<A>(&mut self, r: Reserved<A>, actor: A) -> &mut Self
    where
        A: Actor,
    {
        let name = r.name().to_string();
        let h = r.start_with_shutdown(actor, Some(self.sys.shutdown_notifier()));
        tracing::debug!(target: "quarry-actors", actor = %name, "actor.started");
        self.sys.track(async move { h.task.await? });
        self
    }

    pub async fn graceful_shutdown(self) -> Result<()> {
        self.sys.graceful_shutdown().await
    }

    /// Block until CTRL-C or an actor signals shutdown, then stop everything
    /// and wait for the tasks to finish.
    pub async fn run_until_ctrl_c(mut self) -> Result<()> {
        let shutdown_rx = &mut self.shutdown_rx;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(target: "quarry-actors", "ctrl-c received");
            }
            _ = shutdown_rx.recv() => {}
        }
        self.graceful_shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Context;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct Echo(mpsc::UnboundedSender<u8>);

    #[async_trait]
    impl Actor for Echo {
        type Msg = u8;

        async fn handle(&mut self, msg: u8, _ctx: &mut Context<Self>) -> Result<()> {
            let _ = self.0.send(msg);
            Ok(())
        }
    }

    #[tokio::test]
    async fn reserved_addresses_reach_started_actors() {
        let mut b = Builder::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reserved = b.reserve::<Echo>("echo", 2);
        let addr = reserved.addr();
        addr.send(1).await.unwrap();
        b.start_reserved(reserved, Echo(tx));
        addr.send(2).await.unwrap();

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        b.graceful_shutdown().await.unwrap();
        assert_eq!(addr.send(3).await, Err(3));
    }

    #[tokio::test]
    async fn shutdown_handle_ends_run_loop() {
        let mut b = Builder::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let reserved = b.reserve::<Echo>("echo", 2);
        b.start_reserved(reserved, Echo(tx));
        let handle = b.shutdown_handle();
        handle.signal();
        b.run_until_ctrl_c().await.unwrap();
    }
}
