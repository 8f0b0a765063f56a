//! Mailbox-per-actor runtime on tokio.
//!
//! Each actor is a task draining a bounded `mpsc` channel; callers hold an
//! [`Addr`]. Request/response goes through a `oneshot` sender inside the
//! message:
//!
//! ```
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use quarry_actors::actor::{spawn_actor, Actor, Context};
//! use tokio::sync::oneshot;
//!
//! struct Tally(u32);
//!
//! enum TallyMsg {
//!     Add(u32),
//!     Total(oneshot::Sender<u32>),
//! }
//!
//! #[async_trait]
//! impl Actor for Tally {
//!     type Msg = TallyMsg;
//!
//!     async fn handle(&mut self, msg: TallyMsg, _ctx: &mut Context<Self>) -> Result<()> {
//!         match msg {
//!             TallyMsg::Add(n) => self.0 += n,
//!             TallyMsg::Total(reply) => {
//!                 let _ = reply.send(self.0);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let tally = spawn_actor(Tally(0), 8);
//! tally.addr.send(TallyMsg::Add(2)).await.ok();
//! tally.addr.send(TallyMsg::Add(3)).await.ok();
//!
//! let (tx, rx) = oneshot::channel();
//! tally.addr.send(TallyMsg::Total(tx)).await.ok();
//! assert_eq!(rx.await.unwrap(), 5);
//! # });
//! ```
use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// Minimal actor trait. `Self: Sized` avoids object-safety issues when using `Context<Self>`.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Runtime context for an actor instance.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    pub stop: bool,
}

impl<A: Actor> Context<A> {
    /// Get a clone of this actor's `Addr`.
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Request a graceful stop after processing the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

/// Manual Clone to avoid unnecessary bounds on `A`/`A::Msg`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Async send; awaits backpressure. Returns the message if the receiver is dropped.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Try to send without waiting. Returns the message if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

// Drives one actor until it errors, asks to stop, loses every sender, or
// the shutdown broadcast fires.
fn run_mailbox<A: Actor>(
    mut actor: A,
    mut rx: mpsc::Receiver<A::Msg>,
    addr: Addr<A>,
    shutdown: Option<broadcast::Receiver<()>>,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let mut ctx = Context { addr, stop: false };
        let mut shutdown = shutdown;

        loop {
            let next = match shutdown.as_mut() {
                Some(shutdown_rx) => tokio::select! {
                    _ = shutdown_rx.recv() => None,
                    maybe_msg = rx.recv() => maybe_msg,
                },
                None => rx.recv().await,
            };
            let Some(msg) = next else { break };

            if let Err(e) = actor.handle(msg, &mut ctx).await {
                tracing::error!(target: "quarry-actors", error = ?e, "actor returned error; stopping");
                return Err(e);
            }
            if ctx.stop {
                break;
            }
        }
        Ok(())
    })
}

/// Spawn an actor with a bounded mailbox.
///
/// Stop conditions:
/// - `handle` returns `Err`
/// - all senders are dropped
/// - `ctx.stop()` is called
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_reserved(std::any::type_name::<A>(), capacity).start(actor)
}

/// Reserved spawn: create mailbox+addr now; start the task later.
///
/// Lets two actors hold each other's addresses: reserve both, then start
/// each with the other's `Addr`.
pub struct Reserved<A: Actor> {
    name: String,
    addr: Addr<A>,
    rx: mpsc::Receiver<A::Msg>,
}

impl<A: Actor> Reserved<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Start the actor task on the reserved mailbox. Messages sent before
    /// this are delivered in order.
    pub fn start(self, actor: A) -> ActorHandle<A> {
        self.start_with_shutdown(actor, None)
    }

    pub fn start_with_shutdown(
        self,
        actor: A,
        shutdown: Option<broadcast::Receiver<()>>,
    ) -> ActorHandle<A> {
        let task = run_mailbox(actor, self.rx, self.addr.clone(), shutdown);
        ActorHandle {
            addr: self.addr,
            task,
        }
    }
}

/// Factory for reservation.
pub fn spawn_actor_reserved<A: Actor>(name: impl Into<String>, capacity: usize) -> Reserved<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    Reserved {
        name: name.into(),
        addr: Addr(tx),
        rx,
    }
}
