//! Message broker for Relay.
//!
//! The broker owns the inbound queue and a registry of subscriber
//! mailboxes, and runs a single routing loop that fans messages out.

use crate::message::{unix_timestamp, Message};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// A subscriber identity.
pub type UserId = String;

/// Broker errors.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker has observed cancellation and no longer accepts messages.
    #[error("broker stopped")]
    Stopped,
}

/// Broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of the inbound message queue. Producers block on `submit`
    /// once this many messages are pending.
    pub queue_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { queue_capacity: 100 }
    }
}

/// Shared broker state behind the cloneable handle.
#[derive(Debug)]
struct Shared {
    /// Configuration.
    config: BrokerConfig,
    /// Sending side of the inbound queue.
    input: Sender<Message>,
    /// Receiving side of the inbound queue, taken exactly once by `run`.
    pending: Mutex<Option<Receiver<Message>>>,
    /// Subscriber mailboxes indexed by identity.
    registry: RwLock<HashMap<UserId, Sender<Message>>>,
    /// External shutdown signal observed by the routing loop.
    shutdown: CancellationToken,
    /// Latched once cancellation has been observed.
    stopped: AtomicBool,
}

/// The central message broker.
///
/// Producers call [`submit`](Broker::submit); subscribers hand the sending
/// half of a bounded mailbox to [`register`](Broker::register) and read
/// delivered messages from the receiving half. A single routing task,
/// started by [`run`](Broker::run), decides delivery: broadcast messages
/// are offered to every registered mailbox, private messages to the
/// recipient's mailbox only. Sends into mailboxes never block; a full
/// mailbox drops that subscriber's copy.
///
/// The broker is the sole closer of registered mailboxes: it drops the
/// sending half on [`unregister`](Broker::unregister), on replacement, and
/// for every subscriber when the shutdown signal fires. Subscribers
/// observe the close as end-of-stream on their receiver. Callers must not
/// retain clones of a registered sender, or the close will not be
/// observable.
#[derive(Debug, Clone)]
pub struct Broker {
    inner: Arc<Shared>,
}

impl Broker {
    /// Create a broker with default configuration.
    ///
    /// The broker stops, irrevocably, when `shutdown` is cancelled.
    #[must_use]
    pub fn new(shutdown: CancellationToken) -> Self {
        Self::with_config(BrokerConfig::default(), shutdown)
    }

    /// Create a broker with custom configuration.
    #[must_use]
    pub fn with_config(config: BrokerConfig, shutdown: CancellationToken) -> Self {
        info!(queue_capacity = config.queue_capacity, "Creating broker");
        let (input, receiver) = mpsc::channel(config.queue_capacity);
        Self {
            inner: Arc::new(Shared {
                config,
                input,
                pending: Mutex::new(Some(receiver)),
                registry: RwLock::new(HashMap::new()),
                shutdown,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Get the broker configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Start the routing loop and return immediately.
    ///
    /// Only the first call starts a loop; subsequent calls are logged
    /// no-ops, so there is never more than one routing task per broker.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self) {
        let receiver = self
            .inner
            .pending
            .lock()
            .expect("inbound receiver mutex poisoned")
            .take();
        let Some(receiver) = receiver else {
            warn!("Routing loop already started");
            return;
        };
        tokio::spawn(route(Arc::clone(&self.inner), receiver));
    }

    /// Enqueue a message for routing.
    ///
    /// Blocks while the inbound queue is full, up to its capacity of
    /// pending messages. A submission waiting for capacity fails with
    /// [`BrokerError::Stopped`] if cancellation fires first; once the
    /// broker has observed cancellation, submissions fail immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Stopped`] if the broker has stopped.
    pub async fn submit(&self, message: Message) -> Result<(), BrokerError> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(BrokerError::Stopped);
        }

        tokio::select! {
            result = self.inner.input.send(message) => result.map_err(|_| BrokerError::Stopped),
            () = self.inner.shutdown.cancelled() => {
                self.inner.stopped.store(true, Ordering::SeqCst);
                Err(BrokerError::Stopped)
            }
        }
    }

    /// Install a delivery mailbox for `identity`, replacing any existing one.
    ///
    /// The broker takes sole ownership of the sending half; a replaced
    /// mailbox is closed. Identity format is not validated here; that is
    /// the roster's concern. Registering on a stopped broker closes the
    /// offered mailbox instead of installing it.
    pub async fn register(&self, identity: impl Into<UserId>, mailbox: Sender<Message>) {
        let identity = identity.into();
        let mut registry = self.inner.registry.write().await;

        // The shutdown sweep sets the flag under this same write lock, so a
        // mailbox can never slip in after the sweep and stay open.
        if self.inner.stopped.load(Ordering::SeqCst) {
            debug!(subscriber = %identity, "Register after stop; closing mailbox");
            return;
        }

        if registry.insert(identity.clone(), mailbox).is_some() {
            debug!(subscriber = %identity, "Replaced existing registration");
        } else {
            debug!(
                subscriber = %identity,
                subscribers = registry.len(),
                "Subscriber registered"
            );
        }
    }

    /// Remove `identity`'s mailbox and close it.
    ///
    /// Unknown identities are a no-op, so the call is idempotent.
    pub async fn unregister(&self, identity: &str) {
        let mut registry = self.inner.registry.write().await;
        if registry.remove(identity).is_some() {
            debug!(
                subscriber = %identity,
                subscribers = registry.len(),
                "Subscriber unregistered"
            );
        }
    }

    /// Get the number of registered subscribers.
    #[must_use]
    pub async fn subscriber_count(&self) -> usize {
        self.inner.registry.read().await.len()
    }

    /// Check if an identity is currently registered.
    #[must_use]
    pub async fn is_registered(&self, identity: &str) -> bool {
        self.inner.registry.read().await.contains_key(identity)
    }

    /// Check if the broker has observed cancellation.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}

/// The routing loop: drains the inbound queue until cancellation.
async fn route(shared: Arc<Shared>, mut input: Receiver<Message>) {
    info!("Routing loop started");
    loop {
        tokio::select! {
            // Cancellation strictly preempts further delivery.
            biased;

            () = shared.shutdown.cancelled() => {
                // Pending queued messages are discarded; `input` drops with us.
                shutdown_sweep(&shared).await;
                return;
            }
            maybe = input.recv() => {
                // `shared` holds the sending side, so the queue only yields
                // None once every broker handle is gone.
                let Some(mut message) = maybe else { return };
                if message.timestamp == 0 {
                    message.timestamp = unix_timestamp();
                }
                if message.broadcast {
                    fan_out(&shared, message).await;
                } else {
                    deliver_private(&shared, message).await;
                }
            }
        }
    }
}

/// Close every registered mailbox and latch the stopped flag.
async fn shutdown_sweep(shared: &Shared) {
    let mut registry = shared.registry.write().await;
    shared.stopped.store(true, Ordering::SeqCst);
    let subscribers = registry.len();
    // Dropping each sender is what closes a mailbox; holding the write
    // lock keeps register/unregister out while the sweep runs, so no
    // mailbox is closed twice or written after closing.
    registry.clear();
    info!(subscribers, "Broker stopped; all mailboxes closed");
}

/// Offer a broadcast message to every registered mailbox, never blocking.
async fn fan_out(shared: &Shared, message: Message) {
    let registry = shared.registry.read().await;
    trace!(
        sender = %message.sender,
        subscribers = registry.len(),
        "Broadcasting message"
    );
    for (identity, mailbox) in registry.iter() {
        match mailbox.try_send(message.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = %identity, "Mailbox full; dropping broadcast copy");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %identity, "Mailbox closed; dropping broadcast copy");
            }
        }
    }
}

/// Deliver a private message to its recipient's mailbox, never blocking.
async fn deliver_private(shared: &Shared, message: Message) {
    let registry = shared.registry.read().await;
    let Some(mailbox) = registry.get(&message.recipient) else {
        trace!(recipient = %message.recipient, "Unknown recipient; discarding message");
        return;
    };
    match mailbox.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(message)) => {
            debug!(recipient = %message.recipient, "Mailbox full; dropping private message");
        }
        Err(TrySendError::Closed(message)) => {
            debug!(recipient = %message.recipient, "Mailbox closed; dropping private message");
        }
    }
}
