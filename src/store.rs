use crate::app_config::Core;
use crate::auth::SharedSecret;
use crate::domain::commands::Command;
use crate::domain::events::Event;
use crate::domain::{Epoch, FixSubmission, InvalidFix, LocationFix};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch::{Receiver as WatchReceiver, Sender as WatchSender};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task;
use tracing::{debug, info, instrument, warn};

/// A consistent view of the store: readers see either the state before or after a mutation, never a mix.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreSnapshot {
    pub fix: Option<LocationFix>,
    pub epoch: Epoch,
}

impl StoreSnapshot {
    pub fn has_location(&self) -> bool {
        self.fix.is_some()
    }
}

/// The state at the moment of subscribing, plus every event committed after it.
#[derive(Debug)]
pub struct Subscription {
    pub snapshot: StoreSnapshot,
    pub events: broadcast::Receiver<Event>,
}

/// Single owner of the latest fix and the epoch. Commands are applied one at a time, and each commit publishes
/// its snapshot and event before the next command is read.
#[derive(Debug)]
pub struct Store {
    fix: Option<LocationFix>,
    epoch: Epoch,
    rx: Receiver<Command>,
    events_tx: broadcast::Sender<Event>,
    notifier_tx: WatchSender<StoreSnapshot>,
    notifier_rx: WatchReceiver<StoreSnapshot>,
}

impl Store {
    pub fn new(rx: Receiver<Command>, epoch: Epoch, event_buffer_size: usize) -> Self {
        let (events_tx, _) = broadcast::channel(event_buffer_size.max(1));
        let (notifier_tx, notifier_rx) = watch::channel(StoreSnapshot { fix: None, epoch });

        Store {
            fix: None,
            epoch,
            rx,
            events_tx,
            notifier_tx,
            notifier_rx,
        }
    }

    pub fn notifier(&self) -> WatchReceiver<StoreSnapshot> {
        self.notifier_rx.clone()
    }

    #[instrument(skip(self))]
    pub async fn listen(&mut self) {
        while let Some(command) = self.rx.recv().await {
            debug!("🔵 Received command: {:?}", command);
            match command {
                Command::UpdateLocation { fix, reply } => {
                    self.fix = Some(fix.clone());
                    self.publish(Event::Location(fix));
                    reply.send(()).unwrap_or_default();
                }
                Command::Reset { timestamp, reply } => {
                    let previous = self.epoch;
                    self.fix = None;
                    self.epoch = previous.next_at(timestamp);
                    info!(epoch = %self.epoch, "🔄 Reset tracking, epoch {} replaces {}", self.epoch, previous);

                    self.publish(Event::Reset { timestamp, epoch: self.epoch });
                    reply.send(self.epoch).unwrap_or_default();
                }
                Command::Subscribe { reply } => {
                    let subscription = Subscription {
                        snapshot: self.snapshot(),
                        events: self.events_tx.subscribe(),
                    };
                    reply.send(subscription).unwrap_or_default();
                }
            }
        }
        info!("🔵 Store stopped, all handles dropped");
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            fix: self.fix.clone(),
            epoch: self.epoch,
        }
    }

    fn publish(&self, event: Event) {
        self.notifier_tx.send(self.snapshot()).unwrap_or_default();
        // No subscribers is not an error
        self.events_tx.send(event).unwrap_or_default();
    }
}

/// Cloneable handle to a running [`Store`]. Authentication and validation happen here, so a rejected request
/// never reaches the store.
#[derive(Clone, Debug)]
pub struct LocationStore {
    tx: Sender<Command>,
    notifier_rx: WatchReceiver<StoreSnapshot>,
    secret: SharedSecret,
}

impl LocationStore {
    pub fn new(tx: Sender<Command>, notifier_rx: WatchReceiver<StoreSnapshot>, secret: SharedSecret) -> Self {
        LocationStore { tx, notifier_rx, secret }
    }

    /// Starts a store task with a fresh epoch and returns a handle to it.
    pub fn spawn(core: &Core, secret: SharedSecret) -> Self {
        let (tx, rx) = mpsc::channel::<Command>(core.store_buffer_size().max(1));
        let mut store = Store::new(rx, Epoch::now(), core.event_buffer_size());
        let handle = LocationStore::new(tx, store.notifier(), secret);

        task::spawn(async move {
            store.listen().await;
        });

        handle
    }

    pub fn current(&self) -> StoreSnapshot {
        self.notifier_rx.borrow().clone()
    }

    pub fn notifier(&self) -> WatchReceiver<StoreSnapshot> {
        self.notifier_rx.clone()
    }

    #[instrument(skip_all)]
    pub async fn update(&self, token: Option<&str>, submission: FixSubmission) -> Result<LocationFix, StoreError> {
        self.authorize(token, "update location")?;
        let fix = submission.into_fix(Utc::now().timestamp_millis())?;

        let (reply, response) = oneshot::channel();
        self.send(Command::UpdateLocation { fix: fix.clone(), reply }).await?;
        response.await.map_err(|_| StoreError::Unavailable)?;

        debug!("📍 Updated location to {}, {}", fix.lat, fix.lng);
        Ok(fix)
    }

    #[instrument(skip_all)]
    pub async fn reset(&self, token: Option<&str>) -> Result<Epoch, StoreError> {
        self.authorize(token, "reset")?;

        let (reply, response) = oneshot::channel();
        self.send(Command::Reset {
            timestamp: Utc::now().timestamp_millis(),
            reply,
        })
        .await?;
        response.await.map_err(|_| StoreError::Unavailable)
    }

    pub async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Subscribe { reply }).await?;
        response.await.map_err(|_| StoreError::Unavailable)
    }

    /// Checks a token against the shared secret without touching the store.
    pub fn authorize(&self, token: Option<&str>, action: &str) -> Result<(), StoreError> {
        if self.secret.verify(token) {
            Ok(())
        } else {
            warn!("🔒 Rejected unauthorized {} request", action);
            Err(StoreError::Unauthorized)
        }
    }

    async fn send(&self, command: Command) -> Result<(), StoreError> {
        self.tx.send(command).await.map_err(|_| StoreError::Unavailable)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidFix),
    #[error("location store is unavailable")]
    Unavailable,
}
