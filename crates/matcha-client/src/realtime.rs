//! Real-time channel supervisor.
//!
//! The supervisor runs in a dedicated tokio task. It follows the session's
//! token feed: while a token is present it keeps one connection open,
//! retrying failed connects with linear backoff up to a fixed budget; when
//! the token goes away or changes it drops the connection at once. A
//! connection the server closes right after accepting it is a failed
//! attempt too. Between attempts the state reads `Disconnected`. After
//! the budget is spent it stays disconnected until the token changes or a
//! manual reconnect is requested; the backup poll covers freshness
//! meanwhile.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use matcha_net::{Connection, Connector};
use matcha_shared::constants::{DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_STEP_MS};
use matcha_shared::protocol::PushEvent;
use matcha_shared::types::ChannelState;

use crate::cache::{QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::events::{ClientEvent, EventBus};
use crate::notifications::NotificationFeed;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Floor for [`ReconnectPolicy::stable_after`].
const MIN_STABLE_UPTIME: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    /// Attempt `n` (1-based) waits `n * step` after failing.
    pub step: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.reconnect_attempts,
            step: config.reconnect_step,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }

    /// Uptime after which a dropped connection resets the attempt budget.
    pub fn stable_after(&self) -> Duration {
        self.step.max(MIN_STABLE_UPTIME)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            step: Duration::from_millis(DEFAULT_RECONNECT_STEP_MS),
        }
    }
}

// ---------------------------------------------------------------------------
// Push handling
// ---------------------------------------------------------------------------

/// Applies pushed events to local state: the notification feed, cache
/// invalidations and view-layer events.
#[derive(Clone)]
pub struct PushHandler {
    feed: Arc<NotificationFeed>,
    cache: QueryCache,
    events: EventBus,
}

impl PushHandler {
    pub fn new(feed: Arc<NotificationFeed>, cache: QueryCache, events: EventBus) -> Self {
        Self {
            feed,
            cache,
            events,
        }
    }

    pub fn handle(&self, event: PushEvent) {
        debug!(event = event.name(), "Push event");
        match event {
            PushEvent::Connected { user_id } => {
                debug!(user = %user_id, "Server acknowledged the connection");
            }
            PushEvent::Notification(notification) => {
                let fresh = self.feed.upsert(notification.clone());
                self.cache
                    .invalidate_many(&[QueryKey::Notifications, QueryKey::UnreadCount]);
                if fresh {
                    self.events
                        .emit(ClientEvent::NotificationReceived(notification));
                } else {
                    debug!(id = %notification.id, "Duplicate notification ignored");
                }
            }
            PushEvent::NewMessage(message) => {
                self.cache
                    .invalidate_many(&[QueryKey::Messages, QueryKey::Conversations]);
                self.events.emit(ClientEvent::MessageReceived(message));
            }
            PushEvent::MessageSent(_) => {
                self.cache
                    .invalidate_many(&[QueryKey::Messages, QueryKey::Conversations]);
            }
            PushEvent::Typing(typing) => self.events.emit(ClientEvent::Typing(typing)),
            PushEvent::NewDateProposal(proposal) => {
                self.cache.invalidate(QueryKey::DateProposals);
                self.events
                    .emit(ClientEvent::DateProposalReceived(proposal));
            }
            PushEvent::Error { message } => {
                warn!(%message, "Server reported a socket error");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Commands sent *into* the supervisor task.
#[derive(Debug)]
enum ChannelCommand {
    /// Start over with a fresh attempt budget.
    Reconnect,
    Shutdown,
}

/// Handle on the supervisor task. Dropping it stops the task.
pub struct RealtimeChannel {
    commands: mpsc::Sender<ChannelCommand>,
    state: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Spawn the supervisor. Must be called inside a tokio runtime.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        tokens: watch::Receiver<Option<String>>,
        handler: PushHandler,
        policy: ReconnectPolicy,
        events: EventBus,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);

        let supervisor = Supervisor {
            connector,
            tokens,
            commands: cmd_rx,
            handler,
            policy,
            state: state_tx,
            events,
        };
        let task = tokio::spawn(supervisor.run());

        Self {
            commands: cmd_tx,
            state: state_rx,
            task,
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Retry now with a fresh budget, e.g. after the channel gave up.
    pub fn reconnect(&self) {
        if let Err(e) = self.commands.try_send(ChannelCommand::Reconnect) {
            debug!(error = %e, "Reconnect request dropped");
        }
    }

    /// Close the connection and stop the supervisor.
    pub fn shutdown(&self) {
        if let Err(e) = self.commands.try_send(ChannelCommand::Shutdown) {
            debug!(error = %e, "Shutdown request dropped; aborting");
            self.task.abort();
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Supervisor task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Re-read the token and start over.
    Restart,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    TokenChanged,
    Reconnect,
    Shutdown,
}

enum Pumped {
    Dropped(String),
    Interrupted(Interrupt),
}

enum Backoff {
    Elapsed,
    Reset,
    Exit(Flow),
}

struct Supervisor {
    connector: Arc<dyn Connector>,
    tokens: watch::Receiver<Option<String>>,
    commands: mpsc::Receiver<ChannelCommand>,
    handler: PushHandler,
    policy: ReconnectPolicy,
    state: watch::Sender<ChannelState>,
    events: EventBus,
}

/// Resolves on the next token change or command.
async fn interrupted(
    tokens: &mut watch::Receiver<Option<String>>,
    commands: &mut mpsc::Receiver<ChannelCommand>,
) -> Interrupt {
    tokio::select! {
        changed = tokens.changed() => match changed {
            Ok(()) => Interrupt::TokenChanged,
            // Session store gone.
            Err(_) => Interrupt::Shutdown,
        },
        cmd = commands.recv() => match cmd {
            Some(ChannelCommand::Reconnect) => Interrupt::Reconnect,
            Some(ChannelCommand::Shutdown) | None => Interrupt::Shutdown,
        },
    }
}

impl Supervisor {
    async fn run(mut self) {
        loop {
            let token = self.tokens.borrow_and_update().clone();
            let flow = match token {
                Some(token) => self.serve(&token).await,
                None => {
                    self.set_state(ChannelState::Disconnected);
                    self.idle().await
                }
            };
            if flow == Flow::Stop {
                break;
            }
        }
        self.set_state(ChannelState::Disconnected);
        info!("Real-time channel stopped");
    }

    /// Wait, disconnected, for something that warrants a new attempt.
    async fn idle(&mut self) -> Flow {
        loop {
            match interrupted(&mut self.tokens, &mut self.commands).await {
                Interrupt::TokenChanged => return Flow::Restart,
                Interrupt::Reconnect if self.tokens.borrow().is_some() => return Flow::Restart,
                Interrupt::Reconnect => debug!("Reconnect ignored; no session"),
                Interrupt::Shutdown => return Flow::Stop,
            }
        }
    }

    /// Keep a connection open for `token` until it changes.
    ///
    /// A connection that drops before [`ReconnectPolicy::stable_after`]
    /// counts as a failed attempt; only one that stayed up that long
    /// earns a fresh budget.
    async fn serve(&mut self, token: &str) -> Flow {
        let mut attempt = 0;
        loop {
            if attempt >= self.policy.max_attempts {
                warn!(
                    attempts = attempt,
                    "Giving up on the real-time channel; relying on polling"
                );
                self.set_state(ChannelState::Disconnected);
                return self.idle().await;
            }

            attempt += 1;
            self.set_state(ChannelState::Connecting { attempt });

            let connected = tokio::select! {
                result = self.connector.connect(token) => result,
                interrupt = interrupted(&mut self.tokens, &mut self.commands) => match interrupt {
                    Interrupt::TokenChanged => return Flow::Restart,
                    Interrupt::Shutdown => return Flow::Stop,
                    Interrupt::Reconnect => {
                        attempt = 0;
                        continue;
                    }
                },
            };

            match connected {
                Ok(connection) => {
                    let id = connection.id;
                    let opened_at = Instant::now();
                    info!(connection = %id, attempt, "Real-time channel connected");
                    self.set_state(ChannelState::Connected);

                    match self.pump(connection).await {
                        Pumped::Dropped(reason) => {
                            let uptime = opened_at.elapsed();
                            self.set_state(ChannelState::Disconnected);
                            if uptime >= self.policy.stable_after() {
                                warn!(connection = %id, %reason, "Real-time channel dropped; reconnecting");
                                attempt = 0;
                                continue;
                            }
                            warn!(
                                connection = %id,
                                %reason,
                                ?uptime,
                                attempt,
                                max = self.policy.max_attempts,
                                "Real-time channel closed right after connecting"
                            );
                        }
                        Pumped::Interrupted(Interrupt::TokenChanged) => {
                            info!(connection = %id, "Session changed; closing connection");
                            return Flow::Restart;
                        }
                        Pumped::Interrupted(Interrupt::Reconnect) => {
                            info!(connection = %id, "Manual reconnect");
                            attempt = 0;
                            continue;
                        }
                        Pumped::Interrupted(Interrupt::Shutdown) => return Flow::Stop,
                    }
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.policy.max_attempts,
                        error = %e,
                        "Real-time connect failed"
                    );
                    self.set_state(ChannelState::Disconnected);
                }
            }

            if attempt < self.policy.max_attempts {
                match self.back_off(attempt).await {
                    Backoff::Elapsed => {}
                    Backoff::Reset => attempt = 0,
                    Backoff::Exit(flow) => return flow,
                }
            }
        }
    }

    /// Sleep the linear delay for `attempt`, unless interrupted.
    async fn back_off(&mut self, attempt: u32) -> Backoff {
        let delay = self.policy.delay_for(attempt);
        debug!(?delay, attempt, "Backing off");
        tokio::select! {
            _ = tokio::time::sleep(delay) => Backoff::Elapsed,
            interrupt = interrupted(&mut self.tokens, &mut self.commands) => match interrupt {
                Interrupt::TokenChanged => Backoff::Exit(Flow::Restart),
                Interrupt::Shutdown => Backoff::Exit(Flow::Stop),
                Interrupt::Reconnect => Backoff::Reset,
            },
        }
    }

    /// Forward events until the connection ends or something interrupts.
    /// Dropping `connection` on return closes it.
    async fn pump(&mut self, mut connection: Connection) -> Pumped {
        loop {
            tokio::select! {
                interrupt = interrupted(&mut self.tokens, &mut self.commands) => {
                    return Pumped::Interrupted(interrupt);
                }
                item = connection.events.next() => match item {
                    Some(Ok(event)) => self.handler.handle(event),
                    Some(Err(e)) => return Pumped::Dropped(e.to_string()),
                    None => return Pumped::Dropped("stream ended".to_string()),
                },
            }
        }
    }

    fn set_state(&self, state: ChannelState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            debug!(?state, "Channel state changed");
            self.events.emit(ClientEvent::ChannelStateChanged(state));
        }
    }
}
