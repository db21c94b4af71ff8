//! The spring reactor
//!
//! Listens for `state_changed` and companion-app action events and undoes
//! every genuine transition of a watched entity. Each reversal runs in its
//! own task so the listener loop never waits on the host.
//!
//! Echoes (the `state_changed` caused by our own command) are recognised by
//! the context id the command was issued with, so one external change leads
//! to exactly one command.

use crate::actions::{parse_action, ActionRequest, DelayOverrides, IOS_ACTION_EVENT, MOBILE_APP_ACTION_EVENT};
use crate::config::SpringConfig;
use crate::decision::{decide, Decision, IgnoreReason, Reversal};
use crate::error::SpringError;
use crate::host::Host;
use crate::notify::{build_notification, send_notification, Recipients};
use crate::toggle::ToggleState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ha_core::events::{StateChangedData, STATE_CHANGED};
use ha_core::{Context, EntityId, Event, ServiceCall};
use ha_event_bus::EventReceiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

/// Grace period after which a pending reversal or an unanswered command is forgotten
const STALE_AFTER: Duration = Duration::from_secs(10);

/// Outcome of handling one `state_changed` event
#[derive(Debug)]
pub enum Reaction {
    Ignored(IgnoreReason),
    /// A reversal task was spawned
    Scheduled(JoinHandle<()>),
}

impl Reaction {
    /// Why the event was dropped, `None` if a reversal was scheduled
    pub fn ignore_reason(&self) -> Option<IgnoreReason> {
        match self {
            Reaction::Ignored(reason) => Some(*reason),
            Reaction::Scheduled(_) => None,
        }
    }

    /// Wait for a scheduled reversal to finish
    pub async fn finished(self) {
        if let Reaction::Scheduled(handle) = self {
            if let Err(e) = handle.await {
                warn!(error = %e, "Reversal task failed");
            }
        }
    }
}

struct Shared<H> {
    host: Arc<H>,
    config: SpringConfig,
    recipients: Recipients,
    /// Context ids of commands we issued whose echo has not been seen yet
    in_flight: DashMap<String, Instant>,
    /// Entities with a reversal in progress, and when it was claimed
    pending: DashMap<EntityId, Instant>,
    overrides: DelayOverrides,
}

/// Watches `state_changed` and companion-app action events on a host
pub struct SpringReactor<H: Host> {
    shared: Arc<Shared<H>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<H: Host> SpringReactor<H> {
    /// Build a stopped reactor; `config` is taken as already validated
    pub fn new(host: Arc<H>, config: SpringConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shared: Arc::new(Shared {
                host,
                recipients: Recipients::from_config(&config),
                config,
                in_flight: DashMap::new(),
                pending: DashMap::new(),
                overrides: DelayOverrides::default(),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// Register the listeners and start the listener loop
    ///
    /// Fails without starting anything if any listener cannot be registered.
    pub async fn start(&self) -> Result<(), SpringError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Spring reactor already running");
            return Ok(());
        }

        // The previous loop may have ended on its own when the bus closed
        if let Some(finished) = self.task.lock().await.take() {
            if let Err(e) = finished.await {
                warn!(error = %e, "Previous spring reactor loop ended abnormally");
            }
        }

        let receivers = self
            .listen(STATE_CHANGED)
            .and_then(|state| Ok((state, self.listen(MOBILE_APP_ACTION_EVENT)?)))
            .and_then(|(state, android)| Ok((state, android, self.listen(IOS_ACTION_EVENT)?)));
        let (state_rx, android_rx, ios_rx) = match receivers {
            Ok(receivers) => receivers,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        info!(
            domain = %self.shared.config.domain,
            entities = self.shared.config.entities.len(),
            delay_secs = self.shared.config.delay_seconds,
            "Starting spring reactor"
        );

        let handle = tokio::spawn(listener_loop(
            self.shared.clone(),
            state_rx,
            android_rx,
            ios_rx,
            self.shutdown_tx.subscribe(),
            self.running.clone(),
        ));
        *self.task.lock().await = Some(handle);

        Ok(())
    }

    /// Stop the listener loop and drop the listeners
    ///
    /// Reversals already scheduled still run to completion.
    pub async fn stop(&self) {
        let Some(handle) = self.task.lock().await.take() else {
            return;
        };

        info!("Stopping spring reactor");
        let _ = self.shutdown_tx.send(());
        if let Err(e) = handle.await {
            warn!(error = %e, "Spring reactor loop ended abnormally");
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// True between a successful `start` and `stop`, or until the host ends the event stream
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// React to one `state_changed` event
    pub fn handle_state_change(&self, event: &Event) -> Reaction {
        self.shared.handle_state_change(event)
    }

    /// Record a companion-app button press
    pub fn handle_action(&self, event: &Event) -> Option<ActionRequest> {
        self.shared.handle_action(event)
    }

    fn listen(&self, event_type: &str) -> Result<EventReceiver, SpringError> {
        self.shared
            .host
            .listen(event_type)
            .map_err(|source| SpringError::Listen {
                event_type: event_type.to_string(),
                source,
            })
    }
}

async fn listener_loop<H: Host>(
    shared: Arc<Shared<H>>,
    mut state_rx: EventReceiver,
    mut android_rx: EventReceiver,
    mut ios_rx: EventReceiver,
    mut shutdown_rx: broadcast::Receiver<()>,
    running: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            result = state_rx.recv() => match result {
                Ok(event) => {
                    shared.handle_state_change(&event);
                }
                Err(e) if stream_ended(&e, STATE_CHANGED) => break,
                Err(_) => {}
            },
            result = android_rx.recv() => match result {
                Ok(event) => {
                    shared.handle_action(&event);
                }
                Err(e) if stream_ended(&e, MOBILE_APP_ACTION_EVENT) => break,
                Err(_) => {}
            },
            result = ios_rx.recv() => match result {
                Ok(event) => {
                    shared.handle_action(&event);
                }
                Err(e) if stream_ended(&e, IOS_ACTION_EVENT) => break,
                Err(_) => {}
            },
            _ = shutdown_rx.recv() => {
                debug!("Received shutdown signal");
                break;
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    info!("Spring reactor stopped");
}

/// Log a receive error; true when the channel is gone
fn stream_ended(err: &broadcast::error::RecvError, event_type: &str) -> bool {
    match *err {
        broadcast::error::RecvError::Lagged(n) => {
            warn!(event_type, skipped = n, "Spring reactor lagged behind the event bus");
            false
        }
        broadcast::error::RecvError::Closed => {
            info!(event_type, "Event bus closed");
            true
        }
    }
}

impl<H: Host> Shared<H> {
    #[instrument(skip_all, fields(event_type = %event.event_type))]
    fn handle_state_change(self: &Arc<Self>, event: &Event) -> Reaction {
        let data: StateChangedData = match event.parse_data() {
            Ok(data) => data,
            Err(e) => {
                trace!(error = %e, "Ignoring malformed state_changed payload");
                return Reaction::Ignored(IgnoreReason::Malformed);
            }
        };

        if let Some(new_state) = &data.new_state {
            if self.in_flight.remove(&new_state.context.id).is_some() {
                debug!(
                    entity_id = %data.entity_id,
                    state = %new_state.state,
                    "Ignoring echo of own command"
                );
                return Reaction::Ignored(IgnoreReason::Echo);
            }
        }

        let reversal = match decide(&data, &self.config) {
            Decision::Reverse(reversal) => reversal,
            Decision::Ignore(reason) => {
                trace!(entity_id = %data.entity_id, %reason, "Ignoring state change");
                return Reaction::Ignored(reason);
            }
        };

        let Some(claimed_at) = self.claim(&reversal.entity_id) else {
            debug!(entity_id = %reversal.entity_id, "Reversal already pending, ignoring change");
            return Reaction::Ignored(IgnoreReason::AlreadyPending);
        };

        debug!(
            entity_id = %reversal.entity_id,
            from = %reversal.previous,
            to = %reversal.observed,
            target = %reversal.target,
            "Scheduling reversal"
        );

        let shared = self.clone();
        Reaction::Scheduled(tokio::spawn(async move {
            shared.run_reversal(&reversal).await;
            shared
                .pending
                .remove_if(&reversal.entity_id, |_, at| *at == claimed_at);
        }))
    }

    fn handle_action(&self, event: &Event) -> Option<ActionRequest> {
        let request = parse_action(&event.data)?;
        if !self.config.watches(&request.entity_id) {
            trace!(entity_id = %request.entity_id, "Action for unwatched entity");
            return None;
        }

        info!(
            entity_id = %request.entity_id,
            action = ?request.action,
            delay_secs = request.action.delay().as_secs(),
            "Action received"
        );
        self.overrides
            .set(request.entity_id.clone(), request.action.delay());
        Some(request)
    }

    /// Mark an entity as having a reversal in progress
    ///
    /// Returns `None` while another reversal holds a fresh claim.
    fn claim(&self, entity_id: &EntityId) -> Option<Instant> {
        let now = Instant::now();
        let window = self.config.delay() + STALE_AFTER;

        match self.pending.entry(entity_id.clone()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < window {
                    return None;
                }
                debug!(entity_id = %entity_id, "Clearing stale pending reversal");
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        Some(now)
    }

    async fn run_reversal(&self, reversal: &Reversal) {
        let entity_id = &reversal.entity_id;

        if reversal.is_switch_off() && self.config.enable_notifications {
            let payload = build_notification(
                entity_id,
                &reversal.friendly_name,
                self.config.delay_seconds,
            );
            // Not awaited here; the reversal proceeds regardless
            let host = self.host.clone();
            let recipients = self.recipients.clone();
            tokio::spawn(async move {
                send_notification(host.as_ref(), &recipients, &payload).await;
            });
        }

        let delay = match self.overrides.take(entity_id) {
            Some(delay) => {
                debug!(entity_id = %entity_id, delay_secs = delay.as_secs(), "Using action override delay");
                delay
            }
            None => self.config.delay(),
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;

            let current = self.host.state(entity_id);
            if current.as_ref().map(ToggleState::from) != Some(reversal.observed) {
                debug!(
                    entity_id = %entity_id,
                    expected = %reversal.observed,
                    current = current.as_ref().map(|s| s.state.as_str()).unwrap_or("<removed>"),
                    "State changed during delay, skipping reversal"
                );
                return;
            }
        }

        let context = Context {
            parent_id: Some(reversal.cause.clone()),
            ..Context::new()
        };
        self.track_command(&context);

        let call = ServiceCall::for_entity(
            entity_id.domain(),
            reversal.service(),
            entity_id,
            context.clone(),
        );
        match self.host.call_service(call).await {
            Ok(()) => info!(
                entity_id = %entity_id,
                from = %reversal.observed,
                to = %reversal.target,
                delay_secs = delay.as_secs(),
                "Reversed input boolean"
            ),
            Err(e) => {
                self.in_flight.remove(&context.id);
                warn!(entity_id = %entity_id, error = %e, "Failed to reverse state");
            }
        }
    }

    fn track_command(&self, context: &Context) {
        let now = Instant::now();
        self.in_flight
            .retain(|_, issued| now.duration_since(*issued) < STALE_AFTER);
        self.in_flight.insert(context.id.clone(), now);
    }
}
