// State management module
//
// This module provides the StateManager which wraps LaunchState with thread-safe access
// using Arc<RwLock<T>> and emits change events for whoever drives the launch.

use crate::models::{LaunchStage, LaunchState};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when launch state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A launch attempt has started
    LaunchStarted { attempt: usize },

    /// The pipeline entered a new stage
    StageChanged { stage: LaunchStage },

    /// The version check demanded a reinstall of the static assets
    ReinstallTriggered { reason: String },

    /// Every stage succeeded; the engine may be started
    LaunchReady,

    /// The attempt was aborted
    LaunchFailed { stage: LaunchStage, message: String },

    /// Per-attempt state has been reset
    StateReset,
}

/// Thread-safe launch state with event emission
///
/// - Provides thread-safe access to [`LaunchState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Enforces that only one launch attempt runs at a time
///
/// Cloning is cheap and every clone shares the same state and channel, so the
/// pipeline worker can own one while the launching side subscribes on another.
#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<LaunchState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(LaunchState::default())),
            state_tx,
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, LaunchState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, LaunchState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> LaunchState {
        self.read_lock().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let stage = state_manager.read(|state| state.stage);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&LaunchState) -> R,
    {
        let state = self.read_lock();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut LaunchState),
    {
        let mut state = self.write_lock();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = detect_changes(&old_state, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to all future state changes
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Claim the launch slot.
    ///
    /// Returns `false` without touching the state when an attempt is already running.
    pub fn try_begin_launch(&self) -> bool {
        let mut began = false;
        self.update(|state| {
            if !state.is_launching {
                state.begin_attempt();
                began = true;
            }
        });
        began
    }

    pub fn enter_stage(&self, stage: LaunchStage) -> Vec<StateChange> {
        tracing::info!("Launch stage: {}", stage);
        self.update(|state| state.stage = stage)
    }

    pub fn record_reinstall(&self, reason: String) -> Vec<StateChange> {
        self.update(|state| state.reinstall_reason = Some(reason))
    }

    pub fn finish_success(&self) -> Vec<StateChange> {
        self.update(|state| state.finish_success())
    }

    pub fn finish_failure(&self, message: String) -> Vec<StateChange> {
        self.update(|state| state.finish_failure(message))
    }

    /// Clear per-attempt fields, keeping the counters
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.is_launching = false;
            state.stage = LaunchStage::Idle;
            state.reinstall_reason = None;
            state.last_failure = None;
        });

        let reset_event = StateChange::StateReset;
        let _ = self.state_tx.send(reset_event.clone());
        changes.push(reset_event);

        changes
    }
}

/// Events implied by the transition from `old` to `new`
fn detect_changes(old: &LaunchState, new: &LaunchState) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if !old.is_launching && new.is_launching {
        changes.push(StateChange::LaunchStarted {
            attempt: new.attempts,
        });
    }

    if new.is_launching && old.stage != new.stage && new.stage != LaunchStage::Idle {
        changes.push(StateChange::StageChanged { stage: new.stage });
    }

    if new.reinstall_reason != old.reinstall_reason {
        if let Some(reason) = &new.reinstall_reason {
            changes.push(StateChange::ReinstallTriggered {
                reason: reason.clone(),
            });
        }
    }

    if old.is_launching && !new.is_launching {
        match &new.last_failure {
            Some(message) => changes.push(StateChange::LaunchFailed {
                stage: new.stage,
                message: message.clone(),
            }),
            None if new.stage == LaunchStage::SignalReady => {
                changes.push(StateChange::LaunchReady)
            }
            None => {}
        }
    }

    changes
}
