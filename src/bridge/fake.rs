//! Scriptable in-memory bridge for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{
    BridgeError, DisableOutcome, NativeBridge, NativeUsageEvent, PinnedShortcutIds,
    PinnedShortcutUpdate,
};
use crate::shortcuts::Shortcut;

/// Bridge methods that can be failed one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FakeCall {
    PinnedIds,
    CheckPinConfirmed,
    RequestPin,
    Disable,
    Update,
    NativeUsage,
    ClickedNotifications,
    WidgetSync,
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub pinned: HashSet<String>,
    pub recently_created: HashSet<String>,
    pub confirmed: HashSet<String>,
    /// When set, every call fails with this error
    pub failure: Option<BridgeError>,
    pub call_failures: HashMap<FakeCall, BridgeError>,
    /// Delay before a pin request lands in the recently-created window
    pub pin_delay: Option<Duration>,
    pub requires_manual_removal: bool,
    pub usage_events: Vec<NativeUsageEvent>,
    pub clicked_notifications: Vec<String>,

    pub pinned_queries: usize,
    pub confirmation_checks: usize,
    pub pin_requests: Vec<String>,
    pub disabled: Vec<String>,
    pub updates: Vec<PinnedShortcutUpdate>,
    pub widget_payloads: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeBridge {
    pub state: Mutex<FakeState>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&self, id: &str) {
        self.state.lock().pinned.insert(id.to_string());
    }

    pub fn mark_recently_created(&self, id: &str) {
        self.state.lock().recently_created.insert(id.to_string());
    }

    pub fn clear_recently_created(&self) {
        self.state.lock().recently_created.clear();
    }

    pub fn fail_with(&self, error: Option<BridgeError>) {
        self.state.lock().failure = error;
    }

    pub fn fail_call(&self, call: FakeCall, error: BridgeError) {
        self.state.lock().call_failures.insert(call, error);
    }

    pub fn push_usage(&self, id: &str, timestamp: i64) {
        self.state.lock().usage_events.push(NativeUsageEvent {
            shortcut_id: id.to_string(),
            timestamp,
        });
    }

    pub fn pinned_queries(&self) -> usize {
        self.state.lock().pinned_queries
    }

    fn check_failure(&self, call: FakeCall) -> Result<(), BridgeError> {
        let state = self.state.lock();
        match state.failure.as_ref().or_else(|| state.call_failures.get(&call)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NativeBridge for FakeBridge {
    async fn get_pinned_shortcut_ids(&self) -> Result<PinnedShortcutIds, BridgeError> {
        self.state.lock().pinned_queries += 1;
        self.check_failure(FakeCall::PinnedIds)?;
        let state = self.state.lock();
        Ok(PinnedShortcutIds {
            ids: state.pinned.clone(),
            recently_created_ids: state.recently_created.clone(),
        })
    }

    async fn check_pin_confirmed(&self, id: &str) -> Result<bool, BridgeError> {
        self.state.lock().confirmation_checks += 1;
        self.check_failure(FakeCall::CheckPinConfirmed)?;
        Ok(self.state.lock().confirmed.contains(id))
    }

    async fn request_pin_shortcut(&self, shortcut: &Shortcut) -> Result<(), BridgeError> {
        self.check_failure(FakeCall::RequestPin)?;
        let delay = self.state.lock().pin_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
            self.mark_recently_created(&shortcut.id);
        }
        self.state.lock().pin_requests.push(shortcut.id.clone());
        Ok(())
    }

    async fn disable_pinned_shortcut(&self, id: &str) -> Result<DisableOutcome, BridgeError> {
        self.check_failure(FakeCall::Disable)?;
        let mut state = self.state.lock();
        state.disabled.push(id.to_string());
        state.pinned.remove(id);
        Ok(DisableOutcome {
            requires_manual_removal: state.requires_manual_removal,
        })
    }

    async fn update_pinned_shortcut(&self, update: &PinnedShortcutUpdate) -> Result<(), BridgeError> {
        self.check_failure(FakeCall::Update)?;
        self.state.lock().updates.push(update.clone());
        Ok(())
    }

    async fn get_native_usage_events(&self) -> Result<Vec<NativeUsageEvent>, BridgeError> {
        self.check_failure(FakeCall::NativeUsage)?;
        Ok(std::mem::take(&mut self.state.lock().usage_events))
    }

    async fn get_clicked_notification_ids(&self) -> Result<Vec<String>, BridgeError> {
        self.check_failure(FakeCall::ClickedNotifications)?;
        Ok(std::mem::take(&mut self.state.lock().clicked_notifications))
    }

    async fn sync_widget_data(&self, serialized_shortcuts: String) -> Result<(), BridgeError> {
        self.check_failure(FakeCall::WidgetSync)?;
        self.state.lock().widget_payloads.push(serialized_shortcuts);
        Ok(())
    }
}
