//! Customer dashboard: profile, current subscription, history and pack requests.
//!
//! Data is shared with two background tasks, the subscription poller and the
//! flash-message timer. Both stop when the dashboard's cancellation token
//! fires, which happens on teardown or drop, and neither writes state after
//! that point.

use shared::{Envelope, Id, Pack, Profile, Subscription};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::config::DashboardConfig;
use crate::error::ApiResult;
use crate::router::Route;
use crate::session::SessionContext;
use crate::views::{lock, Notice, UNEXPECTED_ERROR};

const REQUEST_SENT: &str = "Subscription request sent.";
const REQUEST_FAILED: &str = "Request failed.";
const REFRESHED: &str = "Data refreshed!";

/// Server state cached by the dashboard. Every update replaces a field whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerData {
    pub profile: Option<Profile>,
    pub current: Option<Subscription>,
    pub history: Vec<Subscription>,
    pub packs: Vec<Pack>,
}

/// Entry in the pack picker
#[derive(Debug, Clone, PartialEq)]
pub struct PackOption {
    pub id: Id,
    pub name: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub poll_interval: Duration,
    pub flash: Duration,
}

impl From<&DashboardConfig> for SyncTimings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            flash: config.flash_duration(),
        }
    }
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

/// Packs the customer can pick from.
///
/// Uses the live catalog when it has entries. Otherwise falls back to the
/// distinct pack ids seen in history, first occurrence first, so a pack can
/// still be requested when the catalog call failed.
pub fn available_packs(packs: &[Pack], history: &[Subscription]) -> Vec<PackOption> {
    if !packs.is_empty() {
        return packs
            .iter()
            .map(|p| PackOption {
                id: p.id.clone(),
                name: p.name.clone(),
                price: Some(p.price),
            })
            .collect();
    }

    let mut seen = HashSet::new();
    history
        .iter()
        .filter_map(|s| s.pack_id.as_ref())
        .filter(|id| seen.insert((*id).clone()))
        .map(|id| PackOption {
            id: id.clone(),
            name: format!("Pack {id}"),
            price: None,
        })
        .collect()
}

/// Store a fetch result if it succeeded and the dashboard is still alive
fn apply<T>(
    cancel: &CancellationToken,
    data: &Mutex<CustomerData>,
    what: &str,
    result: ApiResult<Envelope<T>>,
    set: impl FnOnce(&mut CustomerData, Option<T>),
) {
    if cancel.is_cancelled() {
        return;
    }
    match result {
        Ok(envelope) if envelope.success => {
            let mut guard = lock(data);
            set(&mut *guard, envelope.data);
        }
        Ok(envelope) => tracing::debug!(what, message = ?envelope.message, "Fetch reported failure"),
        Err(e) => tracing::warn!("Failed to fetch {}: {}", what, e),
    }
}

/// Everything the poller, the flash timer and in-flight requests touch
struct Shared {
    api: ApiClient,
    data: Mutex<CustomerData>,
    notice: Mutex<Option<Notice>>,
    notice_generation: AtomicU64,
    timings: SyncTimings,
    cancel: CancellationToken,
    requesting: AtomicBool,
}

impl Shared {
    async fn load_all(&self) {
        let api = &self.api;
        let data = &self.data;
        let cancel = &self.cancel;

        tokio::join!(
            async {
                let result = api.customer_profile().await;
                apply(cancel, data, "profile", result, |d, v| d.profile = v);
            },
            async {
                let result = api.current_subscription().await;
                apply(cancel, data, "current subscription", result, |d, v| d.current = v);
            },
            async {
                let result = api.subscription_history().await;
                apply(cancel, data, "subscription history", result, |d, v| {
                    d.history = v.unwrap_or_default()
                });
            },
            async {
                let result = api.list_packs().await;
                apply(cancel, data, "packs", result, |d, v| d.packs = v.unwrap_or_default());
            },
        );
    }

    async fn sync_subscriptions(&self) {
        let (api, data, cancel) = (&self.api, &self.data, &self.cancel);
        tokio::join!(
            async {
                let result = api.current_subscription().await;
                apply(cancel, data, "current subscription", result, |d, v| d.current = v);
            },
            async {
                let result = api.subscription_history().await;
                apply(cancel, data, "subscription history", result, |d, v| {
                    d.history = v.unwrap_or_default()
                });
            },
        );
    }

    async fn refresh(self: &Arc<Self>) {
        self.load_all().await;
        self.flash(Notice::success(REFRESHED));
    }

    fn set_notice(&self, notice: Option<Notice>) {
        self.notice_generation.fetch_add(1, Ordering::SeqCst);
        *lock(&self.notice) = notice;
    }

    /// Show `notice` and clear it after the flash duration, unless something
    /// else replaced it meanwhile
    fn flash(self: &Arc<Self>, notice: Notice) {
        let generation = self.notice_generation.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.notice) = Some(notice);

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = shared.cancel.cancelled() => {}
                _ = tokio::time::sleep(shared.timings.flash) => {
                    if shared.notice_generation.load(Ordering::SeqCst) == generation {
                        *lock(&shared.notice) = None;
                    }
                }
            }
        });
    }

    /// Send the request, then refetch history on success. Clears the
    /// in-flight flag when done.
    async fn request(&self, pack_id: String) {
        let result = self.api.request_subscription(&pack_id).await;
        self.requesting.store(false, Ordering::SeqCst);

        match result {
            Ok(envelope) if envelope.success => {
                tracing::info!(pack_id = %pack_id, "Subscription requested");
                self.set_notice(Some(Notice::success(REQUEST_SENT)));
                let history = self.api.subscription_history().await;
                apply(&self.cancel, &self.data, "subscription history", history, |d, v| {
                    d.history = v.unwrap_or_default()
                });
            }
            Ok(envelope) => {
                self.set_notice(Some(Notice::error(envelope.message_or(REQUEST_FAILED))));
            }
            Err(e) => {
                tracing::warn!("Subscription request failed: {}", e);
                self.set_notice(Some(Notice::error(UNEXPECTED_ERROR)));
            }
        }
    }
}

pub struct CustomerDashboard {
    shared: Arc<Shared>,
    pub pack_id: String,
    pub selected_pack: usize,
    pub manual_entry: bool,
}

impl CustomerDashboard {
    /// Create the dashboard without fetching anything
    pub fn new(api: ApiClient, timings: SyncTimings) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                data: Mutex::new(CustomerData::default()),
                notice: Mutex::new(None),
                notice_generation: AtomicU64::new(0),
                timings,
                cancel: CancellationToken::new(),
                requesting: AtomicBool::new(false),
            }),
            pack_id: String::new(),
            selected_pack: 0,
            manual_entry: false,
        }
    }

    /// Create, run the initial four-way load and start the poller
    pub async fn mount(api: ApiClient, timings: SyncTimings) -> Self {
        let dashboard = Self::new(api, timings);
        dashboard.load_all().await;
        dashboard.start_polling();
        dashboard
    }

    /// Like [`mount`](Self::mount), but the initial load runs in the
    /// background and the dashboard is returned straight away
    pub fn launch(api: ApiClient, timings: SyncTimings) -> Self {
        let dashboard = Self::new(api, timings);
        let shared = Arc::clone(&dashboard.shared);
        tokio::spawn(async move { shared.load_all().await });
        dashboard.start_polling();
        dashboard
    }

    pub fn data(&self) -> CustomerData {
        lock(&self.shared.data).clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        lock(&self.shared.notice).clone()
    }

    /// Whether a subscription request is in flight
    pub fn is_requesting(&self) -> bool {
        self.shared.requesting.load(Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn pack_options(&self) -> Vec<PackOption> {
        let data = lock(&self.shared.data);
        available_packs(&data.packs, &data.history)
    }

    /// Fetch profile, current subscription, history and packs concurrently.
    /// Each result lands on its own; one failing leaves the others alone.
    pub async fn load_all(&self) {
        self.shared.load_all().await;
    }

    /// Refetch current subscription and history every poll interval until cancelled
    fn start_polling(&self) {
        let shared = Arc::clone(&self.shared);
        let period = shared.timings.poll_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shared.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!("Polling subscription state");
                        shared.sync_subscriptions().await;
                    }
                }
            }
            tracing::debug!("Subscription poller stopped");
        });
    }

    /// Manual refresh: all four fetches, then a short-lived confirmation
    pub async fn refresh(&self) {
        self.shared.refresh().await;
    }

    /// The refresh as a detached task, for callers that must not wait on it
    pub fn refresh_task(&self) -> impl Future<Output = ()> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        async move { shared.refresh().await }
    }

    pub fn toggle_manual_entry(&mut self) {
        self.manual_entry = !self.manual_entry;
    }

    /// Move the picker selection and copy its id into the form
    pub fn select_pack(&mut self, index: usize) {
        let options = self.pack_options();
        if let Some(option) = options.get(index) {
            self.selected_pack = index;
            self.pack_id = option.id.to_string();
        }
    }

    /// Ask the server for a subscription to `pack_id`. On success the history
    /// is refetched so the new request shows up.
    pub async fn request_subscription(&self) {
        if let Some(task) = self.request_task() {
            task.await;
        }
    }

    /// Start a subscription request and return it as a detached task.
    ///
    /// Returns `None` without side effects when the pack id is blank or a
    /// request is already in flight.
    pub fn request_task(&self) -> Option<impl Future<Output = ()> + Send + 'static> {
        let pack_id = self.pack_id.trim().to_string();
        if pack_id.is_empty() || self.shared.requesting.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.shared.set_notice(None);

        let shared = Arc::clone(&self.shared);
        Some(async move { shared.request(pack_id).await })
    }

    /// Stop the poller and any pending timers
    pub fn teardown(&self) {
        if !self.shared.cancel.is_cancelled() {
            tracing::debug!("Tearing down customer dashboard");
            self.shared.cancel.cancel();
        }
    }

    /// Log out after confirmation; tears the dashboard down
    pub fn logout(&self, confirmed: bool, session: &mut SessionContext) -> Option<Route> {
        if !session.logout(confirmed) {
            return None;
        }
        self.teardown();
        Some(Route::Login)
    }
}

impl Drop for CustomerDashboard {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
