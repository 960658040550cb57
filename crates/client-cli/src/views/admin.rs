//! Admin dashboard: metrics, packs, customers and subscriptions.
//!
//! Lists are refetched when their section is entered and after a mutation
//! succeeds. Subscription filtering happens locally over the fetched page.

use std::sync::{Arc, Mutex, MutexGuard};

use shared::{
    Customer, CustomerUpdate, DashboardMetrics, Id, Pack, Subscription, SubscriptionStatus,
};

use crate::api::{Ack, ApiClient, PageQuery};
use crate::error::ApiResult;
use crate::router::Route;
use crate::session::SessionContext;
use crate::validation::{parse_pack, validate_assignment, validate_customer};
use crate::views::{lock, Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Dashboard,
    Packs,
    Subscriptions,
    Customers,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Dashboard,
        Section::Packs,
        Section::Subscriptions,
        Section::Customers,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Packs => "Packs",
            Section::Subscriptions => "Subscriptions",
            Section::Customers => "Customers",
        }
    }
}

/// Status filter over the subscription list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionFilter {
    #[default]
    All,
    Status(SubscriptionStatus),
}

impl SubscriptionFilter {
    pub const OPTIONS: [SubscriptionFilter; 6] = [
        SubscriptionFilter::All,
        SubscriptionFilter::Status(SubscriptionStatus::Active),
        SubscriptionFilter::Status(SubscriptionStatus::Requested),
        SubscriptionFilter::Status(SubscriptionStatus::Approved),
        SubscriptionFilter::Status(SubscriptionStatus::Inactive),
        SubscriptionFilter::Status(SubscriptionStatus::Expired),
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubscriptionFilter::All => "All Subscriptions",
            SubscriptionFilter::Status(status) => status.label(),
        }
    }

    pub fn matches(self, subscription: &Subscription) -> bool {
        match self {
            SubscriptionFilter::All => true,
            SubscriptionFilter::Status(status) => subscription.status == status,
        }
    }
}

/// Rows matching `filter`, in their original order
pub fn filter_subscriptions(
    subscriptions: &[Subscription],
    filter: SubscriptionFilter,
) -> Vec<&Subscription> {
    subscriptions.iter().filter(|s| filter.matches(s)).collect()
}

/// Transition offered for a subscription row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusAction {
    pub label: &'static str,
    pub target: SubscriptionStatus,
}

pub fn status_action(status: SubscriptionStatus) -> Option<StatusAction> {
    let (label, target) = match status {
        SubscriptionStatus::Active => ("Deactivate", SubscriptionStatus::Inactive),
        SubscriptionStatus::Requested => ("Approve", SubscriptionStatus::Approved),
        SubscriptionStatus::Approved => ("Activate", SubscriptionStatus::Active),
        _ => return None,
    };
    Some(StatusAction { label, target })
}

/// Clickable summary cards on the dashboard section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCard {
    Customers,
    Subscriptions,
    ActiveSubscriptions,
    PendingSubscriptions,
    Revenue,
}

impl MetricCard {
    pub const ALL: [MetricCard; 5] = [
        MetricCard::Customers,
        MetricCard::Subscriptions,
        MetricCard::ActiveSubscriptions,
        MetricCard::PendingSubscriptions,
        MetricCard::Revenue,
    ];

    pub fn title(self) -> &'static str {
        match self {
            MetricCard::Customers => "Total Customers",
            MetricCard::Subscriptions => "Total Subscriptions",
            MetricCard::ActiveSubscriptions => "Active Subscriptions",
            MetricCard::PendingSubscriptions => "Pending Requests",
            MetricCard::Revenue => "Total Revenue",
        }
    }

    pub fn value(self, metrics: &DashboardMetrics) -> String {
        match self {
            MetricCard::Customers => metrics.total_customers.to_string(),
            MetricCard::Subscriptions => metrics.total_subscriptions.to_string(),
            MetricCard::ActiveSubscriptions => metrics.active_subscriptions.to_string(),
            MetricCard::PendingSubscriptions => metrics.pending_subscriptions.to_string(),
            MetricCard::Revenue => format!("${:.2}", metrics.total_revenue),
        }
    }

    fn target(self) -> (Section, Option<SubscriptionFilter>, &'static str) {
        match self {
            MetricCard::Customers => (
                Section::Customers,
                None,
                "Customer management: View, edit, and manage all customer accounts.",
            ),
            MetricCard::Subscriptions => (
                Section::Subscriptions,
                Some(SubscriptionFilter::All),
                "Viewing all subscriptions across all statuses.",
            ),
            MetricCard::ActiveSubscriptions => (
                Section::Subscriptions,
                Some(SubscriptionFilter::Status(SubscriptionStatus::Active)),
                "Showing only active subscriptions. These customers have full access to services.",
            ),
            MetricCard::PendingSubscriptions => (
                Section::Subscriptions,
                Some(SubscriptionFilter::Status(SubscriptionStatus::Requested)),
                "Showing pending subscription requests. These require your approval to activate.",
            ),
            MetricCard::Revenue => (
                Section::Subscriptions,
                Some(SubscriptionFilter::All),
                "Revenue breakdown: Active and completed subscriptions contribute to total revenue.",
            ),
        }
    }
}

/// Text fields of the pack form, parsed on submit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackForm {
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: String,
    pub validity_months: String,
}

impl PackForm {
    pub fn from_pack(pack: &Pack) -> Self {
        Self {
            name: pack.name.clone(),
            description: pack.description.clone().unwrap_or_default(),
            sku: pack.sku.clone(),
            price: pack.price.to_string(),
            validity_months: pack.validity_months.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignForm {
    pub customer_id: String,
    pub pack_id: String,
}

/// Success text, failure fallback and transport text for one mutation
struct Outcome {
    what: &'static str,
    success: String,
    failed: &'static str,
    error: &'static str,
}

/// Everything the admin screen shows and edits
#[derive(Debug)]
pub struct AdminState {
    pub section: Section,
    pub metrics: DashboardMetrics,
    pub packs: Vec<Pack>,
    pub customers: Vec<Customer>,
    pub subscriptions: Vec<Subscription>,
    pub filter: SubscriptionFilter,
    pub notice: Option<Notice>,
    pub loading: bool,
    pub pack_form: PackForm,
    pub editing_pack: Option<Id>,
    pub customer_form: CustomerForm,
    pub editing_customer: Option<Id>,
    pub assign_form: AssignForm,
    pub customer_page: u32,
    pub subscription_page: u32,
}

impl Default for AdminState {
    fn default() -> Self {
        Self {
            section: Section::Dashboard,
            metrics: DashboardMetrics::default(),
            packs: Vec::new(),
            customers: Vec::new(),
            subscriptions: Vec::new(),
            filter: SubscriptionFilter::All,
            notice: None,
            loading: false,
            pack_form: PackForm::default(),
            editing_pack: None,
            customer_form: CustomerForm::default(),
            editing_customer: None,
            assign_form: AssignForm::default(),
            customer_page: 1,
            subscription_page: 1,
        }
    }
}

impl AdminState {
    fn error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::error(text));
    }

    /// Change the subscription filter; the list is not refetched
    pub fn set_filter(&mut self, filter: SubscriptionFilter) {
        self.filter = filter;
        self.notice = Some(Notice::info(format!(
            "Filtering by {}",
            filter.label().to_lowercase()
        )));
    }

    pub fn visible_subscriptions(&self) -> Vec<&Subscription> {
        filter_subscriptions(&self.subscriptions, self.filter)
    }

    /// Row count for every filter option over the fetched list
    pub fn filter_counts(&self) -> Vec<(SubscriptionFilter, usize)> {
        SubscriptionFilter::OPTIONS
            .iter()
            .map(|&f| (f, self.subscriptions.iter().filter(|s| f.matches(s)).count()))
            .collect()
    }

    /// Fill the pack form from the pack at `index` and switch to edit mode
    pub fn start_edit_pack(&mut self, index: usize) -> bool {
        match self.packs.get(index) {
            Some(pack) => {
                self.pack_form = PackForm::from_pack(pack);
                self.editing_pack = Some(pack.id.clone());
                true
            }
            None => false,
        }
    }

    /// Leave edit mode for packs and customers and clear both forms
    pub fn cancel_edit(&mut self) {
        self.editing_pack = None;
        self.editing_customer = None;
        self.pack_form = PackForm::default();
        self.customer_form = CustomerForm::default();
    }

    pub fn edit_customer(&mut self, index: usize) -> bool {
        match self.customers.get(index) {
            Some(customer) => {
                self.customer_form = CustomerForm {
                    name: customer.name.clone(),
                    email: customer.email.clone(),
                    phone: customer.phone.clone().unwrap_or_default(),
                };
                self.editing_customer = Some(customer.id.clone());
                true
            }
            None => false,
        }
    }

    fn has_next_page(&self, page_size: u32) -> bool {
        let len = match self.section {
            Section::Customers => self.customers.len(),
            Section::Subscriptions => self.subscriptions.len(),
            _ => return false,
        };
        len as u32 >= page_size
    }
}

/// Admin view controller.
///
/// Cheap to clone: clones share one [`AdminState`], so an operation can run
/// on a background task while the screen keeps drawing from the same state.
/// The lock is never held across a request.
#[derive(Clone)]
pub struct AdminDashboard {
    api: ApiClient,
    page_size: u32,
    state: Arc<Mutex<AdminState>>,
}

impl AdminDashboard {
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            state: Arc::new(Mutex::new(AdminState::default())),
        }
    }

    /// Create the dashboard and load the metrics
    pub async fn mount(api: ApiClient, page_size: u32) -> Self {
        let dashboard = Self::new(api, page_size);
        dashboard.load_metrics().await;
        dashboard
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn state(&self) -> MutexGuard<'_, AdminState> {
        lock(&self.state)
    }

    fn update<R>(&self, f: impl FnOnce(&mut AdminState) -> R) -> R {
        let mut state = self.state();
        f(&mut *state)
    }

    pub async fn load_metrics(&self) {
        let result = self.api.dashboard_metrics().await;
        let mut state = self.state();
        match result {
            Ok(envelope) if envelope.success => {
                state.metrics = envelope.data.unwrap_or_default();
            }
            Ok(envelope) => {
                tracing::debug!(message = ?envelope.message, "Metrics request reported failure");
                state.metrics = DashboardMetrics::default();
                state.error("Unable to load dashboard metrics");
            }
            Err(e) => {
                tracing::warn!("Failed to load dashboard metrics: {}", e);
                state.error("Error loading dashboard data");
            }
        }
    }

    pub async fn load_packs(&self) {
        self.state().loading = true;
        let result = self.api.list_packs().await;
        let mut state = self.state();
        state.loading = false;

        match result {
            Ok(envelope) if envelope.success => state.packs = envelope.data.unwrap_or_default(),
            Ok(envelope) => {
                tracing::debug!(message = ?envelope.message, "Pack list reported failure");
            }
            Err(e) => {
                tracing::warn!("Failed to load packs: {}", e);
                state.error("Error loading packs");
            }
        }
    }

    pub async fn load_customers(&self) {
        let page = self.update(|s| {
            s.loading = true;
            PageQuery {
                page: s.customer_page,
                limit: self.page_size,
            }
        });
        let result = self.api.customers(page).await;
        let mut state = self.state();
        state.loading = false;

        match result {
            Ok(envelope) if envelope.success => state.customers = envelope.data.unwrap_or_default(),
            Ok(envelope) => state.error(envelope.message_or("Error loading customers")),
            Err(e) => {
                tracing::warn!("Failed to load customers: {}", e);
                state.error("Error loading customers");
            }
        }
    }

    pub async fn load_subscriptions(&self) {
        let page = self.update(|s| {
            s.loading = true;
            PageQuery {
                page: s.subscription_page,
                limit: self.page_size,
            }
        });
        let result = self.api.subscriptions(page, None).await;
        let mut state = self.state();
        state.loading = false;

        match result {
            Ok(envelope) if envelope.success => {
                state.subscriptions = envelope.data.unwrap_or_default()
            }
            Ok(envelope) => state.error(envelope.message_or("Error loading subscriptions")),
            Err(e) => {
                tracing::warn!("Failed to load subscriptions: {}", e);
                state.error("Error loading subscriptions");
            }
        }
    }

    async fn load_section(&self, section: Section) {
        match section {
            Section::Dashboard => {}
            Section::Packs => self.load_packs().await,
            Section::Subscriptions => self.load_subscriptions().await,
            Section::Customers => self.load_customers().await,
        }
    }

    /// Enter `section` and reload its list. Entering the current section does
    /// nothing. The notice is cleared unless the target is subscriptions.
    pub async fn switch_section(&self, section: Section) {
        let entered = self.update(|s| {
            if section == s.section {
                return false;
            }
            s.section = section;
            if section != Section::Subscriptions {
                s.notice = None;
            }
            true
        });
        if entered {
            tracing::debug!(section = section.title(), "Switching admin section");
            self.load_section(section).await;
        }
    }

    /// Jump from a metric card to its section, filter and explanation.
    /// A load error from entering the section is kept over the explanation.
    pub async fn open_card(&self, card: MetricCard) {
        let (section, filter, message) = card.target();
        if let Some(filter) = filter {
            self.state().filter = filter;
        }
        self.switch_section(section).await;
        self.update(|s| {
            if !s.notice.as_ref().is_some_and(Notice::is_error) {
                s.notice = Some(Notice::info(message));
            }
        });
    }

    /// Store the outcome of a mutation as the notice. Returns whether it succeeded.
    fn settle(&self, result: ApiResult<Ack>, outcome: Outcome) -> bool {
        let mut state = self.state();
        match result {
            Ok(envelope) if envelope.success => {
                tracing::info!("{} succeeded", outcome.what);
                state.notice = Some(Notice::success(outcome.success));
                true
            }
            Ok(envelope) => {
                state.error(envelope.message_or(outcome.failed));
                false
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", outcome.what, e);
                state.error(outcome.error);
                false
            }
        }
    }

    /// Claim the loading flag for a mutation. Fails when one is in flight.
    fn claim(&self) -> bool {
        self.update(|s| !std::mem::replace(&mut s.loading, true))
    }

    fn release(&self) {
        self.state().loading = false;
    }

    // ------------------------------------------------------------------
    // Packs
    // ------------------------------------------------------------------

    /// Create a pack, or update the one being edited
    pub async fn submit_pack_form(&self) {
        let parsed = self.update(|s| {
            if s.loading {
                return None;
            }
            let form = &s.pack_form;
            let parsed = parse_pack(
                &form.name,
                &form.sku,
                &form.price,
                &form.validity_months,
                &form.description,
            );
            match parsed {
                Ok(input) => {
                    s.loading = true;
                    Some((input, s.editing_pack.clone()))
                }
                Err(e) => {
                    s.error(e.to_string());
                    None
                }
            }
        });
        let Some((input, editing)) = parsed else {
            return;
        };

        let ok = match editing {
            Some(id) => {
                let result = self.api.update_pack(id.as_str(), &input).await;
                self.settle(
                    result,
                    Outcome {
                        what: "Pack update",
                        success: "Pack updated successfully!".to_string(),
                        failed: "Failed to update pack",
                        error: "Error updating pack",
                    },
                )
            }
            None => {
                let result = self.api.create_pack(&input).await;
                self.settle(
                    result,
                    Outcome {
                        what: "Pack creation",
                        success: "Pack created successfully!".to_string(),
                        failed: "Failed to create pack",
                        error: "Error creating pack",
                    },
                )
            }
        };
        self.release();

        if ok {
            self.update(|s| {
                s.editing_pack = None;
                s.pack_form = PackForm::default();
            });
            self.load_packs().await;
        }
    }

    /// Delete a pack after confirmation. Editing the deleted pack ends with it.
    pub async fn delete_pack(&self, pack_id: &Id, confirmed: bool) {
        if !confirmed {
            return;
        }
        let result = self.api.delete_pack(pack_id.as_str()).await;
        let ok = self.settle(
            result,
            Outcome {
                what: "Pack deletion",
                success: "Pack deleted successfully!".to_string(),
                failed: "Failed to delete pack",
                error: "Error deleting pack",
            },
        );
        if ok {
            self.update(|s| {
                if s.editing_pack.as_ref() == Some(pack_id) {
                    s.editing_pack = None;
                    s.pack_form = PackForm::default();
                }
            });
            self.load_packs().await;
        }
    }

    // ------------------------------------------------------------------
    // Customers
    // ------------------------------------------------------------------

    pub async fn save_customer(&self) {
        let prepared = self.update(|s| {
            let id = s.editing_customer.clone()?;
            if s.loading {
                return None;
            }
            if let Err(e) = validate_customer(&s.customer_form.name, &s.customer_form.email) {
                s.error(e.to_string());
                return None;
            }
            s.loading = true;
            let update = CustomerUpdate {
                name: s.customer_form.name.trim().to_string(),
                email: s.customer_form.email.trim().to_string(),
                phone: s.customer_form.phone.trim().to_string(),
            };
            Some((id, update))
        });
        let Some((id, update)) = prepared else {
            return;
        };

        let result = self.api.update_customer(id.as_str(), &update).await;
        self.release();

        let ok = self.settle(
            result,
            Outcome {
                what: "Customer update",
                success: "Customer updated successfully!".to_string(),
                failed: "Failed to update customer",
                error: "Error updating customer",
            },
        );
        if ok {
            self.update(|s| {
                s.editing_customer = None;
                s.customer_form = CustomerForm::default();
            });
            self.load_customers().await;
            self.load_metrics().await;
        }
    }

    pub async fn delete_customer(&self, customer_id: &Id, confirmed: bool) {
        if !confirmed {
            return;
        }
        let result = self.api.delete_customer(customer_id.as_str()).await;
        let ok = self.settle(
            result,
            Outcome {
                what: "Customer deletion",
                success: "Customer deleted successfully!".to_string(),
                failed: "Failed to delete customer",
                error: "Error deleting customer",
            },
        );
        if ok {
            self.load_customers().await;
            self.load_metrics().await;
        }
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub async fn change_subscription_status(&self, subscription_id: &Id, status: SubscriptionStatus) {
        if !self.claim() {
            return;
        }
        let result = self
            .api
            .update_subscription_status(subscription_id.as_str(), status)
            .await;
        self.release();

        let ok = self.settle(
            result,
            Outcome {
                what: "Status change",
                success: format!("Subscription {status} successfully!"),
                failed: "Failed to update subscription status",
                error: "Error updating subscription status",
            },
        );
        if ok {
            self.load_subscriptions().await;
            self.load_metrics().await;
        }
    }

    pub async fn assign_subscription(&self) {
        let prepared = self.update(|s| {
            if s.loading {
                return None;
            }
            let customer_id = s.assign_form.customer_id.trim().to_string();
            let pack_id = s.assign_form.pack_id.trim().to_string();
            if let Err(e) = validate_assignment(&customer_id, &pack_id) {
                s.error(e.to_string());
                return None;
            }
            s.loading = true;
            Some((customer_id, pack_id))
        });
        let Some((customer_id, pack_id)) = prepared else {
            return;
        };

        let result = self.api.assign_subscription(&customer_id, &pack_id).await;
        self.release();

        let ok = self.settle(
            result,
            Outcome {
                what: "Subscription assignment",
                success: "Subscription assigned successfully!".to_string(),
                failed: "Failed to assign subscription",
                error: "Error assigning subscription",
            },
        );
        if ok {
            self.state().assign_form = AssignForm::default();
            self.load_subscriptions().await;
            self.load_metrics().await;
        }
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    /// Whether the current section's list filled its page
    pub fn has_next_page(&self) -> bool {
        self.state().has_next_page(self.page_size)
    }

    pub async fn next_page(&self) {
        let section = self.update(|s| {
            if !s.has_next_page(self.page_size) {
                return None;
            }
            match s.section {
                Section::Customers => s.customer_page += 1,
                Section::Subscriptions => s.subscription_page += 1,
                _ => return None,
            }
            Some(s.section)
        });
        if let Some(section) = section {
            self.load_section(section).await;
        }
    }

    pub async fn prev_page(&self) {
        let section = self.update(|s| {
            match s.section {
                Section::Customers if s.customer_page > 1 => s.customer_page -= 1,
                Section::Subscriptions if s.subscription_page > 1 => s.subscription_page -= 1,
                _ => return None,
            }
            Some(s.section)
        });
        if let Some(section) = section {
            self.load_section(section).await;
        }
    }

    pub fn logout(&self, confirmed: bool, session: &mut SessionContext) -> Option<Route> {
        session.logout(confirmed).then_some(Route::Login)
    }
}
