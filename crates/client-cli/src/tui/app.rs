//! TUI application state and key handling

use std::future::Future;
use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use shared::{Envelope, Id, LoginData, Role, SubscriptionStatus};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::api::{Ack, ApiClient};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::ApiResult;
use crate::router::{self, Route};
use crate::session::SessionContext;
use crate::views::admin::{status_action, AdminState, MetricCard, Section, SubscriptionFilter};
use crate::views::customer::SyncTimings;
use crate::views::login::LoginAttempt;
use crate::views::{AdminDashboard, CustomerDashboard, LoginView, RegisterView};

use super::render;

pub(super) const LOGIN_FIELDS: [&str; 4] = ["Email", "Password", "Role", "Remember me"];
pub(super) const REGISTER_FIELDS: [&str; 4] = ["Name", "Email", "Phone", "Password"];
pub(super) const PACK_FIELDS: [&str; 5] = ["Name", "SKU", "Price", "Validity (months)", "Description"];
pub(super) const CUSTOMER_FIELDS: [&str; 3] = ["Name", "Email", "Phone"];
pub(super) const ASSIGN_FIELDS: [&str; 2] = ["Customer ID", "Pack ID"];

/// How long the event reader waits before checking whether the app is gone
const EVENT_POLL: Duration = Duration::from_millis(100);
/// Redraw interval while nothing happens, so background updates show up
const REDRAW: Duration = Duration::from_millis(250);

/// Something that needs the network. Runs on a background task while the
/// loop keeps drawing and reading keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Ask(Confirm),
    Navigate(Route),
    SubmitLogin,
    SubmitRegister,
    Refresh,
    RequestSubscription,
    Logout,
    SwitchSection(Section),
    OpenCard(MetricCard),
    SubmitPackForm,
    SaveCustomer,
    AssignSubscription,
    ChangeStatus(Id, SubscriptionStatus),
    DeletePack(Id),
    DeleteCustomer(Id),
    NextPage,
    PrevPage,
}

/// Pending yes/no question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    Logout,
    DeletePack(Id),
    DeleteCustomer(Id),
}

impl Confirm {
    pub fn question(&self) -> &'static str {
        match self {
            Confirm::Logout => "Are you sure you want to logout?",
            Confirm::DeletePack(_) => "Are you sure you want to delete this pack?",
            Confirm::DeleteCustomer(_) => "Are you sure you want to delete this customer?",
        }
    }

    fn into_action(self) -> Action {
        match self {
            Confirm::Logout => Action::Logout,
            Confirm::DeletePack(id) => Action::DeletePack(id),
            Confirm::DeleteCustomer(id) => Action::DeleteCustomer(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminForm {
    Pack,
    Customer,
    Assign,
}

impl AdminForm {
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            AdminForm::Pack => &PACK_FIELDS,
            AdminForm::Customer => &CUSTOMER_FIELDS,
            AdminForm::Assign => &ASSIGN_FIELDS,
        }
    }
}

pub struct LoginScreen {
    pub view: LoginView,
    pub field: usize,
}

pub struct RegisterScreen {
    pub view: RegisterView,
    pub field: usize,
}

pub struct CustomerScreen {
    pub view: CustomerDashboard,
}

pub struct AdminScreen {
    pub view: AdminDashboard,
    /// Row in the current list, or card on the dashboard section
    pub selected: usize,
    pub form: Option<AdminForm>,
    pub field: usize,
}

pub enum Screen {
    Login(LoginScreen),
    Register(RegisterScreen),
    Customer(CustomerScreen),
    Admin(AdminScreen),
}

/// Result of a background action, applied on the UI task
enum Completion {
    Login(LoginAttempt, ApiResult<Envelope<LoginData>>),
    Register(ApiResult<Ack>),
    /// An admin operation started in `section` finished
    Admin { section: Section, submitted: bool },
    Done,
}

/// Main TUI application state
pub struct App {
    pub(super) api: ApiClient,
    pub(super) store: CredentialStore,
    pub(super) session: SessionContext,
    pub(super) route: Route,
    pub(super) screen: Screen,
    pub(super) confirm: Option<Confirm>,
    timings: SyncTimings,
    page_size: u32,
    should_quit: bool,
    in_flight: usize,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
}

fn cycle(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

/// Apply a character or backspace to a text field
fn edit(buf: &mut String, code: KeyCode) -> bool {
    match code {
        KeyCode::Char(c) => {
            buf.push(c);
            true
        }
        KeyCode::Backspace => {
            buf.pop();
            true
        }
        _ => false,
    }
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

/// Read terminal events on a blocking thread until the receiver is dropped
/// or reading fails. The error, if any, is the last item sent.
fn spawn_event_reader() -> mpsc::Receiver<io::Result<Event>> {
    let (tx, rx) = mpsc::channel(64);
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            let event = match event::poll(EVENT_POLL) {
                Ok(true) => event::read(),
                Ok(false) => continue,
                Err(e) => Err(e),
            };
            let failed = event.is_err();
            if tx.blocking_send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

async fn run_admin(view: &AdminDashboard, action: Action) {
    match action {
        Action::SwitchSection(target) => view.switch_section(target).await,
        Action::OpenCard(card) => view.open_card(card).await,
        Action::SubmitPackForm => view.submit_pack_form().await,
        Action::SaveCustomer => view.save_customer().await,
        Action::AssignSubscription => view.assign_subscription().await,
        Action::ChangeStatus(id, status) => view.change_subscription_status(&id, status).await,
        Action::DeletePack(id) => view.delete_pack(&id, true).await,
        Action::DeleteCustomer(id) => view.delete_customer(&id, true).await,
        Action::NextPage => view.next_page().await,
        Action::PrevPage => view.prev_page().await,
        _ => {}
    }
}

impl App {
    pub fn new(config: &Config, api: ApiClient, store: CredentialStore) -> Self {
        let login = LoginView::mount(store.clone());
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            api,
            store,
            session: SessionContext::new(),
            route: Route::Login,
            screen: Screen::Login(LoginScreen { view: login, field: 0 }),
            confirm: None,
            timings: SyncTimings::from(&config.dashboard),
            page_size: config.admin.page_size,
            should_quit: false,
            in_flight: 0,
            done_tx,
            done_rx,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn confirm(&self) -> Option<&Confirm> {
        self.confirm.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether any background action is still running
    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Run the draw/input loop until the user quits
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        let mut events = spawn_event_reader();
        let mut redraw = tokio::time::interval(REDRAW);
        redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.should_quit {
            terminal.draw(|f| render::draw(f, self))?;

            tokio::select! {
                event = events.recv() => match event {
                    Some(Ok(Event::Key(key))) => self.on_key(key),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
                Some(done) = self.done_rx.recv() => self.complete(done),
                _ = redraw.tick() => {}
            }
        }
        Ok(())
    }

    /// Handle one key event, starting its action in the background
    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(action) = self.handle_key(key) {
            self.dispatch(action);
        }
    }

    /// Open the screen for a path such as `/register` or `#/admin`
    pub fn open(&mut self, path: &str) {
        self.navigate(Route::from_path(path));
    }

    /// Show the screen for `requested`, going through the route guard.
    /// Dashboards come up empty and load in the background.
    pub fn navigate(&mut self, requested: Route) {
        let route = router::resolve(requested, &mut self.session);
        let token = self.session.token().map(str::to_string);
        tracing::debug!(requested = %requested, resolved = %route, "Navigating");

        self.confirm = None;
        self.screen = match (route, token) {
            (Route::Register, _) => Screen::Register(RegisterScreen {
                view: RegisterView::new(),
                field: 0,
            }),
            (Route::Admin, Some(token)) => {
                let view = AdminDashboard::new(self.api.with_token(token), self.page_size);
                let loader = view.clone();
                self.spawn(async move {
                    loader.load_metrics().await;
                    Completion::Done
                });
                Screen::Admin(AdminScreen {
                    view,
                    selected: 0,
                    form: None,
                    field: 0,
                })
            }
            (Route::Customer, Some(token)) => {
                let view = CustomerDashboard::launch(self.api.with_token(token), self.timings);
                Screen::Customer(CustomerScreen { view })
            }
            _ => Screen::Login(LoginScreen {
                view: LoginView::mount(self.store.clone()),
                field: 0,
            }),
        };
        self.route = match self.screen {
            Screen::Login(_) => Route::Login,
            _ => route,
        };
    }

    fn spawn(&mut self, work: impl Future<Output = Completion> + Send + 'static) {
        self.in_flight += 1;
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let _ = done.send(work.await);
        });
    }

    /// Map a key press to state changes. Returns the network action to run, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if is_ctrl(&key, 'c') {
            self.should_quit = true;
            return None;
        }

        if let Some(confirm) = self.confirm.take() {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(confirm.into_action()),
                _ => None,
            };
        }

        let action = match &mut self.screen {
            Screen::Login(screen) => login_key(screen, key),
            Screen::Register(screen) => register_key(screen, key),
            Screen::Customer(screen) => customer_key(screen, key),
            Screen::Admin(screen) => admin_key(screen, key),
        };

        match action {
            Some(Action::Quit) => {
                self.should_quit = true;
                None
            }
            Some(Action::Ask(confirm)) => {
                self.confirm = Some(confirm);
                None
            }
            other => other,
        }
    }

    /// Start `action`. Network work is spawned; its result comes back
    /// through [`complete`](Self::complete).
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit | Action::Ask(_) => {}
            Action::Navigate(route) => self.navigate(route),
            Action::SubmitLogin => {
                if let Screen::Login(screen) = &mut self.screen {
                    if let Some(attempt) = screen.view.begin_submit(&mut self.session) {
                        let api = self.api.clone();
                        self.spawn(async move {
                            let result = attempt.send(&api).await;
                            Completion::Login(attempt, result)
                        });
                    }
                }
            }
            Action::SubmitRegister => {
                if let Screen::Register(screen) = &mut self.screen {
                    if let Some(request) = screen.view.begin_submit() {
                        let api = self.api.clone();
                        self.spawn(async move {
                            Completion::Register(api.register_customer(&request).await)
                        });
                    }
                }
            }
            Action::Refresh => {
                if let Screen::Customer(screen) = &self.screen {
                    let task = screen.view.refresh_task();
                    self.spawn(async move {
                        task.await;
                        Completion::Done
                    });
                }
            }
            Action::RequestSubscription => {
                if let Screen::Customer(screen) = &self.screen {
                    if let Some(task) = screen.view.request_task() {
                        self.spawn(async move {
                            task.await;
                            Completion::Done
                        });
                    }
                }
            }
            Action::Logout => {
                let next = match &self.screen {
                    Screen::Admin(screen) => screen.view.logout(true, &mut self.session),
                    Screen::Customer(screen) => screen.view.logout(true, &mut self.session),
                    _ => None,
                };
                if let Some(route) = next {
                    self.navigate(route);
                }
            }
            other => {
                if let Screen::Admin(screen) = &self.screen {
                    let view = screen.view.clone();
                    let section = view.state().section;
                    let submitted = matches!(
                        other,
                        Action::SubmitPackForm | Action::SaveCustomer | Action::AssignSubscription
                    );
                    self.spawn(async move {
                        run_admin(&view, other).await;
                        Completion::Admin { section, submitted }
                    });
                }
            }
        }
    }

    fn complete(&mut self, done: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let next = match done {
            Completion::Login(attempt, result) => match &mut self.screen {
                Screen::Login(screen) => screen.view.finish_submit(attempt, result, &mut self.session),
                _ => {
                    self.session.fail_login();
                    None
                }
            },
            Completion::Register(result) => match &mut self.screen {
                Screen::Register(screen) => screen.view.finish_submit(result),
                _ => None,
            },
            Completion::Admin { section, submitted } => {
                if let Screen::Admin(screen) = &mut self.screen {
                    screen.settle(section, submitted);
                }
                None
            }
            Completion::Done => None,
        };

        if let Some(route) = next {
            self.navigate(route);
        }
    }
}

fn login_key(screen: &mut LoginScreen, key: KeyEvent) -> Option<Action> {
    // The pending login settles on this screen, so it stays until then
    if is_ctrl(&key, 'r') {
        return (!screen.view.loading).then_some(Action::Navigate(Route::Register));
    }
    let view = &mut screen.view;
    match key.code {
        KeyCode::Esc => return Some(Action::Quit),
        KeyCode::Enter => return Some(Action::SubmitLogin),
        KeyCode::F(2) => view.toggle_password_visible(),
        KeyCode::Tab | KeyCode::Down => screen.field = cycle(screen.field, LOGIN_FIELDS.len(), true),
        KeyCode::BackTab | KeyCode::Up => screen.field = cycle(screen.field, LOGIN_FIELDS.len(), false),
        code => match screen.field {
            0 => {
                let mut email = view.email.clone();
                if edit(&mut email, code) {
                    view.set_email(email);
                }
            }
            1 => {
                let mut password = view.password.clone();
                if edit(&mut password, code) {
                    view.set_password(password);
                }
            }
            2 => {
                if matches!(code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                    view.set_role(view.role.toggled());
                }
            }
            _ => {
                if code == KeyCode::Char(' ') {
                    view.set_remember(!view.remember);
                }
            }
        },
    }
    None
}

fn register_key(screen: &mut RegisterScreen, key: KeyEvent) -> Option<Action> {
    let view = &mut screen.view;
    match key.code {
        KeyCode::Esc => return Some(Action::Navigate(Route::Login)),
        KeyCode::Enter => return Some(Action::SubmitRegister),
        KeyCode::F(2) => view.password_visible = !view.password_visible,
        KeyCode::Tab | KeyCode::Down => screen.field = cycle(screen.field, REGISTER_FIELDS.len(), true),
        KeyCode::BackTab | KeyCode::Up => {
            screen.field = cycle(screen.field, REGISTER_FIELDS.len(), false)
        }
        code => {
            let buf = match screen.field {
                0 => &mut view.name,
                1 => &mut view.email,
                2 => &mut view.phone,
                _ => &mut view.password,
            };
            edit(buf, code);
        }
    }
    None
}

fn customer_key(screen: &mut CustomerScreen, key: KeyEvent) -> Option<Action> {
    if is_ctrl(&key, 'l') {
        return Some(Action::Ask(Confirm::Logout));
    }
    if is_ctrl(&key, 'a') {
        return Some(Action::Navigate(Route::Admin));
    }
    let view = &mut screen.view;
    match key.code {
        KeyCode::F(5) => return Some(Action::Refresh),
        KeyCode::Enter => return Some(Action::RequestSubscription),
        KeyCode::Tab => view.toggle_manual_entry(),
        KeyCode::Up if !view.manual_entry => {
            let index = view.selected_pack.saturating_sub(1);
            view.select_pack(index);
        }
        KeyCode::Down if !view.manual_entry => {
            let index = if view.pack_id.is_empty() { 0 } else { view.selected_pack + 1 };
            view.select_pack(index);
        }
        code if view.manual_entry => {
            edit(&mut view.pack_id, code);
        }
        _ => {}
    }
    None
}

fn admin_key(screen: &mut AdminScreen, key: KeyEvent) -> Option<Action> {
    if is_ctrl(&key, 'l') {
        return Some(Action::Ask(Confirm::Logout));
    }
    if is_ctrl(&key, 'u') {
        return Some(Action::Navigate(Route::Customer));
    }
    if let Some(form) = screen.form {
        return admin_form_key(screen, form, key);
    }

    let mut state = screen.view.state();
    match key.code {
        KeyCode::Tab => {
            let index = Section::ALL.iter().position(|s| *s == state.section).unwrap_or(0);
            return Some(Action::SwitchSection(Section::ALL[cycle(index, Section::ALL.len(), true)]));
        }
        KeyCode::F(n) if (1..=4).contains(&n) => {
            return Some(Action::SwitchSection(Section::ALL[usize::from(n - 1)]));
        }
        KeyCode::Up => screen.selected = screen.selected.saturating_sub(1),
        KeyCode::Down => {
            let len = list_len(&state);
            if screen.selected + 1 < len {
                screen.selected += 1;
            }
        }
        KeyCode::PageDown => return Some(Action::NextPage),
        KeyCode::PageUp => return Some(Action::PrevPage),
        code => match (state.section, code) {
            (Section::Dashboard, KeyCode::Enter) => {
                return MetricCard::ALL.get(screen.selected).map(|card| Action::OpenCard(*card));
            }
            (Section::Packs, KeyCode::Char('n')) => {
                state.cancel_edit();
                screen.form = Some(AdminForm::Pack);
                screen.field = 0;
            }
            (Section::Packs, KeyCode::Char('e')) => {
                if state.start_edit_pack(screen.selected) {
                    screen.form = Some(AdminForm::Pack);
                    screen.field = 0;
                }
            }
            (Section::Packs, KeyCode::Char('d')) => {
                return state
                    .packs
                    .get(screen.selected)
                    .map(|p| Action::Ask(Confirm::DeletePack(p.id.clone())));
            }
            (Section::Customers, KeyCode::Char('e')) => {
                if state.edit_customer(screen.selected) {
                    screen.form = Some(AdminForm::Customer);
                    screen.field = 0;
                }
            }
            (Section::Customers, KeyCode::Char('d')) => {
                return state
                    .customers
                    .get(screen.selected)
                    .map(|c| Action::Ask(Confirm::DeleteCustomer(c.id.clone())));
            }
            (Section::Subscriptions, KeyCode::Char('f')) => {
                let options = SubscriptionFilter::OPTIONS;
                let index = options.iter().position(|f| *f == state.filter).unwrap_or(0);
                state.set_filter(options[cycle(index, options.len(), true)]);
                screen.selected = 0;
            }
            (Section::Subscriptions, KeyCode::Char('a')) => {
                screen.form = Some(AdminForm::Assign);
                screen.field = 0;
            }
            (Section::Subscriptions, KeyCode::Enter) => {
                let rows = state.visible_subscriptions();
                return rows.get(screen.selected).and_then(|s| {
                    status_action(s.status).map(|a| Action::ChangeStatus(s.id.clone(), a.target))
                });
            }
            _ => {}
        },
    }
    None
}

fn admin_form_key(screen: &mut AdminScreen, form: AdminForm, key: KeyEvent) -> Option<Action> {
    let len = form.fields().len();
    match key.code {
        KeyCode::Esc => {
            screen.view.state().cancel_edit();
            screen.form = None;
        }
        KeyCode::Enter => {
            return Some(match form {
                AdminForm::Pack => Action::SubmitPackForm,
                AdminForm::Customer => Action::SaveCustomer,
                AdminForm::Assign => Action::AssignSubscription,
            });
        }
        KeyCode::Tab | KeyCode::Down => screen.field = cycle(screen.field, len, true),
        KeyCode::BackTab | KeyCode::Up => screen.field = cycle(screen.field, len, false),
        code => {
            let mut state = screen.view.state();
            let buf = match (form, screen.field) {
                (AdminForm::Pack, 0) => &mut state.pack_form.name,
                (AdminForm::Pack, 1) => &mut state.pack_form.sku,
                (AdminForm::Pack, 2) => &mut state.pack_form.price,
                (AdminForm::Pack, 3) => &mut state.pack_form.validity_months,
                (AdminForm::Pack, _) => &mut state.pack_form.description,
                (AdminForm::Customer, 0) => &mut state.customer_form.name,
                (AdminForm::Customer, 1) => &mut state.customer_form.email,
                (AdminForm::Customer, _) => &mut state.customer_form.phone,
                (AdminForm::Assign, 0) => &mut state.assign_form.customer_id,
                (AdminForm::Assign, _) => &mut state.assign_form.pack_id,
            };
            edit(buf, code);
        }
    }
    None
}

/// Rows in the current section's list, or cards on the dashboard
fn list_len(state: &AdminState) -> usize {
    match state.section {
        Section::Dashboard => MetricCard::ALL.len(),
        Section::Packs => state.packs.len(),
        Section::Customers => state.customers.len(),
        Section::Subscriptions => state.visible_subscriptions().len(),
    }
}

impl AdminScreen {
    /// Fix up selection and form once an operation started in `started_in`
    /// has finished. A successful submission closes its form.
    fn settle(&mut self, started_in: Section, submitted: bool) {
        let state = self.view.state();
        if state.section != started_in {
            self.selected = 0;
            self.form = None;
        }
        if submitted && state.notice.as_ref().is_some_and(|n| !n.is_error()) {
            self.form = None;
        }
        self.selected = self.selected.min(list_len(&state).saturating_sub(1));
    }
}

/// Role label for the login form
pub(super) fn role_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::Customer => "Customer",
    }
}
