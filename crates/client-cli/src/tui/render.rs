//! Drawing for each screen

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs, Wrap},
};
use shared::{display_date, SubscriptionStatus};

use crate::views::admin::{status_action, AdminState, MetricCard, Section};
use crate::views::{Notice, NoticeKind};

use super::app::{
    role_label, AdminForm, AdminScreen, App, CustomerScreen, LoginScreen, RegisterScreen, Screen,
    LOGIN_FIELDS, REGISTER_FIELDS,
};

/// Draw the whole frame
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    draw_title_bar(frame, app, layout[0]);

    match &app.screen {
        Screen::Login(screen) => draw_login(frame, screen, layout[1]),
        Screen::Register(screen) => draw_register(frame, screen, layout[1]),
        Screen::Customer(screen) => draw_customer(frame, screen, layout[1]),
        Screen::Admin(screen) => draw_admin(frame, screen, layout[1]),
    }

    draw_status_bar(frame, app, layout[2]);

    if let Some(confirm) = &app.confirm {
        draw_confirm(frame, confirm.question(), area);
    }
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let who = match app.session.role() {
        Some(role) => format!("signed in as {}", role_label(role)),
        None => "not signed in".to_string(),
    };
    let title = format!(" packdesk | {} | {} | {} ", app.route, who, app.api.base_url());
    let paragraph = Paragraph::new(title).style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let help = if app.busy() {
        " Working...".to_string()
    } else if app.confirm.is_some() {
        " y: Yes | n/Esc: No ".to_string()
    } else {
        match &app.screen {
            Screen::Login(_) => " Tab: Next field | Space: Toggle | F2: Show password | Enter: Sign in | Ctrl+R: Register | Esc: Quit ".to_string(),
            Screen::Register(_) => " Tab: Next field | F2: Show password | Enter: Register | Esc: Back to login ".to_string(),
            Screen::Customer(_) => " Up/Down: Pick pack | Tab: Manual entry | Enter: Request | F5: Refresh | Ctrl+L: Logout | Ctrl+C: Quit ".to_string(),
            Screen::Admin(screen) => admin_help(screen),
        }
    };

    let paragraph = Paragraph::new(help).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn admin_help(screen: &AdminScreen) -> String {
    if screen.form.is_some() {
        return " Tab: Next field | Enter: Save | Esc: Cancel ".to_string();
    }
    let section = match screen.view.state().section {
        Section::Dashboard => "Up/Down: Card | Enter: Open",
        Section::Packs => "n: New | e: Edit | d: Delete",
        Section::Customers => "e: Edit | d: Delete | PgUp/PgDn: Page",
        Section::Subscriptions => "f: Filter | Enter: Row action | a: Assign | PgUp/PgDn: Page",
    };
    format!(" Tab/F1-F4: Section | {} | Ctrl+L: Logout | Ctrl+C: Quit ", section)
}

fn notice_line(notice: &Notice) -> Line<'static> {
    let color = match notice.kind {
        NoticeKind::Success => Color::Green,
        NoticeKind::Error => Color::Red,
        NoticeKind::Info => Color::Cyan,
    };
    Line::styled(notice.text.clone(), Style::default().fg(color))
}

fn error_line(text: &str) -> Line<'static> {
    Line::styled(text.to_string(), Style::default().fg(Color::Red))
}

/// One form row, highlighted when focused
fn field_line(label: &str, value: &str, focused: bool, invalid: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let cursor = if focused { "_" } else { "" };
    let value_style = if invalid {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let label_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Line::from(vec![
        Span::styled(format!("{}{:<18}", marker, label), label_style),
        Span::styled(format!("{}{}", value, cursor), value_style),
    ])
}

fn masked(value: &str, visible: bool) -> String {
    if visible {
        value.to_string()
    } else {
        "*".repeat(value.chars().count())
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_confirm(frame: &mut Frame, question: &str, area: Rect) {
    let popup = centered(area, 52, 5);
    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(vec![Line::from(""), Line::from(question.to_string())])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" Confirm (y/n) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(paragraph, popup);
}

fn draw_login(frame: &mut Frame, screen: &LoginScreen, area: Rect) {
    let view = &screen.view;
    let role = format!(
        "[{}] {}",
        role_label(view.role),
        if view.loading { "(signing in...)" } else { "" }
    );
    let remember = if view.remember { "[x]" } else { "[ ]" };
    let values = [
        view.email.clone(),
        masked(&view.password, view.password_visible),
        role,
        remember.to_string(),
    ];
    let invalid = [view.email_invalid(), view.password_invalid(), false, false];

    let mut lines = vec![Line::from("")];
    for (i, label) in LOGIN_FIELDS.iter().enumerate() {
        lines.push(field_line(label, &values[i], screen.field == i, invalid[i]));
    }
    lines.push(Line::from(""));
    if let Some(error) = &view.error {
        lines.push(error_line(error));
    }

    let block = Block::default().title(" Sign in ").borders(Borders::ALL);
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, centered(area, 70, 12));
}

fn draw_register(frame: &mut Frame, screen: &RegisterScreen, area: Rect) {
    let view = &screen.view;
    let values = [
        view.name.clone(),
        view.email.clone(),
        view.phone.clone(),
        masked(&view.password, view.password_visible),
    ];
    let invalid = [view.name_invalid(), view.email_invalid(), false, view.password_invalid()];

    let mut lines = vec![Line::from("")];
    for (i, label) in REGISTER_FIELDS.iter().enumerate() {
        lines.push(field_line(label, &values[i], screen.field == i, invalid[i]));
    }
    lines.push(Line::from(""));
    if view.loading {
        lines.push(Line::from("Registering..."));
    }
    if let Some(error) = &view.error {
        lines.push(error_line(error));
    }

    let block = Block::default().title(" Create customer account ").borders(Borders::ALL);
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, centered(area, 70, 12));
}

fn status_style(status: SubscriptionStatus) -> Style {
    let color = match status {
        SubscriptionStatus::Active => Color::Green,
        SubscriptionStatus::Requested => Color::Yellow,
        SubscriptionStatus::Approved => Color::Cyan,
        SubscriptionStatus::Inactive | SubscriptionStatus::Expired => Color::Red,
        SubscriptionStatus::Unknown => Color::Gray,
    };
    Style::default().fg(color)
}

fn opt_date(raw: Option<&String>) -> String {
    raw.map(|d| display_date(d)).unwrap_or_else(|| "-".to_string())
}

fn draw_customer(frame: &mut Frame, screen: &CustomerScreen, area: Rect) {
    let view = &screen.view;
    let data = view.data();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[0]);

    let profile = match &data.profile {
        Some(p) => vec![
            Line::from(format!("{} <{}>", p.name, p.email)),
            Line::from(p.phone.clone().unwrap_or_default()),
        ],
        None => vec![Line::from("Loading profile...")],
    };
    frame.render_widget(
        Paragraph::new(profile).block(Block::default().title(" Profile ").borders(Borders::ALL)),
        top[0],
    );

    let current = match &data.current {
        Some(s) => vec![
            Line::from(vec![
                Span::raw(format!("{}  ", s.pack_display())),
                Span::styled(s.status.label(), status_style(s.status)),
            ]),
            Line::from(format!("Expires: {}", opt_date(s.expires_at.as_ref()))),
        ],
        None => vec![Line::from("No active subscription")],
    };
    frame.render_widget(
        Paragraph::new(current)
            .block(Block::default().title(" Current subscription ").borders(Borders::ALL)),
        top[1],
    );

    let notice = view.notice().map(|n| notice_line(&n)).unwrap_or_default();
    frame.render_widget(Paragraph::new(notice), layout[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(layout[2]);

    if view.manual_entry {
        let lines = vec![
            Line::from(""),
            field_line("Pack ID", &view.pack_id, true, false),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default().title(" Request a pack (manual) ").borders(Borders::ALL)),
            bottom[0],
        );
    } else {
        let options = view.pack_options();
        let items: Vec<ListItem> = options
            .iter()
            .map(|o| match o.price {
                Some(price) => ListItem::new(format!("{}  ${:.2}", o.name, price)),
                None => ListItem::new(o.name.clone()),
            })
            .collect();
        let selected = (!view.pack_id.is_empty()).then_some(view.selected_pack);
        let title = if view.is_requesting() { " Request a pack (sending...) " } else { " Request a pack " };
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(selected);
        frame.render_stateful_widget(list, bottom[0], &mut state);
    }

    let rows: Vec<Row> = data
        .history
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.pack_display()),
                Cell::from(s.status.label()).style(status_style(s.status)),
                Cell::from(opt_date(s.requested_at.as_ref())),
                Cell::from(opt_date(s.expires_at.as_ref())),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Min(16), Constraint::Length(10), Constraint::Length(12), Constraint::Length(12)],
    )
    .header(Row::new(vec!["Pack", "Status", "Requested", "Expires"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().title(" History ").borders(Borders::ALL));
    frame.render_widget(table, bottom[1]);
}

fn draw_admin(frame: &mut Frame, screen: &AdminScreen, area: Rect) {
    let state = screen.view.state();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let titles: Vec<String> = Section::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("F{} {}", i + 1, s.title()))
        .collect();
    let index = Section::ALL.iter().position(|s| *s == state.section).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(index)
        .block(Block::default().borders(Borders::ALL).title(" Admin "))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, layout[0]);

    let notice = match (&state.notice, state.loading) {
        (_, true) => Line::from("Loading..."),
        (Some(notice), false) => notice_line(notice),
        (None, false) => Line::default(),
    };
    frame.render_widget(Paragraph::new(notice), layout[1]);

    let body = match screen.form {
        Some(_) => {
            let split = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(layout[2]);
            draw_admin_form(frame, screen, &state, split[1]);
            split[0]
        }
        None => layout[2],
    };

    match state.section {
        Section::Dashboard => draw_metric_cards(frame, screen, &state, body),
        Section::Packs => draw_packs(frame, screen, &state, body),
        Section::Customers => draw_customers(frame, screen, &state, body),
        Section::Subscriptions => draw_subscriptions(frame, screen, &state, body),
    }
}

fn draw_metric_cards(frame: &mut Frame, screen: &AdminScreen, state: &AdminState, area: Rect) {
    let metrics = &state.metrics;
    let items: Vec<ListItem> = MetricCard::ALL
        .iter()
        .map(|card| ListItem::new(format!("{:<24}{}", card.title(), card.value(metrics))))
        .collect();
    let list = List::new(items)
        .block(Block::default().title(" Overview ").borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(screen.selected));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn header(cells: Vec<&'static str>) -> Row<'static> {
    Row::new(cells).style(Style::default().add_modifier(Modifier::BOLD))
}

fn selection(screen: &AdminScreen, len: usize) -> TableState {
    TableState::default().with_selected((len > 0).then_some(screen.selected))
}

fn highlighted(table: Table<'_>) -> Table<'_> {
    table
        .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .highlight_symbol("> ")
}

fn draw_packs(frame: &mut Frame, screen: &AdminScreen, state: &AdminState, area: Rect) {
    let packs = &state.packs;
    let rows: Vec<Row> = packs
        .iter()
        .map(|p| {
            Row::new(vec![
                p.name.clone(),
                p.sku.clone(),
                format!("${:.2}", p.price),
                format!("{} months", p.validity_months),
                p.description.clone().unwrap_or_default(),
            ])
        })
        .collect();
    let title = if state.editing_pack.is_some() { " Packs (editing) " } else { " Packs " };
    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Min(10),
        ],
    )
    .header(header(vec!["Name", "SKU", "Price", "Validity", "Description"]))
    .block(Block::default().title(title).borders(Borders::ALL));
    let mut table_state = selection(screen, packs.len());
    frame.render_stateful_widget(highlighted(table), area, &mut table_state);
}

fn draw_customers(frame: &mut Frame, screen: &AdminScreen, state: &AdminState, area: Rect) {
    let rows: Vec<Row> = state
        .customers
        .iter()
        .map(|c| {
            let active = if c.has_active_subscription { "yes" } else { "no" };
            Row::new(vec![
                c.name.clone(),
                c.email.clone(),
                c.phone.clone().unwrap_or_default(),
                c.total_subscriptions.to_string(),
                active.to_string(),
                opt_date(c.created_at.as_ref()),
            ])
        })
        .collect();
    let title = format!(" Customers (page {}) ", state.customer_page);
    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Min(18),
            Constraint::Length(14),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(11),
        ],
    )
    .header(header(vec!["Name", "Email", "Phone", "Subs", "Active", "Joined"]))
    .block(Block::default().title(title).borders(Borders::ALL));
    let mut table_state = selection(screen, state.customers.len());
    frame.render_stateful_widget(highlighted(table), area, &mut table_state);
}

fn draw_subscriptions(frame: &mut Frame, screen: &AdminScreen, state: &AdminState, area: Rect) {

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let spans: Vec<Span> = state
        .filter_counts()
        .into_iter()
        .map(|(filter, count)| {
            let text = format!(" {} ({}) ", filter.label(), count);
            if filter == state.filter {
                Span::styled(text, Style::default().fg(Color::Black).bg(Color::Cyan))
            } else {
                Span::raw(text)
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), layout[0]);

    let visible = state.visible_subscriptions();
    let rows: Vec<Row> = visible
        .iter()
        .map(|s| {
            let customer = s
                .customer_name
                .clone()
                .or_else(|| s.customer_email.clone())
                .or_else(|| s.customer_id.as_ref().map(|id| format!("Customer {id}")))
                .unwrap_or_default();
            let action = status_action(s.status).map(|a| a.label).unwrap_or("");
            Row::new(vec![
                Cell::from(customer),
                Cell::from(s.pack_display()),
                Cell::from(s.status.label()).style(status_style(s.status)),
                Cell::from(opt_date(s.requested_at.as_ref())),
                Cell::from(opt_date(s.expires_at.as_ref())),
                Cell::from(action),
            ])
        })
        .collect();
    let title = format!(" Subscriptions (page {}) ", state.subscription_page);
    let table = Table::new(
        rows,
        [
            Constraint::Min(14),
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(11),
        ],
    )
    .header(header(vec!["Customer", "Pack", "Status", "Requested", "Expires", "Action"]))
    .block(Block::default().title(title).borders(Borders::ALL));
    let mut table_state = selection(screen, visible.len());
    frame.render_stateful_widget(highlighted(table), layout[1], &mut table_state);
}

fn draw_admin_form(frame: &mut Frame, screen: &AdminScreen, state: &AdminState, area: Rect) {
    let Some(form) = screen.form else {
        return;
    };
    let (title, values): (&str, Vec<&str>) = match form {
        AdminForm::Pack => {
            let f = &state.pack_form;
            let title = if state.editing_pack.is_some() { " Edit pack " } else { " New pack " };
            (
                title,
                vec![
                    f.name.as_str(),
                    f.sku.as_str(),
                    f.price.as_str(),
                    f.validity_months.as_str(),
                    f.description.as_str(),
                ],
            )
        }
        AdminForm::Customer => {
            let f = &state.customer_form;
            (" Edit customer ", vec![f.name.as_str(), f.email.as_str(), f.phone.as_str()])
        }
        AdminForm::Assign => {
            let f = &state.assign_form;
            (" Assign subscription ", vec![f.customer_id.as_str(), f.pack_id.as_str()])
        }
    };

    let mut lines = vec![Line::from("")];
    for (i, (label, value)) in form.fields().iter().zip(values).enumerate() {
        lines.push(field_line(label, value, screen.field == i, false));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}
