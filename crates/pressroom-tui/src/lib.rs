// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use pressroom_app::{
    ALLOWED_LIMITS, CloseRequest, Comment, DialogMode, Filter, Notification, NotificationEmitter,
    NotificationLevel, Resource, ResourceView, Ticket, TicketFilterForm, TicketType, ViewStatus,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::format_description;

/// How a resource shows up as table rows and in the detail dialog.
pub trait TableRows: Resource {
    const TITLE: &'static str;

    fn columns() -> &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    fn detail_text(&self) -> String;

    fn filter_hint() -> &'static str {
        "key=value ..."
    }

    fn parse_filter(raw: &str) -> Result<Filter> {
        Filter::parse(raw)
    }
}

impl TableRows for Ticket {
    const TITLE: &'static str = "tickets";

    fn columns() -> &'static [&'static str] {
        &["", "ticket", "type", "email", "opened", "answers"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            unread_mark(self.is_unread()).to_owned(),
            self.id.to_string(),
            TicketType::label_for(&self.content.kind).to_owned(),
            self.content.email.clone(),
            format_timestamp(self.content.created_at),
            self.responses.len().to_string(),
        ]
    }

    fn detail_text(&self) -> String {
        let mut lines = vec![
            format!("ticket: {}", self.id),
            format!("type: {}", TicketType::label_for(&self.content.kind)),
            format!("from: {} <{}>", self.user.name, self.content.email),
            format!("opened: {}", format_timestamp(self.content.created_at)),
            String::new(),
            self.content.msg.clone(),
        ];
        if !self.responses.is_empty() {
            lines.push(String::new());
            lines.push(format!("answers ({}):", self.responses.len()));
            for response in &self.responses {
                lines.push(format!(
                    "- [{}] {}",
                    format_timestamp(response.created_at),
                    response.msg
                ));
            }
        }
        lines.join("\n")
    }

    fn filter_hint() -> &'static str {
        "tid=<id> type=<bug-report|...> begin=<date> end=<date> order=<asc|desc>"
    }

    /// Validates the type choice; "n/d" means any type and order defaults to desc.
    fn parse_filter(raw: &str) -> Result<Filter> {
        Ok(TicketFilterForm::parse(raw)?.to_filter())
    }
}

impl TableRows for Comment {
    const TITLE: &'static str = "comments";

    fn columns() -> &'static [&'static str] {
        &["", "author", "email", "article", "comment", "answered"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            unread_mark(self.is_unread()).to_owned(),
            self.user_name.clone(),
            self.user_email.clone(),
            self.article
                .as_ref()
                .map(|article| article.title.clone())
                .unwrap_or_default(),
            truncate(&self.comment, 48),
            if self.answer.as_deref().is_some_and(|answer| !answer.is_empty()) {
                "yes".to_owned()
            } else {
                "no".to_owned()
            },
        ]
    }

    fn detail_text(&self) -> String {
        let mut lines = vec![format!("from: {} <{}>", self.user_name, self.user_email)];
        if let Some(article) = &self.article {
            lines.push(format!("article: {}", article.title));
        }
        lines.push(format!(
            "confirmed: {}",
            if self.confirmed { "yes" } else { "no" }
        ));
        lines.push(String::new());
        lines.push(self.comment.clone());
        if let Some(answer) = self.answer.as_deref().filter(|answer| !answer.is_empty()) {
            lines.push(String::new());
            lines.push(format!("answer: {answer}"));
        }
        lines.join("\n")
    }
}

fn unread_mark(unread: bool) -> &'static str {
    if unread { "●" } else { " " }
}

fn format_timestamp(value: Option<OffsetDateTime>) -> String {
    value
        .and_then(|value| {
            value
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| "-".to_owned())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Collects notifications from background completions for the next frame.
#[derive(Debug, Clone, Default)]
pub struct ToastSink {
    queue: Arc<Mutex<Vec<Notification>>>,
}

impl ToastSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *queue)
    }
}

impl NotificationEmitter for ToastSink {
    fn emit(&self, notification: Notification) {
        tracing::debug!(
            level = notification.level.as_str(),
            message = %notification.message,
            "toast queued"
        );
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Nav,
    Filter(String),
}

#[derive(Debug, Clone, Default)]
pub struct ViewData {
    pub selected_row: usize,
    pub input: InputMode,
    pub confirming_close: bool,
    pub status: Option<StatusLine>,
    pub status_token: u64,
    pub help_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CycleLimit,
    Refresh,
    Open(DialogMode),
    SwitchMode(DialogMode),
    RequestClose,
    ConfirmClose,
    CancelClose,
    DraftInput(char),
    DraftBackspace,
    SubmitReply,
    BeginFilter,
    FilterInput(char),
    FilterBackspace,
    SubmitFilter,
    CancelFilter,
    ClearFilter,
    ToggleHelp,
    Noop,
}

/// Maps a key press to an action given what currently has focus.
pub fn key_action(
    input: &InputMode,
    dialog: Option<DialogMode>,
    confirming_close: bool,
    key: KeyEvent,
) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
        return KeyAction::Quit;
    }

    if confirming_close {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::ConfirmClose,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => KeyAction::CancelClose,
            _ => KeyAction::Noop,
        };
    }

    match dialog {
        Some(DialogMode::Reply) => {
            return match key.code {
                KeyCode::Esc => KeyAction::RequestClose,
                KeyCode::Tab => KeyAction::SwitchMode(DialogMode::View),
                KeyCode::Enter => KeyAction::SubmitReply,
                KeyCode::Char('s') if ctrl => KeyAction::SubmitReply,
                KeyCode::Backspace => KeyAction::DraftBackspace,
                KeyCode::Char(ch) if !ctrl => KeyAction::DraftInput(ch),
                _ => KeyAction::Noop,
            };
        }
        Some(DialogMode::View) => {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('q') => KeyAction::RequestClose,
                KeyCode::Tab | KeyCode::Char('a') => KeyAction::SwitchMode(DialogMode::Reply),
                _ => KeyAction::Noop,
            };
        }
        None => {}
    }

    if let InputMode::Filter(_) = input {
        return match key.code {
            KeyCode::Esc => KeyAction::CancelFilter,
            KeyCode::Enter => KeyAction::SubmitFilter,
            KeyCode::Backspace => KeyAction::FilterBackspace,
            KeyCode::Char(ch) if !ctrl => KeyAction::FilterInput(ch),
            _ => KeyAction::Noop,
        };
    }

    match key.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('j') | KeyCode::Down => KeyAction::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => KeyAction::MoveUp,
        KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => KeyAction::NextPage,
        KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => KeyAction::PrevPage,
        KeyCode::Char('g') | KeyCode::Home => KeyAction::FirstPage,
        KeyCode::Char('G') | KeyCode::End => KeyAction::LastPage,
        KeyCode::Char('L') => KeyAction::CycleLimit,
        KeyCode::Char('r') => KeyAction::Refresh,
        KeyCode::Enter => KeyAction::Open(DialogMode::View),
        KeyCode::Char('a') => KeyAction::Open(DialogMode::Reply),
        KeyCode::Char('/') => KeyAction::BeginFilter,
        KeyCode::Char('x') => KeyAction::ClearFilter,
        KeyCode::Char('?') => KeyAction::ToggleHelp,
        _ => KeyAction::Noop,
    }
}

/// The next allowed page size after `current`, wrapping around.
pub fn next_limit(current: u32) -> u32 {
    let position = ALLOWED_LIMITS.iter().position(|limit| *limit == current);
    match position {
        Some(index) => ALLOWED_LIMITS[(index + 1) % ALLOWED_LIMITS.len()],
        None => ALLOWED_LIMITS[0],
    }
}

/// Applies one action to the view. Returns `true` when the shell should exit.
pub fn apply_action<R: TableRows>(
    view: &mut ResourceView<R>,
    view_data: &mut ViewData,
    action: KeyAction,
) -> Result<bool> {
    match action {
        KeyAction::Quit => return Ok(true),
        KeyAction::Noop => {}
        KeyAction::ToggleHelp => view_data.help_visible = !view_data.help_visible,
        KeyAction::MoveUp => {
            view_data.selected_row = view_data.selected_row.saturating_sub(1);
        }
        KeyAction::MoveDown => {
            let last = view.store().items().len().saturating_sub(1);
            view_data.selected_row = (view_data.selected_row + 1).min(last);
        }
        KeyAction::NextPage => {
            let page = view.query().page().saturating_add(1);
            view.set_page(page)?;
            view_data.selected_row = 0;
        }
        KeyAction::PrevPage => {
            let page = view.query().page();
            if page > 1 {
                view.set_page(page - 1)?;
                view_data.selected_row = 0;
            }
        }
        KeyAction::FirstPage => {
            if view.query().page() != 1 {
                view.set_page(1)?;
                view_data.selected_row = 0;
            }
        }
        KeyAction::LastPage => {
            let last = u32::try_from(view.store().page_count().max(1))
                .context("page count does not fit a page number")?;
            if view.query().page() != last {
                view.set_page(last)?;
                view_data.selected_row = 0;
            }
        }
        KeyAction::CycleLimit => {
            view.set_limit(next_limit(view.query().limit()))?;
            view_data.selected_row = 0;
        }
        KeyAction::Refresh => view.refresh(),
        KeyAction::Open(mode) => {
            let Some(id) = view
                .store()
                .items()
                .get(view_data.selected_row)
                .map(|row| row.id().clone())
            else {
                bail!("nothing selected -- wait for the list to load");
            };
            view.activate(&id, mode)?;
        }
        KeyAction::SwitchMode(mode) => view.switch_mode(mode),
        KeyAction::RequestClose => {
            if view.request_close() == CloseRequest::NeedsConfirmation {
                view_data.confirming_close = true;
            }
        }
        KeyAction::ConfirmClose => {
            view.confirm_close();
            view_data.confirming_close = false;
        }
        KeyAction::CancelClose => view_data.confirming_close = false,
        KeyAction::DraftInput(ch) => {
            let mut draft = view.selection().draft().to_owned();
            draft.push(ch);
            view.edit_draft(draft);
        }
        KeyAction::DraftBackspace => {
            let mut draft = view.selection().draft().to_owned();
            draft.pop();
            view.edit_draft(draft);
        }
        KeyAction::SubmitReply => view.submit_reply()?,
        KeyAction::BeginFilter => {
            let current = view
                .query()
                .filter()
                .constraints()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            view_data.input = InputMode::Filter(current);
        }
        KeyAction::FilterInput(ch) => {
            if let InputMode::Filter(text) = &mut view_data.input {
                text.push(ch);
            }
        }
        KeyAction::FilterBackspace => {
            if let InputMode::Filter(text) = &mut view_data.input {
                text.pop();
            }
        }
        KeyAction::SubmitFilter => {
            if let InputMode::Filter(text) = &view_data.input {
                let filter = R::parse_filter(text)?;
                view.submit_filter(filter);
                view_data.input = InputMode::Nav;
                view_data.selected_row = 0;
            }
        }
        KeyAction::CancelFilter => view_data.input = InputMode::Nav,
        KeyAction::ClearFilter => {
            if !view.query().filter().is_empty() {
                view.clear_filter();
                view_data.selected_row = 0;
            }
        }
    }
    Ok(false)
}

/// Runs the terminal shell until the user quits.
pub fn run_app<R: TableRows>(view: &mut ResourceView<R>, toasts: &ToastSink) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    view.start();

    let mut result = Ok(());
    loop {
        view.process_events();
        process_internal_events(&mut view_data, &internal_rx);
        for toast in toasts.drain() {
            emit_status(&mut view_data, &internal_tx, toast);
        }
        clamp_selection(&mut view_data, view.store().items().len());

        if let Err(error) = terminal.draw(|frame| render(frame, view, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    let action = key_action(
                        &view_data.input,
                        view.selection().mode(),
                        view_data.confirming_close,
                        key,
                    );
                    match apply_action(view, &mut view_data, action) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(error) => emit_status(
                            &mut view_data,
                            &internal_tx,
                            Notification::warning(format!("{error:#}")),
                        ),
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    notification: Notification,
) {
    let after = notification.auto_close;
    view_data.status = Some(StatusLine {
        level: notification.level,
        message: notification.message,
    });
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token, after);
}

fn clamp_selection(view_data: &mut ViewData, rows: usize) {
    view_data.selected_row = view_data.selected_row.min(rows.saturating_sub(1));
}

fn render<R: TableRows>(frame: &mut ratatui::Frame<'_>, view: &ResourceView<R>, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(view))
        .block(Block::default().title("pressroom").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    match view.status() {
        ViewStatus::Ready => render_table(frame, layout[1], view, view_data),
        status => {
            let style = match status {
                ViewStatus::Error(_) => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::Gray),
            };
            let panel = Paragraph::new(render_panel_text(view))
                .style(style)
                .block(Block::default().title(R::TITLE).borders(Borders::ALL));
            frame.render_widget(panel, layout[1]);
        }
    }

    let footer = Paragraph::new(footer_text(view, view_data))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, layout[2]);

    let status_widget =
        Paragraph::new(status_text(view_data)).style(status_style(view_data.status.as_ref()));
    frame.render_widget(status_widget, layout[3]);

    if view.selection().is_open() {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let title = view
            .selection()
            .mode()
            .map_or("details", DialogMode::label);
        let dialog = Paragraph::new(render_dialog_text(view, view_data))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(dialog, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table<R: TableRows>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    view: &ResourceView<R>,
    view_data: &ViewData,
) {
    let columns = R::columns();
    let widths = columns
        .iter()
        .map(|label| {
            if label.is_empty() {
                Constraint::Length(2)
            } else {
                Constraint::Min(8)
            }
        })
        .collect::<Vec<_>>();
    let header = Row::new(columns.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = view.store().items().iter().enumerate().map(|(index, row)| {
        let mut style = Style::default();
        if row.is_unread() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if view.is_sending(row.id()) {
            style = style.fg(Color::DarkGray);
        }
        if index == view_data.selected_row {
            style = style.bg(Color::DarkGray);
        }
        Row::new(row.cells()).style(style)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(R::TITLE).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn header_text<R: TableRows>(view: &ResourceView<R>) -> String {
    view.session().greeting()
}

/// Loading, empty and error panels shown instead of the table.
pub fn render_panel_text<R: TableRows>(view: &ResourceView<R>) -> String {
    match view.status() {
        ViewStatus::Loading => format!("loading {}...", R::TITLE),
        ViewStatus::Empty => {
            let filter = view.query().filter();
            if filter.is_empty() {
                format!("no data\n\nthere are no {} yet", R::TITLE)
            } else {
                format!(
                    "no data\n\nnothing matches filter: {}\npress x to clear it",
                    filter.describe()
                )
            }
        }
        ViewStatus::Error(error) => format!(
            "could not load {}\n\n{}\n\npress r to retry",
            R::TITLE,
            error.user_message()
        ),
        ViewStatus::Ready => String::new(),
    }
}

pub fn footer_text<R: TableRows>(view: &ResourceView<R>, view_data: &ViewData) -> String {
    if let InputMode::Filter(text) = &view_data.input {
        return format!("filter> {text}_   ({})", R::filter_hint());
    }
    let store = view.store();
    let query = view.query();
    let mut footer = format!(
        "page {} of {} | {} {} | limit {} | filter: {}",
        query.page(),
        store.page_count().max(1),
        store.total_count(),
        R::TITLE,
        query.limit(),
        query.filter().describe()
    );
    if view.is_refreshing() {
        footer.push_str(" | refreshing...");
    }
    footer
}

pub fn status_text(view_data: &ViewData) -> String {
    let hints = "j/k move | h/l page | g/G first/last | L limit | / filter | x clear | enter open | a reply | r reload | ? help | q quit";
    match &view_data.status {
        Some(status) => format!("[{}] {} | {hints}", status.level.as_str(), status.message),
        None => hints.to_owned(),
    }
}

fn status_style(status: Option<&StatusLine>) -> Style {
    let color = match status.map(|status| status.level) {
        Some(NotificationLevel::Success) => Color::Green,
        Some(NotificationLevel::Warning) => Color::Yellow,
        Some(NotificationLevel::Error) => Color::Red,
        Some(NotificationLevel::Info) | None => Color::Cyan,
    };
    Style::default().fg(color)
}

pub fn render_dialog_text<R: TableRows>(view: &ResourceView<R>, view_data: &ViewData) -> String {
    let selection = view.selection();
    let entity = selection.entity();
    let current = view.store().get(entity.id()).unwrap_or(entity);
    let mut text = current.detail_text();

    if selection.mode() == Some(DialogMode::Reply) {
        text.push_str("\n\n-- reply --\n");
        text.push_str(selection.draft());
        text.push('_');
        if selection.is_sending() {
            text.push_str("\n\nsending...");
        } else {
            text.push_str("\n\nenter send | tab details | esc close");
        }
    } else {
        text.push_str("\n\na reply | esc close");
    }

    if view_data.confirming_close {
        text.push_str("\n\ndiscard the unsent reply? y/n");
    }
    text
}

fn help_overlay_text() -> &'static str {
    "list: j/k move | h/l prev/next page | g/G first/last page | L cycle page size\n\
list: enter details | a reply | r reload | / filter | x clear filter | q quit\n\
filter: type key=value pairs | enter apply | esc cancel\n\
dialog: tab switch details/reply | enter or ctrl+s send | esc close\n\
close prompt: y discard draft | n keep editing\n\
global: ctrl+q or ctrl+c quit | ? help"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
