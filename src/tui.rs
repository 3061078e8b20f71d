use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap};
use serde_json::Value;

use crate::api::BankApi;
use crate::app::{App, ProgressEvent, ProgressSink, ProgressSinkKind};
use crate::clock::Clock;
use crate::dashboard::{Dashboard, lock};
use crate::domain::{ApiStatus, BankId, BankStatus, Record, Severity};

const LOGS_MAX: usize = 200;
const TITLE: &str = "Sri Lankan Bank FD Rates Monitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Banks,
    Rates,
    Logs,
    Help,
}

type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct TuiProgress {
    logs: LogBuffer,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        let mut line = format!("[{}] {}", timestamp(), event.message.trim());
        if let Some(elapsed) = event.elapsed {
            line.push_str(&format!(" ({} ms)", elapsed.as_millis()));
        }
        if let Ok(mut logs) = self.logs.lock() {
            push_log(&mut logs, line);
        }
    }
}

struct Worker {
    kind: ProgressSinkKind,
    handle: JoinHandle<()>,
}

pub struct Tui {
    view: View,
    cursor: usize,
    confirm_clear: bool,
    log_scroll: u16,
    logs: LogBuffer,
    worker: Option<Worker>,
}

impl Tui {
    pub fn new() -> Self {
        Self {
            view: View::Banks,
            cursor: 0,
            confirm_clear: false,
            log_scroll: 0,
            logs: Arc::new(Mutex::new(VecDeque::new())),
            worker: None,
        }
    }

    pub fn sink(&self) -> impl ProgressSink + Send + 'static {
        TuiProgress {
            logs: self.logs.clone(),
        }
    }

    pub fn run<A, C>(&mut self, app: Arc<App<A, C>>) -> miette::Result<()>
    where
        A: BankApi + 'static,
        C: Clock + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let state = app.state();
        let result = loop {
            app.tick();
            self.reap_worker();

            {
                let dashboard = lock(&state);
                let now = Instant::now();
                if let Err(err) = terminal
                    .draw(|frame| draw_ui(frame, self, &dashboard, now))
                    .into_diagnostic()
                {
                    break Err(err);
                }
            }

            match event::poll(Duration::from_millis(120)).into_diagnostic() {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => break Err(err),
            }
            match event::read().into_diagnostic() {
                Ok(Event::Key(key)) => {
                    if self.handle_key(key, &app) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(err) => break Err(err),
            }
        };

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        if let Some(worker) = self.worker.take() {
            worker.handle.join().ok();
        }
        result
    }

    fn handle_key<A, C>(&mut self, key: KeyEvent, app: &Arc<App<A, C>>) -> bool
    where
        A: BankApi + 'static,
        C: Clock + 'static,
    {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        if self.confirm_clear {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_clear = false;
                    self.spawn(app, ProgressSinkKind::Clear);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_clear = false;
                }
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return !self.is_busy(),
            KeyCode::Char('?') | KeyCode::F(1) => self.view = View::Help,
            KeyCode::F(4) => self.view = View::Logs,
            KeyCode::Tab => {
                self.view = match self.view {
                    View::Banks => View::Rates,
                    View::Rates => View::Logs,
                    View::Logs | View::Help => View::Banks,
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.view == View::Logs {
                    self.log_scroll = self.log_scroll.saturating_sub(1);
                } else {
                    self.cursor = self.cursor.saturating_sub(1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.view == View::Logs {
                    self.log_scroll = self.log_scroll.saturating_add(1);
                } else {
                    let count = lock(&app.state()).registry().len();
                    if self.cursor + 1 < count {
                        self.cursor += 1;
                    }
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let state = app.state();
                let id = self.bank_under_cursor(&lock(&state));
                if let Some(id) = id {
                    app.toggle(&id);
                }
            }
            KeyCode::Char('x') => lock(&app.state()).clear_selection(),
            KeyCode::Char('f') => {
                if let Some(worker) = &self.worker {
                    app.notify(busy_notice(worker.kind), Severity::Error);
                } else {
                    self.spawn(app, ProgressSinkKind::Fetch);
                }
            }
            KeyCode::Char('e') => {
                if !self.is_busy() {
                    self.spawn(app, ProgressSinkKind::Export);
                }
            }
            KeyCode::Char('c') => {
                if !self.is_busy() {
                    self.confirm_clear = true;
                }
            }
            KeyCode::Char('r') => {
                if !self.is_busy() {
                    self.spawn(app, ProgressSinkKind::Banks);
                }
            }
            _ => {}
        }
        false
    }

    fn spawn<A, C>(&mut self, app: &Arc<App<A, C>>, kind: ProgressSinkKind)
    where
        A: BankApi + 'static,
        C: Clock + 'static,
    {
        let app = Arc::clone(app);
        let sink = self.sink();
        let handle = thread::spawn(move || match kind {
            ProgressSinkKind::Fetch => {
                let _ = app.fetch_selected(&sink);
            }
            ProgressSinkKind::Export => {
                let _ = app.export(&sink);
            }
            ProgressSinkKind::Clear => {
                app.clear(&sink);
            }
            ProgressSinkKind::Banks => {
                app.load_registry(&sink);
            }
        });
        self.worker = Some(Worker { kind, handle });
    }

    fn reap_worker(&mut self) {
        if self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.handle.is_finished())
        {
            if let Some(worker) = self.worker.take() {
                worker.handle.join().ok();
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.worker.is_some()
    }

    fn busy_label(&self) -> Option<&'static str> {
        self.worker.as_ref().map(|worker| worker_label(worker.kind))
    }

    fn bank_under_cursor(&self, dashboard: &Dashboard) -> Option<BankId> {
        dashboard
            .banks()
            .nth(self.cursor)
            .map(|bank| bank.id.clone())
    }
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_ui(frame: &mut ratatui::Frame, tui: &Tui, dashboard: &Dashboard, now: Instant) {
    let notification_count = dashboard.notifications(now).count() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(notification_count.min(5) + 2),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(dashboard, tui), chunks[0]);

    match tui.view {
        View::Banks => {
            let main = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            frame.render_widget(draw_bank_grid(dashboard, tui.cursor), main[0]);
            frame.render_widget(draw_results_summary(dashboard), main[1]);
        }
        View::Rates => draw_rates(frame, dashboard, tui, chunks[1]),
        View::Logs => frame.render_widget(draw_logs(tui), chunks[1]),
        View::Help => frame.render_widget(draw_help(), chunks[1]),
    }

    frame.render_widget(draw_progress(dashboard), chunks[2]);
    frame.render_widget(draw_notifications(dashboard, now), chunks[3]);
    frame.render_widget(draw_footer(dashboard, tui), chunks[4]);
}

fn draw_header(dashboard: &Dashboard, tui: &Tui) -> Paragraph<'static> {
    let (api_label, api_color) = match dashboard.api_status() {
        ApiStatus::Connected => ("API connected", Color::Green),
        ApiStatus::Disconnected => ("API disconnected", Color::Red),
    };
    let mut spans = vec![
        Span::styled(
            TITLE,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(api_label, Style::default().fg(api_color)),
        Span::raw(format!(
            "  banks monitored: {}  active rates: {}",
            dashboard.registry().len(),
            dashboard.results().len()
        )),
    ];
    if let Some(label) = tui.busy_label() {
        spans.push(Span::styled(
            format!("  [{label}]"),
            Style::default().fg(Color::Yellow),
        ));
    }
    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
}

fn draw_bank_grid(dashboard: &Dashboard, cursor: usize) -> Paragraph<'static> {
    let lines: Vec<Line> = dashboard
        .banks()
        .enumerate()
        .map(|(index, bank)| {
            let selected = dashboard.selection().contains(&bank.id);
            let status = dashboard.status(&bank.id);
            let (icon, color) = status_icon(status);
            let marker = if selected { "[x]" } else { "[ ]" };
            let mut style = Style::default();
            if index == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::styled(format!("{marker} {:<8}", bank.id.as_str()), style),
                Span::raw(format!(" {:<18} ", bank.domain())),
                Span::styled(
                    format!("{icon} {}", dashboard.status_text(&bank.id)),
                    Style::default().fg(color),
                ),
            ])
        })
        .collect();
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Banks"))
}

fn draw_results_summary(dashboard: &Dashboard) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if dashboard.results().is_empty() {
        lines.push(Line::from("No rates fetched yet."));
        lines.push(Line::from("Select banks with SPACE, then press f."));
    } else {
        for (id, rows) in dashboard.results().iter() {
            lines.push(Line::from(format!("{id}: {} records", rows.len())));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "total: {} records",
            dashboard.results().total_records()
        )));
    }
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Latest Fixed Deposit Rates"))
}

fn draw_rates(frame: &mut ratatui::Frame, dashboard: &Dashboard, tui: &Tui, area: Rect) {
    let Some(id) = tui.bank_under_cursor(dashboard) else {
        frame.render_widget(Paragraph::new("No banks configured."), area);
        return;
    };
    let title = format!("{id} Fixed Deposit Rates");
    let block = Block::default().borders(Borders::ALL).title(title);
    let rows = match dashboard.records(&id) {
        Some(rows) if !rows.is_empty() => rows,
        Some(_) => {
            frame.render_widget(Paragraph::new("No records returned.").block(block), area);
            return;
        }
        None => {
            frame.render_widget(Paragraph::new("Not fetched yet.").block(block), area);
            return;
        }
    };

    let columns = table_columns(rows);
    let header = Row::new(columns.iter().map(|column| Cell::from(column.clone())))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let body = rows.iter().map(|record| {
        Row::new(
            columns
                .iter()
                .map(|column| Cell::from(format_value(record.get(column)))),
        )
    });
    let widths = vec![Constraint::Ratio(1, columns.len().max(1) as u32); columns.len()];
    let table = Table::new(body, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn draw_progress(dashboard: &Dashboard) -> Gauge<'static> {
    let progress = dashboard.progress();
    let label = if progress.is_active() {
        format!("Processing banks... {} of {}", progress.current, progress.total)
    } else {
        "idle".to_string()
    };
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Blue))
        .percent(progress.percent() as u16)
        .label(label)
}

fn draw_notifications(dashboard: &Dashboard, now: Instant) -> Paragraph<'static> {
    let lines: Vec<Line> = dashboard
        .notifications(now)
        .map(|notification| {
            let color = match notification.severity {
                Severity::Info => Color::White,
                Severity::Success => Color::Green,
                Severity::Error => Color::Red,
            };
            Line::from(Span::styled(
                notification.text.clone(),
                Style::default().fg(color),
            ))
        })
        .collect();
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Messages"))
}

fn draw_footer(dashboard: &Dashboard, tui: &Tui) -> Paragraph<'static> {
    let text = if tui.confirm_clear {
        "Clear all fetched data? y = confirm, n = cancel".to_string()
    } else {
        let selected = dashboard.selection().len();
        let fetch_label = match selected {
            0 => "Fetch Selected Banks".to_string(),
            1 => "Fetch 1 Bank".to_string(),
            n => format!("Fetch {n} Banks"),
        };
        format!(
            "SPACE select  f {fetch_label}  e Export to Excel  c Clear All Data  TAB view  ? help  q quit"
        )
    };
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn draw_logs(tui: &Tui) -> Paragraph<'static> {
    let lines: Vec<Line> = tui
        .logs
        .lock()
        .map(|logs| logs.iter().map(|line| Line::from(line.clone())).collect())
        .unwrap_or_default();
    Paragraph::new(lines)
        .scroll((tui.log_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title("Logs"))
}

fn draw_help() -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from("Up/Down, j/k   move between banks"),
        Line::from("SPACE, Enter   toggle bank selection"),
        Line::from("x              deselect all banks"),
        Line::from("f              fetch selected banks one by one"),
        Line::from("e              export fetched rates to a spreadsheet"),
        Line::from("c              clear all fetched data"),
        Line::from("r              reload bank list from the backend"),
        Line::from("TAB            banks / rates table / logs"),
        Line::from("q, Esc         quit (not while a request is running)"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"))
}

fn worker_label(kind: ProgressSinkKind) -> &'static str {
    match kind {
        ProgressSinkKind::Fetch => "fetching",
        ProgressSinkKind::Export => "exporting",
        ProgressSinkKind::Clear => "clearing",
        ProgressSinkKind::Banks => "loading banks",
    }
}

fn busy_notice(kind: ProgressSinkKind) -> String {
    match kind {
        ProgressSinkKind::Fetch => "A fetch is already in progress".to_string(),
        other => format!("Cannot fetch while {}", worker_label(other)),
    }
}

fn status_icon(status: BankStatus) -> (&'static str, Color) {
    match status {
        BankStatus::Idle => (" ", Color::Gray),
        BankStatus::Loading => ("~", Color::Blue),
        BankStatus::Success => ("+", Color::Green),
        BankStatus::Error => ("!", Color::Red),
    }
}

fn table_columns(rows: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in rows {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn push_log(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(item);
    while buffer.len() > LOGS_MAX {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
