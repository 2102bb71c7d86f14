use crate::api::{AllocationApi, PageQuery};
use crate::calc::DateRange;
use crate::data::{Allocation, AllocationType, AppSettings, Employee, Project};
use crate::error::PlanError;
use crate::planner::confirm::destructive_change_prompt;
use crate::planner::{AllocationTarget, PlanMode, Planner, Proposal, SubmitOutcome};
use crate::ui::Tui;
use crate::ui::debounce::Debouncer;
use anyhow::Result;
use chrono::NaiveDate;
use clap::ValueEnum;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::time::{Duration, Instant};

const DATE_FORMAT: &str = "%Y-%m-%d";

const FOCUS_COLOR: Color = Color::Yellow;
const LOCKED_COLOR: Color = Color::DarkGray;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Employee,
    Project,
    Type,
    Start,
    End,
    Mode,
    Percent,
}

impl Field {
    const ORDER: [Field; 7] = [
        Field::Employee,
        Field::Project,
        Field::Type,
        Field::Start,
        Field::End,
        Field::Mode,
        Field::Percent,
    ];

    fn step(self, by: isize) -> Self {
        let len = Self::ORDER.len() as isize;
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        Self::ORDER[(i + by).rem_euclid(len) as usize]
    }
}

pub struct App<'a> {
    api: &'a mut dyn AllocationApi,
    planner: Planner,
    page_size: usize,
    focus: Field,
    search_buf: String,
    search: Debouncer<String>,
    employees: Vec<Employee>,
    employee_cursor: usize,
    selected_employee: Option<Employee>,
    projects: Vec<Project>,
    start_buf: String,
    end_buf: String,
    uniform_buf: String,
    month_cursor: usize,
    /// Labels of the months a waiting change would discard. Some = modal open.
    confirm_labels: Option<Vec<String>>,
    /// Last message for the status line (text, color). Cleared on next keypress.
    status: Option<(String, Color)>,
    outcome: Option<SubmitOutcome>,
}

impl<'a> App<'a> {
    pub fn new_create(
        api: &'a mut dyn AllocationApi,
        settings: &AppSettings,
        today: NaiveDate,
    ) -> Result<Self> {
        let mut planner = Planner::new(today);
        planner.open_create(AllocationTarget {
            allocation_type: settings.default_allocation_type,
            ..AllocationTarget::default()
        });
        Self::with_planner(api, settings, planner)
    }

    pub fn new_edit(
        api: &'a mut dyn AllocationApi,
        settings: &AppSettings,
        today: NaiveDate,
        allocation: &Allocation,
    ) -> Result<Self> {
        let mut planner = Planner::new(today);
        planner.open_edit(allocation)?;
        let mut app = Self::with_planner(api, settings, planner)?;
        app.selected_employee = app
            .api
            .employees(&PageQuery::all())?
            .items
            .into_iter()
            .find(|e| e.id == allocation.employee_id);
        Ok(app)
    }

    fn with_planner(
        api: &'a mut dyn AllocationApi,
        settings: &AppSettings,
        planner: Planner,
    ) -> Result<Self> {
        let page_size = settings.page_size();
        let projects = api.projects(&PageQuery::all())?.items;
        let employees = api.employees(&PageQuery::new(0, page_size))?.items;
        let mut app = App {
            api,
            planner,
            page_size,
            focus: Field::Employee,
            search_buf: String::new(),
            search: Debouncer::new(settings.search_debounce()),
            employees,
            employee_cursor: 0,
            selected_employee: None,
            projects,
            start_buf: String::new(),
            end_buf: String::new(),
            uniform_buf: String::new(),
            month_cursor: 0,
            confirm_labels: None,
            status: None,
            outcome: None,
        };
        app.sync_buffers();
        Ok(app)
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Set once a submit went through (or turned out to be a no-op).
    pub fn outcome(&self) -> Option<&SubmitOutcome> {
        self.outcome.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|(msg, _)| msg.as_str())
    }

    pub fn is_confirming(&self) -> bool {
        self.confirm_labels.is_some()
    }

    /// Re-reads the text buffers from the plan. Used after a declined change
    /// so the date boxes show the range that is still in effect.
    fn sync_buffers(&mut self) {
        let range = self.planner.range();
        self.start_buf = range.start.map(format_date).unwrap_or_default();
        self.end_buf = range.end.map(format_date).unwrap_or_default();
        self.uniform_buf = self
            .planner
            .plan()
            .uniform_value
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.clamp_month_cursor();
    }

    fn clamp_month_cursor(&mut self) {
        let len = self.planner.months().len();
        if self.month_cursor >= len {
            self.month_cursor = len.saturating_sub(1);
        }
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Color::Red));
    }

    fn report<T>(&mut self, result: Result<T, PlanError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.set_error(err.to_string());
                None
            }
        }
    }

    fn handle_proposal(&mut self, proposal: Option<Proposal>) {
        match proposal {
            Some(Proposal::NeedsConfirmation(removed)) => {
                self.confirm_labels = Some(removed.iter().map(|k| k.label()).collect());
            }
            Some(Proposal::Applied) => self.clamp_month_cursor(),
            None => {}
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.handle_key_at(code, modifiers, Instant::now())
    }

    /// Returns true when the form should close.
    pub fn handle_key_at(&mut self, code: KeyCode, modifiers: KeyModifiers, now: Instant) -> bool {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.planner.close();
            return true;
        }
        if self.confirm_labels.is_some() {
            self.handle_confirm_key(code);
            return false;
        }

        self.status = None;

        if code == KeyCode::Char('s') && modifiers.contains(KeyModifiers::CONTROL) {
            return self.submit();
        }

        match code {
            KeyCode::Esc => {
                self.planner.close();
                return true;
            }
            KeyCode::Tab => {
                self.leave_field();
                self.focus = self.focus.step(1);
            }
            KeyCode::BackTab => {
                self.leave_field();
                self.focus = self.focus.step(-1);
            }
            _ => match self.focus {
                Field::Employee => self.handle_employee_key(code, now),
                Field::Project => match code {
                    KeyCode::Left | KeyCode::Up => self.cycle_project(-1),
                    KeyCode::Right | KeyCode::Down => self.cycle_project(1),
                    _ => {}
                },
                Field::Type => match code {
                    KeyCode::Left | KeyCode::Up => self.cycle_type(-1),
                    KeyCode::Right | KeyCode::Down => self.cycle_type(1),
                    _ => {}
                },
                Field::Start | Field::End => self.handle_date_key(code),
                Field::Mode => match code {
                    KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Left | KeyCode::Right => {
                        let result = self.planner.propose_mode(self.planner.mode().toggled());
                        let proposal = self.report(result);
                        self.handle_proposal(proposal);
                    }
                    _ => {}
                },
                Field::Percent => match self.planner.mode() {
                    PlanMode::Uniform => self.handle_uniform_key(code),
                    PlanMode::PerMonth => self.handle_month_key(code),
                },
            },
        }
        false
    }

    /// Runs pending debounced work. Called by the event loop between key events.
    pub fn tick(&mut self, now: Instant) {
        if let Some(term) = self.search.poll(now) {
            self.refresh_employees(&term);
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        let accept = match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        self.confirm_labels = None;
        self.planner.resolve_pending(accept);
        self.sync_buffers();
    }

    fn leave_field(&mut self) {
        if matches!(self.focus, Field::Start | Field::End) {
            self.commit_range();
        }
    }

    fn handle_employee_key(&mut self, code: KeyCode, now: Instant) {
        match code {
            KeyCode::Char(c) => {
                self.search_buf.push(c);
                self.search.push(self.search_buf.clone(), now);
            }
            KeyCode::Backspace => {
                self.search_buf.pop();
                self.search.push(self.search_buf.clone(), now);
            }
            KeyCode::Up => {
                self.employee_cursor = self.employee_cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.employee_cursor + 1 < self.employees.len() {
                    self.employee_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(employee) = self.employees.get(self.employee_cursor).cloned() {
                    let result = self.planner.set_employee(employee.id);
                    if self.report(result).is_some() {
                        self.selected_employee = Some(employee);
                    }
                }
            }
            _ => {}
        }
    }

    fn refresh_employees(&mut self, term: &str) {
        let query = PageQuery::new(0, self.page_size).with_search(term);
        match self.api.employees(&query) {
            Ok(page) => {
                tracing::debug!(search = term, hits = page.total, "employee search");
                self.employees = page.items;
                self.employee_cursor = 0;
            }
            Err(err) => self.set_error(err.user_message()),
        }
    }

    fn cycle_project(&mut self, step: isize) {
        if self.projects.is_empty() {
            return;
        }
        let len = self.projects.len() as isize;
        let current = self
            .planner
            .target()
            .project_id
            .and_then(|id| self.projects.iter().position(|p| p.id == id));
        let next = match current {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step >= 0 => 0,
            None => len - 1,
        } as usize;
        let id = self.projects[next].id;
        let result = self.planner.set_project(Some(id));
        self.report(result);
    }

    fn cycle_type(&mut self, step: isize) {
        let all = AllocationType::value_variants();
        let current = self.planner.target().allocation_type;
        let i = all.iter().position(|t| *t == current).unwrap_or(0) as isize;
        let next = all[(i + step).rem_euclid(all.len() as isize) as usize];
        let result = self.planner.set_allocation_type(next);
        self.report(result);
    }

    fn handle_date_key(&mut self, code: KeyCode) {
        let buf = match self.focus {
            Field::Start => &mut self.start_buf,
            _ => &mut self.end_buf,
        };
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => buf.push(c),
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Enter => self.commit_range(),
            _ => {}
        }
    }

    /// Proposes the range typed into the date boxes. A bad date or an inverted
    /// range is reported and the boxes fall back to the range in effect.
    fn commit_range(&mut self) {
        let parsed = parse_date_field(&self.start_buf)
            .and_then(|start| parse_date_field(&self.end_buf).map(|end| DateRange { start, end }));
        let range = match parsed {
            Ok(range) => range,
            Err(msg) => {
                self.set_error(msg);
                self.sync_buffers();
                return;
            }
        };
        if range == self.planner.range() {
            return;
        }
        match self.planner.propose_range(range) {
            Ok(proposal) => self.handle_proposal(Some(proposal)),
            Err(err) => {
                self.set_error(err.to_string());
                self.sync_buffers();
            }
        }
    }

    fn handle_uniform_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => self.uniform_buf.push(c),
            KeyCode::Backspace => {
                self.uniform_buf.pop();
            }
            _ => return,
        }
        let result = self.planner.set_uniform_input(&self.uniform_buf);
        if let Some(value) = self.report(result) {
            self.uniform_buf = value.map(|v| v.to_string()).unwrap_or_default();
        }
    }

    fn handle_month_key(&mut self, code: KeyCode) {
        let Some(key) = self.planner.months().get(self.month_cursor).map(|m| m.key) else {
            return;
        };
        let mut text = self
            .planner
            .value(&key)
            .map(|v| v.to_string())
            .unwrap_or_default();
        match code {
            KeyCode::Up => {
                self.month_cursor = self.month_cursor.saturating_sub(1);
                return;
            }
            KeyCode::Down => {
                if self.month_cursor + 1 < self.planner.months().len() {
                    self.month_cursor += 1;
                }
                return;
            }
            KeyCode::Char(c) if c.is_ascii_digit() => text.push(c),
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Delete => text.clear(),
            _ => return,
        }
        let result = self.planner.set_month_input(key, &text);
        self.report(result);
    }

    /// Returns true when the form is done.
    fn submit(&mut self) -> bool {
        self.leave_field();
        if self.confirm_labels.is_some() {
            return false;
        }
        match self.planner.submit(&mut *self.api) {
            Ok(SubmitOutcome::Failed(msg)) => {
                self.set_error(msg);
                false
            }
            Ok(outcome) => {
                self.outcome = Some(outcome);
                true
            }
            Err(err) => {
                self.set_error(err.to_string());
                false
            }
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let size = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(9), // form fields + borders
                Constraint::Min(5),    // search results or month grid
                Constraint::Length(1), // status
                Constraint::Length(1), // key hints
            ])
            .split(size);

        self.render_form(f, chunks[0]);
        if self.focus == Field::Employee {
            self.render_employees(f, chunks[1]);
        } else {
            self.render_months(f, chunks[1]);
        }

        if let Some((msg, color)) = &self.status {
            f.render_widget(
                Paragraph::new(Span::styled(msg.clone(), Style::default().fg(*color))),
                chunks[2],
            );
        }
        f.render_widget(
            Paragraph::new(Span::styled(
                "Tab/Shift-Tab=field  ←→=choose  Space=toggle mode  Ctrl-S=save  Esc=cancel",
                Style::default().fg(Color::DarkGray),
            )),
            chunks[3],
        );

        if let Some(labels) = &self.confirm_labels {
            render_confirm(f, size, labels);
        }
    }

    fn render_form(&self, f: &mut Frame, area: Rect) {
        let target = self.planner.target();
        let employee = self
            .selected_employee
            .as_ref()
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "(none)".to_string());
        let employee = if self.focus == Field::Employee {
            format!("{employee}   search: {}_", self.search_buf)
        } else {
            employee
        };
        let project = if !target.allocation_type.requires_project() {
            "n/a".to_string()
        } else {
            target
                .project_id
                .and_then(|id| self.projects.iter().find(|p| p.id == id))
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "(none)".to_string())
        };
        let percent = match self.planner.mode() {
            PlanMode::Uniform if self.focus == Field::Percent => format!("{}_%", self.uniform_buf),
            PlanMode::Uniform => format!("{}%", self.uniform_buf),
            PlanMode::PerMonth => "set per month below".to_string(),
        };
        let date = |buf: &str, field: Field| {
            if self.focus == field {
                format!("{buf}_")
            } else {
                buf.to_string()
            }
        };

        let fields = [
            (Field::Employee, "Employee", employee),
            (Field::Project, "Project", project),
            (Field::Type, "Type", target.allocation_type.label().to_string()),
            (Field::Start, "Start (YYYY-MM-DD)", date(&self.start_buf, Field::Start)),
            (Field::End, "End (YYYY-MM-DD)", date(&self.end_buf, Field::End)),
            (Field::Mode, "Mode", self.planner.mode().label().to_string()),
            (Field::Percent, "Percentage", percent),
        ];
        let lines: Vec<Line> = fields
            .into_iter()
            .map(|(field, label, value)| {
                let style = if field == self.focus {
                    Style::default().fg(FOCUS_COLOR).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let marker = if field == self.focus { "> " } else { "  " };
                Line::from(Span::styled(format!("{marker}{label:<20} {value}"), style))
            })
            .collect();

        let title = match self.planner.editing_id() {
            Some(id) => format!(" Edit allocation #{id} "),
            None => " New allocation ".to_string(),
        };
        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }

    fn render_employees(&self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self
            .employees
            .iter()
            .map(|e| Row::new(vec![Cell::from(e.name.clone()), Cell::from(e.email.clone())]))
            .collect();
        let mut table_state = TableState::default();
        if !self.employees.is_empty() {
            table_state.select(Some(self.employee_cursor));
        }
        let title = if self.search.is_pending() {
            " Employees (searching…) "
        } else {
            " Employees  (↑↓=move  Enter=select) "
        };
        let table = Table::new(rows, [Constraint::Length(28), Constraint::Min(20)])
            .header(
                Row::new(vec!["Name", "Email"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(
                Style::default()
                    .fg(FOCUS_COLOR)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(table, area, &mut table_state);
    }

    fn render_months(&self, f: &mut Frame, area: Rect) {
        let per_month = self.planner.mode() == PlanMode::PerMonth;
        let uniform = self.planner.plan().uniform_value;
        let rows: Vec<Row> = self
            .planner
            .months()
            .iter()
            .map(|m| {
                let value = if per_month {
                    self.planner.value(&m.key)
                } else {
                    uniform
                };
                let value = value.map(|v| format!("{v}%")).unwrap_or_else(|| "-".to_string());
                let row = Row::new(vec![
                    Cell::from(m.label.clone()),
                    Cell::from(value),
                    Cell::from(if m.locked() { "past" } else { "" }),
                ]);
                if m.locked() || !per_month {
                    row.style(Style::default().fg(LOCKED_COLOR))
                } else {
                    row
                }
            })
            .collect();

        let mut table_state = TableState::default();
        if per_month && self.focus == Field::Percent && !self.planner.months().is_empty() {
            table_state.select(Some(self.month_cursor));
        }
        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(6),
            ],
        )
        .header(
            Row::new(vec!["Month", "Value", ""]).style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(" Months "))
        .row_highlight_style(
            Style::default()
                .fg(FOCUS_COLOR)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(table, area, &mut table_state);
    }
}

fn render_confirm(f: &mut Frame, area: Rect, labels: &[String]) {
    let popup = centered(area, 60, 7);
    let text = vec![
        Line::from(destructive_change_prompt(labels)),
        Line::from(""),
        Line::from(Span::styled(
            "y=discard  n=keep",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Confirm ")),
        popup,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// An empty box is a missing bound, not an error.
fn parse_date_field(buf: &str) -> Result<Option<NaiveDate>, String> {
    let buf = buf.trim();
    if buf.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(buf, DATE_FORMAT)
        .map(Some)
        .map_err(|_| format!("invalid date '{buf}' (expected YYYY-MM-DD)"))
}

// ── App event loop ────────────────────────────────────────────────────────────

pub fn run_app(terminal: &mut Tui, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;
        if event::poll(Duration::from_millis(16))? {
            if let CEvent::Key(key) = event::read()? {
                if app.handle_key(key.code, key.modifiers) {
                    break;
                }
            }
        }
        app.tick(Instant::now());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalApi;
    use crate::calc::MonthKey;
    use crate::data::{AllocationData, DirectoryData};
    use crate::planner::form::FormState;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mk(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn make_api() -> LocalApi {
        let directory = DirectoryData {
            employees: vec![
                Employee {
                    id: 1,
                    name: "Ada Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                    manager_id: None,
                },
                Employee {
                    id: 2,
                    name: "Grace Hopper".to_string(),
                    email: "grace@example.com".to_string(),
                    manager_id: None,
                },
            ],
            projects: vec![
                Project {
                    id: 10,
                    name: "Apollo".to_string(),
                    client: None,
                },
                Project {
                    id: 11,
                    name: "Gemini".to_string(),
                    client: Some("NASA".to_string()),
                },
            ],
            managers: vec![],
        };
        LocalApi::in_memory(directory, AllocationData::default())
    }

    fn key(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(code, KeyModifiers::empty())
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            key(app, KeyCode::Char(c));
        }
    }

    fn ctrl(app: &mut App, c: char) -> bool {
        app.handle_key(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Picks the first employee and project, then types the range and moves to Mode.
    fn fill_basics(app: &mut App, start: &str, end: &str) {
        key(app, KeyCode::Enter); // employee
        key(app, KeyCode::Tab);
        key(app, KeyCode::Right); // project
        key(app, KeyCode::Tab);
        key(app, KeyCode::Tab); // type stays Project
        type_str(app, start);
        key(app, KeyCode::Tab);
        type_str(app, end);
        key(app, KeyCode::Tab);
    }

    #[test]
    fn test_search_waits_for_debounce() {
        let mut api = make_api();
        let settings = AppSettings::default();
        let mut app = App::new_create(&mut api, &settings, d(2025, 1, 1)).unwrap();
        assert_eq!(app.employees.len(), 2);

        let start = Instant::now();
        for (i, c) in "grace".chars().enumerate() {
            app.handle_key_at(
                KeyCode::Char(c),
                KeyModifiers::empty(),
                start + Duration::from_millis(50 * i as u64),
            );
        }
        app.tick(start + Duration::from_millis(300));
        assert_eq!(app.employees.len(), 2, "searched before the input settled");

        app.tick(start + Duration::from_millis(200 + 300));
        assert_eq!(app.employees.len(), 1);
        assert_eq!(app.employees[0].name, "Grace Hopper");
    }

    #[test]
    fn test_enter_selects_employee() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2025, 1, 1)).unwrap();
        key(&mut app, KeyCode::Down);
        key(&mut app, KeyCode::Enter);
        assert_eq!(app.planner().target().employee_id, Some(2));
        assert_eq!(app.selected_employee.as_ref().unwrap().name, "Grace Hopper");
    }

    #[test]
    fn test_create_uniform_allocation() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2024, 12, 1)).unwrap();
        fill_basics(&mut app, "2025-01-01", "2025-03-31");
        assert_eq!(app.planner().months().len(), 3);

        key(&mut app, KeyCode::Tab); // percent
        type_str(&mut app, "100");
        assert!(ctrl(&mut app, 's'));

        let Some(SubmitOutcome::Created(created)) = app.outcome() else {
            panic!("expected a created allocation, status: {:?}", app.status());
        };
        assert_eq!(created.project_id, Some(10));
        assert_eq!(created.current_month_allocation, Some(100));
        assert!(created.monthly_allocations.is_empty());
    }

    #[test]
    fn test_uniform_input_clamps() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2024, 12, 1)).unwrap();
        fill_basics(&mut app, "2025-01-01", "2025-01-31");
        key(&mut app, KeyCode::Tab);
        type_str(&mut app, "250");
        assert_eq!(app.uniform_buf, "100");
        assert_eq!(app.planner().plan().uniform_value, Some(100));
    }

    #[test]
    fn test_missing_month_keeps_form_open() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2024, 12, 1)).unwrap();
        fill_basics(&mut app, "2025-01-01", "2025-03-31");
        key(&mut app, KeyCode::Char(' ')); // per month
        key(&mut app, KeyCode::Tab);
        type_str(&mut app, "50");
        key(&mut app, KeyCode::Down);
        type_str(&mut app, "75");

        assert!(!ctrl(&mut app, 's'));
        assert!(app.status().unwrap().contains("Mar 2025"));
        assert_eq!(app.planner().state(), FormState::Editing(PlanMode::PerMonth));
        assert!(app.outcome().is_none());
    }

    #[test]
    fn test_shrinking_range_asks_and_decline_restores() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2024, 12, 1)).unwrap();
        fill_basics(&mut app, "2025-01-01", "2025-06-30");
        key(&mut app, KeyCode::Char(' '));
        key(&mut app, KeyCode::Tab);
        for _ in 0..4 {
            key(&mut app, KeyCode::Down);
        }
        type_str(&mut app, "40");
        assert_eq!(app.planner().value(&mk(2025, 5)), Some(40));

        key(&mut app, KeyCode::BackTab);
        key(&mut app, KeyCode::BackTab); // end date
        for _ in 0..5 {
            key(&mut app, KeyCode::Backspace);
        }
        type_str(&mut app, "03-31");
        key(&mut app, KeyCode::Enter);
        assert!(app.is_confirming());
        assert_eq!(app.confirm_labels, Some(vec!["May 2025".to_string()]));

        // Other keys are swallowed while the modal is open
        key(&mut app, KeyCode::Tab);
        assert!(app.is_confirming());

        key(&mut app, KeyCode::Char('n'));
        assert!(!app.is_confirming());
        assert_eq!(app.end_buf, "2025-06-30");
        assert_eq!(app.planner().months().len(), 6);
        assert_eq!(app.planner().value(&mk(2025, 5)), Some(40));

        for _ in 0..5 {
            key(&mut app, KeyCode::Backspace);
        }
        type_str(&mut app, "03-31");
        key(&mut app, KeyCode::Enter);
        key(&mut app, KeyCode::Char('y'));
        assert_eq!(app.planner().months().len(), 3);
        assert_eq!(app.end_buf, "2025-03-31");
    }

    #[test]
    fn test_invalid_range_is_reported_and_reverted() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2024, 12, 1)).unwrap();
        fill_basics(&mut app, "2025-03-01", "2025-01-31");
        assert!(app.status().unwrap().contains("after end date"));
        assert_eq!(app.end_buf, "");
        assert!(app.planner().months().is_empty());
    }

    #[test]
    fn test_bad_date_text_is_reported() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2024, 12, 1)).unwrap();
        for _ in 0..3 {
            key(&mut app, KeyCode::Tab);
        }
        type_str(&mut app, "2025-13-01");
        key(&mut app, KeyCode::Enter);
        assert!(app.status().unwrap().contains("invalid date"));
        assert_eq!(app.start_buf, "");
    }

    #[test]
    fn test_edit_opens_with_existing_values() {
        let mut api = make_api();
        let existing = {
            let request = crate::data::CreateAllocationRequest {
                employee_id: 2,
                project_id: Some(11),
                start_date: d(2025, 1, 1),
                end_date: d(2025, 2, 28),
                allocation_type: AllocationType::Project,
                year: 2025,
                current_month_allocation: Some(60),
                monthly_allocations: None,
            };
            api.create_allocation(&request).unwrap()
        };
        let mut app =
            App::new_edit(&mut api, &AppSettings::default(), d(2025, 1, 15), &existing).unwrap();
        assert_eq!(app.start_buf, "2025-01-01");
        assert_eq!(app.uniform_buf, "60");
        assert_eq!(app.selected_employee.as_ref().unwrap().id, 2);

        assert!(ctrl(&mut app, 's'));
        assert_eq!(app.outcome(), Some(&SubmitOutcome::NoChanges));
    }

    #[test]
    fn test_esc_closes_form() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2025, 1, 1)).unwrap();
        assert!(key(&mut app, KeyCode::Esc));
        assert_eq!(app.planner().state(), FormState::Closed);
        assert!(app.outcome().is_none());
    }

    #[test]
    fn test_type_cycle_hides_project() {
        let mut api = make_api();
        let mut app = App::new_create(&mut api, &AppSettings::default(), d(2025, 1, 1)).unwrap();
        key(&mut app, KeyCode::Tab);
        key(&mut app, KeyCode::Tab);
        key(&mut app, KeyCode::Right);
        assert_eq!(app.planner().target().allocation_type, AllocationType::Vacation);
        key(&mut app, KeyCode::Left);
        key(&mut app, KeyCode::Left);
        assert_eq!(app.planner().target().allocation_type, AllocationType::Prospect);
    }
}
