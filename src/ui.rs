use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::api::TaskService;
use crate::boundary::ErrorBoundary;
use crate::controller::{Controller, Settled};
use crate::form::{Field, FormMode, Submission, TaskForm, TextField};
use crate::models::{PopupMode, Task, TaskStatus};
use crate::views::{self, LoadingSize};

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

pub struct App<S> {
    controller: Controller<S>,
    boundary: ErrorBoundary,
    /// Id of the selected note. Reordering the list keeps the same note selected.
    pub selected: Option<String>,
    /// Display position of the last selection, used to pick a neighbour when
    /// the selected note disappears.
    anchor: usize,
    pub popup_mode: PopupMode,
    pub form: Option<TaskForm>,
    pub search: TextField,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
    pub tick: usize,
}

impl<S: TaskService + 'static> App<S> {
    /// Must be called inside a tokio runtime: the first list request starts here.
    pub fn new(service: Arc<S>) -> Self {
        let mut controller = Controller::new(service);
        controller.reload();
        App {
            controller,
            boundary: ErrorBoundary::new(),
            selected: None,
            anchor: 0,
            popup_mode: PopupMode::None,
            form: None,
            search: TextField::new(""),
            status: None,
            should_quit: false,
            tick: 0,
        }
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.controller
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let id = self.selected.as_deref()?;
        self.controller.partitions().iter().find(|t| t.id == id)
    }

    /// Position of the selected note in display order, if it is visible.
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.controller.partitions().iter().position(|t| t.id == id)
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_task().map(|t| t.id.clone())
    }

    fn visible_len(&self) -> usize {
        self.controller.partitions().len()
    }

    fn select_index(&mut self, index: usize) {
        self.selected = self.controller.partitions().get(index).map(|t| t.id.clone());
        self.anchor = index;
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_len();
        match self.selected_index() {
            Some(i) => self.anchor = i,
            None if len == 0 => self.selected = None,
            None => self.select_index(self.anchor.min(len - 1)),
        }
    }

    pub fn next_item(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.selected_index() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.select_index(i);
    }

    pub fn previous_item(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.selected_index() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.select_index(i);
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
        });
    }

    pub fn open_create_form(&mut self) {
        self.form = Some(TaskForm::create());
        self.popup_mode = PopupMode::Form;
    }

    pub fn open_edit_form(&mut self) {
        if let Some(task) = self.selected_task() {
            self.form = Some(TaskForm::edit(task));
            self.popup_mode = PopupMode::Form;
        }
    }

    pub fn close_popup(&mut self) {
        self.popup_mode = PopupMode::None;
        self.form = None;
    }

    /// Throw away local state and start over, the remedy for a rendering fault.
    pub fn full_reload(&mut self) {
        log::info!("full reload requested");
        self.close_popup();
        self.boundary.reset();
        self.selected = None;
        self.anchor = 0;
        self.status = None;
        self.controller.reset();
    }

    /// Apply whatever the service has answered since the last call.
    pub fn process_outcomes(&mut self) {
        for settled in self.controller.poll() {
            self.on_settled(settled);
        }
    }

    /// Wait for the next service answer and apply it.
    pub async fn settle(&mut self) -> Option<Settled> {
        let settled = self.controller.settle().await?;
        self.on_settled(settled.clone());
        Some(settled)
    }

    fn on_settled(&mut self, settled: Settled) {
        match &settled {
            Settled::Created { .. } => {
                if matches!(&self.form, Some(form) if form.mode == FormMode::Create && form.submitting) {
                    self.close_popup();
                }
            }
            Settled::Updated { ticket, .. } => {
                if self.form.as_ref().is_some_and(|form| form.pending == Some(*ticket)) {
                    self.close_popup();
                }
            }
            Settled::CreateFailed { message } => {
                if let Some(form) = self.form.as_mut().filter(|f| f.mode == FormMode::Create) {
                    form.submit_failed(message.clone());
                }
            }
            Settled::UpdateFailed { ticket, message, .. } => {
                if let Some(form) = self.form.as_mut().filter(|f| f.pending == Some(*ticket)) {
                    form.submit_failed(message.clone());
                }
            }
            _ => {}
        }
        if let Some(text) = settled.status_line() {
            self.set_status(text, settled.is_failure());
        }
        self.clamp_selection();
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match form.submit() {
            Some(Submission::Create(input)) => self.controller.create(input),
            Some(Submission::Update { id, patch }) => form.pending = self.controller.update(&id, patch),
            None => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.boundary.has_fault() {
            match key.code {
                KeyCode::Char('R') | KeyCode::Char('r') => self.full_reload(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }
        match self.popup_mode.clone() {
            PopupMode::None => self.handle_normal_key(key),
            PopupMode::Form => self.handle_form_key(key),
            PopupMode::Search => self.handle_search_key(key),
            PopupMode::TaskStatus => {
                match key.code {
                    KeyCode::Char(c @ '1'..='3') => {
                        let status = TaskStatus::ALL[(c as u8 - b'1') as usize];
                        if let Some(id) = self.selected_id() {
                            self.controller.set_status(&id, status);
                        }
                        self.close_popup();
                    }
                    KeyCode::Esc => self.close_popup(),
                    _ => {}
                }
            }
            PopupMode::ConfirmDelete(id) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.controller.delete(&id);
                    self.close_popup();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.close_popup(),
                _ => {}
            },
            PopupMode::Help => self.close_popup(),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.next_item(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_item(),
            KeyCode::Char('n') => self.open_create_form(),
            KeyCode::Enter | KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char(' ') | KeyCode::Char('*') => {
                if let Some(id) = self.selected_id() {
                    self.controller.toggle_favorite(&id);
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = self.selected_id() {
                    self.controller.toggle_complete(&id);
                }
            }
            KeyCode::Char('s') => {
                if self.selected_task().is_some() {
                    self.popup_mode = PopupMode::TaskStatus;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    self.popup_mode = PopupMode::ConfirmDelete(id);
                }
            }
            KeyCode::Char('/') => self.popup_mode = PopupMode::Search,
            KeyCode::Char('f') => self.controller.cycle_favorite_filter(),
            KeyCode::Char('t') => self.controller.cycle_status_filter(),
            KeyCode::Char('c') => self.controller.cycle_color_filter(),
            KeyCode::Char('r') => self.controller.reload(),
            KeyCode::Char('?') => self.popup_mode = PopupMode::Help,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.popup_mode = PopupMode::None;
                return;
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.search.insert_char(c),
            KeyCode::Backspace => self.search.delete_char(),
            KeyCode::Left => self.search.move_cursor_left(),
            KeyCode::Right => self.search.move_cursor_right(),
            KeyCode::Home => self.search.move_to_start(),
            KeyCode::End => self.search.move_to_end(),
            _ => return,
        }
        let value = self.search.value.clone();
        self.controller.set_search(&value);
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.close_popup();
                return;
            }
            KeyCode::Char('s') if ctrl => {
                self.submit_form();
                return;
            }
            KeyCode::Char('f') if ctrl => {
                if let Some(FormMode::Edit { id }) = self.form.as_ref().map(|f| f.mode.clone()) {
                    self.controller.toggle_favorite(&id);
                }
                return;
            }
            KeyCode::Enter if self.form.as_ref().is_some_and(|f| f.focus == Field::Title) => {
                self.submit_form();
                return;
            }
            _ => {}
        }

        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => form.next_field(),
            KeyCode::F(2) => form.next_color(),
            KeyCode::Right if ctrl => form.next_color(),
            KeyCode::Left if ctrl => form.previous_color(),
            KeyCode::Left => form.focused_mut().move_cursor_left(),
            KeyCode::Right => form.focused_mut().move_cursor_right(),
            KeyCode::Home => form.focused_mut().move_to_start(),
            KeyCode::End => form.focused_mut().move_to_end(),
            KeyCode::Backspace => form.focused_mut().delete_char(),
            KeyCode::Enter => form.focused_mut().insert_char('\n'),
            KeyCode::Char(c) if !ctrl => form.focused_mut().insert_char(c),
            _ => {}
        }
    }
}

pub fn run_tui<S: TaskService + 'static>(service: Arc<S>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Panic output would land on the alternate screen; send it to the log instead.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|info| log::error!("panic: {info}")));

    let mut app = App::new(service);
    let res = run_app(&mut terminal, &mut app);

    let _ = std::panic::take_hook();
    std::panic::set_hook(default_hook);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: TaskService + 'static>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        app.process_outcomes();
        terminal.draw(|f| draw(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
        app.tick = app.tick.wrapping_add(1);

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

pub fn draw<S: TaskService + 'static>(f: &mut Frame, app: &mut App<S>) {
    let area = f.area();
    let mut boundary = std::mem::take(&mut app.boundary);
    boundary.render(f, area, |f| draw_main(f, app));
    app.boundary = boundary;
}

fn draw_main<S: TaskService + 'static>(f: &mut Frame, app: &App<S>) {
    let state = app.controller.state();
    let mut constraints = vec![Constraint::Length(3)];
    if state.error.is_some() {
        constraints.push(Constraint::Length(5));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    views::render_header(
        f,
        chunks[0],
        &app.search,
        app.popup_mode == PopupMode::Search,
        &state.filters,
    );

    let mut next = 1;
    if let Some(error) = &state.error {
        views::render_error_banner(f, chunks[next], error);
        next += 1;
    }

    let body = chunks[next];
    let parts = app.controller.partitions();
    if state.loading && parts.is_empty() {
        views::render_loading(f, body, "Loading...", LoadingSize::for_area(body), app.tick);
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
            .split(body);
        let refreshing = state.loading.then_some(app.tick);
        views::render_task_list(f, columns[0], &parts, app.selected_index(), refreshing);
        views::render_task_detail(f, columns[1], app.selected_task());
    }

    let status = app.status.as_ref();
    views::render_status_line(
        f,
        chunks[next + 1],
        status.map(|s| s.text.as_str()),
        status.is_some_and(|s| s.is_error),
        app.controller.in_flight() > 0,
    );

    match &app.popup_mode {
        PopupMode::Form => {
            if let Some(form) = &app.form {
                views::render_form(f, form);
            }
        }
        PopupMode::TaskStatus => views::render_status_popup(f, app.selected_task().map(|t| t.status)),
        PopupMode::ConfirmDelete(id) => {
            let title = app.controller.state().find(id).map_or("", |t| t.title.as_str());
            views::render_confirm_delete(f, title);
        }
        PopupMode::Help => views::render_help(f),
        PopupMode::Search | PopupMode::None => {}
    }
}
