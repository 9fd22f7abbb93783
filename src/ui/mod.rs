// ui/mod.rs — `todod ui` ratatui terminal UI.
//
// Full-screen interactive TUI over the REST API:
//   - List view: tasks in display order (incomplete first, then ascending
//     effective timestamp), one status badge per row
//   - Add view: three-field creation form (name / description / deadline)
//   - Toggles run as independent async requests; a toggle in flight disables
//     only its own row, and the list is re-fetched after each success

pub mod view;

use anyhow::{Context as _, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use std::collections::HashSet;
use std::io;
use tokio::sync::mpsc;

use crate::cli::client::ApiClient;
use crate::config::TodoConfig;
use crate::storage::TaskRow;

/// Results of spawned requests, delivered back to the event loop.
enum UiEvent {
    Fetched(Result<Vec<TaskRow>, String>),
    Toggled { id: String, error: Option<String> },
    Created(Result<TaskRow, String>),
}

#[derive(PartialEq)]
enum View {
    List,
    Add,
}

/// The creation form. Submit is refused while any field is empty.
#[derive(Default)]
struct AddForm {
    name: String,
    description: String,
    deadline: String,
    focus: usize, // 0 = name, 1 = description, 2 = deadline
    submitting: bool,
}

impl AddForm {
    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.name,
            1 => &mut self.description,
            _ => &mut self.deadline,
        }
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.deadline.trim().is_empty()
    }
}

/// ratatui-based interactive task UI.
pub struct TodoUi {
    config: TodoConfig,
}

impl TodoUi {
    pub fn new(config: &TodoConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Start the interactive TUI loop.
    pub async fn run(self) -> Result<()> {
        // Set up terminal.
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("create terminal")?;

        let result = self.event_loop(&mut terminal).await;

        // Restore terminal regardless of result.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let client = ApiClient::new(self.config.server_url())?;
        let (tx, mut rx) = mpsc::unbounded_channel::<UiEvent>();

        let mut tasks: Vec<TaskRow> = Vec::new();
        let mut selected: usize = 0;
        // Ids with a toggle in flight — each one disables only its own row.
        let mut pending: HashSet<String> = HashSet::new();
        let mut is_loading = true;
        let mut error: Option<String> = None;
        let mut current_view = View::List;
        let mut form = AddForm::default();

        spawn_fetch(&client, &tx);

        loop {
            // Recompute display order (and overdue, inside the renderer)
            // on every pass — both are derived, never stored.
            let mut display = tasks.clone();
            view::sort_for_display(&mut display);
            if selected >= display.len() {
                selected = display.len().saturating_sub(1);
            }

            terminal.draw(|f| {
                draw_ui(
                    f,
                    &current_view,
                    &display,
                    selected,
                    &pending,
                    is_loading,
                    error.as_deref(),
                    &form,
                );
            })?;

            // Poll for terminal events (non-blocking, 50ms timeout).
            if event::poll(std::time::Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    // Ctrl+C quits from anywhere.
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break;
                    }

                    match current_view {
                        View::List => match key.code {
                            KeyCode::Char('q') => break,
                            KeyCode::Char('r') => {
                                error = None;
                                spawn_fetch(&client, &tx);
                            }
                            KeyCode::Up | KeyCode::Char('k') => {
                                selected = selected.saturating_sub(1);
                            }
                            KeyCode::Down | KeyCode::Char('j') => {
                                if selected + 1 < display.len() {
                                    selected += 1;
                                }
                            }
                            KeyCode::Char(' ') | KeyCode::Enter => {
                                if let Some(task) = display.get(selected) {
                                    // Row already updating — its control is disabled.
                                    if !pending.contains(&task.id) {
                                        pending.insert(task.id.clone());
                                        error = None;
                                        spawn_toggle(&client, &tx, &task.id, !task.completed);
                                    }
                                }
                            }
                            KeyCode::Char('a') => {
                                error = None;
                                form = AddForm::default();
                                current_view = View::Add;
                            }
                            _ => {}
                        },
                        View::Add => match key.code {
                            KeyCode::Esc => {
                                if !form.submitting {
                                    error = None;
                                    current_view = View::List;
                                }
                            }
                            KeyCode::Tab => form.focus = (form.focus + 1) % 3,
                            KeyCode::BackTab => form.focus = (form.focus + 2) % 3,
                            KeyCode::Enter => {
                                if form.submitting {
                                    // Request already in flight — form is disabled.
                                } else if !form.is_complete() {
                                    error = Some(
                                        "name, description, and deadline are required"
                                            .to_string(),
                                    );
                                } else {
                                    match view::parse_deadline_input(&form.deadline) {
                                        Ok(deadline) => {
                                            form.submitting = true;
                                            error = None;
                                            spawn_create(
                                                &client,
                                                &tx,
                                                form.name.trim(),
                                                form.description.trim(),
                                                deadline,
                                            );
                                        }
                                        Err(e) => error = Some(e.to_string()),
                                    }
                                }
                            }
                            KeyCode::Backspace => {
                                if !form.submitting {
                                    form.field_mut().pop();
                                }
                            }
                            KeyCode::Char(c) => {
                                if !form.submitting {
                                    form.field_mut().push(c);
                                }
                            }
                            _ => {}
                        },
                    }
                }
            }

            // Drain results of spawned requests (non-blocking).
            while let Ok(ev) = rx.try_recv() {
                match ev {
                    UiEvent::Fetched(Ok(fetched)) => {
                        tasks = fetched;
                        is_loading = false;
                    }
                    UiEvent::Fetched(Err(msg)) => {
                        error = Some(msg);
                        is_loading = false;
                    }
                    UiEvent::Toggled { id, error: None } => {
                        pending.remove(&id);
                        spawn_fetch(&client, &tx);
                    }
                    UiEvent::Toggled {
                        id,
                        error: Some(msg),
                    } => {
                        pending.remove(&id);
                        error = Some(msg);
                    }
                    UiEvent::Created(Ok(_)) => {
                        // Back to the list, like the web form navigating home.
                        form = AddForm::default();
                        current_view = View::List;
                        spawn_fetch(&client, &tx);
                    }
                    UiEvent::Created(Err(msg)) => {
                        error = Some(format!("error adding task: {msg}"));
                        form.submitting = false;
                    }
                }
            }
        }

        Ok(())
    }
}

// ─── Spawned requests ─────────────────────────────────────────────────────────

fn spawn_fetch(client: &ApiClient, tx: &mpsc::UnboundedSender<UiEvent>) {
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = client.list_tasks().await.map_err(|e| e.to_string());
        let _ = tx.send(UiEvent::Fetched(result));
    });
}

fn spawn_toggle(client: &ApiClient, tx: &mpsc::UnboundedSender<UiEvent>, id: &str, completed: bool) {
    let client = client.clone();
    let tx = tx.clone();
    let id = id.to_owned();
    tokio::spawn(async move {
        let error = client.set_completed(&id, completed).await.err().map(|e| e.to_string());
        let _ = tx.send(UiEvent::Toggled { id, error });
    });
}

fn spawn_create(
    client: &ApiClient,
    tx: &mpsc::UnboundedSender<UiEvent>,
    name: &str,
    description: &str,
    deadline: chrono::DateTime<Utc>,
) {
    let client = client.clone();
    let tx = tx.clone();
    let name = name.to_owned();
    let description = description.to_owned();
    tokio::spawn(async move {
        let result = client
            .create_task(&name, &description, Some(deadline))
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(UiEvent::Created(result));
    });
}

// ─── UI rendering ─────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    f: &mut ratatui::Frame,
    current_view: &View,
    display: &[TaskRow],
    selected: usize,
    pending: &HashSet<String>,
    is_loading: bool,
    error: Option<&str>,
    form: &AddForm,
) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // body
            Constraint::Length(1), // status line
            Constraint::Length(1), // help line
        ])
        .split(area);

    render_header(f, chunks[0], display);
    match current_view {
        View::List => render_task_list(f, chunks[1], display, selected, pending, is_loading),
        View::Add => render_add_form(f, chunks[1], form),
    }
    render_status(f, chunks[2], error, form);
    render_help(f, chunks[3], current_view);
}

fn render_header(f: &mut ratatui::Frame, area: Rect, display: &[TaskRow]) {
    let open = display.iter().filter(|t| !t.completed).count();
    let header = Paragraph::new(format!(
        " todod — Task Overview  ({open} open / {} total)",
        display.len()
    ))
    .style(Style::default().bg(Color::Rgb(28, 28, 40)).fg(Color::White));
    f.render_widget(header, area);
}

fn render_task_list(
    f: &mut ratatui::Frame,
    area: Rect,
    display: &[TaskRow],
    selected: usize,
    pending: &HashSet<String>,
    is_loading: bool,
) {
    if display.is_empty() {
        let text = if is_loading {
            "Fetching tasks…"
        } else {
            "No tasks yet. Press 'a' to create your first todo."
        };
        let empty = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Tasks"))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = display
        .iter()
        .map(|task| {
            let marker = if task.completed { "[x] " } else { "[ ] " };
            let (badge, badge_style) = if pending.contains(&task.id) {
                ("updating…", Style::default().fg(Color::DarkGray))
            } else if task.completed {
                ("Completed", Style::default().fg(Color::Green))
            } else if view::is_overdue(task, now) {
                ("Overdue", Style::default().fg(Color::Red))
            } else {
                ("In progress", Style::default().fg(Color::Blue))
            };

            let line = Line::from(vec![
                Span::raw(marker),
                Span::styled(
                    task.name.clone(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" — {}", task.description),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw("  "),
                Span::styled(badge, badge_style),
                Span::styled(
                    format!("  {}", view::format_timestamp(task)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .highlight_symbol("▸ ")
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(Some(selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_add_form(f: &mut ratatui::Frame, area: Rect, form: &AddForm) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let fields = [
        ("Name", &form.name),
        ("Description", &form.description),
        ("Deadline (YYYY-MM-DD HH:MM)", &form.deadline),
    ];

    for (i, (title, value)) in fields.iter().enumerate() {
        let focused = form.focus == i && !form.submitting;
        let border_style = if focused {
            Style::default().fg(Color::Cyan)
        } else if form.submitting {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let cursor = if focused { "▌" } else { "" };
        let field = Paragraph::new(format!("{value}{cursor}"))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(*title)
                    .border_style(border_style),
            )
            .style(Style::default().fg(Color::White));
        f.render_widget(field, chunks[i]);
    }
}

fn render_status(f: &mut ratatui::Frame, area: Rect, error: Option<&str>, form: &AddForm) {
    let (text, style) = if let Some(msg) = error {
        (format!(" {msg}"), Style::default().fg(Color::Red))
    } else if form.submitting {
        (" Adding task…".to_string(), Style::default().fg(Color::Yellow))
    } else {
        (String::new(), Style::default())
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

fn render_help(f: &mut ratatui::Frame, area: Rect, current_view: &View) {
    let help = match current_view {
        View::List => " ↑/↓ or j/k: select  |  Space/Enter: toggle  |  a: add  |  r: refresh  |  q: quit",
        View::Add => " Tab: next field  |  Enter: add task  |  Esc: back to list",
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
