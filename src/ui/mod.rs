use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, InputMode};
use crate::domain::task::Task;
use crate::storage::KeyValueStorage;

pub fn run<S: KeyValueStorage>(mut app: App<S>, tick_rate: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = event_loop(&mut terminal, &mut app, tick_rate);
    restore_after(res, || cleanup_terminal(&mut terminal))
}

/// Runs `cleanup` whatever `res` is. An error from the loop wins over one
/// from cleanup.
fn restore_after<T>(res: Result<T>, cleanup: impl FnOnce() -> Result<()>) -> Result<T> {
    let cleaned = cleanup();
    let value = res?;
    cleaned?;
    Ok(value)
}

fn event_loop<S: KeyValueStorage>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<S>,
    tick_rate: Duration,
) -> Result<()> {
    // First frame goes out before storage is read.
    terminal.draw(|f| draw(f, app))?;
    app.hydrate();

    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(app, key.code)
        {
            return Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

/// Returns `true` when the user asked to quit.
fn handle_key<S: KeyValueStorage>(app: &mut App<S>, code: KeyCode) -> bool {
    if !app.is_ready() {
        return code == KeyCode::Char('q');
    }
    match app.mode {
        InputMode::Normal => match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => app.select_next(),
            KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
            KeyCode::Char('a') | KeyCode::Char('n') => app.start_editing(),
            KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
            KeyCode::Char('X') => app.clear_all(),
            _ => {}
        },
        InputMode::Editing => match code {
            KeyCode::Esc => app.cancel_editing(),
            KeyCode::Enter => app.add_task(),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        },
    }

    false
}

fn draw<S: KeyValueStorage>(f: &mut ratatui::Frame, app: &App<S>) {
    let size = f.area();

    if !app.is_ready() {
        let placeholder = Paragraph::new("Loading…")
            .alignment(Alignment::Center)
            .block(Block::default().title("FocusFlow").borders(Borders::ALL));
        f.render_widget(placeholder, size);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(size);

    f.render_widget(render_header(app), chunks[0]);

    let tasks = app.tasks();
    if tasks.is_empty() {
        f.render_widget(render_empty(), chunks[1]);
    } else {
        let mut list_state = ListState::default();
        list_state.select(Some(app.selected));
        f.render_stateful_widget(render_list(&tasks, app.selected), chunks[1], &mut list_state);
    }

    f.render_widget(render_footer(app), chunks[2]);
}

fn render_header<S: KeyValueStorage>(app: &App<S>) -> Paragraph<'static> {
    let summary = app.summary();
    let mut spans = vec![Span::styled("FocusFlow", Style::default().fg(Color::Cyan))];
    if summary.total > 0 {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            summary.to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }
    Paragraph::new(Line::from(spans))
        .block(Block::default().title("Overview").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_empty() -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from(Span::styled(
            "All caught up!",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("Press 'a' to add a task and begin your flow."),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().title("Tasks").borders(Borders::ALL))
}

fn render_list(tasks: &[Task], selected: usize) -> List<'_> {
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let symbol = if task.completed { "✔" } else { "○" };
            let line = Line::from(format!(" {symbol} {}", task.text));

            let style = if idx == selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else if task.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT | Modifier::ITALIC)
            } else {
                Style::default()
            };

            ListItem::new(line).style(style)
        })
        .collect();

    List::new(items)
        .block(
            Block::default()
                .title("Tasks (j/k move ; a/n add ; Space/Enter toggle ; d delete ; X clear all)")
                .borders(Borders::ALL),
        )
        .highlight_symbol("➤ ")
}

fn render_footer<S: KeyValueStorage>(app: &App<S>) -> Paragraph<'_> {
    match app.mode {
        InputMode::Normal => {
            let msg = app
                .status
                .as_deref()
                .unwrap_or("q quit ; a add ; X clear all");
            Paragraph::new(msg).block(Block::default().title("Normal").borders(Borders::ALL))
        }
        InputMode::Editing => {
            let line = Line::from(vec![
                Span::raw("What's your focus today? "),
                Span::styled(&app.input, Style::default().fg(Color::Yellow)),
                Span::raw("█"),
            ]);
            Paragraph::new(line).block(
                Block::default()
                    .title("Input (Enter to add / Esc to cancel)")
                    .borders(Borders::ALL),
            )
        }
    }
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
