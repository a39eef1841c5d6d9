use crate::cli::{build_config, Cli};
use crate::classifier::{Classifier, HttpClassifier};
use crate::recipes::RecipeBook;
use crate::session::{Session, SessionState};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Commands emitted by the UI thread to drive the session.
#[derive(Debug, Clone)]
enum UiCommand {
    SelectImage(PathBuf),
    Classify,
    ToggleRecipe,
    Reset,
    Quit,
}

/// Updates flowing back from the controller to the UI thread.
#[derive(Debug)]
enum UiUpdate {
    State(SessionState),
    Notice(String),
}

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels both ways; neither side may block the other.
    let (update_tx, update_rx) = mpsc::unbounded_channel::<UiUpdate>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(update_rx, cmd_tx));

    let res = run_controller(&args, update_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Own the session inside the runtime and apply completions as they land.
async fn run_controller(
    args: &Cli,
    update_tx: UnboundedSender<UiUpdate>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let cfg = build_config(args);
    let classifier: Arc<dyn Classifier> =
        Arc::new(HttpClassifier::new(&cfg).context("set up classifier client")?);
    let book = RecipeBook::load()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(classifier, event_tx);

    if let Some(path) = args.image.clone() {
        session.select_image(path);
        let _ = update_tx.send(UiUpdate::State(session.state().clone()));
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::SelectImage(path)) => session.select_image(path),
                    Some(UiCommand::Classify) => {
                        if let Err(e) = session.classify() {
                            let _ = update_tx.send(UiUpdate::Notice(e.to_string()));
                        }
                    }
                    Some(UiCommand::ToggleRecipe) => {
                        if let Err(e) = session.toggle_recipe(&book) {
                            let _ = update_tx.send(UiUpdate::Notice(e.to_string()));
                        }
                    }
                    Some(UiCommand::Reset) => session.reset(),
                    Some(UiCommand::Quit) | None => break,
                }
                let _ = update_tx.send(UiUpdate::State(session.state().clone()));
            }
            ev = event_rx.recv() => {
                // The session keeps a sender alive, so this never yields None.
                if let Some(ev) = ev {
                    if let Some(notice) = session.apply(ev) {
                        let _ = update_tx.send(UiUpdate::Notice(notice));
                    }
                    let _ = update_tx.send(UiUpdate::State(session.state().clone()));
                }
            }
        }
    }

    Ok(())
}

/// UI-thread-local view state; the session snapshot is replaced wholesale
/// on every update.
struct UiState {
    session: SessionState,
    info: String,
    input: String,
    editing: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            session: SessionState::default(),
            info: String::new(),
            input: String::new(),
            editing: false,
        }
    }
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut update_rx: UnboundedReceiver<UiUpdate>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // The resolver is read-only; the UI thread keeps its own copy for
    // rendering the recipe panel.
    let book = RecipeBook::load()?;
    let mut state = UiState::default();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain updates without blocking to keep the UI responsive.
        while let Ok(update) = update_rx.try_recv() {
            match update {
                UiUpdate::State(session) => state.session = session,
                UiUpdate::Notice(notice) => state.info = notice,
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &book)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if state.editing {
                    match k.code {
                        KeyCode::Enter => {
                            let path = state.input.trim().to_string();
                            state.editing = false;
                            if !path.is_empty() {
                                state.info.clear();
                                let _ = cmd_tx.send(UiCommand::SelectImage(PathBuf::from(path)));
                            }
                        }
                        KeyCode::Esc => {
                            state.editing = false;
                            state.input.clear();
                        }
                        KeyCode::Backspace => {
                            state.input.pop();
                        }
                        KeyCode::Char(c) => state.input.push(c),
                        _ => {}
                    }
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('o')) => {
                        state.editing = true;
                        state.input.clear();
                    }
                    (_, KeyCode::Char('i')) => {
                        state.info.clear();
                        let _ = cmd_tx.send(UiCommand::Classify);
                    }
                    (_, KeyCode::Char('r')) => {
                        state.info.clear();
                        let _ = cmd_tx.send(UiCommand::ToggleRecipe);
                    }
                    (_, KeyCode::Char('n')) => {
                        state.info.clear();
                        state.input.clear();
                        let _ = cmd_tx.send(UiCommand::Reset);
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn draw(area: Rect, f: &mut Frame, state: &UiState, book: &RecipeBook) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "dishlens",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  identify Nigerian dishes & get recipes"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let mut lines: Vec<Line> = Vec::new();
    let session = &state.session;

    if state.editing {
        lines.push(Line::from(vec![
            Span::styled("Photo path: ", Style::default().fg(Color::Gray)),
            Span::raw(state.input.clone()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]));
        lines.push(Line::from(""));
    }

    match (&session.selected_image, &session.preview) {
        (Some(image), Some(preview)) => {
            lines.push(Line::from(vec![
                Span::styled("Photo: ", Style::default().fg(Color::Gray)),
                Span::raw(format!(
                    "{} ({}x{}, {})",
                    image.file_name, preview.width, preview.height, preview.mime
                )),
            ]));
        }
        _ => {
            lines.push(Line::from(Span::styled(
                "No photo selected — press o and enter a path",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    if session.busy {
        lines.push(Line::from(Span::styled(
            "Analyzing…",
            Style::default().fg(Color::Cyan),
        )));
    }

    if let Some(label) = &session.prediction_label {
        let confidence = session.confidence_score.unwrap_or(0.0);
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Dish: ", Style::default().fg(Color::Gray)),
            Span::styled(
                label.clone(),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  ({:.0}% confidence)", confidence * 100.0)),
        ]));

        match book.resolve(label) {
            Some(recipe) if session.recipe_expanded => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("How to make {label}"),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(format!(
                    "Cook time: {}   Servings: {}",
                    recipe.cook_time, recipe.servings
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Ingredients",
                    Style::default().fg(Color::Yellow),
                )));
                for ingredient in &recipe.ingredients {
                    lines.push(Line::from(format!("  - {ingredient}")));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Instructions",
                    Style::default().fg(Color::Yellow),
                )));
                for (i, step) in recipe.instructions.iter().enumerate() {
                    lines.push(Line::from(format!("  {}. {step}", i + 1)));
                }
            }
            Some(_) => {
                lines.push(Line::from(Span::styled(
                    "Press r to view the recipe",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    "Recipe not available for this dish",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, chunks[1]);

    let mut footer_spans = vec![Span::styled(
        "o photo  i identify  r recipe  n new search  q quit",
        Style::default().fg(Color::Gray),
    )];
    if !state.info.is_empty() {
        footer_spans.push(Span::raw("   "));
        footer_spans.push(Span::styled(
            state.info.clone(),
            Style::default().fg(Color::Red),
        ));
    }
    let footer =
        Paragraph::new(Line::from(footer_spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}
