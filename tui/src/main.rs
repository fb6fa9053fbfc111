use anyhow::Result;
use clap::Parser;
use config::{load_env_file, Settings};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use picstash_core::{
    FsImageStore, GalleryEngine, GalleryEvent, GallerySession, HttpImageStore, ImageStore, Phase,
    UploadFile,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[cfg(not(debug_assertions))]
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

#[derive(Parser, Debug)]
#[command(name = "picstash", about = "Modal image gallery and picker")]
struct Args {
    /// Gallery server base URL (e.g. http://127.0.0.1:7878)
    #[arg(long, env = "PICSTASH_SERVER")]
    server: Option<String>,

    /// Browse a local image directory directly, without a server
    #[arg(long, env = "PICSTASH_DIR")]
    dir: Option<PathBuf>,

    /// Public URL prefix for locally stored images
    #[arg(long, env = "PICSTASH_PUBLIC_BASE")]
    public_base: Option<String>,
}

/// What the key handler is currently routed to
enum Mode {
    Browse,
    /// Prompting for files to upload
    UploadPrompt,
    /// Waiting for the user to confirm a delete
    ConfirmDelete { filename: String },
}

struct App {
    session: GallerySession,
    engine: GalleryEngine,
    mode: Mode,
    upload_input: Input,
    cursor: usize,
    status_message: Option<String>,
    spinner_frame: usize,
    should_quit: bool,
}

impl App {
    fn new(engine: GalleryEngine, session: GallerySession) -> Self {
        App {
            session,
            engine,
            mode: Mode::Browse,
            upload_input: Input::default(),
            cursor: 0,
            status_message: None,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    fn cursor_image_filename(&self) -> Option<String> {
        self.session
            .images()
            .get(self.cursor)
            .map(|image| image.filename.clone())
    }

    fn move_cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_cursor_down(&mut self) {
        let last = self.session.images().len().saturating_sub(1);
        self.cursor = (self.cursor + 1).min(last);
    }

    fn get_spinner(&self) -> &'static str {
        const BRAILLE_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
        BRAILLE_FRAMES[self.spinner_frame % BRAILLE_FRAMES.len()]
    }

    fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    fn check_engine_events(&mut self) {
        while let Some(event) = self.engine.try_recv() {
            match event {
                GalleryEvent::Images(images) => {
                    self.session.set_images(images);
                    let last = self.session.images().len().saturating_sub(1);
                    self.cursor = self.cursor.min(last);
                }
                GalleryEvent::UploadDone { errors } => {
                    self.session.finish_upload();
                    self.status_message = if errors.is_empty() {
                        Some("Upload complete".to_string())
                    } else {
                        Some(format!("Uploaded with errors: {}", errors.join(", ")))
                    };
                }
                GalleryEvent::UploadFailed(message) => {
                    self.session.finish_upload();
                    self.status_message = Some(format!("Upload failed: {}", message));
                }
                GalleryEvent::Deleted(filename) => {
                    // Clear a selection pointing at the deleted file right
                    // away; the refresh that follows would do it too
                    if self
                        .session
                        .selected()
                        .is_some_and(|image| image.filename == filename)
                    {
                        self.session.clear_selection();
                    }
                    self.status_message = Some(format!("Deleted {}", filename));
                }
                GalleryEvent::DeleteFailed(message) => {
                    self.status_message = Some(format!("Delete failed: {}", message));
                }
                GalleryEvent::Error(message) => {
                    self.status_message = Some(format!("Error: {}", message));
                }
            }
        }
    }

    /// Copy a URL to the system clipboard. Failures are logged, never
    /// surfaced as a blocking error.
    fn copy_url(&mut self, url: &str) {
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url.to_string()))
        {
            Ok(()) => {
                tracing::info!("copied {} to clipboard", url);
                self.status_message = Some("URL copied".to_string());
            }
            Err(e) => {
                tracing::warn!("clipboard copy failed: {}", e);
            }
        }
    }

    /// Read the paths in the upload prompt and dispatch one batch upload
    fn submit_upload_prompt(&mut self) {
        let value = self.upload_input.value().to_string();
        self.upload_input.reset();
        self.mode = Mode::Browse;

        let paths: Vec<&str> = value.split_whitespace().collect();
        if paths.is_empty() {
            return;
        }

        let mut files = Vec::new();
        let mut read_errors = Vec::new();
        for path in paths {
            match std::fs::read(path) {
                Ok(data) => {
                    let original = std::path::Path::new(path)
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or(path)
                        .to_string();
                    files.push(UploadFile::new(original, data));
                }
                Err(e) => {
                    tracing::warn!("could not read {}: {}", path, e);
                    read_errors.push(format!("Could not read file: {}", path));
                }
            }
        }

        if files.is_empty() {
            self.status_message = Some(read_errors.join(", "));
            return;
        }
        if !read_errors.is_empty() {
            self.status_message = Some(read_errors.join(", "));
        }

        if self.session.begin_upload() {
            self.engine.upload(files);
        } else {
            self.status_message = Some("Cannot upload right now".to_string());
        }
    }

    fn handle_key_event(&mut self, key: crossterm::event::KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.session.close();
            self.should_quit = true;
            return;
        }

        // Carry the pending filename out of the mode first so the mode
        // can be replaced while handling the key
        if let Mode::ConfirmDelete { filename } = &self.mode {
            let filename = filename.clone();
            self.handle_confirm_key(key.code, filename);
            return;
        }

        match self.mode {
            Mode::Browse => self.handle_browse_key(key.code),
            Mode::UploadPrompt => self.handle_upload_prompt_key(key),
            Mode::ConfirmDelete { .. } => {}
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode, filename: String) {
        self.mode = Mode::Browse;
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.engine.delete(filename);
            }
            // Declining aborts with no side effects
            _ => {}
        }
    }

    fn handle_upload_prompt_key(&mut self, key: crossterm::event::KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.upload_input.reset();
                self.mode = Mode::Browse;
            }
            KeyCode::Enter => self.submit_upload_prompt(),
            _ => {
                self.upload_input.handle_event(&Event::Key(key));
            }
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.session.close();
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor_down(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(filename) = self.cursor_image_filename() {
                    self.session.select(&filename);
                }
            }
            KeyCode::Char('i') => {
                if self.session.can_insert() {
                    self.session.confirm_insert();
                    self.should_quit = true;
                }
            }
            KeyCode::Char('u') => {
                if self.session.phase() == Phase::Uploading {
                    // The upload affordance is disabled while a batch is
                    // outstanding
                    self.status_message = Some("Upload already in progress".to_string());
                } else {
                    self.mode = Mode::UploadPrompt;
                }
            }
            KeyCode::Char('d') => {
                if let Some(filename) = self.cursor_image_filename() {
                    self.mode = Mode::ConfirmDelete { filename };
                }
            }
            KeyCode::Char('c') => {
                if let Some(url) = self
                    .session
                    .images()
                    .get(self.cursor)
                    .map(|image| image.url.clone())
                {
                    self.copy_url(&url);
                }
            }
            KeyCode::Char('r') => {
                self.engine.refresh();
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Gallery
            Constraint::Length(3), // Upload prompt / key hints
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    render_gallery(f, app, chunks[0]);

    match app.mode {
        Mode::UploadPrompt => {
            let input_widget = Paragraph::new(app.upload_input.value())
                .style(Style::default().fg(Color::White))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Upload files (space-separated paths, Enter to send, Esc to cancel)"),
                );
            f.render_widget(input_widget, chunks[1]);
            f.set_cursor_position((
                chunks[1].x + app.upload_input.visual_cursor() as u16 + 1,
                chunks[1].y + 1,
            ));
        }
        _ => {
            let hints = Paragraph::new(
                "↑/↓ move · Enter select · i insert · u upload · d delete · c copy url · r refresh · q quit",
            )
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(hints, chunks[1]);
        }
    }

    render_status_bar(f, app, chunks[2]);

    if let Mode::ConfirmDelete { filename } = &app.mode {
        render_confirm_popup(f, filename, chunks[0]);
    }
}

fn render_gallery(f: &mut Frame, app: &mut App, area: Rect) {
    let count = app.session.images().len();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Images ({})", count));

    if app.session.phase() == Phase::Loading {
        let placeholder = Paragraph::new(format!("{} Loading images...", app.get_spinner()))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    if count == 0 {
        let placeholder = Paragraph::new("No images uploaded yet. Press u to upload some.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let selected_filename = app
        .session
        .selected()
        .map(|image| image.filename.clone());

    let items: Vec<ListItem> = app
        .session
        .images()
        .iter()
        .map(|image| {
            let is_selected = selected_filename.as_deref() == Some(image.filename.as_str());
            let marker = if is_selected { "✔ " } else { "  " };
            let size_kb = image.size / 1024;

            let style = if is_selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{}", marker, image.filename), style),
                Span::styled(
                    format!("  {} KB", size_kb),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(app.cursor));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let phase_note = match app.session.phase() {
        Phase::Loading => format!("{} Loading...", app.get_spinner()),
        Phase::Uploading => format!("{} Uploading...", app.get_spinner()),
        Phase::Ready => {
            if app.session.can_insert() {
                "selection ready - press i to insert".to_string()
            } else {
                "no selection".to_string()
            }
        }
    };

    let status_text = if let Some(ref message) = app.status_message {
        format!(" {} | {} ", phase_note, message)
    } else {
        format!(" {} ", phase_note)
    };

    let status_bar =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(status_bar, area);
}

fn render_confirm_popup(f: &mut Frame, filename: &str, area: Rect) {
    let popup_area = centered_rect(area, 60, 5);

    let text = vec![
        Line::from(format!("Delete {}?", filename)),
        Line::from(""),
        Line::from(Span::styled(
            "y = delete, any other key = cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let popup = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Confirm delete")
            .style(Style::default().fg(Color::Red)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

/// Fixed-size rect centered inside the given area
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env files
    load_env_file();
    let args = Args::parse();

    // Setup file-based logging; the terminal belongs to the UI.
    // In dev mode, use a local ./picstash.log that gets recreated on each
    // run; in release mode, use the data directory with daily rotation.
    #[cfg(debug_assertions)]
    let log_file = {
        let path = PathBuf::from("./picstash.log");
        let _ = std::fs::remove_file(&path);
        std::fs::File::create(&path)?
    };
    #[cfg(debug_assertions)]
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    #[cfg(not(debug_assertions))]
    let (non_blocking, _guard) = {
        let log_dir = config::PathManager::logs_dir().unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&log_dir)?;
        let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "picstash.log");
        tracing_appender::non_blocking(file_appender)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Starting picstash gallery");

    let settings = Settings::load();
    let public_base = args
        .public_base
        .unwrap_or_else(|| settings.public_base.clone());

    let store: Arc<dyn ImageStore> = if let Some(dir) = args.dir {
        Arc::new(FsImageStore::new(dir, public_base))
    } else {
        let url = args.server.unwrap_or_else(|| settings.server_url());
        Arc::new(HttpImageStore::new(&url))
    };

    // The snippet lands here when the user confirms a selection; it is
    // printed for the host once the terminal is restored
    let inserted: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&inserted);
    let session = GallerySession::open(Box::new(move |snippet| {
        *sink.lock().unwrap() = Some(snippet);
    }));

    let engine = GalleryEngine::new(store);
    engine.refresh();

    let mut app = App::new(engine, session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    while !app.should_quit {
        terminal.draw(|f| ui(f, &mut app))?;

        app.check_engine_events();
        if app.session.phase() != Phase::Ready {
            app.advance_spinner();
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key_event(key);
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Hand the snippet to the host
    if let Some(snippet) = inserted.lock().unwrap().take() {
        println!("{}", snippet);
    }

    Ok(())
}
