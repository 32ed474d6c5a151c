//! Autocomp - Main entry point.
//!
//! A small interactive session for exercising the completion pipeline: a
//! scratch buffer backed by the buffer-words service. Type to trigger the
//! panel, navigate it with the arrow keys, commit with enter/tab.
//!
//! Usage: autocomp [OPTIONS]
//!
//! Options:
//!   --version, -v    Show version
//!
//! Keys: Ctrl+Space invokes completion manually, Ctrl+Q quits.

use std::env;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::Paragraph,
};

use autocomp::config::Config;
use autocomp::editor::{EditorView, ScratchBuffer, ViewId};
use autocomp::language::LanguageRegistry;
use autocomp::logging;
use autocomp::panel::widget::{PanelWidget, panel_key};
use autocomp::pipeline::CompletionPipeline;
use autocomp::words::BufferWordsService;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seed text so the words service has something to offer immediately.
const SEED: &str = "fn first_sample() {}\nfn further_sample() {}\nlet favorite = 1;\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("autocomp v{}", VERSION);
        return Ok(());
    }

    let config = Config::load().unwrap_or_default();
    if let Err(e) = logging::init(&config.log_config) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = ScratchBuffer::from_text(ViewId(1), "rust", SEED);
    let mut pipeline = CompletionPipeline::new(
        config.completion,
        LanguageRegistry::new(),
        Arc::new(BufferWordsService::new()),
    );
    pipeline.start();

    loop {
        pipeline.pump(&mut view);
        terminal.draw(|frame| draw(frame, &view, &pipeline))?;

        if !event::poll(Duration::from_millis(30))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Quit and manual invoke come before panel handling.
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char(' ') => {
                    pipeline.invoke(&view);
                    continue;
                }
                _ => {}
            }
        }

        if let Some(panel_key) = panel_key(&key) {
            if pipeline.handle_key(&mut view, panel_key) {
                continue;
            }
        }

        match key.code {
            KeyCode::Char(ch) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
                view.type_char(ch);
                pipeline.on_char_modified(&view, Some(ch));
            }
            KeyCode::Enter => {
                view.type_char('\n');
                pipeline.on_char_modified(&view, Some('\n'));
            }
            KeyCode::Backspace => {
                view.backspace();
                pipeline.on_char_modified(&view, None);
            }
            KeyCode::Left => {
                let cursor = view.cursor().saturating_sub(1);
                view.set_cursor(cursor);
                pipeline.on_pos_changed(&view, cursor, false);
            }
            KeyCode::Right => {
                let cursor = (view.cursor() + 1).min(view.len_chars());
                view.set_cursor(cursor);
                pipeline.on_pos_changed(&view, cursor, false);
            }
            _ => {}
        }
    }

    pipeline.stop();
    Ok(())
}

fn draw(frame: &mut ratatui::Frame<'_>, view: &ScratchBuffer, pipeline: &CompletionPipeline) {
    let area = frame.area();

    let lines: Vec<Line> = view.text().lines().map(|l| Line::raw(l.to_string())).collect();
    frame.render_widget(Paragraph::new(lines), area);

    let status = Rect::new(0, area.height.saturating_sub(1), area.width, 1);
    frame.render_widget(
        Paragraph::new("Ctrl+Space: complete  Ctrl+Q: quit")
            .style(Style::default().fg(Color::DarkGray)),
        status,
    );

    let cursor = view.cursor();
    let line = view.line_of(cursor);
    let col = cursor - view.line_start(line);
    frame.set_cursor_position((col as u16, line as u16));

    if let Some(panel_view) = pipeline.panel_view() {
        frame.render_widget(
            PanelWidget::new(&panel_view, (col as u16, line as u16)),
            area,
        );
    }
}
