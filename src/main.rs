// SPDX-License-Identifier: MIT
//
// fgraph: event inspector front end for the fg-term engine.
//
// Wires the engine together the way the grapher does and shows what it
// decodes: every key, mouse report, paste block, resize and cursor reply
// is listed on a full-screen canvas, newest at the bottom. With `--echo`
// it stays on the main screen and echoes typed characters instead.
//
//   stdin → fg-input thread → queue → Dispatcher::drain_all → Inspector
//   Inspector::render → Canvas → Terminal output → stdout
//
// q (full screen only), Ctrl-C and Ctrl-D quit.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use fg_term::canvas::Canvas;
use fg_term::config::EngineConfig;
use fg_term::dispatch::{Dispatcher, Handler, ListenerResult};
use fg_term::event::{CustomEvent, ErrorEvent, Event, KeyCode, KeyEvent, MouseEvent};
use fg_term::logging;
use fg_term::style::{Color, Style};
use fg_term::terminal::{Size, Terminal};

/// Pause between drain passes.
const FRAME: Duration = Duration::from_millis(16);

/// Event lines kept for display.
const HISTORY: usize = 512;

const TITLE: &str = " fgraph event inspector: q or Ctrl-C quits ";

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fgraph")]
#[command(version)]
#[command(about = "Show the terminal events fg-term decodes", long_about = None)]
struct Cli {
    /// Write a debug log to FILE (filter overridable with FGRAPH_LOG)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Milliseconds a lone ESC waits before it counts as the Escape key
    #[arg(long, value_name = "MS", default_value_t = 100)]
    alt_timeout: u64,

    /// Upper bound on buffered bracketed-paste text
    #[arg(long, value_name = "BYTES", default_value_t = 1 << 20)]
    paste_max_bytes: usize,

    /// Also deliver every event wrapped as an "any" event
    #[arg(long)]
    any_events: bool,

    /// Stop on the first listener failure instead of reporting it
    #[arg(long)]
    no_catch: bool,

    /// Stay on the main screen and echo typed characters
    #[arg(long)]
    echo: bool,

    /// Leave mouse tracking off
    #[arg(long)]
    no_mouse: bool,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_alt_timeout(Duration::from_millis(self.alt_timeout))
            .with_paste_max_bytes(self.paste_max_bytes)
            .with_any_events(self.any_events)
            .with_catch_errors(!self.no_catch)
    }
}

// ─── Inspector ──────────────────────────────────────────────────────────────

/// Owns the terminal and the event history; receives every event through
/// its `Handler` methods.
struct Inspector {
    term: Terminal,
    lines: VecDeque<String>,
    size: Size,
    pointer: Option<(u16, u16)>,
    fullscreen: bool,
    running: bool,
    dirty: bool,
}

impl Inspector {
    fn new(term: Terminal, fullscreen: bool) -> Self {
        let size = term.size();
        Self {
            term,
            lines: VecDeque::with_capacity(HISTORY),
            size,
            pointer: None,
            fullscreen,
            running: true,
            dirty: true,
        }
    }

    fn log(&mut self, line: String) {
        if self.lines.len() == HISTORY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.dirty = true;
    }

    fn render(&mut self) -> std::io::Result<()> {
        self.dirty = false;
        if !self.fullscreen {
            return self.term.output().flush();
        }

        let Size { cols, rows } = self.size;
        // One row short, so the final line break never scrolls the screen.
        let height = rows.saturating_sub(1).max(1);
        let mut canvas = Canvas::styled(cols, height);

        canvas.write_styled_at(0, 0, &clip(TITLE, cols), Style::INVERSE | Style::BOLD);
        let body = usize::from(height - 1);
        let skip = self.lines.len().saturating_sub(body);
        for (y, line) in (1..height).zip(self.lines.iter().skip(skip)) {
            canvas.write_at(0, y, &clip(line, cols));
        }
        if let Some((x, y)) = self.pointer.filter(|&(x, y)| x < cols && y < height) {
            canvas.set_at(x, y, '+');
            canvas.set_style_at(x, y, Style::BOLD.with_fg(Color::Yellow));
        }

        let out = self.term.output();
        out.home();
        canvas.draw(out)
    }
}

/// First `cols` characters of `text`, control characters shown as `·`.
fn clip(text: &str, cols: u16) -> String {
    text.chars()
        .map(|c| if c.is_control() { '·' } else { c })
        .take(usize::from(cols))
        .collect()
}

fn describe_mouse(mouse: &MouseEvent) -> String {
    let mut line = format!("mouse  {:?} at {},{}", mouse.button, mouse.x, mouse.y);
    for (on, name) in [
        (mouse.shift(), " shift"),
        (mouse.alt(), " alt"),
        (mouse.ctrl(), " ctrl"),
        (mouse.hold(), " drag"),
    ] {
        if on {
            line.push_str(name);
        }
    }
    line
}

impl Handler for Inspector {
    fn on_key(&mut self, key: &KeyEvent) -> ListenerResult {
        if self.fullscreen {
            self.log(format!("key    {key}"));
        } else if self.term.echo_key(key) {
            self.dirty = true;
        }
        Ok(())
    }

    fn on_mouse(&mut self, mouse: &MouseEvent) -> ListenerResult {
        self.pointer = Some((mouse.x, mouse.y));
        self.log(describe_mouse(mouse));
        Ok(())
    }

    fn on_paste(&mut self, text: &str) -> ListenerResult {
        let preview: String = text.chars().take(40).collect();
        self.log(format!("paste  {} chars: {preview}", text.chars().count()));
        Ok(())
    }

    fn on_resize(&mut self, size: Size) -> ListenerResult {
        self.size = size;
        self.log(format!("resize {}x{}", size.cols, size.rows));
        Ok(())
    }

    fn on_cursor_position(&mut self, x: u16, y: u16) -> ListenerResult {
        self.log(format!("cursor {x},{y}"));
        Ok(())
    }

    fn on_any(&mut self, event: &Event) -> ListenerResult {
        self.log(format!("  any  {}", event.tag().name()));
        Ok(())
    }

    fn on_error(&mut self, error: &ErrorEvent) -> ListenerResult {
        self.log(format!("error  {}", error.message()));
        Ok(())
    }

    fn on_custom(&mut self, event: &CustomEvent) -> ListenerResult {
        match event.tag.as_str() {
            "stop" => self.running = false,
            tag => self.log(format!("event  {tag} {:?}", event.args)),
        }
        Ok(())
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.engine_config();
    let mut dispatcher = Dispatcher::new(config);
    let mut term = Terminal::new(config, dispatcher.sender());
    term.default_listeners(&mut dispatcher);

    let fullscreen = !cli.echo;
    if fullscreen {
        let quit = dispatcher.sender();
        dispatcher.on(KeyEvent::plain(KeyCode::Char('q')), move |_| {
            quit.send(Event::custom("stop"));
            Ok(())
        });
    }

    term.init().context("failed to put the terminal in raw mode")?;
    if fullscreen {
        term.enter_fullscreen()?;
        if cli.no_mouse {
            term.output().disable_mouse_tracking(false);
        }
        term.output().request_cursor_pos();
        term.output().flush()?;
    } else {
        term.set_echo(true);
    }
    term.start_get_chars().context("failed to start the input thread")?;

    let mut inspector = Inspector::new(term, fullscreen);
    while inspector.running {
        dispatcher.drain_all(&mut inspector)?;
        if inspector.dirty {
            inspector.render()?;
        }
        thread::sleep(FRAME);
    }

    inspector.term.stop()?;
    tracing::info!(events = inspector.lines.len(), "inspector finished");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log {
        logging::init_file_logging(path, "fg_term=debug,fgraph=debug")
            .with_context(|| format!("cannot open log file {}", path.display()))?;
    }
    tracing::debug!(?cli, "starting");

    run(&cli)
}
