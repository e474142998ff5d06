// SPDX-License-Identifier: MIT
//
// End-to-end: raw input bytes → decoder → queue → dispatcher → canvas →
// output bytes. Everything runs on the test thread with explicit
// instants, so nothing here touches the real terminal.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use fg_term::canvas::Canvas;
use fg_term::config::EngineConfig;
use fg_term::dispatch::{Dispatcher, Handler, ListenerResult};
use fg_term::event::{CustomEvent, ErrorEvent, Event, KeyCode, Matcher};
use fg_term::input::Decoder;
use fg_term::output::Output;
use fg_term::style::{Color, Style};
use fg_term::terminal::Terminal;

/// Decode `bytes` and queue every resulting event on `dispatcher`.
fn feed(dispatcher: &Dispatcher, decoder: &mut Decoder, bytes: &[u8], now: Instant) {
    let sender = dispatcher.sender();
    let mut events = Vec::new();
    decoder.feed_all(bytes, now, &mut events);
    for event in events {
        sender.send(event);
    }
}

fn decoder(config: &EngineConfig) -> Decoder {
    Decoder::new(config, Arc::new(AtomicBool::new(true)))
}

fn drawn(canvas: &Canvas) -> String {
    let mut out = Output::new(Vec::new());
    canvas.draw(&mut out).unwrap();
    String::from_utf8(out.sink().clone()).unwrap()
}

#[derive(Default)]
struct App {
    running: bool,
    errors: Vec<String>,
    pastes: Vec<String>,
}

impl Handler for App {
    fn on_custom(&mut self, event: &CustomEvent) -> ListenerResult {
        match event.tag.as_str() {
            "start" => self.running = true,
            "stop" => self.running = false,
            _ => {}
        }
        Ok(())
    }

    fn on_error(&mut self, error: &ErrorEvent) -> ListenerResult {
        self.errors.push(error.message());
        Ok(())
    }

    fn on_paste(&mut self, text: &str) -> ListenerResult {
        self.pastes.push(text.to_owned());
        Ok(())
    }
}

#[test]
fn typed_keys_land_on_canvas() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let mut decoder = decoder(&config);

    let canvas = Rc::new(RefCell::new(Canvas::new(4, 2)));
    let cursor = Rc::new(RefCell::new((0u16, 0u16)));
    {
        let canvas = Rc::clone(&canvas);
        let cursor = Rc::clone(&cursor);
        dispatcher.on("key", move |event| {
            let Some(key) = (match event {
                Event::Key(k) => Some(k),
                _ => None,
            }) else {
                return Ok(());
            };
            let mut pos = cursor.borrow_mut();
            match key.code {
                KeyCode::Char(c) => {
                    canvas.borrow_mut().set_at(pos.0, pos.1, c);
                    pos.0 += 1;
                }
                KeyCode::Enter => *pos = (0, pos.1 + 1),
                _ => {}
            }
            Ok(())
        });
    }

    feed(&dispatcher, &mut decoder, b"hi\rok", Instant::now());
    assert_eq!(dispatcher.drain_all(&mut ()).unwrap(), 5);

    assert_eq!(canvas.borrow().get_line(0), "hi  ");
    assert_eq!(canvas.borrow().get_line(1), "ok  ");
    assert_eq!(
        drawn(&canvas.borrow()),
        "hi\x1b[0K\r\nok\x1b[0K\r\n"
    );
}

#[test]
fn ctrl_c_stops_through_default_listeners() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let term = Terminal::with_output(config, dispatcher.sender(), Output::new(Vec::new()));
    term.default_listeners(&mut dispatcher);
    let mut decoder = decoder(&config);
    let mut app = App::default();

    dispatcher.queue_event(Event::custom("start"));
    dispatcher.drain_all(&mut app).unwrap();
    assert!(app.running);

    feed(&dispatcher, &mut decoder, b"x\x03", Instant::now());
    // The Ctrl-C listener queues "stop" behind the keys; the same drain
    // delivers it.
    dispatcher.drain_all(&mut app).unwrap();
    assert!(!app.running);
}

#[test]
fn arrow_listener_and_bare_name() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let mut decoder = decoder(&config);
    let moves = Rc::new(RefCell::new(Vec::new()));
    for name in ["up", "down"] {
        let moves = Rc::clone(&moves);
        dispatcher.on(name, move |_| {
            moves.borrow_mut().push(name);
            Ok(())
        });
    }

    feed(&dispatcher, &mut decoder, b"\x1b[A\x1b[B\x1bOA\x1b[1;5A", Instant::now());
    dispatcher.drain_all(&mut ()).unwrap();
    assert_eq!(*moves.borrow(), vec!["up", "down", "up", "up"]);
}

#[test]
fn paste_arrives_as_one_event() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let mut decoder = decoder(&config);
    let mut app = App::default();

    let now = Instant::now();
    feed(&dispatcher, &mut decoder, b"\x1b[200~line one\r", now);
    feed(&dispatcher, &mut decoder, b"line two\x1b[201~", now);
    assert_eq!(dispatcher.drain_all(&mut app).unwrap(), 1);
    assert_eq!(app.pastes, vec!["line one\nline two".to_owned()]);

    let mut canvas = Canvas::new(8, 3);
    canvas.write_at(0, 0, &app.pastes[0]);
    assert_eq!(canvas.get_line(0), "line one");
    assert_eq!(canvas.get_line(1), "line two");
    assert_eq!(canvas.get_line(2), "        ");
}

#[test]
fn lone_escape_after_timeout() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let mut decoder = decoder(&config);
    let escapes = Rc::new(RefCell::new(0));
    {
        let escapes = Rc::clone(&escapes);
        dispatcher.on(KeyCode::Escape, move |_| {
            *escapes.borrow_mut() += 1;
            Ok(())
        });
    }

    let t0 = Instant::now();
    feed(&dispatcher, &mut decoder, b"\x1b", t0);
    dispatcher.drain_all(&mut ()).unwrap();
    assert_eq!(*escapes.borrow(), 0);

    let mut events = Vec::new();
    decoder.tick(t0 + config.alt_timeout + Duration::from_millis(1), &mut events);
    for event in events {
        dispatcher.queue_event(event);
    }
    dispatcher.drain_all(&mut ()).unwrap();
    assert_eq!(*escapes.borrow(), 1);
}

#[test]
fn mouse_click_at_position() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let mut decoder = decoder(&config);
    let canvas = Rc::new(RefCell::new(Canvas::new(6, 12)));
    {
        let canvas = Rc::clone(&canvas);
        dispatcher.on(Matcher::MousePos(4, 9), move |_| {
            canvas.borrow_mut().set_at(4, 9, '*');
            Ok(())
        });
    }

    feed(&dispatcher, &mut decoder, &[0x1b, b'[', b'M', 32, 32 + 5, 32 + 10], Instant::now());
    feed(&dispatcher, &mut decoder, &[0x1b, b'[', b'M', 32, 32 + 1, 32 + 1], Instant::now());
    dispatcher.drain_all(&mut ()).unwrap();
    assert_eq!(canvas.borrow().get_at(4, 9), '*');
    assert_eq!(canvas.borrow().get_at(0, 0), ' ');
}

#[test]
fn failing_listener_becomes_error_event() {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(config);
    let mut decoder = decoder(&config);
    let mut app = App::default();
    let after = Rc::new(RefCell::new(false));

    dispatcher.on("q", |_| Err("no quitting yet".into()));
    {
        let after = Rc::clone(&after);
        dispatcher.on("q", move |_| {
            *after.borrow_mut() = true;
            Ok(())
        });
    }

    feed(&dispatcher, &mut decoder, b"q", Instant::now());
    dispatcher.drain_all(&mut app).unwrap();
    assert!(*after.borrow());
    assert_eq!(app.errors, vec!["no quitting yet".to_owned()]);
}

#[test]
fn styled_canvas_frame_bytes() {
    let mut canvas = Canvas::styled(2, 1);
    canvas.write_styled_at(0, 0, "a", Style::BOLD | Style::fg(Color::Red));
    canvas.set_at(1, 0, 'b');
    assert_eq!(drawn(&canvas), "\x1b[0m\x1b[1;31ma\x1b[0mb\r\n");
}

#[test]
fn sub_and_blit_compose_frames() {
    let mut graph = Canvas::filled(3, 2, '.');
    graph.set_at(1, 1, '#');
    let mut screen = Canvas::new(5, 3);
    screen.blit(&graph, 2, 1);

    assert_eq!(screen.get_line(0), "     ");
    assert_eq!(screen.get_line(1), "  ...");
    assert_eq!(screen.get_line(2), "  .#.");
    assert_eq!(screen.sub(2, 1, 3, 2).get_line(1), ".#.");
    assert_eq!(drawn(&screen), "\x1b[0K\r\n  ...\r\n  .#.\r\n");
}
