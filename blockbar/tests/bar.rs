use blockbar::protocol::SharedBuffer;
use blockbar::signals::realtime_signal;
use blockbar::{Bar, Config, Emitter, EventRouter, Output, Services, SignalBridge, SignalRoutes};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Harness {
    bar: Arc<Bar>,
    emitter: Emitter,
    buffer: SharedBuffer,
}

impl Harness {
    fn new(config: &str) -> Self {
        let config = Config::parse(config, &mut Services::new()).unwrap();
        let bar = Arc::new(Bar::from_config(config));
        let buffer = SharedBuffer::new();
        let output = Arc::new(Output::new(buffer.clone()));
        output.write_header().unwrap();
        bar.start().unwrap();
        bar.prime(Instant::now());
        let emitter = Emitter::new(Arc::clone(&bar), output);
        Self {
            bar,
            emitter,
            buffer,
        }
    }

    fn router(&self) -> EventRouter {
        EventRouter::new(self.emitter.clone())
    }

    fn frames(&self) -> Vec<Vec<Value>> {
        self.buffer
            .contents()
            .lines()
            .skip(2)
            .map(|line| serde_json::from_str(line.trim_start_matches(',')).unwrap())
            .collect()
    }

    /// (instance, full_text) pairs of the newest frame
    fn last_frame(&self) -> Vec<(String, String)> {
        self.frames()
            .last()
            .expect("no frame written")
            .iter()
            .map(|entry| {
                (
                    entry["instance"].as_str().unwrap().to_string(),
                    entry["full_text"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }
}

fn click(name: &str, instance: &str, button: u32) -> String {
    format!(
        r#",{{"name":"{}","instance":"{}","button":{},"x":0,"y":0,"relative_x":20,"width":100}}"#,
        name, instance, button
    )
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display())
}

#[test]
fn test_frames_follow_order() {
    let harness = Harness::new(
        r##"
        order = ["b", "a"]
        [a]
        type = "custom"
        format = "alpha"
        color = "#00ff00"
        [b]
        type = "custom"
        format = "beta"
        "##,
    );
    harness.emitter.emit().unwrap();

    let text = harness.buffer.contents();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(r#"{"version":1,"click_events":true}"#));
    assert_eq!(lines.next(), Some("["));

    let frames = harness.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0][0]["name"], "custom");
    assert_eq!(frames[0][0]["full_text"], "beta");
    assert_eq!(frames[0][1]["full_text"], "alpha");
    assert_eq!(frames[0][1]["color"], "#00ff00");
}

#[test]
fn test_unknown_targets_are_ignored() {
    let harness = Harness::new(
        r#"
        order = ["a"]
        [a]
        type = "custom"
        format = "alpha"
        "#,
    );
    let router = harness.router();

    assert!(!router.handle_line(&click("custom", "missing", 1)).unwrap());
    assert!(!router.handle_line(&click("custom", "a.child", 1)).unwrap());
    assert!(!router.handle_line(&click("internal/menu", "a", 1)).unwrap());
    assert!(!router.handle_line(&click("custom", "a", 9)).unwrap());
    assert!(!router.handle_line(",{\"name\":").unwrap());
    assert!(harness.frames().is_empty());

    assert!(router.handle_line(&click("custom", "a", 1)).unwrap());
    assert_eq!(harness.last_frame(), vec![("a".to_string(), "alpha".to_string())]);
}

#[test]
fn test_menu_expands_through_event_stream() {
    let harness = Harness::new(
        r#"
        order = ["menu", "tail"]
        [menu]
        type = "internal/menu"
        format = "menu"
        [menu.one]
        format = "first"
        [menu.two]
        format = "second"
        [tail]
        type = "custom"
        format = "tail"
        "#,
    );

    let input = [
        "[".to_string(),
        click("internal/menu", "menu", 1).trim_start_matches(',').to_string(),
        "this line is garbage".to_string(),
        click("custom", "menu.two", 1),
    ]
    .join("\n");
    harness.router().run(Cursor::new(input)).unwrap();

    let frames = harness.frames();
    assert_eq!(frames.len(), 2);

    let instances: Vec<&str> = frames[0]
        .iter()
        .map(|e| e["instance"].as_str().unwrap())
        .collect();
    assert_eq!(instances, vec!["menu.one", "menu.two", "menu", "tail"]);
    assert_eq!(frames[0][0]["separator"], false);
    assert_eq!(frames[0][0]["full_text"], "first");

    // the click on a child left the menu expanded
    assert_eq!(frames[1].len(), 4);
    assert!(harness.bar.blocks()[0].is_expanded());

    harness
        .router()
        .handle_line(&click("internal/menu", "menu", 3))
        .unwrap();
    assert!(harness.bar.blocks()[0].is_expanded());

    harness
        .router()
        .handle_line(&click("internal/menu", "menu", 1))
        .unwrap();
    let instances: Vec<String> = harness.last_frame().into_iter().map(|(i, _)| i).collect();
    assert_eq!(instances, vec!["menu", "tail"]);
}

#[test]
fn test_click_command_and_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state");
    std::fs::write(&state, "before\n").unwrap();

    let harness = Harness::new(&format!(
        r#"
        order = ["a"]
        [a]
        type = "custom"
        format = "%text%"
        interval = 0
        text-command = "cat {state}"
        [a.click]
        command = "echo after > {state}"
        blocking = true
        "#,
        state = shell_quote(&state)
    ));
    harness.emitter.emit().unwrap();
    assert_eq!(harness.last_frame()[0].1, "before");

    assert!(harness.router().handle_line(&click("custom", "a", 1)).unwrap());
    assert_eq!(harness.last_frame()[0].1, "after");
}

#[test]
fn test_slider_entry_follows_click() {
    let harness = Harness::new(
        r##"
        order = ["v"]
        [v]
        type = "custom"
        format = "%value%"
        value-command = "echo 40"
        [v.click]
        slider-show = "toggle"
        [v.slider]
        width = 5
        fill = "#"
        empty = "-"
        "##,
    );
    let router = harness.router();

    assert!(router.handle_line(&click("custom", "v", 1)).unwrap());
    assert_eq!(
        harness.last_frame(),
        vec![
            ("v-slider".to_string(), "##---".to_string()),
            ("v".to_string(), "40".to_string()),
        ]
    );

    // slider clicks reach the block even without a slider command
    assert!(router.handle_line(&click("custom", "v-slider", 1)).unwrap());

    assert!(router.handle_line(&click("custom", "v", 1)).unwrap());
    assert_eq!(harness.last_frame(), vec![("v".to_string(), "40".to_string())]);
}

fn counter_config(state: &Path, offset: i64) -> String {
    format!(
        r#"
        order = ["a", "b"]
        [a]
        type = "custom"
        format = "%text%"
        interval = 0
        signal = {offset}
        text-command = "cat {state}"
        [b]
        type = "custom"
        format = "b"
        "#,
        state = shell_quote(state),
        offset = offset,
    )
}

#[test]
fn test_signal_delivery_refreshes_bound_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state");
    std::fs::write(&state, "one\n").unwrap();

    let harness = Harness::new(&counter_config(&state, 4));
    let routes = SignalRoutes::new(&harness.bar);
    let signal = realtime_signal(4).unwrap();
    assert_eq!(routes.signals(), vec![signal]);

    let bridge = SignalBridge::new(routes, harness.emitter.clone());
    std::fs::write(&state, "two\n").unwrap();

    assert!(!bridge.deliver(signal + 1).unwrap());
    assert!(harness.frames().is_empty());

    assert!(bridge.deliver(signal).unwrap());
    assert_eq!(harness.last_frame()[0], ("a".to_string(), "two".to_string()));
}

#[test]
fn test_raised_signal_reaches_worker() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state");
    std::fs::write(&state, "one\n").unwrap();

    let harness = Harness::new(&counter_config(&state, 1));
    let routes = SignalRoutes::new(&harness.bar);
    SignalBridge::new(routes, harness.emitter.clone())
        .spawn()
        .unwrap();

    std::fs::write(&state, "two\n").unwrap();
    signal_hook::low_level::raise(realtime_signal(1).unwrap()).unwrap();

    // unbound real-time signals are absorbed
    signal_hook::low_level::raise(realtime_signal(2).unwrap()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if harness
            .frames()
            .last()
            .map_or(false, |frame| frame[0]["full_text"] == "two")
        {
            break;
        }
        assert!(Instant::now() < deadline, "no frame after signal");
        std::thread::sleep(Duration::from_millis(10));
    }
}
