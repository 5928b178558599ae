//! Block engine
//!
//! A [`Block`] owns one status unit's render state and runs a private update
//! loop. Nobody refreshes a block directly: callers record the freshness
//! point they need with [`Block::request_update`] and, when they must not
//! print stale text, wait for the loop to catch up with it.
//!
//! Requests coalesce to the newest timestamp, so a burst of forced updates
//! arriving while a refresh is in flight costs at most one more refresh.
//! Timestamps are monotonic; stepping the wall clock back does not make
//! later requests look stale.

mod command;
mod settings;
mod source;

pub use command::{shell, Launcher};
pub use settings::{
    ClickSettings, CompositeSettings, Interval, Settings, SliderSettings, SliderToggle,
};
pub use source::{MouseAction, Reading, RefreshContext, Source};

use crate::config::BlockConfig;
use crate::protocol::Entry;
use crate::template;
use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Freshness point of a block
pub type Timestamp = Instant;

/// Suffix of the protocol instance carrying a block's slider
pub const SLIDER_SUFFIX: &str = "-slider";

/// Kind tag and names of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub kind: String,
    /// Name within the parent scope
    pub name: String,
    /// Dot-separated path from the top level, unique across the bar
    pub instance: String,
}

impl Identity {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: kind.into(),
            instance: name.clone(),
            name,
        }
    }

    /// Identity of a child nested under this block
    pub fn child(&self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: kind.into(),
            instance: format!("{}.{}", self.instance, name),
            name,
        }
    }
}

/// `None` orders before every timestamp: nothing requested, never refreshed
struct State {
    requested: Option<Timestamp>,
    last_update: Option<Timestamp>,
    value: Option<f64>,
    text: String,
    overrides: BTreeMap<String, Value>,
}

/// Consistent copy of a block's displayable state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub text: String,
    pub value: Option<f64>,
    /// Configured style with dynamic overrides applied
    pub style: BTreeMap<String, Value>,
    pub last_update: Option<Timestamp>,
}

struct Composite {
    settings: CompositeSettings,
    children: Vec<Arc<Block>>,
    expanded: AtomicBool,
    idle_ticks: AtomicU64,
}

impl Composite {
    fn is_expanded(&self) -> bool {
        self.expanded.load(Ordering::SeqCst)
    }

    /// Restart the idle countdown
    fn touch(&self) {
        self.idle_ticks.store(0, Ordering::SeqCst);
    }

    fn toggle(&self) {
        self.touch();
        self.expanded.fetch_xor(true, Ordering::SeqCst);
    }

    fn tick(&self) {
        if !self.is_expanded() || self.settings.collapse_after == 0 {
            return;
        }
        let idle = self.idle_ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if idle >= self.settings.collapse_after {
            self.expanded.store(false, Ordering::SeqCst);
            self.idle_ticks.store(0, Ordering::SeqCst);
        }
    }

    fn child(&self, name: &str) -> Option<&Arc<Block>> {
        self.children.iter().find(|child| child.identity.name == name)
    }
}

pub struct Block {
    identity: Identity,
    settings: Settings,
    source: Mutex<Box<dyn Source>>,
    state: Mutex<State>,
    /// Wakes the update loop when `requested` moves past `last_update`
    wake: Condvar,
    /// Wakes waiters when `last_update` advances
    fresh: Condvar,
    ticks: AtomicU64,
    started: AtomicBool,
    show_slider: AtomicBool,
    click: Launcher,
    slider: Launcher,
    composite: Option<Composite>,
}

impl Block {
    pub fn new(identity: Identity, settings: Settings, source: Box<dyn Source>) -> Self {
        let click = Launcher::new(settings.click.blocking, settings.click.single_instance);
        Self {
            identity,
            source: Mutex::new(source),
            state: Mutex::new(State {
                requested: None,
                last_update: None,
                value: None,
                text: String::new(),
                overrides: BTreeMap::new(),
            }),
            wake: Condvar::new(),
            fresh: Condvar::new(),
            ticks: AtomicU64::new(0),
            started: AtomicBool::new(false),
            show_slider: AtomicBool::new(false),
            click,
            slider: Launcher::new(false, false),
            composite: None,
            settings,
        }
    }

    /// Turn this block into a composite owning `children`
    pub fn with_children(mut self, settings: CompositeSettings, children: Vec<Block>) -> Self {
        self.composite = Some(Composite {
            expanded: AtomicBool::new(settings.show_default),
            idle_ticks: AtomicU64::new(0),
            children: children.into_iter().map(Arc::new).collect(),
            settings,
        });
        self
    }

    pub fn from_config(config: BlockConfig) -> Self {
        let BlockConfig {
            identity,
            settings,
            source,
            composite,
            children,
        } = config;

        let block = Block::new(identity, settings, source);
        match composite {
            Some(composite) => block.with_children(
                composite,
                children.into_iter().map(Block::from_config).collect(),
            ),
            None => block,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn kind(&self) -> &str {
        &self.identity.kind
    }

    pub fn instance(&self) -> &str {
        &self.identity.instance
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn children(&self) -> &[Arc<Block>] {
        match &self.composite {
            Some(composite) => &composite.children,
            None => &[],
        }
    }

    pub fn is_composite(&self) -> bool {
        self.composite.is_some()
    }

    pub fn is_expanded(&self) -> bool {
        self.composite
            .as_ref()
            .map_or(false, |composite| composite.is_expanded())
    }

    pub fn slider_shown(&self) -> bool {
        self.show_slider.load(Ordering::SeqCst)
    }

    pub fn last_update(&self) -> Option<Timestamp> {
        self.state.lock().last_update
    }

    /// Find the block addressed by a dot-separated path below this one
    pub fn descendant(&self, path: &str) -> Option<&Block> {
        if path.is_empty() {
            return Some(self);
        }
        let (head, rest) = split_path(path);
        self.composite
            .as_ref()?
            .child(head)?
            .descendant(rest)
    }

    /// Call `f` for this block and every block below it, parents first
    pub fn visit(self: &Arc<Self>, f: &mut dyn FnMut(&Arc<Block>)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Start the update loop of this block and of all its children
    ///
    /// Each block gets exactly one loop; later calls are no-ops.
    pub fn spawn(self: &Arc<Self>) -> io::Result<()> {
        if !self.started.swap(true, Ordering::SeqCst) {
            let block = Arc::clone(self);
            thread::Builder::new()
                .name(format!("block:{}", self.identity.instance))
                .spawn(move || block.run())?;
        }
        for child in self.children() {
            child.spawn()?;
        }
        Ok(())
    }

    /// Ask for the block to be fresh as of `timestamp`
    ///
    /// Older or equal timestamps than the one already requested are ignored.
    /// With `blocking` the caller waits until the update loop has caught up;
    /// this never returns early on a spurious wakeup.
    pub fn request_update(&self, timestamp: Timestamp, blocking: bool) {
        let timestamp = Some(timestamp);
        let mut state = self.state.lock();
        if timestamp > state.requested {
            state.requested = timestamp;
            self.wake.notify_all();
        }
        if blocking {
            self.fresh
                .wait_while(&mut state, |state| state.last_update < timestamp);
        }
    }

    /// Scheduler tick, refreshes when the interval is due
    pub fn tick(&self, timestamp: Timestamp) {
        let count = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(composite) = &self.composite {
            composite.tick();
            for child in &composite.children {
                child.tick(timestamp);
            }
        }

        if self.settings.interval.is_due(count) {
            self.request_update(timestamp, false);
        }
    }

    /// Block until fresh as of `timestamp`, only for blocks marked needed
    ///
    /// Waits for the newest request made up to `timestamp` to complete, so a
    /// needed block whose interval was not due this tick does not stall.
    pub fn wait_if_needed(&self, timestamp: Timestamp) {
        if !self.settings.needed {
            return;
        }
        let mut state = self.state.lock();
        self.fresh.wait_while(&mut state, |state| {
            state.last_update < state.requested.min(Some(timestamp))
        });
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        let mut style = self.settings.style.clone();
        style.extend(
            state
                .overrides
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        Snapshot {
            text: state.text.clone(),
            value: state.value,
            style,
            last_update: state.last_update,
        }
    }

    /// Append this block's protocol entries
    ///
    /// Visible children of an expanded composite come first, then the
    /// slider when shown, then the block itself.
    pub fn entries(&self, out: &mut Vec<Entry>) {
        if let Some(composite) = &self.composite {
            if composite.is_expanded() {
                for child in &composite.children {
                    child.entries(out);
                }
            }
        }

        let snapshot = self.snapshot();
        if self.slider_shown() {
            let slider = &self.settings.slider;
            let domain = &self.settings.domain;
            let text = template::gauge(
                snapshot.value.unwrap_or(domain.min),
                domain,
                slider.width,
                &slider.fill,
                &slider.empty,
            );
            out.push(Entry::new(
                &self.identity.kind,
                format!("{}{}", self.identity.instance, SLIDER_SUFFIX),
                text,
                snapshot.style.clone(),
            ));
        }

        out.push(Entry::new(
            &self.identity.kind,
            self.identity.instance.clone(),
            snapshot.text,
            snapshot.style,
        ));
    }

    /// Handle a button press addressed to `sub` below this block
    ///
    /// A primary press with an empty `sub` toggles a composite. A non-empty
    /// `sub` goes to the matching child and leaves this block untouched.
    pub fn handle_click(&self, action: MouseAction, sub: &str) -> bool {
        if !sub.is_empty() {
            return self.route(sub, |child, rest| child.handle_click(action, rest));
        }

        let mut handled = false;
        if let Some(composite) = &self.composite {
            if action == MouseAction::Primary {
                composite.toggle();
                handled = true;
            }
        }

        handled |= self.source.lock().handle_click(action);

        let toggle = self.settings.click.slider;
        if toggle != SliderToggle::Keep {
            let _ = self
                .show_slider
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |shown| {
                    Some(toggle.apply(shown))
                });
            handled = true;
        }

        if let Some(command) = &self.settings.click.command {
            handled |= self.click.launch(command);
        }

        handled
    }

    pub fn handle_scroll(&self, action: MouseAction, sub: &str) -> bool {
        if !sub.is_empty() {
            return self.route(sub, |child, rest| child.handle_scroll(action, rest));
        }
        self.source.lock().handle_scroll(action)
    }

    /// Handle a press on the slider entry, `fraction` is the position on it
    pub fn handle_slider_click(&self, action: MouseAction, sub: &str, fraction: f64) -> bool {
        if !sub.is_empty() {
            return self.route(sub, |child, rest| {
                child.handle_slider_click(action, rest, fraction)
            });
        }

        let mut handled = false;
        if action == MouseAction::Primary {
            handled |= self.source.lock().handle_slider_click(fraction);
        }
        if let Some(command) = &self.settings.slider.command {
            handled |= self.slider.launch(command);
        }
        handled
    }

    /// Hand an event to the child named by the first path element
    ///
    /// Reaching a child counts as activity and restarts the collapse countdown.
    fn route(&self, sub: &str, f: impl FnOnce(&Block, &str) -> bool) -> bool {
        let (head, rest) = split_path(sub);
        let Some(composite) = &self.composite else {
            return false;
        };
        match composite.child(head) {
            Some(child) => {
                composite.touch();
                f(child.as_ref(), rest)
            }
            None => false,
        }
    }

    fn run(&self) {
        log::debug!("Update loop started for {}", self.identity.instance);

        loop {
            let target = {
                let mut state = self.state.lock();
                self.wake
                    .wait_while(&mut state, |state| state.requested <= state.last_update);
                state.requested
            };

            let ctx = RefreshContext {
                now: Utc::now(),
                format: &self.settings.format,
                domain: &self.settings.domain,
            };
            let result = self.source.lock().refresh(&ctx);

            let mut state = self.state.lock();
            match result {
                Ok(reading) => self.apply(&mut state, reading),
                Err(e) => log::debug!("Refresh of {} failed: {:#}", self.identity.instance, e),
            }
            if target > state.last_update {
                state.last_update = target;
            }
            drop(state);

            self.fresh.notify_all();
        }
    }

    fn apply(&self, state: &mut State, reading: Reading) {
        if reading.value.is_some() {
            state.value = reading.value;
        }

        let format = reading.format.as_deref().unwrap_or(&self.settings.format);
        state.text = template::render(format, &reading.fields, state.value, &self.settings.domain);

        for (key, value) in reading.style {
            match value {
                Some(value) => {
                    state.overrides.insert(key, value);
                }
                None => {
                    state.overrides.remove(&key);
                }
            }
        }
    }
}

/// Split `a.b.c` into `a` and `b.c`
fn split_path(path: &str) -> (&str, &str) {
    path.split_once('.').unwrap_or((path, ""))
}
