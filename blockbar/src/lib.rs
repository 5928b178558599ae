//! Blockbar - threaded status line generator for i3bar and swaybar
//!
//! Every block refreshes on its own thread. The scheduler emits one frame
//! per second; clicks and real-time signals force a block to refresh and
//! emit a frame out of band.

pub mod bar;
pub mod block;
pub mod config;
pub mod error;
pub mod event;
pub mod kinds;
pub mod paths;
pub mod protocol;
pub mod scheduler;
pub mod signals;
pub mod template;

pub use bar::{Bar, Emitter};
pub use block::{Block, MouseAction, Source};
pub use config::Config;
pub use error::ConfigError;
pub use event::{ClickEvent, EventRouter};
pub use kinds::Services;
pub use protocol::Output;
pub use scheduler::Scheduler;
pub use signals::{SignalBridge, SignalRoutes};
