//! Shell commands launched from clicks

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// `sh -c <command>` with stdin and stdout detached from the bar's streams
///
/// The bar protocol owns both of our standard streams, so a child must never
/// read click events or write into the status output.
pub fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null());
    cmd
}

/// Launches a click command, honouring the blocking and single-instance flags
#[derive(Debug)]
pub struct Launcher {
    blocking: bool,
    single_instance: bool,
    running: Arc<AtomicBool>,
}

impl Launcher {
    pub fn new(blocking: bool, single_instance: bool) -> Self {
        Self {
            blocking,
            single_instance,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a previously launched command is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run `command`; returns false when it was skipped or failed to start
    pub fn launch(&self, command: &str) -> bool {
        let was_running = self.running.swap(true, Ordering::SeqCst);
        if was_running && self.single_instance {
            log::debug!("Not relaunching '{}', previous instance still running", command);
            return false;
        }

        let child = match shell(command).spawn() {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Failed to run '{}': {}", command, e);
                self.running.store(false, Ordering::SeqCst);
                return false;
            }
        };

        if self.blocking {
            reap(child, command);
            self.running.store(false, Ordering::SeqCst);
        } else {
            let running = Arc::clone(&self.running);
            let command = command.to_string();
            let spawned = thread::Builder::new()
                .name("click-command".to_string())
                .spawn(move || {
                    reap(child, &command);
                    running.store(false, Ordering::SeqCst);
                });
            if let Err(e) = spawned {
                log::warn!("Failed to start reaper thread: {}", e);
                self.running.store(false, Ordering::SeqCst);
            }
        }

        true
    }
}

fn reap(mut child: Child, command: &str) {
    match child.wait() {
        Ok(status) if !status.success() => {
            log::debug!("'{}' exited with {}", command, status);
        }
        Ok(_) => {}
        Err(e) => log::warn!("Failed to wait for '{}': {}", command, e),
    }
}
