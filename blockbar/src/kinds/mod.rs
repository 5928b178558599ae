//! Block kinds, selected by the `type` key of a block table

pub mod audio;
mod battery;
mod custom;
mod datetime;
mod menu;
mod network;
mod pulseaudio;
mod temperature;

pub use audio::AudioMonitor;
pub use battery::Battery;
pub use custom::Custom;
pub use datetime::DateTime;
pub use menu::Menu;
pub use network::Network;
pub use pulseaudio::PulseAudio;
pub use temperature::Temperature;

use crate::block::Source;
use audio::Device;
use std::io;
use std::sync::Arc;

pub const BATTERY: &str = "internal/battery";
pub const DATETIME: &str = "internal/datetime";
pub const TEMPERATURE: &str = "internal/temperature";
pub const NETWORK: &str = "internal/network";
pub const PULSE_OUTPUT: &str = "internal/pulseaudio.output";
pub const PULSE_INPUT: &str = "internal/pulseaudio.input";
pub const CUSTOM: &str = "custom";
pub const MENU: &str = "internal/menu";

/// Background services shared between blocks
///
/// Services are created while the configuration is read, but nothing runs
/// until [`Services::start`] is called after it was fully validated.
#[derive(Default)]
pub struct Services {
    audio: Option<Arc<AudioMonitor>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared audio monitor, created on first use
    pub fn audio(&mut self) -> Arc<AudioMonitor> {
        Arc::clone(self.audio.get_or_insert_with(|| Arc::new(AudioMonitor::new())))
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn start(&self) -> io::Result<()> {
        if let Some(audio) = &self.audio {
            audio.start()?;
        }
        Ok(())
    }
}

/// Create the source for `kind`, `None` for an unknown kind tag
pub fn create(kind: &str, services: &mut Services) -> Option<Box<dyn Source>> {
    let source: Box<dyn Source> = match kind {
        BATTERY => Box::new(Battery::new()),
        DATETIME => Box::new(DateTime::new()),
        TEMPERATURE => Box::new(Temperature::new()),
        NETWORK => Box::new(Network::new()),
        PULSE_OUTPUT => Box::new(PulseAudio::new(Device::Sink, services.audio())),
        PULSE_INPUT => Box::new(PulseAudio::new(Device::Source, services.audio())),
        CUSTOM => Box::new(Custom::new()),
        MENU => Box::new(Menu),
        _ => return None,
    };
    Some(source)
}

/// Whether blocks of `kind` own child blocks
pub fn is_composite(kind: &str) -> bool {
    kind == MENU
}
