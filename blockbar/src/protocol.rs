//! i3bar protocol output
//!
//! The stream is a header object, an opening `[`, and then an endless,
//! comma-separated sequence of frames, one JSON array per line. All frame
//! writers share one [`Output`], whose lock keeps frames from interleaving.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub version: u32,
    pub click_events: bool,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            click_events: true,
        }
    }
}

/// One block object inside a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub name: String,
    pub instance: String,
    pub full_text: String,
    #[serde(flatten)]
    pub style: BTreeMap<String, Value>,
}

impl Entry {
    pub fn new(
        name: &str,
        instance: String,
        full_text: String,
        style: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            name: name.to_string(),
            instance,
            full_text,
            style,
        }
    }
}

struct Sink {
    writer: Box<dyn Write + Send>,
    frames: u64,
}

/// Serialized access to the protocol stream
pub struct Output {
    sink: Mutex<Sink>,
}

impl Output {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Sink {
                writer: Box::new(writer),
                frames: 0,
            }),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write the header and open the frame array
    pub fn write_header(&self) -> io::Result<()> {
        let mut sink = self.sink.lock();
        serde_json::to_writer(&mut sink.writer, &Header::default())?;
        sink.writer.write_all(b"\n[\n")?;
        sink.writer.flush()
    }

    pub fn write_frame(&self, entries: &[Entry]) -> io::Result<()> {
        self.emit_with(|| entries.to_vec())
    }

    /// Build a frame with `frame` and write it, both under the output lock
    ///
    /// Assembling under the lock keeps frames in the order their content
    /// was sampled.
    pub fn emit_with(&self, frame: impl FnOnce() -> Vec<Entry>) -> io::Result<()> {
        let mut sink = self.sink.lock();
        let entries = frame();
        if sink.frames > 0 {
            sink.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut sink.writer, &entries)?;
        sink.writer.write_all(b"\n")?;
        sink.writer.flush()?;
        sink.frames += 1;
        Ok(())
    }

    /// Number of frames written so far
    pub fn frames(&self) -> u64 {
        self.sink.lock().frames
    }
}

/// Cloneable in-memory writer, handy for capturing output
#[derive(Clone, Default)]
pub struct SharedBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(instance: &str, text: &str) -> Entry {
        Entry::new("custom", instance.to_string(), text.to_string(), BTreeMap::new())
    }

    #[test]
    fn test_stream_framing() {
        let buffer = SharedBuffer::new();
        let output = Output::new(buffer.clone());

        output.write_header().unwrap();
        output.write_frame(&[entry("a", "one")]).unwrap();
        output.write_frame(&[entry("a", "two"), entry("b", "x")]).unwrap();

        let text = buffer.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"{"version":1,"click_events":true}"#);
        assert_eq!(lines[1], "[");
        assert_eq!(
            lines[2],
            r#"[{"name":"custom","instance":"a","full_text":"one"}]"#
        );
        assert!(lines[3].starts_with(",["));
        assert_eq!(output.frames(), 2);
    }

    #[test]
    fn test_entry_style_and_escaping() {
        let mut style = BTreeMap::new();
        style.insert("color".to_string(), Value::from("#00ff00"));
        style.insert("separator".to_string(), Value::from(false));
        let entry = Entry::new("custom", "q".to_string(), "say \"hi\"".to_string(), style);

        let json: Value = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(json["full_text"], "say \"hi\"");
        assert_eq!(json["color"], "#00ff00");
        assert_eq!(json["separator"], false);
    }

    #[test]
    fn test_concurrent_frames_do_not_interleave() {
        let buffer = SharedBuffer::new();
        let output = std::sync::Arc::new(Output::new(buffer.clone()));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let output = output.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let entries: Vec<Entry> = (0..5)
                            .map(|j| entry(&format!("w{}-{}", i, j), "text"))
                            .collect();
                        output.write_frame(&entries).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let text = buffer.contents();
        let mut count = 0;
        for line in text.lines() {
            let frame: Vec<Value> =
                serde_json::from_str(line.trim_start_matches(',')).unwrap();
            assert_eq!(frame.len(), 5);
            count += 1;
        }
        assert_eq!(count, 400);
    }
}
