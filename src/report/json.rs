use std::io::{self, Write};

use harrow_core::{Message, MessageBus};
use parking_lot::Mutex;

/// Writes one JSON object per message, newline-delimited.
pub struct JsonLinesReporter<W> {
    out: Mutex<W>,
}

impl JsonLinesReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write(&self, message: &Message) -> io::Result<()> {
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, message)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

impl<W: Write + Send> MessageBus for JsonLinesReporter<W> {
    fn queue_message(&self, message: Message) -> bool {
        if let Err(err) = self.write(&message) {
            tracing::warn!(error = %err, message = message.name(), "failed to write json message");
        }
        true
    }
}
