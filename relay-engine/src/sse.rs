//! Incremental parser for server-sent-event byte streams.
//!
//! The push channel delivers `event:` / `data:` / `id:` lines terminated by
//! a blank line. Chunks arrive fragmented at arbitrary boundaries, so the
//! parser buffers the trailing partial line between calls.

/// One fully assembled server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// Concatenated `data:` payload.
    pub data: String,
    /// Value of the `id:` field, if any.
    pub id: Option<String>,
}

/// Stateful SSE frame assembler.
#[derive(Debug, Default)]
pub struct SseParser {
    partial_line: String,
    event: Option<String>,
    data: String,
    id: Option<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport chunk and returns every event completed by it.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut completed = Vec::new();
        let mut rest = chunk;

        while let Some(newline) = rest.find('\n') {
            let (head, tail) = rest.split_at(newline);
            self.partial_line.push_str(head);
            rest = &tail[1..];

            let line = std::mem::take(&mut self.partial_line);
            if let Some(event) = self.consume_line(line.trim_end_matches('\r')) {
                completed.push(event);
            }
        }

        self.partial_line.push_str(rest);
        completed
    }

    fn consume_line(&mut self, line: &str) -> Option<SseEvent> {
        if let Some(value) = line.strip_prefix("event:") {
            self.event = Some(value.trim().to_string());
            None
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data.push_str(value.trim());
            None
        } else if let Some(value) = line.strip_prefix("id:") {
            self.id = Some(value.trim().to_string());
            None
        } else if line.starts_with(':') {
            // Comment line; servers use these as transport keep-alives.
            None
        } else if line.is_empty() {
            self.flush()
        } else {
            // Field we do not understand; skip it rather than poison the frame.
            None
        }
    }

    fn flush(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() && self.id.is_none() {
            return None;
        }
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data),
            id: self.id.take(),
        })
    }
}
