/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental parser for a `text/event-stream` body. Chunks may split events,
/// lines and multi-byte characters anywhere; only complete events are decoded.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    // Keep-alive comments produce blocks with no data.
    if data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_named_event() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: comment\ndata: {\"id\":1}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("comment".to_string()),
                data: "{\"id\":1}".to_string(),
            }]
        );
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: comm").is_empty());
        assert!(parser.push(b"ent\ndata: a").is_empty());
        let events = parser.push(b"bc\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "abc");
    }

    #[test]
    fn test_keep_alive_is_skipped() {
        let mut parser = SseParser::new();
        let events = parser.push(b":\n\nevent: comment\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn test_multiline_data_and_crlf() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: one\r\ndata: two\r");
        assert!(events.is_empty());
        let events = parser.push(b"\n\r\n");
        assert_eq!(events[0].data, "one\ntwo");
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn test_character_split_across_chunks() {
        let bytes = "event: comment\ndata: café\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut parser = SseParser::new();
        assert!(parser.push(&bytes[..split]).is_empty());
        let events = parser.push(&bytes[split..]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "café");
    }
}
