//! Incremental Server-Sent Events parser for `streamGenerateContent?alt=sse`.
//!
//! Events are separated by a blank line. Each event carries one or more
//! `data:` lines, which are joined with `\n`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// OpenAI-style terminator; Gemini closes the connection instead but
    /// some proxies in front of it still send one
    pub fn is_done_marker(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Buffers partial input across network chunks.
///
/// Bytes are kept raw until a whole event has arrived, so multi-byte
/// characters and CRLF pairs split between chunks survive intact.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and drain every event that is now complete.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = find_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_block(&String::from_utf8_lossy(&rest))
    }
}

/// End offset of the first blank-line separator (`\n\n`, `\r\n\r\n` or mixed)
fn find_boundary(buf: &[u8]) -> Option<usize> {
    buf.iter().enumerate().find_map(|(i, &b)| {
        if b != b'\n' {
            return None;
        }
        match &buf[i + 1..] {
            [b'\n', ..] => Some(i + 2),
            [b'\r', b'\n', ..] => Some(i + 3),
            _ => None,
        }
    })
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(val) = line.strip_prefix("event:") {
            event = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data_lines.push(val.strip_prefix(' ').unwrap_or(val));
        }
        // id:, retry: and ":" comments are not used
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_events() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].data, "{\"a\":2}");
    }

    #[test]
    fn test_crlf_framing() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: hel").is_empty());
        let events = parser.feed(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keepalive\nevent: chunk\ndata: a\ndata: b\n\n: ping\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("chunk"));
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let payload = "data: नमस्ते\n\n".as_bytes();
        let mut parser = SseParser::new();
        // Byte 7 falls inside the first Devanagari character
        assert!(parser.feed(&payload[..7]).is_empty());
        let events = parser.feed(&payload[7..]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "नमस्ते");
    }

    #[test]
    fn test_crlf_separator_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: one\r\n\r").is_empty());
        let events = parser.feed(b"\ndata: two\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn test_finish_flushes_tail() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: [DONE]").is_empty());
        let tail = parser.finish().unwrap();
        assert!(tail.is_done_marker());
        assert!(parser.finish().is_none());
    }
}
