use bytes::Bytes;

/// Sentinel payload closing an OpenAI-style event stream.
pub const DONE_DATA: &str = "[DONE]";

/// Yields the payload of every `data: ` line of a buffered event stream, in
/// arrival order, skipping the `[DONE]` terminator.
///
/// Lines without the exact `data: ` prefix (comments, `event:` lines, blank
/// separators) are ignored. Payloads are not validated here.
pub fn data_payloads(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').filter_map(|line| {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let payload = line.strip_prefix("data: ")?;
        (payload != DONE_DATA).then_some(payload)
    })
}

/// Encodes one data-only event.
pub fn data_frame(data: &str) -> Bytes {
    let mut frame = String::with_capacity(data.len() + 8);
    frame.push_str("data: ");
    frame.push_str(data);
    frame.push_str("\n\n");
    Bytes::from(frame)
}

pub fn done_frame() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}
