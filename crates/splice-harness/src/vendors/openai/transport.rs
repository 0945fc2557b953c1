use crate::content::{FinishReason, GenerationEvent};
use crate::errors::ProviderError;
use crate::model::ProviderId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub data: String,
}

/// Splits a byte stream into SSE frames; tolerates frames cut across chunks.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..idx + delim_len);
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing frame the server closed without a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_sse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut data_lines: Vec<String> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }
    // Non-data fields such as `event:` are ignored.
    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        data: data_lines.join("\n"),
    })
}

/// What a single SSE frame means for the generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameEvent {
    Generation(GenerationEvent),
    /// `[DONE]` terminator; nothing follows.
    Done,
}

pub(crate) fn map_completion_frame(
    provider: &ProviderId,
    frame: &SseFrame,
) -> Result<Option<FrameEvent>, ProviderError> {
    let data = frame.data.trim();
    if data == "[DONE]" {
        return Ok(Some(FrameEvent::Done));
    }
    if data.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        ProviderError::protocol(provider.clone(), format!("invalid SSE JSON frame: {e}"))
    })?;
    map_completion_json(provider, &value).map(|event| event.map(FrameEvent::Generation))
}

/// Maps one `text_completion` chunk. Chunks without choices (usage-only
/// trailers) produce nothing.
pub(crate) fn map_completion_json(
    provider: &ProviderId,
    value: &serde_json::Value,
) -> Result<Option<GenerationEvent>, ProviderError> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|v| v.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("completion stream error");
        return Err(ProviderError::provider(provider.clone(), message, None));
    }
    let Some(choice) = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
    else {
        return Ok(None);
    };
    let text = choice
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(FinishReason::parse);
    Ok(Some(GenerationEvent {
        text,
        finish_reason,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderId {
        ProviderId::new("openai-compat")
    }

    #[test]
    fn sse_decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let part1 = b"data: {\"choices\":[{\"text\":\"hel";
        let part2 = b"lo\",\"finish_reason\":null}]}\n\n";
        assert!(decoder.push_chunk(part1).is_empty());
        let frames = decoder.push_chunk(part2);
        assert_eq!(frames.len(), 1);
        let event = map_completion_frame(&provider(), &frames[0]).expect("map");
        assert_eq!(
            event,
            Some(FrameEvent::Generation(GenerationEvent::text("hello")))
        );
    }

    #[test]
    fn sse_decoder_handles_crlf_and_comments() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b": keep-alive\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(
            map_completion_frame(&provider(), &frames[0]).expect("map"),
            Some(FrameEvent::Done)
        );
    }

    #[test]
    fn decoder_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: [DONE]").is_empty());
        let frame = decoder.finish().expect("trailing frame");
        assert_eq!(frame.data, "[DONE]");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn frames_without_data_are_dropped() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"event: ping\n\ndata: [DONE]\n\n");
        assert_eq!(frames, vec![SseFrame { data: "[DONE]".into() }]);
    }

    #[test]
    fn maps_finish_reason() {
        let value = serde_json::json!({
            "object": "text_completion",
            "choices": [{"index": 0, "text": "", "finish_reason": "length"}]
        });
        let event = map_completion_json(&provider(), &value)
            .expect("map")
            .expect("event");
        assert_eq!(event.text, "");
        assert_eq!(event.finish_reason, Some(FinishReason::Length));
    }

    #[test]
    fn usage_only_chunk_is_skipped() {
        let value = serde_json::json!({"choices": [], "usage": {"completion_tokens": 3}});
        assert_eq!(map_completion_json(&provider(), &value).expect("map"), None);
    }

    #[test]
    fn error_object_maps_to_provider_error() {
        let value = serde_json::json!({"error": {"message": "model not found"}});
        let err = map_completion_json(&provider(), &value).expect_err("should fail");
        assert!(matches!(err, ProviderError::Provider { message, .. } if message == "model not found"));
    }

    #[test]
    fn malformed_json_is_protocol_error() {
        let frame = SseFrame {
            data: "{not json".into(),
        };
        let err = map_completion_frame(&provider(), &frame).expect_err("should fail");
        assert!(matches!(err, ProviderError::Protocol { .. }));
    }
}
