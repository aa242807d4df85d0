//! Parser for the line-oriented chat streaming format
//!
//! The completion endpoint streams its answer as lines of `prefix:payload`
//! where the payload is JSON. The prefixes we understand:
//!
//! - `f:` message frame carrying the upstream message id
//! - `0:` one text delta, a JSON-encoded string
//! - `e:` end of a generation step with a finish reason
//! - `d:` end of the whole response with finish reason and token usage
//!
//! Anything else (unknown prefixes, malformed payloads, blank lines) is
//! skipped rather than treated as an error, so a new upstream frame type
//! never breaks existing deployments.

use serde::Deserialize;

/// One decoded line of the chat stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// `f:` frame opening a message
    Start { message_id: String },

    /// `0:` text delta
    Text(String),

    /// `e:` end of one generation step
    StepFinish { finish_reason: String },

    /// `d:` end of the response
    Finish {
        finish_reason: String,
        prompt_tokens: Option<u64>,
        completion_tokens: Option<u64>,
    },
}

#[derive(Deserialize)]
struct StartFrame {
    #[serde(rename = "messageId")]
    message_id: String,
}

#[derive(Deserialize)]
struct FinishFrame {
    #[serde(rename = "finishReason")]
    finish_reason: String,
    #[serde(default)]
    usage: Option<UsageFrame>,
}

#[derive(Deserialize)]
struct UsageFrame {
    #[serde(rename = "promptTokens")]
    prompt_tokens: Option<u64>,
    #[serde(rename = "completionTokens")]
    completion_tokens: Option<u64>,
}

fn parse_line(line: &str) -> Option<StreamEvent> {
    let (prefix, payload) = line.split_once(':')?;

    match prefix {
        "f" => {
            let frame: StartFrame = serde_json::from_str(payload).ok()?;
            Some(StreamEvent::Start {
                message_id: frame.message_id,
            })
        }
        "0" => {
            let text: String = serde_json::from_str(payload).ok()?;
            Some(StreamEvent::Text(text))
        }
        "e" => {
            let frame: FinishFrame = serde_json::from_str(payload).ok()?;
            Some(StreamEvent::StepFinish {
                finish_reason: frame.finish_reason,
            })
        }
        "d" => {
            let frame: FinishFrame = serde_json::from_str(payload).ok()?;
            let usage = frame.usage.unwrap_or(UsageFrame {
                prompt_tokens: None,
                completion_tokens: None,
            });
            Some(StreamEvent::Finish {
                finish_reason: frame.finish_reason,
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            })
        }
        other => {
            tracing::trace!(prefix = other, "skipping unknown stream prefix");
            None
        }
    }
}

/// Decode a full response body into its events, skipping anything
/// unrecognized.
pub fn parse_stream(body: &str) -> Vec<StreamEvent> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

/// Concatenate all text deltas of a full response body
pub fn collect_text(body: &str) -> String {
    parse_stream(body)
        .into_iter()
        .filter_map(|event| match event {
            StreamEvent::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "f:{\"messageId\":\"msg-1\"}\n",
        "0:\"Rust is \"\n",
        "0:\"a systems language.\"\n",
        "e:{\"finishReason\":\"stop\",\"usage\":{\"promptTokens\":12,\"completionTokens\":8}}\n",
        "d:{\"finishReason\":\"stop\",\"usage\":{\"promptTokens\":12,\"completionTokens\":8}}\n",
    );

    #[test]
    fn test_parse_full_stream() {
        let events = parse_stream(SAMPLE);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            StreamEvent::Start {
                message_id: "msg-1".to_string()
            }
        );
        assert_eq!(events[1], StreamEvent::Text("Rust is ".to_string()));
        assert_eq!(
            events[4],
            StreamEvent::Finish {
                finish_reason: "stop".to_string(),
                prompt_tokens: Some(12),
                completion_tokens: Some(8),
            }
        );
    }

    #[test]
    fn test_collect_text_joins_deltas() {
        assert_eq!(collect_text(SAMPLE), "Rust is a systems language.");
    }

    #[test]
    fn test_deltas_preserve_json_escapes() {
        let body = "0:\"line one\\nline \\\"two\\\"\"\n";
        assert_eq!(collect_text(body), "line one\nline \"two\"");
    }

    #[test]
    fn test_unknown_prefixes_are_skipped() {
        let body = concat!(
            "9:{\"tool\":\"call\"}\n",
            "0:\"kept\"\n",
            "x-vendor:whatever\n",
        );
        let events = parse_stream(body);
        assert_eq!(events, vec![StreamEvent::Text("kept".to_string())]);
    }

    #[test]
    fn test_malformed_payloads_are_skipped() {
        let body = concat!(
            "0:not json\n",
            "f:{\"wrongField\":1}\n",
            "0:\"still works\"\n",
            "\n",
            "no prefix at all\n",
        );
        assert_eq!(collect_text(body), "still works");
    }

    #[test]
    fn test_finish_without_usage() {
        let events = parse_stream("d:{\"finishReason\":\"length\"}\n");
        assert_eq!(
            events,
            vec![StreamEvent::Finish {
                finish_reason: "length".to_string(),
                prompt_tokens: None,
                completion_tokens: None,
            }]
        );
    }

    #[test]
    fn test_empty_body() {
        assert!(parse_stream("").is_empty());
        assert_eq!(collect_text(""), "");
    }
}
