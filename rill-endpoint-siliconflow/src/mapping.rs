//! Request/response JSON mapping for the chat-completions API.

use rill_types::{ChatReply, ChatRequest, TransportError};
use serde_json::json;

/// Sampling and sizing knobs owned by the client.
pub(crate) struct RequestOptions<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
}

/// Build the chat-completions request body.
///
/// The history pairs are flattened into the alternating
/// `user`/`assistant` message list the API expects, followed by the
/// new user message.
pub(crate) fn to_api_request(request: &ChatRequest, opts: &RequestOptions<'_>) -> serde_json::Value {
    let mut messages = Vec::with_capacity(request.history.len() * 2 + 1);
    for pair in &request.history {
        messages.push(json!({"role": "user", "content": pair.user}));
        messages.push(json!({"role": "assistant", "content": pair.assistant}));
    }
    messages.push(json!({"role": "user", "content": request.next_user_text}));

    json!({
        "model": opts.model,
        "messages": messages,
        "max_tokens": opts.max_tokens,
        "temperature": opts.temperature,
        "stream": opts.stream,
    })
}

/// Extract the reply text from a non-streaming response body.
pub(crate) fn from_api_response(json: &serde_json::Value) -> Result<ChatReply, TransportError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            TransportError::InvalidResponse(
                "missing choices[0].message.content in response".into(),
            )
        })?;
    Ok(ChatReply {
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use rill_types::ExchangePair;

    use super::*;

    fn options() -> RequestOptions<'static> {
        RequestOptions {
            model: "Qwen/Qwen2.5-7B-Instruct",
            max_tokens: 4096,
            temperature: 0.7,
            stream: false,
        }
    }

    #[test]
    fn history_flattens_to_alternating_messages() {
        let request = ChatRequest {
            history: vec![ExchangePair {
                user: "hi".into(),
                assistant: "hello".into(),
            }],
            next_user_text: "how are you".into(),
        };
        let body = to_api_request(&request, &options());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hi");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "hello");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"], "how are you");
    }

    #[test]
    fn request_carries_sampling_knobs() {
        let request = ChatRequest {
            history: vec![],
            next_user_text: "hi".into(),
        };
        let body = to_api_request(&request, &options());
        assert_eq!(body["model"], "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn response_text_is_extracted() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi there"}}]
        });
        let reply = from_api_response(&body).unwrap();
        assert_eq!(reply.text, "Hi there");
    }

    #[test]
    fn missing_content_is_invalid_response() {
        let body = serde_json::json!({"choices": []});
        assert!(matches!(
            from_api_response(&body),
            Err(TransportError::InvalidResponse(_))
        ));
    }
}
