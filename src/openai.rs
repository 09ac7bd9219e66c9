use anyhow::Context as _;
use serde::Serialize;

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

#[derive(Debug, Clone, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    text: TextOptions,
    store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct TextOptions {
    format: TextFormat,
}

#[derive(Debug, Clone, Serialize)]
struct TextFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Sampling parameters for one Responses API call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

pub async fn responses_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    instructions: &str,
    input: &str,
    sampling: Sampling,
) -> anyhow::Result<String> {
    let body = ResponsesRequest {
        model,
        instructions,
        input,
        text: TextOptions {
            format: TextFormat { kind: "text" },
        },
        store: false,
        // The GPT-5 family rejects sampling params like `temperature`.
        temperature: (!model.starts_with("gpt-5")).then_some(sampling.temperature),
        max_output_tokens: sampling.max_output_tokens,
    };

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read OpenAI response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("OpenAI API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse OpenAI response")?;
    extract_output_text(&value).context("extract output text")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `output` array in response"))?;

    let text = output
        .iter()
        .filter(|item| item.get("type").and_then(|v| v.as_str()) == Some("message"))
        .filter_map(|item| item.get("content").and_then(|v| v.as_array()))
        .flatten()
        .filter(|part| part.get("type").and_then(|v| v.as_str()) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect::<String>();

    if text.trim().is_empty() {
        anyhow::bail!("OpenAI output text is empty");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            responses_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/responses"
        );
    }

    #[test]
    fn request_omits_temperature_for_gpt5() -> anyhow::Result<()> {
        let request = |model: &'static str| ResponsesRequest {
            model,
            instructions: "sys",
            input: "prompt",
            text: TextOptions {
                format: TextFormat { kind: "text" },
            },
            store: false,
            temperature: (!model.starts_with("gpt-5")).then_some(0.75),
            max_output_tokens: Some(3000),
        };

        let value = serde_json::to_value(request("gpt-4o"))?;
        assert_eq!(value["temperature"], serde_json::json!(0.75));
        assert_eq!(value["max_output_tokens"], serde_json::json!(3000));
        assert_eq!(value["text"]["format"]["type"], "text");

        let value = serde_json::to_value(request("gpt-5-mini"))?;
        assert!(value.get("temperature").is_none());
        Ok(())
    }

    #[test]
    fn output_text_concatenates_message_parts() -> anyhow::Result<()> {
        let value = serde_json::json!({
            "output": [
                { "type": "reasoning", "content": [{ "type": "output_text", "text": "no" }] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "TITLE: a\n" },
                    { "type": "refusal", "refusal": "x" },
                    { "type": "output_text", "text": "BODY: b" }
                ]}
            ]
        });
        assert_eq!(extract_output_text(&value)?, "TITLE: a\nBODY: b");
        Ok(())
    }

    #[test]
    fn empty_output_is_an_error() {
        let value = serde_json::json!({ "output": [] });
        assert!(extract_output_text(&value).is_err());
        assert!(extract_output_text(&serde_json::json!({})).is_err());
    }

    #[test]
    fn error_message_is_extracted_from_api_errors() {
        assert_eq!(
            parse_error_message(r#"{"error":{"message":"bad key"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(parse_error_message("not json"), None);
    }
}
