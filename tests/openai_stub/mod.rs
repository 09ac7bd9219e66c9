use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

/// How the stub answers a `PAGE {location}|{category}|{symptom}` prompt.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// All five labeled sections.
    Sections,
    /// Drop the BODY section for prompts containing this text.
    MissingBodyFor(String),
    /// Respond with an API error for prompts containing this text.
    ServerErrorFor(String),
}

pub struct OpenAiStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OpenAiStub {
    pub fn spawn(behavior: StubBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/v1/responses" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };
                seen.lock().expect("lock requests").push(parsed.clone());

                let Some(prompt) = parsed.get("input").and_then(|v| v.as_str()) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing input").with_status_code(400),
                    );
                    continue;
                };

                if let StubBehavior::ServerErrorFor(needle) = &behavior
                    && prompt.contains(needle.as_str())
                {
                    let error = serde_json::json!({ "error": { "message": "stub overloaded" } });
                    let _ = request.respond(
                        tiny_http::Response::from_string(error.to_string()).with_status_code(500),
                    );
                    continue;
                }

                let drop_body = matches!(&behavior, StubBehavior::MissingBodyFor(needle) if prompt.contains(needle.as_str()));
                let Some(output_text) = page_response(prompt, drop_body) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("unknown prompt").with_status_code(400),
                    );
                    continue;
                };

                let response_body = serde_json::json!({
                    "id": "resp_stub",
                    "object": "response",
                    "model": parsed.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
                    "output": [
                        {
                            "type": "message",
                            "role": "assistant",
                            "content": [
                                { "type": "output_text", "text": output_text }
                            ]
                        }
                    ]
                });

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(200)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Request bodies received so far, in arrival order.
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl Drop for OpenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn page_response(prompt: &str, drop_body: bool) -> Option<String> {
    let line = prompt.lines().find_map(|l| l.strip_prefix("PAGE "))?;
    let mut parts = line.split('|');
    let (location, category, symptom) = (parts.next()?, parts.next()?, parts.next()?);

    let mut text = format!(
        "TITLE: {category} {symptom} in {location}\n\
DESCRIPTION: {category} repair in {location}, same day.\n\
H1: {category} {symptom} in {location}?\n\
INTRO: Local technicians for {location} homes.\n"
    );
    if !drop_body {
        text.push_str(&format!(
            "BODY:\n<h2>Why a {category} ends up {symptom}</h2>\n<p>Notes for {location}.</p>\n"
        ));
    }
    Some(text)
}
