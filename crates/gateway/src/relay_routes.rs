//! The relay endpoint.
//!
//! `GET /` returns a plain-text usage summary. `POST /` accepts
//! `application/json`, `multipart/form-data`, or urlencoded form bodies,
//! normalizes them, and forwards the result to the configured webhook,
//! relaying the destination's response back to the caller.

use {
    axum::{
        Json,
        extract::{FromRequest, Multipart, Request, State},
        http::{StatusCode, header::CONTENT_TYPE},
        response::{IntoResponse, Response},
    },
    serde_json::{Value, json},
    tracing::warn,
};

use {
    crate::server::{AppState, MAX_INBOUND_BODY_BYTES},
    hookbridge_relay::{
        attachment::{UploadedFile, collect},
        dispatch::dispatch,
        message::{CanonicalMessage, RawPayload, parse_form_payload, parse_json_payload},
    },
};

/// `GET /` — plain-text usage summary.
pub async fn usage_handler() -> &'static str {
    concat!(
        "hookbridge — Discord webhook relay\n\n",
        "POST to this endpoint with either multipart/form-data (files + fields) or application/json.\n",
        "Accepted JSON fields: content, username, avatar_url, tts (bool), embeds (array), file_urls (array of urls).\n",
        "Set the DISCORD_WEBHOOK_URL environment variable to configure the destination.\n",
    )
}

/// `POST /` — normalize, collect attachments, dispatch, relay the response.
pub async fn relay_handler(State(state): State<AppState>, req: Request) -> Response {
    // Configuration is checked before any parsing or fetching work.
    let Some(webhook_url) = state.config.webhook_url.clone() else {
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "DISCORD_WEBHOOK_URL is not configured on the server" }),
        );
    };

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (raw_payload, uploads) = if content_type.contains("application/json") {
        let Ok(body) = axum::body::to_bytes(req.into_body(), MAX_INBOUND_BODY_BYTES).await else {
            return json_response(StatusCode::BAD_REQUEST, json!({ "error": "unreadable body" }));
        };
        match parse_json_payload(&body) {
            Ok(payload) => (payload, Vec::new()),
            Err(_) => {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Invalid JSON body" }),
                );
            },
        }
    } else if content_type.contains("multipart/form-data") {
        read_multipart(req, &state).await
    } else {
        let Ok(body) = axum::body::to_bytes(req.into_body(), MAX_INBOUND_BODY_BYTES).await else {
            return json_response(StatusCode::BAD_REQUEST, json!({ "error": "unreadable body" }));
        };
        (parse_form_payload(&body), Vec::new())
    };

    let message = CanonicalMessage::from_raw(&raw_payload);
    // The parts vector owns any temp downloads; every return path below
    // drops it and with it the backing files.
    let parts = collect(&state.client, uploads, &raw_payload, &state.config).await;

    let result = match dispatch(&state.client, &webhook_url, &message, parts, &state.config).await {
        Ok(result) => result,
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            );
        },
    };

    if let Some(transport_error) = result.transport_error {
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "Failed to contact Discord webhook",
                "curl_error": transport_error,
            }),
        );
    }

    let status = result.status.unwrap_or(0);
    if result.is_success() {
        json_response(
            StatusCode::OK,
            json!({
                "status": "ok",
                "discord_status": status,
                "discord_response": result.body,
            }),
        )
    } else {
        // Relay the destination's status verbatim; 0/unmappable becomes 500.
        let code =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        json_response(code, json!({
            "status": "error",
            "discord_status": status,
            "discord_response": result.body,
        }))
    }
}

/// Pull form fields and file uploads out of a multipart body. A field that
/// fails mid-transfer is skipped, mirroring the per-file error handling of
/// classic form uploads; a broken stream ends the scan with whatever was
/// already read.
async fn read_multipart(req: Request, state: &AppState) -> (RawPayload, Vec<UploadedFile>) {
    let mut payload = RawPayload::new();
    let mut uploads = Vec::new();

    let Ok(mut multipart) = Multipart::from_request(req, state).await else {
        return (payload, uploads);
    };

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().map(str::to_string);
                let filename = field.file_name().map(str::to_string);
                let declared = field.content_type().map(str::to_string);

                if filename.is_some() {
                    match field.bytes().await {
                        Ok(data) => uploads.push(UploadedFile {
                            filename,
                            content_type: declared,
                            data,
                        }),
                        Err(e) => {
                            warn!(error = %e, "skipping upload field with transfer error");
                        },
                    }
                } else if let Some(name) = name {
                    match field.text().await {
                        Ok(text) => {
                            payload.insert(name, Value::String(text));
                        },
                        Err(e) => {
                            warn!(field = %name, error = %e, "skipping unreadable form field");
                        },
                    }
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body, stopping field scan");
                break;
            },
        }
    }

    (payload, uploads)
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use {
        super::*,
        crate::server::build_relay_app,
        hookbridge_config::RelayConfig,
    };

    /// Serve the app on an ephemeral port and return its base URL.
    async fn spawn_app(config: RelayConfig) -> String {
        let app = build_relay_app(AppState::new(config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        format!("http://{addr}")
    }

    fn config_for(webhook_url: Option<String>) -> RelayConfig {
        RelayConfig {
            webhook_url,
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn get_returns_usage_text() {
        let base = spawn_app(config_for(None)).await;
        let resp = reqwest::get(&base).await.unwrap();
        assert_eq!(resp.status(), 200);
        let text = resp.text().await.unwrap();
        assert!(text.contains("Discord webhook relay"));
        assert!(text.contains("file_urls"));
    }

    #[tokio::test]
    async fn missing_webhook_url_is_a_500_config_error() {
        let base = spawn_app(config_for(None)).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .json(&json!({ "content": "hi" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body["error"],
            "DISCORD_WEBHOOK_URL is not configured on the server"
        );
    }

    #[tokio::test]
    async fn invalid_json_body_is_a_400() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/webhook")
            .expect(0)
            .create_async()
            .await;

        let base = spawn_app(config_for(Some(format!("{}/webhook", server.url())))).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid JSON body");
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn json_post_relays_the_destination_response() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/webhook")
            .match_body(mockito::Matcher::Regex(
                r#"(?s)name="payload_json".*"content":"hello""#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"1"}"#)
            .create_async()
            .await;

        let base = spawn_app(config_for(Some(format!("{}/webhook", server.url())))).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .json(&json!({ "content": "hello", "tts": "1" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["discord_status"], 200);
        assert_eq!(body["discord_response"], json!({"id": "1"}));
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn destination_error_status_and_body_are_relayed() {
        let mut server = mockito::Server::new_async().await;
        let _hook = server
            .mock("POST", "/webhook")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"rate limited"}"#)
            .create_async()
            .await;

        let base = spawn_app(config_for(Some(format!("{}/webhook", server.url())))).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .json(&json!({ "content": "hi" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 429);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["discord_status"], 429);
        assert_eq!(body["discord_response"], json!({"message": "rate limited"}));
    }

    #[tokio::test]
    async fn unreachable_webhook_reports_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = spawn_app(config_for(Some(format!("http://{addr}/webhook")))).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .json(&json!({ "content": "hi" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Failed to contact Discord webhook");
        assert!(body["curl_error"].as_str().is_some());
    }

    #[tokio::test]
    async fn multipart_uploads_are_forwarded_with_fields() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/webhook")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(
                    r#"(?s)name="payload_json".*"content":"with file""#.to_string(),
                ),
                mockito::Matcher::Regex(r#"name="file0"; filename="a.txt""#.to_string()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let base = spawn_app(config_for(Some(format!("{}/webhook", server.url())))).await;
        let form = reqwest::multipart::Form::new()
            .text("content", "with file")
            .part(
                "file",
                reqwest::multipart::Part::bytes(b"file body".to_vec())
                    .file_name("a.txt")
                    .mime_str("text/plain")
                    .unwrap(),
            );
        let resp = reqwest::Client::new()
            .post(&base)
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn urlencoded_form_fields_are_normalized() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/webhook")
            .match_body(mockito::Matcher::Regex(
                r#"(?s)"content":"from a form".*"tts":true"#.to_string(),
            ))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let base = spawn_app(config_for(Some(format!("{}/webhook", server.url())))).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .header("content-type", "application/x-www-form-urlencoded")
            .body("content=from+a+form&tts=1&ignored=x")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn file_urls_are_fetched_and_forwarded() {
        let mut server = mockito::Server::new_async().await;
        let _a = server
            .mock("GET", "/a.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("aaa")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("bbb")
            .create_async()
            .await;
        let hook = server
            .mock("POST", "/webhook")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"name="file0"; filename="a.png""#.to_string()),
                mockito::Matcher::Regex(r#"name="file1"; filename="b.png""#.to_string()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let base = spawn_app(config_for(Some(format!("{}/webhook", server.url())))).await;
        let resp = reqwest::Client::new()
            .post(&base)
            .json(&json!({
                "content": "two files",
                "file_urls": [
                    format!("{}/a.png", server.url()),
                    "ftp://bad",
                    format!("{}/b.png", server.url()),
                ],
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        hook.assert_async().await;
    }
}
