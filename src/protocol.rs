use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

// ── Wire types ────────────────────────────────────────────────────────────────

/// Outbound envelope. The session identifier field is `session_id` — the one
/// canonical name this client sends (never `user_id` alongside it).
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

/// Inbound envelope. Every field is optional by design: the backend omits
/// whatever a given turn doesn't need, and absence is a handled condition,
/// not a protocol violation. German deployments use `entscheidung` and
/// `begruendung` for the decision fields, hence the aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatEnvelope {
    pub response: Option<String>,
    pub text: Option<String>,
    pub options: Option<Vec<String>>,
    pub progress: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(alias = "entscheidung")]
    pub decision: Option<String>,
    #[serde(alias = "begruendung")]
    pub rationale: Option<String>,
}

// ── Classified reply ──────────────────────────────────────────────────────────

/// What the dialog controller dispatches on. Produced by one explicit
/// classification step instead of field-probing scattered through the
/// controller.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    /// A regular turn: question or info text, optionally with choices and a
    /// backend-reported completion percentage.
    Message {
        text: String,
        options: Vec<String>,
        progress: Option<i64>,
    },
    /// Terminal verdict. Forces progress to 100 and unlocks the apply-gate.
    Decision {
        decision: String,
        rationale: Option<String>,
    },
    /// Valid JSON, but nothing the controller knows how to render.
    Unrecognized,
}

/// Classify a parsed envelope by message kind.
pub fn classify(env: ChatEnvelope) -> BackendReply {
    let is_decision = env.kind.as_deref() == Some("decision") || env.decision.is_some();
    if is_decision {
        let decision = env
            .decision
            .or(env.response)
            .or(env.text)
            .unwrap_or_default();
        return BackendReply::Decision {
            decision,
            rationale: env.rationale,
        };
    }
    if let Some(text) = env.response.or(env.text) {
        return BackendReply::Message {
            text,
            options: env.options.unwrap_or_default(),
            progress: env.progress,
        };
    }
    BackendReply::Unrecognized
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// `timeout` bounds the whole request — a hung backend surfaces as the
    /// network-error path instead of leaving the dialog awaiting forever.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// Send one message for one session. Exactly one request per call — no
    /// retries, no queuing. Network failure, non-success status, and an
    /// unparsable body all come back as `Err`.
    pub async fn send(&self, message: &str, session_id: &str) -> Result<BackendReply> {
        let url = format!("{}/chat", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            message,
            session_id,
        };

        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("backend error {}: {}", status, text));
        }

        let env: ChatEnvelope = resp.json().await?;
        Ok(classify(env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classify_question_with_options_and_progress() {
        let env = parse(
            r#"{"type":"question","text":"Welche Hochschulreife?",
                "options":["Abitur","Fachabitur"],"progress":15}"#,
        );
        assert_eq!(
            classify(env),
            BackendReply::Message {
                text: "Welche Hochschulreife?".into(),
                options: vec!["Abitur".into(), "Fachabitur".into()],
                progress: Some(15),
            }
        );
    }

    #[test]
    fn test_classify_response_field_without_type() {
        let env = parse(r#"{"response":"Willkommen!"}"#);
        match classify(env) {
            BackendReply::Message {
                text,
                options,
                progress,
            } => {
                assert_eq!(text, "Willkommen!");
                assert!(options.is_empty());
                assert_eq!(progress, None);
            }
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_decision_by_type() {
        let env = parse(
            r#"{"type":"decision","decision":"Zulassung möglich",
                "rationale":"ECTS ausreichend"}"#,
        );
        assert_eq!(
            classify(env),
            BackendReply::Decision {
                decision: "Zulassung möglich".into(),
                rationale: Some("ECTS ausreichend".into()),
            }
        );
    }

    #[test]
    fn test_classify_decision_by_german_field_names() {
        let env = parse(r#"{"entscheidung":"Ja","begruendung":"Note erfüllt"}"#);
        assert_eq!(
            classify(env),
            BackendReply::Decision {
                decision: "Ja".into(),
                rationale: Some("Note erfüllt".into()),
            }
        );
    }

    #[test]
    fn test_decision_type_falls_back_to_response_text() {
        let env = parse(r#"{"type":"decision","response":"Keine Zulassung"}"#);
        assert_eq!(
            classify(env),
            BackendReply::Decision {
                decision: "Keine Zulassung".into(),
                rationale: None,
            }
        );
    }

    #[test]
    fn test_decision_wins_over_message_fields() {
        let env = parse(r#"{"response":"ignored","decision":"Ja"}"#);
        assert!(matches!(classify(env), BackendReply::Decision { .. }));
    }

    #[test]
    fn test_empty_envelope_is_unrecognized() {
        assert_eq!(classify(parse("{}")), BackendReply::Unrecognized);
        // Options/progress alone aren't renderable either
        let env = parse(r#"{"options":["A"],"progress":50}"#);
        assert_eq!(classify(env), BackendReply::Unrecognized);
    }

    #[test]
    fn test_request_serializes_one_identifier_field() {
        let req = ChatRequest {
            message: "init",
            session_id: "abc-123",
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"session_id\":\"abc-123\""));
        assert!(json.contains("\"message\":\"init\""));
        assert!(!json.contains("user_id"));
    }
}
