use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ClientError, Countdown, Draft, DraftBuffer, SessionActions, SubmitReceipt, TimerConfig};

/// Session calls against the HTTP API, authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    client: Client,
    base_url: String,
    token: String,
    session_id: String,
}

/// Enough of the active-session payload to resume a countdown and restore drafts.
#[derive(Debug, Clone)]
pub struct ActiveSessionSnapshot {
    pub session_id: String,
    pub started_at: OffsetDateTime,
    pub time_limit_minutes: i32,
    pub auto_save_interval_seconds: u64,
    pub saved: Vec<Draft>,
}

impl ActiveSessionSnapshot {
    pub fn countdown(&self) -> Countdown {
        Countdown::new(self.started_at, self.time_limit_minutes)
    }

    pub fn drafts(&self) -> DraftBuffer {
        DraftBuffer::restore(self.saved.iter().cloned())
    }

    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::with_autosave_seconds(self.auto_save_interval_seconds)
    }
}

#[derive(Debug, Deserialize)]
struct WireSession {
    id: String,
    #[serde(with = "time::serde::rfc3339")]
    started_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
struct WireExam {
    time_limit_minutes: i32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    question_id: String,
    response_text: Option<String>,
    selected_option_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireActiveSession {
    session: WireSession,
    exam: WireExam,
    responses: Vec<WireResponse>,
    auto_save_interval_seconds: u64,
}

impl From<WireActiveSession> for ActiveSessionSnapshot {
    fn from(wire: WireActiveSession) -> Self {
        Self {
            session_id: wire.session.id,
            started_at: wire.session.started_at,
            time_limit_minutes: wire.exam.time_limit_minutes,
            auto_save_interval_seconds: wire.auto_save_interval_seconds,
            saved: wire
                .responses
                .into_iter()
                .map(|response| Draft {
                    question_id: response.question_id,
                    response_text: response.response_text,
                    selected_option_id: response.selected_option_id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SaveBody<'a> {
    question_id: &'a str,
    response_text: Option<&'a str>,
    selected_option_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    total_points: i32,
    is_late: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl HttpSessionClient {
    /// `base_url` includes the API prefix, e.g. `https://exams.example.org/api/v1`.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            session_id: session_id.into(),
        })
    }

    /// Starts (or resumes) the caller's session for `exam_id`.
    pub async fn start(
        base_url: &str,
        token: impl Into<String>,
        exam_id: &str,
    ) -> Result<Self, ClientError> {
        let mut client = Self::new(base_url, token, String::new())?;
        let url = format!("{}/sessions/exams/{exam_id}/start", client.base_url);
        let session: WireSession = client.send(client.client.post(url)).await?;
        client.session_id = session.id;
        Ok(client)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn fetch_active(&self) -> Result<ActiveSessionSnapshot, ClientError> {
        let url = format!("{}/sessions/{}", self.base_url, self.session_id);
        let wire: WireActiveSession = self.send(self.client.get(url)).await?;
        Ok(wire.into())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

fn status_error(status: StatusCode, body: &str) -> ClientError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|error| error.detail)
        .unwrap_or_else(|_| body.trim().to_string());
    ClientError::Status { status: status.as_u16(), detail }
}

#[async_trait]
impl SessionActions for HttpSessionClient {
    async fn save(&self, draft: &Draft) -> Result<(), ClientError> {
        let url = format!("{}/sessions/{}/responses", self.base_url, self.session_id);
        let body = SaveBody {
            question_id: &draft.question_id,
            response_text: draft.response_text.as_deref(),
            selected_option_id: draft.selected_option_id.as_deref(),
        };
        let _: serde_json::Value = self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn submit(&self) -> Result<SubmitReceipt, ClientError> {
        let url = format!("{}/sessions/{}/submit", self.base_url, self.session_id);
        let body: SubmitBody = self.send(self.client.post(url)).await?;
        Ok(SubmitReceipt { total_points: body.total_points, is_late: body.is_late })
    }
}
