//! REST collection client for signed-in accounts.

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{PrismError, Result};
use crate::solve::{Penalty, PuzzleType, Solve};

/// Remote solve collection, one call per history operation
pub trait SolveRemote: Send {
    fn list(&self) -> Result<Vec<Solve>>;
    fn create(&self, solve: &Solve) -> Result<Solve>;
    fn update(&self, id: &str, patch: &SolvePatch) -> Result<Solve>;
    fn delete(&self, id: &str) -> Result<()>;
}

/// Body of a create request; the server assigns the id
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewSolve<'a> {
    time: u64,
    scramble: &'a str,
    puzzle_type: PuzzleType,
    state: Penalty,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

impl<'a> From<&'a Solve> for NewSolve<'a> {
    fn from(s: &'a Solve) -> Self {
        Self {
            time: s.raw_time_ms,
            scramble: &s.scramble,
            puzzle_type: s.puzzle_type,
            state: s.penalty,
            timestamp: s.created_at,
        }
    }
}

/// Partial update; only the penalty is mutable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolvePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Penalty>,
}

impl SolvePatch {
    pub fn penalty(penalty: Penalty) -> Self {
        Self {
            state: Some(penalty),
        }
    }
}

pub struct RestClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.token).send()?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .ok()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(PrismError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

impl SolveRemote for RestClient {
    fn list(&self) -> Result<Vec<Solve>> {
        let response = self.send(self.client.get(self.url("/solves")))?;
        let solves: Vec<Solve> = response.json()?;
        debug!(count = solves.len(), "listed remote solves");
        Ok(solves)
    }

    fn create(&self, solve: &Solve) -> Result<Solve> {
        let response = self.send(
            self.client
                .post(self.url("/solves"))
                .json(&NewSolve::from(solve)),
        )?;
        Ok(response.json()?)
    }

    fn update(&self, id: &str, patch: &SolvePatch) -> Result<Solve> {
        let response = self.send(
            self.client
                .patch(self.url(&format!("/solves/{id}")))
                .json(patch),
        )?;
        Ok(response.json()?)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let response = self.send(self.client.delete(self.url(&format!("/solves/{id}"))))?;
        if response.status() != StatusCode::NO_CONTENT {
            debug!(status = %response.status(), "delete returned a body");
        }
        Ok(())
    }
}
