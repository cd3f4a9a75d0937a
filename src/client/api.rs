//! Authoritative-state API used by the reconciler. A trait so tests and
//! alternative transports can stand in for the HTTP implementation.

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::dto::{
    auth::{USER_ID_HEADER, USER_NAME_HEADER},
    session::{ParticipantListResponse, SessionResponse, VoteListResponse},
};

/// Errors surfaced by API calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed.
    #[error("transport failure")]
    Transport(#[source] reqwest::Error),
    /// The server answered with an error status.
    #[error("server rejected the call ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("malformed response body")]
    Decode(#[source] reqwest::Error),
}

impl ClientError {
    /// Whether the server refused the operation (as opposed to a transport
    /// problem). Refusals roll back optimistic state; transport problems
    /// may be retried.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected { .. })
    }
}

/// Authoritative fetches and mutations against the estimation service.
pub trait SessionApi: Send + Sync {
    /// Fetch the session snapshot.
    fn get_session(&self, session_id: Uuid)
    -> BoxFuture<'_, Result<SessionResponse, ClientError>>;
    /// Fetch votes for a task (the current one when `task_id` is `None`).
    fn get_votes(
        &self,
        session_id: Uuid,
        task_id: Option<Uuid>,
    ) -> BoxFuture<'_, Result<VoteListResponse, ClientError>>;
    /// Fetch the participant roster.
    fn get_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'_, Result<ParticipantListResponse, ClientError>>;
    /// Join the session (idempotent).
    fn join(&self, session_id: Uuid) -> BoxFuture<'_, Result<(), ClientError>>;
    /// Cast a first vote on the current task.
    fn vote(
        &self,
        session_id: Uuid,
        story_points: Option<u8>,
    ) -> BoxFuture<'_, Result<(), ClientError>>;
    /// Overwrite an existing vote on the current task.
    fn change_vote(
        &self,
        session_id: Uuid,
        story_points: Option<u8>,
    ) -> BoxFuture<'_, Result<(), ClientError>>;
    /// Finalize the current task (owner only).
    fn finalize(
        &self,
        session_id: Uuid,
        final_story_points: Option<u32>,
    ) -> BoxFuture<'_, Result<(), ClientError>>;
    /// End the session (owner only).
    fn end(&self, session_id: Uuid) -> BoxFuture<'_, Result<(), ClientError>>;
}

/// HTTP implementation of [`SessionApi`].
pub struct HttpSessionApi {
    http: reqwest::Client,
    base_url: String,
    user_id: Uuid,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpSessionApi {
    /// API client authenticating as `user_id` against `base_url`.
    pub fn new(base_url: impl Into<String>, user_id: Uuid, display_name: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            user_id,
            display_name,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_ID_HEADER, self.user_id.to_string());
        if let Some(name) = &self.display_name {
            request = request.header(USER_NAME_HEADER, name);
        }
        request
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_owned(),
        };
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        Self::send(request)
            .await?
            .json::<T>()
            .await
            .map_err(ClientError::Decode)
    }

    async fn send_unit(request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        Self::send(request).await.map(|_| ())
    }
}

impl SessionApi for HttpSessionApi {
    fn get_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'_, Result<SessionResponse, ClientError>> {
        let request = self.request(reqwest::Method::GET, &format!("/sessions/{session_id}"));
        Box::pin(Self::send_json(request))
    }

    fn get_votes(
        &self,
        session_id: Uuid,
        task_id: Option<Uuid>,
    ) -> BoxFuture<'_, Result<VoteListResponse, ClientError>> {
        let mut request = self.request(
            reqwest::Method::GET,
            &format!("/sessions/{session_id}/votes"),
        );
        if let Some(task_id) = task_id {
            request = request.query(&[("task_id", task_id.to_string())]);
        }
        Box::pin(Self::send_json(request))
    }

    fn get_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'_, Result<ParticipantListResponse, ClientError>> {
        let request = self.request(
            reqwest::Method::GET,
            &format!("/sessions/{session_id}/participants"),
        );
        Box::pin(Self::send_json(request))
    }

    fn join(&self, session_id: Uuid) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = self.request(
            reqwest::Method::POST,
            &format!("/sessions/{session_id}/join"),
        );
        Box::pin(Self::send_unit(request))
    }

    fn vote(
        &self,
        session_id: Uuid,
        story_points: Option<u8>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/sessions/{session_id}/vote"),
            )
            .json(&serde_json::json!({ "story_points": story_points }));
        Box::pin(Self::send_unit(request))
    }

    fn change_vote(
        &self,
        session_id: Uuid,
        story_points: Option<u8>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = self
            .request(
                reqwest::Method::PUT,
                &format!("/sessions/{session_id}/vote"),
            )
            .json(&serde_json::json!({ "story_points": story_points }));
        Box::pin(Self::send_unit(request))
    }

    fn finalize(
        &self,
        session_id: Uuid,
        final_story_points: Option<u32>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/sessions/{session_id}/finalize"),
            )
            .json(&serde_json::json!({ "final_story_points": final_story_points }));
        Box::pin(Self::send_unit(request))
    }

    fn end(&self, session_id: Uuid) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = self.request(
            reqwest::Method::POST,
            &format!("/sessions/{session_id}/end"),
        );
        Box::pin(Self::send_unit(request))
    }
}
