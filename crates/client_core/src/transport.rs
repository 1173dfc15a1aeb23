//! Dual-path dispatch: an embedded node bridge when the host shell provides
//! one, a REST admin API otherwise. Everything downstream sees one uniform
//! contract and never learns which path served a call.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{ApplicationId, ContextId},
    error::{ApiError, ApiResult},
    protocol::{
        CreateContextRequest, CreateContextResponse, Envelope, ExecutionRequest, InviteRequest,
        JoinContextRequest, JoinContextResponse, MembershipStatus, WireError,
    },
};
use tracing::warn;

/// Handle onto a node embedded in the host shell. Operations mirror the
/// REST admin API but stay in-process.
#[async_trait]
pub trait NodeBridge: Send + Sync {
    async fn create_context(&self, request: &CreateContextRequest)
        -> Result<CreateContextResponse>;
    async fn invite_member(&self, request: &InviteRequest) -> Result<String>;
    async fn join_context(&self, invitation_payload: &str) -> Result<JoinContextResponse>;
    async fn verify_membership(&self, context_id: &ContextId) -> Result<MembershipStatus>;
    async fn list_contexts(&self) -> Result<Value>;
    async fn execute(&self, request: &ExecutionRequest) -> Result<Value>;
}

/// Stand-in bridge for hosts without an embedded node. Every call fails,
/// which routes the selector onto the REST path.
pub struct MissingNodeBridge;

#[async_trait]
impl NodeBridge for MissingNodeBridge {
    async fn create_context(
        &self,
        _request: &CreateContextRequest,
    ) -> Result<CreateContextResponse> {
        Err(anyhow!("embedded node bridge is unavailable"))
    }

    async fn invite_member(&self, _request: &InviteRequest) -> Result<String> {
        Err(anyhow!("embedded node bridge is unavailable"))
    }

    async fn join_context(&self, _invitation_payload: &str) -> Result<JoinContextResponse> {
        Err(anyhow!("embedded node bridge is unavailable"))
    }

    async fn verify_membership(&self, _context_id: &ContextId) -> Result<MembershipStatus> {
        Err(anyhow!("embedded node bridge is unavailable"))
    }

    async fn list_contexts(&self) -> Result<Value> {
        Err(anyhow!("embedded node bridge is unavailable"))
    }

    async fn execute(&self, _request: &ExecutionRequest) -> Result<Value> {
        Err(anyhow!("embedded node bridge is unavailable"))
    }
}

/// REST fallback against a node's admin API and JSON-RPC endpoint.
pub struct RestTransport {
    http: Client,
    node_url: String,
    application_id: Option<ApplicationId>,
}

impl RestTransport {
    pub fn new(node_url: impl Into<String>, application_id: Option<ApplicationId>) -> Self {
        let node_url = node_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            node_url,
            application_id,
        }
    }

    async fn create_context(&self, request: &CreateContextRequest) -> Result<CreateContextResponse> {
        // Context creation is the one operation that needs to name the
        // application; without it the REST path cannot proceed.
        let application_id = self.application_id.clone().ok_or_else(|| {
            anyhow!("application id is not configured; the REST transport cannot create contexts")
        })?;

        let mut body = request.clone();
        body.application_id = Some(application_id);

        let response = self
            .http
            .post(format!("{}/admin-api/contexts", self.node_url))
            .json(&body)
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    async fn invite_member(&self, request: &InviteRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/admin-api/contexts/invite", self.node_url))
            .json(request)
            .send()
            .await?;

        match unwrap_envelope::<Value>(response).await? {
            Value::String(payload) => Ok(payload),
            other => Err(anyhow!("unexpected invitation payload shape: {other}")),
        }
    }

    async fn join_context(&self, invitation_payload: &str) -> Result<JoinContextResponse> {
        let response = self
            .http
            .post(format!("{}/admin-api/contexts/join", self.node_url))
            .json(&JoinContextRequest {
                invitation_payload: invitation_payload.to_string(),
            })
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    async fn verify_membership(&self, context_id: &ContextId) -> Result<MembershipStatus> {
        let response = self
            .http
            .get(format!("{}/admin-api/contexts/{context_id}", self.node_url))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(MembershipStatus { joined: false });
        }

        // The admin API has no dedicated membership probe; a fetchable
        // context record implies the node joined it.
        let data: Value = unwrap_envelope(response).await?;
        Ok(MembershipStatus {
            joined: !data.is_null(),
        })
    }

    async fn list_contexts(&self) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}/admin-api/contexts", self.node_url))
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": "execute",
            "params": {
                "contextId": request.context_id.as_str(),
                "method": request.method,
                "argsJson": request.args_json,
                "executorPublicKey": request.executor_id.as_str(),
            },
        });

        let response: Value = self
            .http
            .post(format!("{}/jsonrpc", self.node_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("context execution failed");
            return Err(anyhow!("{message}"));
        }

        Ok(response
            .get("result")
            .and_then(|result| result.get("output"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// Unwraps the admin API's `{data}` envelope, turning failure responses
/// into errors carrying the node's own message when one is present.
async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("error").cloned())
            .and_then(|error| serde_json::from_value::<WireError>(error).ok())
            .and_then(|error| error.message)
            .unwrap_or_else(|| format!("node responded with status {status}"));
        return Err(anyhow!(message));
    }

    let envelope: Envelope<T> = response.json().await?;
    Ok(envelope.data)
}

/// Uniform contract every downstream component consumes. A call either
/// yields data or a normalized `ApiError`; no transport failure escapes.
#[async_trait]
pub trait ContextTransport: Send + Sync {
    async fn create_context(&self, request: CreateContextRequest)
        -> ApiResult<CreateContextResponse>;
    async fn invite_member(&self, request: InviteRequest) -> ApiResult<String>;
    async fn join_context(&self, invitation_payload: String) -> ApiResult<JoinContextResponse>;
    async fn verify_membership(&self, context_id: ContextId) -> ApiResult<MembershipStatus>;
    async fn list_contexts(&self) -> ApiResult<Value>;
    async fn execute(&self, request: ExecutionRequest) -> ApiResult<Value>;
}

/// Bridge-first selector with REST fallback.
pub struct TransportSelector {
    bridge: Arc<dyn NodeBridge>,
    rest: RestTransport,
}

impl TransportSelector {
    pub fn new(bridge: Arc<dyn NodeBridge>, rest: RestTransport) -> Self {
        Self { bridge, rest }
    }

    /// Selector for hosts that never embed a node.
    pub fn rest_only(rest: RestTransport) -> Self {
        Self::new(Arc::new(MissingNodeBridge), rest)
    }
}

fn note_bridge_failure(operation: &str, err: &anyhow::Error) {
    warn!(
        operation,
        error = %err,
        "node bridge attempt failed; retrying over REST"
    );
}

fn transport_failure(operation: &str, err: &anyhow::Error) -> ApiError {
    let message = err.root_cause().to_string();
    if message.trim().is_empty() {
        ApiError::internal(format!("{operation} request failed"))
    } else {
        ApiError::internal(message)
    }
}

#[async_trait]
impl ContextTransport for TransportSelector {
    async fn create_context(
        &self,
        request: CreateContextRequest,
    ) -> ApiResult<CreateContextResponse> {
        match self.bridge.create_context(&request).await {
            Ok(response) => Ok(response),
            Err(bridge_err) => {
                note_bridge_failure("create_context", &bridge_err);
                self.rest
                    .create_context(&request)
                    .await
                    .map_err(|err| transport_failure("create_context", &err))
            }
        }
    }

    async fn invite_member(&self, request: InviteRequest) -> ApiResult<String> {
        match self.bridge.invite_member(&request).await {
            Ok(payload) => Ok(payload),
            Err(bridge_err) => {
                note_bridge_failure("invite_member", &bridge_err);
                self.rest
                    .invite_member(&request)
                    .await
                    .map_err(|err| transport_failure("invite_member", &err))
            }
        }
    }

    async fn join_context(&self, invitation_payload: String) -> ApiResult<JoinContextResponse> {
        match self.bridge.join_context(&invitation_payload).await {
            Ok(response) => Ok(response),
            Err(bridge_err) => {
                note_bridge_failure("join_context", &bridge_err);
                self.rest
                    .join_context(&invitation_payload)
                    .await
                    .map_err(|err| transport_failure("join_context", &err))
            }
        }
    }

    async fn verify_membership(&self, context_id: ContextId) -> ApiResult<MembershipStatus> {
        match self.bridge.verify_membership(&context_id).await {
            Ok(status) => Ok(status),
            Err(bridge_err) => {
                note_bridge_failure("verify_membership", &bridge_err);
                self.rest
                    .verify_membership(&context_id)
                    .await
                    .map_err(|err| transport_failure("verify_membership", &err))
            }
        }
    }

    async fn list_contexts(&self) -> ApiResult<Value> {
        match self.bridge.list_contexts().await {
            Ok(listing) => Ok(listing),
            Err(bridge_err) => {
                note_bridge_failure("list_contexts", &bridge_err);
                self.rest
                    .list_contexts()
                    .await
                    .map_err(|err| transport_failure("list_contexts", &err))
            }
        }
    }

    async fn execute(&self, request: ExecutionRequest) -> ApiResult<Value> {
        match self.bridge.execute(&request).await {
            Ok(output) => Ok(output),
            Err(bridge_err) => {
                note_bridge_failure("execute", &bridge_err);
                self.rest
                    .execute(&request)
                    .await
                    .map_err(|err| transport_failure("execute", &err))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
