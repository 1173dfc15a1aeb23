use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{ContextId, UserId},
    error::ApiResult,
    protocol::{
        CreateContextRequest, CreateContextResponse, ExecutionRequest, InviteRequest,
        JoinContextResponse,
    },
};
use tracing::warn;

use crate::transport::ContextTransport;

/// Typed facade over the selected transport for context lifecycle calls.
pub struct ContextService {
    transport: Arc<dyn ContextTransport>,
}

impl ContextService {
    pub fn new(transport: Arc<dyn ContextTransport>) -> Self {
        Self { transport }
    }

    pub async fn create_context(
        &self,
        name: &str,
        is_private: bool,
        dao: bool,
    ) -> ApiResult<CreateContextResponse> {
        self.transport
            .create_context(CreateContextRequest {
                is_private,
                context_name: name.to_string(),
                application_id: None,
                dao,
            })
            .await
    }

    pub async fn invite_to_context(
        &self,
        context_id: &ContextId,
        inviter: &UserId,
        invitee: &UserId,
    ) -> ApiResult<String> {
        self.transport
            .invite_member(InviteRequest {
                context_id: context_id.clone(),
                inviter_id: inviter.clone(),
                invitee_id: invitee.clone(),
            })
            .await
    }

    pub async fn join_context(&self, invitation_payload: &str) -> ApiResult<JoinContextResponse> {
        self.transport
            .join_context(invitation_payload.to_string())
            .await
    }

    /// Membership check that degrades to "not joined" whenever the
    /// transport cannot confirm it.
    pub async fn verify_context(&self, context_id: &ContextId) -> ApiResult<bool> {
        match self.transport.verify_membership(context_id.clone()).await {
            Ok(status) => Ok(status.joined),
            Err(err) => {
                warn!(
                    context_id = %context_id,
                    error = %err,
                    "membership verification failed; reporting not joined"
                );
                Ok(false)
            }
        }
    }

    pub async fn list_contexts(&self) -> ApiResult<Value> {
        self.transport.list_contexts().await
    }

    pub async fn execute(
        &self,
        context_id: &ContextId,
        executor: &UserId,
        method: &str,
        args_json: Value,
    ) -> ApiResult<Value> {
        self.transport
            .execute(ExecutionRequest {
                context_id: context_id.clone(),
                method: method.to_string(),
                args_json,
                executor_id: executor.clone(),
            })
            .await
    }
}
