use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ApplicationId, CanonicalMilestone, ContextId, UserId};

/// Context creation request shared by both transports. The REST path fills
/// in `application_id` from its configuration before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContextRequest {
    pub is_private: bool,
    pub context_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    /// Marks the context as carrying DAO agreement metadata.
    #[serde(default)]
    pub dao: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContextResponse {
    #[serde(alias = "contextId")]
    pub context_id: ContextId,
    #[serde(
        default,
        alias = "memberPublicKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub member_public_key: Option<String>,
    #[serde(default, alias = "executorId", skip_serializing_if = "Option::is_none")]
    pub executor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    pub context_id: ContextId,
    pub inviter_id: UserId,
    pub invitee_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinContextRequest {
    pub invitation_payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinContextResponse {
    #[serde(alias = "contextId")]
    pub context_id: ContextId,
    #[serde(alias = "memberPublicKey")]
    pub member_public_key: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MembershipStatus {
    #[serde(default)]
    pub joined: bool,
}

/// A context-application call: DAO initialization, agreement submission,
/// document upload and context listings all ride through this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub context_id: ContextId,
    pub method: String,
    pub args_json: Value,
    pub executor_id: UserId,
}

/// Agreement submission payload, amounts already in micro units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementSubmission {
    pub id: String,
    pub name: String,
    pub participants: Vec<UserId>,
    pub milestones: Vec<CanonicalMilestone>,
    pub voting_threshold: u8,
    pub total_funding: u64,
    pub context_id: ContextId,
    pub user_id: UserId,
}

/// Success envelope wrapped around REST admin-API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}
