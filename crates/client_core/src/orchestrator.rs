//! Top-level agreement workflows: plain agreements, the full DAO pipeline,
//! listings and invitation pass-throughs.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use shared::{
    domain::{Agreement, ContextId, DocumentFile, MilestoneDraft, ParticipantRole, UserId},
    error::{ApiError, ApiResult},
    protocol::{AgreementSubmission, CreateContextResponse},
};
use storage::ScratchStore;
use tracing::{info, warn};

use crate::{
    context::ContextService, documents::DocumentUploadCoordinator, milestone, scratch_keys,
    transport::ContextTransport,
};

/// Prefix of synthetic agreement ids minted at submission time.
const AGREEMENT_ID_PREFIX: &str = "dao_agreement";

pub const DEFAULT_VOTING_THRESHOLD: u8 = 75;

/// Inputs of the end-to-end DAO pipeline.
#[derive(Debug, Clone)]
pub struct DaoAgreementRequest {
    pub name: String,
    pub participant_ids: Vec<UserId>,
    pub milestones: Vec<MilestoneDraft>,
    /// Total funding in user-facing decimal units.
    pub total_funding: f64,
    pub voting_threshold: u8,
    pub documents: Vec<DocumentFile>,
}

impl DaoAgreementRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participant_ids: Vec::new(),
            milestones: Vec::new(),
            total_funding: 0.0,
            voting_threshold: DEFAULT_VOTING_THRESHOLD,
            documents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletedDaoAgreement {
    pub agreement: Agreement,
    pub agreement_id: String,
}

pub struct AgreementOrchestrator {
    contexts: ContextService,
    documents: DocumentUploadCoordinator,
    scratch: Arc<dyn ScratchStore>,
}

impl AgreementOrchestrator {
    pub fn new(transport: Arc<dyn ContextTransport>, scratch: Arc<dyn ScratchStore>) -> Self {
        Self {
            contexts: ContextService::new(Arc::clone(&transport)),
            documents: DocumentUploadCoordinator::new(transport),
            scratch,
        }
    }

    pub fn contexts(&self) -> &ContextService {
        &self.contexts
    }

    pub fn documents(&self) -> &DocumentUploadCoordinator {
        &self.documents
    }

    /// Creates a plain shared agreement. The follow-up join is best effort:
    /// the creator already has access through creation, so its failure is
    /// logged and swallowed.
    pub async fn create_agreement(&self, name: &str) -> ApiResult<Agreement> {
        let created = self.contexts.create_context(name, false, false).await?;
        let user_id = effective_user_id(&created)?;

        if let Err(err) = self
            .contexts
            .execute(
                &created.context_id,
                &user_id,
                "register_self_as_participant",
                json!({ "context_name": name }),
            )
            .await
        {
            warn!(
                context_id = %created.context_id,
                error = %err,
                "joining freshly created context failed; continuing as creator"
            );
        }

        let agreement = Agreement::for_context(
            created.context_id,
            name,
            user_id.as_str(),
            ParticipantRole::Owner,
            now_ms(),
        );
        self.record_active_agreement(&agreement.context_id, &user_id)
            .await;
        Ok(agreement)
    }

    /// Creates a DAO agreement context. DAO state is unusable without
    /// initialization, so here both follow-up steps are hard failures,
    /// unlike the optional join above.
    pub async fn create_dao_agreement_context(&self, name: &str) -> ApiResult<Agreement> {
        let created = self.contexts.create_context(name, false, true).await?;
        let user_id = effective_user_id(&created)?;

        self.contexts
            .execute(
                &created.context_id,
                &user_id,
                "initialize_dao_agreement",
                json!({
                    "context_id": created.context_id.as_str(),
                    "name": name,
                    "owner": user_id.as_str(),
                }),
            )
            .await?;

        self.contexts
            .execute(
                &created.context_id,
                &user_id,
                "join_dao_agreement",
                json!({
                    "context_id": created.context_id.as_str(),
                    "user_id": user_id.as_str(),
                }),
            )
            .await?;

        let agreement = Agreement::for_context(
            created.context_id,
            name,
            user_id.as_str(),
            ParticipantRole::Owner,
            now_ms(),
        );
        self.record_active_agreement(&agreement.context_id, &user_id)
            .await;
        Ok(agreement)
    }

    /// End-to-end DAO pipeline: context creation, milestone encoding,
    /// submission, then document upload. A later step only runs when all
    /// prior steps succeeded; a document failure does not roll back the
    /// already-committed submission, it fails the composite call instead.
    pub async fn create_complete_dao_agreement(
        &self,
        request: DaoAgreementRequest,
    ) -> ApiResult<CompletedDaoAgreement> {
        let agreement = self.create_dao_agreement_context(&request.name).await?;
        let user_id = UserId::from(agreement.member_public_key.clone());

        let milestones = milestone::encode(&request.milestones, &user_id);
        let participants = participant_roster(&user_id, &request.participant_ids);
        let agreement_id = format!(
            "{AGREEMENT_ID_PREFIX}_{}_{}",
            agreement.context_id,
            now_ms()
        );

        let submission = AgreementSubmission {
            id: agreement_id.clone(),
            name: request.name.clone(),
            participants,
            milestones,
            voting_threshold: request.voting_threshold,
            total_funding: milestone::scale_to_micro(request.total_funding),
            context_id: agreement.context_id.clone(),
            user_id: user_id.clone(),
        };
        let submission_args = serde_json::to_value(&submission)
            .map_err(|err| ApiError::internal(err.to_string()))?;

        self.contexts
            .execute(
                &agreement.context_id,
                &user_id,
                "create_agreement",
                submission_args,
            )
            .await?;
        info!(
            agreement_id = %agreement_id,
            context_id = %agreement.context_id,
            "dao agreement submitted"
        );

        if !request.documents.is_empty() {
            self.documents
                .upload_all(&agreement.context_id, &user_id, &request.documents)
                .await?;
        }

        self.record_active_agreement(&agreement.context_id, &user_id)
            .await;
        Ok(CompletedDaoAgreement {
            agreement,
            agreement_id,
        })
    }

    /// Lists joined contexts as agreements. An unrecognized listing shape
    /// degrades to an empty view instead of failing the caller.
    pub async fn list_agreements(&self) -> ApiResult<Vec<Agreement>> {
        let raw = self.contexts.list_contexts().await?;
        Ok(normalize_context_listing(&raw))
    }

    pub async fn invite_to_agreement(
        &self,
        context_id: &ContextId,
        inviter: &UserId,
        invitee: &UserId,
    ) -> ApiResult<String> {
        self.contexts
            .invite_to_context(context_id, inviter, invitee)
            .await
    }

    pub async fn join_agreement(&self, invitation_payload: &str) -> ApiResult<Agreement> {
        let joined = self.contexts.join_context(invitation_payload).await?;
        let user_id = UserId::from(joined.member_public_key.clone());

        // The invitation payload carries no display name; listings refresh
        // it once the context syncs.
        let agreement = Agreement::for_context(
            joined.context_id.clone(),
            joined.context_id.as_str(),
            joined.member_public_key,
            ParticipantRole::Unknown,
            now_ms(),
        );
        self.record_active_agreement(&agreement.context_id, &user_id)
            .await;
        Ok(agreement)
    }

    pub async fn verify_agreement(&self, context_id: &ContextId) -> ApiResult<bool> {
        self.contexts.verify_context(context_id).await
    }

    /// Scratch bookkeeping feeds navigation into the agreement detail
    /// view; failures here must not fail the operation that produced the
    /// agreement.
    async fn record_active_agreement(&self, context_id: &ContextId, user_id: &UserId) {
        for (key, value) in [
            (scratch_keys::AGREEMENT_CONTEXT_ID, context_id.as_str()),
            (scratch_keys::AGREEMENT_CONTEXT_USER_ID, user_id.as_str()),
        ] {
            if let Err(err) = self.scratch.set(key, value).await {
                warn!(key, error = %err, "failed to record active agreement entry");
            }
        }
    }
}

/// Creator first, then invited ids with blanks and duplicates dropped.
fn participant_roster(creator: &UserId, invited: &[UserId]) -> Vec<UserId> {
    let mut roster = vec![creator.clone()];
    for candidate in invited {
        if candidate.is_blank() || roster.contains(candidate) {
            continue;
        }
        roster.push(candidate.clone());
    }
    roster
}

fn effective_user_id(created: &CreateContextResponse) -> ApiResult<UserId> {
    created
        .member_public_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            created
                .executor_id
                .clone()
                .filter(|id| !id.trim().is_empty())
        })
        .map(UserId::from)
        .ok_or_else(|| {
            ApiError::internal("context creation returned neither a member key nor an executor id")
        })
}

fn normalize_context_listing(raw: &Value) -> Vec<Agreement> {
    let records = if let Some(list) = raw.as_array() {
        list
    } else if let Some(list) = raw.get("output").and_then(Value::as_array) {
        list
    } else if let Some(list) = raw.get("result").and_then(Value::as_array) {
        list
    } else {
        warn!("unrecognized joined-context listing shape; returning no agreements");
        return Vec::new();
    };

    records.iter().filter_map(agreement_from_record).collect()
}

fn agreement_from_record(record: &Value) -> Option<Agreement> {
    let context_id = string_field(record, &["contextId", "context_id", "id"])?;
    let name = string_field(record, &["contextName", "context_name", "name"])
        .unwrap_or_else(|| context_id.clone());
    let member_public_key =
        string_field(record, &["memberPublicKey", "member_public_key"]).unwrap_or_default();
    let role = string_field(record, &["role"])
        .map(|raw| ParticipantRole::parse(&raw))
        .unwrap_or(ParticipantRole::Unknown);
    let joined_at = number_field(record, &["joinedAt", "joined_at"]).unwrap_or(0);

    let mut agreement = Agreement::for_context(
        ContextId::from(context_id),
        name,
        member_public_key,
        role,
        joined_at,
    );
    agreement.private_identity = string_field(record, &["privateIdentity", "private_identity"]);
    agreement.shared_identity = string_field(record, &["sharedIdentity", "shared_identity"]);
    Some(agreement)
}

fn string_field(record: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| record.get(name).and_then(Value::as_str))
        .map(str::to_string)
}

fn number_field(record: &Value, names: &[&str]) -> Option<u64> {
    names
        .iter()
        .find_map(|name| record.get(name).and_then(Value::as_u64))
}

pub(crate) fn now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
