//! Canonicalizes user-entered milestone drafts into the records the
//! agreement context stores.

use std::collections::BTreeMap;

use chrono::Utc;
use shared::domain::{
    CanonicalMilestone, MilestoneCondition, MilestoneDraft, MilestoneStatus, MilestoneType, UserId,
};

/// Factor between user-facing decimal amounts and on-context micro units.
pub const MICRO_SCALE: f64 = 1_000_000.0;

pub fn encode(drafts: &[MilestoneDraft], default_recipient: &UserId) -> Vec<CanonicalMilestone> {
    encode_at(
        drafts,
        default_recipient,
        Utc::now().timestamp_millis() as u64,
    )
}

pub fn encode_at(
    drafts: &[MilestoneDraft],
    default_recipient: &UserId,
    now_ms: u64,
) -> Vec<CanonicalMilestone> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let milestone_type = match &draft.condition {
                MilestoneCondition::Manual => MilestoneType::ManualApproval,
                MilestoneCondition::Document { .. } => MilestoneType::DocumentSignature,
                MilestoneCondition::Time { .. } => MilestoneType::TimeRelease,
                // Voting milestones have no canonical encoding yet; they
                // fall back to manual approval.
                MilestoneCondition::Voting { .. } => MilestoneType::ManualApproval,
            };

            let recipient = draft
                .recipients
                .first()
                .cloned()
                .unwrap_or_else(|| default_recipient.clone());

            CanonicalMilestone {
                id: index as u64 + 1,
                title: draft.title.clone(),
                description: draft.description.clone(),
                milestone_type,
                recipient,
                amount: micro_amount(&draft.amount),
                status: MilestoneStatus::Pending,
                votes: BTreeMap::new(),
                created_at: now_ms * 1_000_000,
                completed_at: None,
            }
        })
        .collect()
}

/// Scales a user-entered decimal amount to integer micro units. Drafts
/// whose amount fails to parse encode as zero.
pub fn micro_amount(decimal: &str) -> u64 {
    scale_to_micro(decimal.trim().parse::<f64>().unwrap_or(0.0))
}

pub fn scale_to_micro(amount: f64) -> u64 {
    (amount.max(0.0) * MICRO_SCALE).round() as u64
}

#[cfg(test)]
#[path = "tests/milestone_tests.rs"]
mod tests;
