use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ContextId);
id_newtype!(UserId);
id_newtype!(ApplicationId);

/// Roles a member can hold inside a shared context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Owner,
    Signer,
    Viewer,
    Unknown,
}

impl ParticipantRole {
    /// Unrecognized wire strings map to `Unknown` rather than failing the
    /// record they arrived in.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "owner" => Self::Owner,
            "signer" => Self::Signer,
            "viewer" => Self::Viewer,
            _ => Self::Unknown,
        }
    }
}

/// A shared context plus the caller's membership metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub id: ContextId,
    pub name: String,
    pub context_id: ContextId,
    pub member_public_key: String,
    pub role: ParticipantRole,
    /// Milliseconds since the unix epoch.
    pub joined_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_identity: Option<String>,
}

impl Agreement {
    /// `id` always mirrors the backing context id.
    pub fn for_context(
        context_id: ContextId,
        name: impl Into<String>,
        member_public_key: impl Into<String>,
        role: ParticipantRole,
        joined_at: u64,
    ) -> Self {
        Self {
            id: context_id.clone(),
            name: name.into(),
            context_id,
            member_public_key: member_public_key.into(),
            role,
            joined_at,
            private_identity: None,
            shared_identity: None,
        }
    }
}

/// An invited member of a DAO agreement under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub context_id: ContextId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_payload: Option<String>,
    pub user_id: UserId,
}

impl Participant {
    /// Refuses construction when either identity is blank.
    pub fn new(context_id: ContextId, user_id: UserId) -> Option<Self> {
        if context_id.is_blank() || user_id.is_blank() {
            return None;
        }
        Some(Self {
            context_id,
            invitation_payload: None,
            user_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
}

/// Completion condition of a milestone draft, with the fields each variant
/// actually requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MilestoneCondition {
    Manual,
    Document {
        document_id: String,
    },
    Time {
        duration: u64,
        unit: TimeUnit,
    },
    Voting {
        threshold: u8,
        duration: u64,
        unit: TimeUnit,
    },
}

/// User-entered milestone, amounts still in decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneDraft {
    pub id: String,
    pub title: String,
    pub description: String,
    pub amount: String,
    pub recipients: Vec<UserId>,
    #[serde(flatten)]
    pub condition: MilestoneCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneType {
    ManualApproval,
    DocumentSignature,
    TimeRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Pending,
    ReadyForVoting,
    VotingActive,
    Approved,
    Executed,
    Rejected,
}

/// Milestone record in the shape the agreement context stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMilestone {
    /// 1-based position in the submitted sequence.
    pub id: u64,
    pub title: String,
    pub description: String,
    pub milestone_type: MilestoneType,
    pub recipient: UserId,
    /// Integer micro units (decimal amount scaled by 1,000,000).
    pub amount: u64,
    pub status: MilestoneStatus,
    pub votes: BTreeMap<String, bool>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
}

/// In-memory file handed to the document upload coordinator.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub id: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            bytes,
        }
    }
}
