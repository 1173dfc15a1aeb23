//! The six-step DAO creation flow as an explicit state machine with
//! per-step guards, decoupled from any rendering concern.

use std::sync::Arc;

use shared::{
    domain::{Agreement, DocumentFile, MilestoneDraft, Participant},
    error::{ApiError, ApiResult},
};
use storage::ScratchStore;
use tracing::warn;

use crate::{
    orchestrator::{
        AgreementOrchestrator, CompletedDaoAgreement, DaoAgreementRequest,
        DEFAULT_VOTING_THRESHOLD,
    },
    scratch_keys,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Name,
    Participants,
    Documents,
    Funding,
    Milestones,
    Review,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            Self::Name => 1,
            Self::Participants => 2,
            Self::Documents => 3,
            Self::Funding => 4,
            Self::Milestones => 5,
            Self::Review => 6,
        }
    }

    fn forward(self) -> Option<Self> {
        match self {
            Self::Name => Some(Self::Participants),
            Self::Participants => Some(Self::Documents),
            Self::Documents => Some(Self::Funding),
            Self::Funding => Some(Self::Milestones),
            Self::Milestones => Some(Self::Review),
            Self::Review => None,
        }
    }

    fn backward(self) -> Option<Self> {
        match self {
            Self::Name => None,
            Self::Participants => Some(Self::Name),
            Self::Documents => Some(Self::Participants),
            Self::Funding => Some(Self::Documents),
            Self::Milestones => Some(Self::Funding),
            Self::Review => Some(Self::Milestones),
        }
    }
}

/// Local edits accumulated across the wizard steps. Nothing here touches
/// the backend until step 1 creation and step 6 submission.
#[derive(Debug, Clone)]
pub struct WizardDraft {
    pub name: String,
    pub participants: Vec<Participant>,
    pub documents: Vec<DocumentFile>,
    pub funding: String,
    pub milestones: Vec<MilestoneDraft>,
    pub voting_threshold: u8,
}

impl Default for WizardDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            participants: Vec::new(),
            documents: Vec::new(),
            funding: String::new(),
            milestones: Vec::new(),
            voting_threshold: DEFAULT_VOTING_THRESHOLD,
        }
    }
}

pub struct DaoWizard {
    orchestrator: Arc<AgreementOrchestrator>,
    scratch: Arc<dyn ScratchStore>,
    step: WizardStep,
    context_created: bool,
    completed: bool,
    pub draft: WizardDraft,
}

impl DaoWizard {
    pub fn new(orchestrator: Arc<AgreementOrchestrator>, scratch: Arc<dyn ScratchStore>) -> Self {
        Self {
            orchestrator,
            scratch,
            step: WizardStep::Name,
            context_created: false,
            completed: false,
            draft: WizardDraft::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn context_created(&self) -> bool {
        self.context_created
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Appends a participant unless one with the same identity is already
    /// listed. The creator is implicit and never appears here.
    pub fn add_participant(&mut self, participant: Participant) -> bool {
        if self
            .draft
            .participants
            .iter()
            .any(|existing| existing.user_id == participant.user_id)
        {
            return false;
        }
        self.draft.participants.push(participant);
        true
    }

    /// Guard predicate of the current step.
    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::Name => !self.draft.name.trim().is_empty(),
            // Participants and documents are optional; review adds nothing.
            WizardStep::Participants | WizardStep::Documents | WizardStep::Review => true,
            WizardStep::Funding => parse_funding(&self.draft.funding).is_some(),
            WizardStep::Milestones => self.milestones_fit_funding(),
        }
    }

    fn milestones_fit_funding(&self) -> bool {
        if self.draft.milestones.is_empty() {
            return false;
        }
        let Some(funding) = parse_funding(&self.draft.funding) else {
            return false;
        };
        let total: f64 = self
            .draft
            .milestones
            .iter()
            .map(|draft| draft.amount.trim().parse::<f64>().unwrap_or(0.0))
            .sum();
        total <= funding
    }

    /// Attempts to advance one step. Returns `Ok(false)` when the current
    /// step's guard refuses the transition; only the step-1 side effect can
    /// produce an error. Re-entering step 1 after a successful creation
    /// advances without re-running the side effect.
    pub async fn next(&mut self) -> ApiResult<bool> {
        if self.completed || !self.can_advance() {
            return Ok(false);
        }
        let Some(next) = self.step.forward() else {
            // Review only moves forward through `submit`.
            return Ok(false);
        };

        if self.step == WizardStep::Name && !self.context_created {
            let agreement = self
                .orchestrator
                .create_dao_agreement_context(self.draft.name.trim())
                .await?;
            self.context_created = true;
            self.persist_temp_context(&agreement).await;
        }

        self.step = next;
        Ok(true)
    }

    pub fn prev(&mut self) -> bool {
        if self.completed {
            return false;
        }
        match self.step.backward() {
            Some(step) => {
                self.step = step;
                true
            }
            None => false,
        }
    }

    /// Runs the terminal submission from the review step. On success the
    /// workflow leaves the numbered steps for good.
    pub async fn submit(&mut self) -> ApiResult<CompletedDaoAgreement> {
        if self.completed {
            return Err(ApiError::validation("wizard already submitted"));
        }
        if self.step != WizardStep::Review {
            return Err(ApiError::validation(
                "submission is only available from the review step",
            ));
        }

        let request = DaoAgreementRequest {
            name: self.draft.name.trim().to_string(),
            participant_ids: self
                .draft
                .participants
                .iter()
                .map(|participant| participant.user_id.clone())
                .collect(),
            milestones: self.draft.milestones.clone(),
            total_funding: parse_funding(&self.draft.funding).unwrap_or(0.0),
            voting_threshold: self.draft.voting_threshold,
            documents: self.draft.documents.clone(),
        };

        let completed = self
            .orchestrator
            .create_complete_dao_agreement(request)
            .await?;
        self.completed = true;
        self.clear_temp_context().await;
        Ok(completed)
    }

    /// Discards the draft and any step-1 bookkeeping.
    pub async fn reset(&mut self) {
        self.step = WizardStep::Name;
        self.context_created = false;
        self.completed = false;
        self.draft = WizardDraft::default();
        self.clear_temp_context().await;
    }

    async fn persist_temp_context(&self, agreement: &Agreement) {
        for (key, value) in [
            (
                scratch_keys::TEMP_DAO_CONTEXT_ID,
                agreement.context_id.as_str(),
            ),
            (
                scratch_keys::TEMP_DAO_CONTEXT_USER_ID,
                agreement.member_public_key.as_str(),
            ),
            (scratch_keys::TEMP_DAO_AGREEMENT_NAME, agreement.name.as_str()),
        ] {
            if let Err(err) = self.scratch.set(key, value).await {
                warn!(key, error = %err, "failed to persist wizard scratch entry");
            }
        }
    }

    async fn clear_temp_context(&self) {
        for key in [
            scratch_keys::TEMP_DAO_CONTEXT_ID,
            scratch_keys::TEMP_DAO_CONTEXT_USER_ID,
            scratch_keys::TEMP_DAO_AGREEMENT_NAME,
        ] {
            if let Err(err) = self.scratch.remove(key).await {
                warn!(key, error = %err, "failed to clear wizard scratch entry");
            }
        }
    }
}

/// Funding amounts must parse as a number greater than zero.
pub fn parse_funding(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| *value > 0.0)
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
