//! Client-side orchestration core for agreement workflows: dual-transport
//! dispatch, context management, milestone canonicalization, document batch
//! uploads and the DAO creation wizard. Rendering sits entirely on top of
//! the types exported here.

pub mod config;
pub mod context;
pub mod documents;
pub mod milestone;
pub mod orchestrator;
pub mod transport;
pub mod wizard;

/// Scratch-store keys shared between the orchestrator and the wizard.
pub mod scratch_keys {
    /// Written at wizard step-1 creation, cleared on reset or submission.
    pub const TEMP_DAO_CONTEXT_ID: &str = "tempDaoContextID";
    pub const TEMP_DAO_CONTEXT_USER_ID: &str = "tempDaoContextUserID";
    pub const TEMP_DAO_AGREEMENT_NAME: &str = "tempDaoAgreementName";

    /// Written on any successful join, creation or completion; read when
    /// navigating into an agreement's detail view.
    pub const AGREEMENT_CONTEXT_ID: &str = "agreementContextID";
    pub const AGREEMENT_CONTEXT_USER_ID: &str = "agreementContextUserID";
}

pub use config::{load_settings, Settings};
pub use context::ContextService;
pub use documents::{DocumentUploadCoordinator, UploadEvent};
pub use orchestrator::{
    AgreementOrchestrator, CompletedDaoAgreement, DaoAgreementRequest, DEFAULT_VOTING_THRESHOLD,
};
pub use transport::{
    ContextTransport, MissingNodeBridge, NodeBridge, RestTransport, TransportSelector,
};
pub use wizard::{DaoWizard, WizardDraft, WizardStep};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
