use super::*;
use crate::test_support::TestTransport;
use shared::domain::MilestoneCondition;
use storage::MemoryScratchStore;

fn orchestrator(transport: Arc<TestTransport>) -> AgreementOrchestrator {
    AgreementOrchestrator::new(transport as _, Arc::new(MemoryScratchStore::default()))
}

fn manual_milestone(title: &str, amount: &str, recipients: &[&str]) -> MilestoneDraft {
    MilestoneDraft {
        id: format!("draft-{title}"),
        title: title.to_string(),
        description: String::new(),
        amount: amount.to_string(),
        recipients: recipients.iter().map(|id| UserId::from(*id)).collect(),
        condition: MilestoneCondition::Manual,
    }
}

#[tokio::test]
async fn create_agreement_swallows_join_failure() {
    let transport =
        Arc::new(TestTransport::ok().failing_method("register_self_as_participant"));
    let orchestrator = orchestrator(Arc::clone(&transport));

    let agreement = orchestrator.create_agreement("Acme").await.expect("create");
    assert_eq!(agreement.name, "Acme");
    assert_eq!(agreement.role, ParticipantRole::Owner);
    assert_eq!(agreement.id, agreement.context_id);
    assert_eq!(agreement.member_public_key, "member-key");
}

#[tokio::test]
async fn create_agreement_records_navigation_keys() {
    let transport = Arc::new(TestTransport::ok());
    let scratch = Arc::new(MemoryScratchStore::default());
    let orchestrator = AgreementOrchestrator::new(transport as _, Arc::clone(&scratch) as _);

    let agreement = orchestrator.create_agreement("Acme").await.expect("create");
    assert_eq!(
        scratch
            .get(crate::scratch_keys::AGREEMENT_CONTEXT_ID)
            .await
            .expect("get"),
        Some(agreement.context_id.0.clone())
    );
    assert_eq!(
        scratch
            .get(crate::scratch_keys::AGREEMENT_CONTEXT_USER_ID)
            .await
            .expect("get"),
        Some("member-key".to_string())
    );
}

#[tokio::test]
async fn dao_context_initialization_failure_is_hard() {
    let transport = Arc::new(TestTransport::ok().failing_method("initialize_dao_agreement"));
    let orchestrator = orchestrator(transport);

    let err = orchestrator
        .create_dao_agreement_context("Proj")
        .await
        .expect_err("should fail");
    assert!(err.message.contains("initialize_dao_agreement"));
}

#[tokio::test]
async fn dao_context_join_failure_is_hard() {
    let transport = Arc::new(TestTransport::ok().failing_method("join_dao_agreement"));
    let orchestrator = orchestrator(transport);

    assert!(orchestrator.create_dao_agreement_context("Proj").await.is_err());
}

#[tokio::test]
async fn dao_context_prefers_member_key_and_falls_back_to_executor() {
    let orchestrator_with_key = orchestrator(Arc::new(TestTransport::ok()));
    let agreement = orchestrator_with_key
        .create_dao_agreement_context("Proj")
        .await
        .expect("create");
    assert_eq!(agreement.member_public_key, "member-key");

    let orchestrator_without_key = orchestrator(Arc::new(TestTransport::ok().without_member_key()));
    let agreement = orchestrator_without_key
        .create_dao_agreement_context("Proj")
        .await
        .expect("create");
    assert_eq!(agreement.member_public_key, "executor-id");
}

#[tokio::test]
async fn complete_pipeline_submits_canonical_agreement() {
    let transport = Arc::new(TestTransport::ok());
    let orchestrator = orchestrator(Arc::clone(&transport));

    let mut request = DaoAgreementRequest::new("Proj");
    request.participant_ids = vec![UserId::from("p1")];
    request.milestones = vec![manual_milestone("M1", "10", &["p1"])];
    request.total_funding = 10.0;

    let completed = orchestrator
        .create_complete_dao_agreement(request)
        .await
        .expect("pipeline");
    assert!(completed.agreement_id.starts_with("dao_agreement_ctx-1_"));

    let args = transport
        .execution_args("create_agreement")
        .await
        .expect("submission args");
    assert_eq!(args["participants"], json!(["member-key", "p1"]));
    assert_eq!(args["milestones"][0]["id"], 1);
    assert_eq!(args["milestones"][0]["amount"], 10_000_000u64);
    assert_eq!(args["milestones"][0]["recipient"], "p1");
    assert_eq!(args["total_funding"], 10_000_000u64);
    assert_eq!(args["voting_threshold"], 75);

    // No documents were supplied, so no upload phase ran.
    let methods = transport.executed_methods().await;
    assert!(!methods.iter().any(|method| method == "upload_document"));
}

#[tokio::test]
async fn pipeline_deduplicates_participants_against_creator() {
    let transport = Arc::new(TestTransport::ok());
    let orchestrator = orchestrator(Arc::clone(&transport));

    let mut request = DaoAgreementRequest::new("Proj");
    request.participant_ids = vec![
        UserId::from("p1"),
        UserId::from("p1"),
        UserId::from("member-key"),
        UserId::from("  "),
        UserId::from("p2"),
    ];
    request.milestones = vec![manual_milestone("M1", "1", &["p1"])];
    request.total_funding = 5.0;

    orchestrator
        .create_complete_dao_agreement(request)
        .await
        .expect("pipeline");

    let args = transport
        .execution_args("create_agreement")
        .await
        .expect("submission args");
    assert_eq!(args["participants"], json!(["member-key", "p1", "p2"]));
}

#[tokio::test]
async fn document_failure_after_submission_fails_the_composite_call() {
    let transport = Arc::new(TestTransport::ok().failing_upload("terms.pdf"));
    let orchestrator = orchestrator(Arc::clone(&transport));

    let mut request = DaoAgreementRequest::new("Proj");
    request.milestones = vec![manual_milestone("M1", "1", &["p1"])];
    request.total_funding = 5.0;
    request.documents = vec![
        DocumentFile::new("scope.pdf", b"scope".to_vec()),
        DocumentFile::new("terms.pdf", b"terms".to_vec()),
    ];

    let err = orchestrator
        .create_complete_dao_agreement(request)
        .await
        .expect_err("should fail");
    assert!(err.message.contains("terms.pdf"));

    // The submission itself still went through; there is no rollback.
    let methods = transport.executed_methods().await;
    assert!(methods.iter().any(|method| method == "create_agreement"));
    assert_eq!(
        methods
            .iter()
            .filter(|method| method.as_str() == "upload_document")
            .count(),
        2
    );
}

#[tokio::test]
async fn pipeline_aborts_before_submission_when_creation_fails() {
    let transport = Arc::new(TestTransport::failing_create());
    let orchestrator = orchestrator(Arc::clone(&transport));

    let mut request = DaoAgreementRequest::new("Proj");
    request.milestones = vec![manual_milestone("M1", "1", &["p1"])];
    request.total_funding = 5.0;

    assert!(orchestrator.create_complete_dao_agreement(request).await.is_err());
    assert!(transport.executed_methods().await.is_empty());
}

#[tokio::test]
async fn list_agreements_accepts_the_three_known_shapes() {
    let record = json!({
        "contextId": "ctx-7",
        "contextName": "Acme",
        "memberPublicKey": "member-key",
        "role": "owner",
        "joinedAt": 1_700_000_000_000u64,
    });

    for listing in [
        json!([record]),
        json!({ "output": [record] }),
        json!({ "result": [record] }),
    ] {
        let transport = Arc::new(TestTransport::ok().with_listing(listing));
        let orchestrator = orchestrator(transport);

        let agreements = orchestrator.list_agreements().await.expect("list");
        assert_eq!(agreements.len(), 1);
        assert_eq!(agreements[0].context_id.as_str(), "ctx-7");
        assert_eq!(agreements[0].name, "Acme");
        assert_eq!(agreements[0].role, ParticipantRole::Owner);
        assert_eq!(agreements[0].joined_at, 1_700_000_000_000);
    }
}

#[tokio::test]
async fn list_agreements_degrades_unknown_shapes_to_empty() {
    let transport = Arc::new(TestTransport::ok().with_listing(json!({"surprise": true})));
    let orchestrator = orchestrator(transport);

    let agreements = orchestrator.list_agreements().await.expect("list");
    assert!(agreements.is_empty());
}

#[tokio::test]
async fn list_agreements_reads_legacy_field_names() {
    let listing = json!([{
        "context_id": "ctx-8",
        "context_name": "Legacy",
        "member_public_key": "legacy-key",
        "role": "signer",
        "joined_at": 12u64,
        "private_identity": "priv",
        "shared_identity": "shared",
    }]);
    let transport = Arc::new(TestTransport::ok().with_listing(listing));
    let orchestrator = orchestrator(transport);

    let agreements = orchestrator.list_agreements().await.expect("list");
    assert_eq!(agreements.len(), 1);
    assert_eq!(agreements[0].context_id.as_str(), "ctx-8");
    assert_eq!(agreements[0].member_public_key, "legacy-key");
    assert_eq!(agreements[0].role, ParticipantRole::Signer);
    assert_eq!(agreements[0].private_identity.as_deref(), Some("priv"));
    assert_eq!(agreements[0].shared_identity.as_deref(), Some("shared"));
}

#[tokio::test]
async fn join_agreement_records_navigation_keys() {
    let transport = Arc::new(TestTransport::ok());
    let scratch = Arc::new(MemoryScratchStore::default());
    let orchestrator = AgreementOrchestrator::new(transport as _, Arc::clone(&scratch) as _);

    let agreement = orchestrator
        .join_agreement("opaque-invitation")
        .await
        .expect("join");
    assert_eq!(agreement.context_id.as_str(), "ctx-joined");
    assert_eq!(
        scratch
            .get(crate::scratch_keys::AGREEMENT_CONTEXT_USER_ID)
            .await
            .expect("get"),
        Some("joined-member-key".to_string())
    );
}
