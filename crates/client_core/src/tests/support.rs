//! Scripted transport double shared by the orchestration tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::ContextId,
    error::{ApiError, ApiResult},
    protocol::{
        CreateContextRequest, CreateContextResponse, ExecutionRequest, InviteRequest,
        JoinContextResponse, MembershipStatus,
    },
};
use tokio::sync::Mutex;

use crate::transport::ContextTransport;

pub(crate) struct TestTransport {
    pub created_contexts: Mutex<Vec<CreateContextRequest>>,
    pub executions: Mutex<Vec<ExecutionRequest>>,
    pub member_public_key: Option<String>,
    pub executor_id: Option<String>,
    pub context_listing: Value,
    pub fail_create: bool,
    pub fail_methods: Vec<String>,
    pub fail_uploads: Vec<String>,
    pub joined: bool,
}

impl TestTransport {
    pub fn ok() -> Self {
        Self {
            created_contexts: Mutex::new(Vec::new()),
            executions: Mutex::new(Vec::new()),
            member_public_key: Some("member-key".to_string()),
            executor_id: Some("executor-id".to_string()),
            context_listing: json!([]),
            fail_create: false,
            fail_methods: Vec::new(),
            fail_uploads: Vec::new(),
            joined: true,
        }
    }

    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::ok()
        }
    }

    pub fn failing_method(mut self, method: &str) -> Self {
        self.fail_methods.push(method.to_string());
        self
    }

    pub fn failing_upload(mut self, file_name: &str) -> Self {
        self.fail_uploads.push(file_name.to_string());
        self
    }

    pub fn without_member_key(mut self) -> Self {
        self.member_public_key = None;
        self
    }

    pub fn with_listing(mut self, listing: Value) -> Self {
        self.context_listing = listing;
        self
    }

    pub async fn created_count(&self) -> usize {
        self.created_contexts.lock().await.len()
    }

    pub async fn executed_methods(&self) -> Vec<String> {
        self.executions
            .lock()
            .await
            .iter()
            .map(|request| request.method.clone())
            .collect()
    }

    pub async fn execution_args(&self, method: &str) -> Option<Value> {
        self.executions
            .lock()
            .await
            .iter()
            .find(|request| request.method == method)
            .map(|request| request.args_json.clone())
    }
}

#[async_trait]
impl ContextTransport for TestTransport {
    async fn create_context(
        &self,
        request: CreateContextRequest,
    ) -> ApiResult<CreateContextResponse> {
        if self.fail_create {
            return Err(ApiError::internal("context creation refused"));
        }
        let mut created = self.created_contexts.lock().await;
        created.push(request);
        let sequence = created.len();
        Ok(CreateContextResponse {
            context_id: ContextId::from(format!("ctx-{sequence}")),
            member_public_key: self.member_public_key.clone(),
            executor_id: self.executor_id.clone(),
        })
    }

    async fn invite_member(&self, request: InviteRequest) -> ApiResult<String> {
        Ok(format!(
            "invitation:{}:{}",
            request.context_id, request.invitee_id
        ))
    }

    async fn join_context(&self, _invitation_payload: String) -> ApiResult<JoinContextResponse> {
        Ok(JoinContextResponse {
            context_id: ContextId::from("ctx-joined"),
            member_public_key: "joined-member-key".to_string(),
        })
    }

    async fn verify_membership(&self, _context_id: ContextId) -> ApiResult<MembershipStatus> {
        Ok(MembershipStatus {
            joined: self.joined,
        })
    }

    async fn list_contexts(&self) -> ApiResult<Value> {
        Ok(self.context_listing.clone())
    }

    async fn execute(&self, request: ExecutionRequest) -> ApiResult<Value> {
        self.executions.lock().await.push(request.clone());

        if self.fail_methods.contains(&request.method) {
            return Err(ApiError::internal(format!("{} rejected", request.method)));
        }

        if request.method == "upload_document" {
            if let Some(name) = request.args_json.get("name").and_then(Value::as_str) {
                if self.fail_uploads.iter().any(|candidate| candidate == name) {
                    return Err(ApiError::internal(format!("storage rejected '{name}'")));
                }
            }
        }

        Ok(Value::Null)
    }
}
