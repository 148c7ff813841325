//! # Copy Job Message
//!
//! Request to replicate the file rows of one version onto another. The job
//! is not a source of truth: the destination version's readiness flag is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::MessagingResult;

/// Wire format: `{"tenantId":1,"taskId":2,"oldVersionId":3,"newVersionId":4,"traceId":"..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyJob {
    pub tenant_id: i64,
    pub task_id: i64,
    /// Version the file rows are copied from
    pub old_version_id: i64,
    /// PREPARING version receiving the copies
    pub new_version_id: i64,
    /// Correlates dispatch, execution and failure logs
    pub trace_id: String,
}

impl CopyJob {
    /// Build a job with a fresh trace id
    pub fn new(tenant_id: i64, task_id: i64, old_version_id: i64, new_version_id: i64) -> Self {
        Self {
            tenant_id,
            task_id,
            old_version_id,
            new_version_id,
            trace_id: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn encode(&self) -> MessagingResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> MessagingResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
