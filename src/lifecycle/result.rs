//! Uniform operation results.
//!
//! Every public orchestrator operation answers with an [`OperationResult`].
//! Internally the orchestrator works with `Result<T, LifecycleError>` and
//! converts at the boundary through `From`.

use crate::container::ContainerError;
use crate::record::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome codes carried by every [`OperationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Ok,
    ParamError,
    AuthorityError,
    PermissionError,
    ContainerNotFound,
    ContainerStatusRefuse,
    DockerOperationError,
    StoreError,
}

impl ResultCode {
    /// Every code, in declaration order.
    pub fn all() -> &'static [ResultCode] {
        &[
            ResultCode::Ok,
            ResultCode::ParamError,
            ResultCode::AuthorityError,
            ResultCode::PermissionError,
            ResultCode::ContainerNotFound,
            ResultCode::ContainerStatusRefuse,
            ResultCode::DockerOperationError,
            ResultCode::StoreError,
        ]
    }

    /// Stable numeric value.
    pub fn code(self) -> i32 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::ParamError => 10,
            ResultCode::AuthorityError => 20,
            ResultCode::PermissionError => 21,
            ResultCode::ContainerNotFound => 30,
            ResultCode::ContainerStatusRefuse => 31,
            ResultCode::DockerOperationError => 40,
            ResultCode::StoreError => 50,
        }
    }

    /// Default message for the code.
    pub fn message(self) -> &'static str {
        match self {
            ResultCode::Ok => "success",
            ResultCode::ParamError => "invalid parameters",
            ResultCode::AuthorityError => "unable to resolve caller authority",
            ResultCode::PermissionError => "permission denied",
            ResultCode::ContainerNotFound => "container not found",
            ResultCode::ContainerStatusRefuse => "operation not allowed in current container status",
            ResultCode::DockerOperationError => "container runtime operation failed",
            ResultCode::StoreError => "container record store failed",
        }
    }

    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Orchestrator failure taxonomy.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid parameter: {0}")]
    Param(String),

    #[error("Unable to resolve role for user {0}")]
    Authority(String),

    #[error("User {user_id} may not access {target}")]
    Permission { user_id: String, target: String },

    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Container {container_id} is {status}, cannot {operation}")]
    StatusRefused {
        container_id: String,
        status: String,
        operation: &'static str,
    },

    #[error("Runtime error: {0}")]
    Runtime(#[from] ContainerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn code(&self) -> ResultCode {
        match self {
            LifecycleError::Param(_) => ResultCode::ParamError,
            LifecycleError::Authority(_) => ResultCode::AuthorityError,
            LifecycleError::Permission { .. } => ResultCode::PermissionError,
            LifecycleError::NotFound(_) => ResultCode::ContainerNotFound,
            LifecycleError::StatusRefused { .. } => ResultCode::ContainerStatusRefuse,
            LifecycleError::Runtime(_) => ResultCode::DockerOperationError,
            LifecycleError::Store(_) => ResultCode::StoreError,
        }
    }
}

/// `{ code, message, payload }` answer returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub code: ResultCode,
    pub message: String,
    pub payload: Option<T>,
}

impl<T> OperationResult<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            code: ResultCode::Ok,
            message: ResultCode::Ok.message().to_string(),
            payload: Some(payload),
        }
    }

    /// Success with a custom message and no payload.
    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            code: ResultCode::Ok,
            message: message.into(),
            payload: None,
        }
    }

    pub fn error(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            payload: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// Numeric value of the code, as exposed on the wire.
    pub fn numeric_code(&self) -> i32 {
        self.code.code()
    }
}

impl<T> From<Result<T, LifecycleError>> for OperationResult<T> {
    fn from(result: Result<T, LifecycleError>) -> Self {
        match result {
            Ok(payload) => OperationResult::ok(payload),
            Err(e) => OperationResult::error(e.code(), e.to_string()),
        }
    }
}
