use std::future::Future;
use std::time::Duration;

use gradebook_core::domain::{
    DomainError, ErrorKind, StoreError, StudentId, SubmissionId, SubmissionKey,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("校验失败: {0}")]
    Validation(DomainError),

    #[error("提交冲突: 成绩单 {key} 已被提交 {existing} 占用")]
    Conflict {
        key: SubmissionKey,
        existing: SubmissionId,
    },

    #[error("状态非法: {0}")]
    InvalidState(DomainError),

    #[error("数据不足: 学生 {0} 没有可计分的已审批科目")]
    InsufficientData(StudentId),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("存储错误: {0}")]
    Store(StoreError),

    #[error("操作超时: {0}")]
    Timeout(String),

    #[error("等待班级锁超时: {0}")]
    LockTimeout(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML 错误: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl GradingError {
    /// Failures a class batch records per student instead of aborting on.
    pub fn is_per_student(&self) -> bool {
        matches!(self, Self::InsufficientData(_))
    }
}

impl From<DomainError> for GradingError {
    fn from(err: DomainError) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::Validation(err),
            ErrorKind::InvalidState => Self::InvalidState(err),
            ErrorKind::InsufficientData => match err {
                DomainError::InsufficientData(student_id) => Self::InsufficientData(student_id),
                other => Self::Validation(other),
            },
        }
    }
}

impl From<StoreError> for GradingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::Timeout("store call timed out".to_string()),
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GradingError>;

/// 为一次协作方调用加上超时，超时返回 `GradingError::Timeout`。
pub(crate) async fn bounded<T, E>(
    timeout: Duration,
    operation: &str,
    call: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T>
where
    GradingError: From<E>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(outcome) => Ok(outcome?),
        Err(_) => Err(GradingError::Timeout(format!(
            "{operation} did not finish within {timeout:?}"
        ))),
    }
}
