use anyhow::Result;
use gradebook_core::domain::{CohortKey, ResultId, StudentId, SubmissionId, SubmissionKey, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// 成绩流水线对外广播的事件类型。事件只在对应写入提交之后发出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradingEvent {
    /// 教师创建了新的成绩单草稿。
    SubmissionCreated {
        submission_id: SubmissionId,
        key: SubmissionKey,
        teacher_id: UserId,
    },
    /// 成绩单已提交审核。
    SubmissionSubmitted { submission_id: SubmissionId },
    /// 成绩单已审批通过。
    SubmissionApproved {
        submission_id: SubmissionId,
        key: SubmissionKey,
        reviewer_id: UserId,
    },
    /// 成绩单被驳回。
    SubmissionRejected {
        submission_id: SubmissionId,
        reviewer_id: UserId,
        reason: String,
    },
    /// 单个学生的成绩结果已生成或重新生成。
    ResultGenerated {
        result_id: ResultId,
        student_id: StudentId,
        cohort: CohortKey,
    },
    /// 班级排名已重新计算。
    CohortRanked {
        cohort: CohortKey,
        total_students: u32,
        ranked_students: u32,
    },
    /// 整班生成批次结束。
    ClassGenerationCompleted {
        cohort: CohortKey,
        succeeded: usize,
        failed: Vec<StudentId>,
        partial: bool,
    },
}

/// 基于 `tokio::broadcast` 的事件广播器。
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<GradingEvent>,
}

impl EventBroadcaster {
    /// 创建事件广播器。
    ///
    /// `capacity` 表示内部广播队列容量。
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 广播一个事件，没有订阅者时直接丢弃。
    pub fn emit(&self, event: GradingEvent) {
        let _ = self.sender.send(event);
    }

    /// 订阅事件流。
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

/// 事件接收流包装器。
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<GradingEvent>,
}

impl EventStream {
    /// 异步接收下一条事件。
    ///
    /// 订阅者落后导致的丢失只记录日志并继续接收；只有广播器关闭时才返回错误。
    pub async fn recv(&mut self) -> Result<GradingEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged, skipped events");
                }
                Err(err @ RecvError::Closed) => return Err(err.into()),
            }
        }
    }

    /// 非阻塞尝试接收一条事件。
    pub fn try_recv(&mut self) -> Result<GradingEvent> {
        Ok(self.receiver.try_recv()?)
    }

    /// 取出当前已缓冲的全部事件。
    pub fn drain(&mut self) -> Vec<GradingEvent> {
        std::iter::from_fn(|| self.receiver.try_recv().ok()).collect()
    }
}
