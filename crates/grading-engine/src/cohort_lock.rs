use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use gradebook_core::domain::CohortKey;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::{GradingError, Result};

type Registry = Arc<StdMutex<HashMap<CohortKey, Arc<Mutex<()>>>>>;

/// 按班级（班级/学期/学年）划分的进程内互斥锁。
///
/// 同一班级的“聚合 + 排名”序列同一时刻最多只有一个在执行；不同班级互不影响。
/// 最后一个持有者或等待者离开后，对应条目会从表中移除。
#[derive(Debug, Default)]
pub struct CohortLocks {
    locks: Registry,
}

/// 持有期间独占对应班级，释放时自动解锁。
#[derive(Debug)]
pub struct CohortGuard {
    cohort: CohortKey,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl CohortGuard {
    pub fn cohort(&self) -> CohortKey {
        self.cohort
    }
}

impl Drop for CohortGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        evict_if_idle(&self.registry, self.cohort);
    }
}

// 表本身持有一份引用；计数为 1 说明既没有持有者也没有等待者。
fn evict_if_idle(registry: &Registry, cohort: CohortKey) {
    let mut locks = registry.lock().unwrap_or_else(PoisonError::into_inner);
    if locks
        .get(&cohort)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        locks.remove(&cohort);
    }
}

impl CohortLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取班级锁，超过 `timeout` 仍未拿到时返回 `LockTimeout`。
    pub async fn acquire(&self, cohort: CohortKey, timeout: Duration) -> Result<CohortGuard> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(cohort).or_default().clone()
        };

        let acquired = tokio::time::timeout(timeout, lock.lock_owned()).await;
        match acquired {
            Ok(guard) => {
                debug!(cohort = %cohort, "cohort lock acquired");
                Ok(CohortGuard {
                    cohort,
                    guard: Some(guard),
                    registry: self.locks.clone(),
                })
            }
            Err(_) => {
                evict_if_idle(&self.locks, cohort);
                Err(GradingError::LockTimeout(format!(
                    "cohort {cohort} still busy after {timeout:?}"
                )))
            }
        }
    }

    /// 当前是否有任务持有该班级的锁。
    pub fn is_held(&self, cohort: CohortKey) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .get(&cohort)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// 当前登记在表中的班级数。
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
