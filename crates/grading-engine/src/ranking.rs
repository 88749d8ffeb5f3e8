use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gradebook_core::domain::{CohortKey, CohortRanking, ResultStore, rank_results};
use tracing::info;

use crate::Result;
use crate::error::bounded;

/// 对整个班级全量重算名次与统计数据。
///
/// 调用方负责持有该班级的锁，保证读取到的是完整的结果集。
pub struct ClassRankingEngine {
    results: Arc<dyn ResultStore>,
    store_timeout: Duration,
}

impl ClassRankingEngine {
    /// `store_timeout` 限制每一次存储读写的耗时。
    pub fn new(results: Arc<dyn ResultStore>, store_timeout: Duration) -> Self {
        Self {
            results,
            store_timeout,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn rank(&self, cohort: CohortKey) -> Result<CohortRanking> {
        let results = bounded(
            self.store_timeout,
            "list cohort results",
            self.results.list_cohort_results(cohort),
        )
        .await?;
        let ranking = rank_results(cohort, &results, Utc::now());
        bounded(
            self.store_timeout,
            "save cohort ranking",
            self.results.save_ranking(&ranking),
        )
        .await?;

        info!(
            cohort = %cohort,
            total_students = ranking.statistics.total_students,
            ranked_students = ranking.statistics.ranked_students,
            "cohort ranked"
        );

        Ok(ranking)
    }
}
