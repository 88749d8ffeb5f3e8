use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CohortKey, ResultId, StudentId, StudentResult, round_score};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStatistics {
    pub cohort: CohortKey,
    pub highest_score: Option<Decimal>,
    pub lowest_score: Option<Decimal>,
    pub class_average: Option<Decimal>,
    pub total_students: u32,
    pub ranked_students: u32,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub result_id: ResultId,
    pub student_id: StudentId,
    pub position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortRanking {
    pub entries: Vec<RankedEntry>,
    pub statistics: ClassStatistics,
}

impl CohortRanking {
    pub fn position_of(&self, student_id: StudentId) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.student_id == student_id)
            .and_then(|entry| entry.position)
    }
}

/// Competition ranking (1, 2, 2, 4) by average score, highest first.
///
/// Results without an average get no position and are left out of the
/// score statistics, but still count toward `total_students`.
pub fn rank_results(
    cohort: CohortKey,
    results: &[StudentResult],
    computed_at: DateTime<Utc>,
) -> CohortRanking {
    let mut scored: Vec<(Decimal, &StudentResult)> = results
        .iter()
        .filter_map(|result| result.average_score.map(|average| (average, result)))
        .collect();
    scored.sort_by(|(a, left), (b, right)| b.cmp(a).then(left.student_id.cmp(&right.student_id)));

    let mut entries = Vec::with_capacity(results.len());
    let mut previous: Option<(Decimal, u32)> = None;
    for (index, (average, result)) in scored.iter().enumerate() {
        let position = match previous {
            Some((prev_average, prev_position)) if prev_average == *average => prev_position,
            _ => u32::try_from(index + 1).unwrap_or(u32::MAX),
        };
        previous = Some((*average, position));
        entries.push(RankedEntry {
            result_id: result.id,
            student_id: result.student_id,
            position: Some(position),
        });
    }

    let mut unranked: Vec<&StudentResult> = results
        .iter()
        .filter(|result| result.average_score.is_none())
        .collect();
    unranked.sort_by_key(|result| result.student_id);
    entries.extend(unranked.into_iter().map(|result| RankedEntry {
        result_id: result.id,
        student_id: result.student_id,
        position: None,
    }));

    let averages: Vec<Decimal> = scored.iter().map(|(average, _)| *average).collect();
    let ranked_students = u32::try_from(averages.len()).unwrap_or(u32::MAX);
    let class_average = (!averages.is_empty()).then(|| {
        let sum: Decimal = averages.iter().sum();
        round_score(sum / Decimal::from(ranked_students))
    });

    CohortRanking {
        entries,
        statistics: ClassStatistics {
            cohort,
            highest_score: averages.first().copied(),
            lowest_score: averages.last().copied(),
            class_average,
            total_students: u32::try_from(results.len()).unwrap_or(u32::MAX),
            ranked_students,
            computed_at,
        },
    }
}
