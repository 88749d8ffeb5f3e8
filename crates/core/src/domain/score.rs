use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreComponent {
    ContinuousAssessment,
    Exam,
}

impl fmt::Display for ScoreComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinuousAssessment => f.write_str("continuous assessment"),
            Self::Exam => f.write_str("exam"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeLetter(String);

impl GradeLetter {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the threshold table: scores at or above `min_score` earn `letter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min_score: Decimal,
    pub letter: GradeLetter,
    pub remark: String,
}

impl GradeBand {
    pub fn new(min_score: Decimal, letter: &str, remark: &str) -> Self {
        Self {
            min_score,
            letter: GradeLetter::new(letter),
            remark: remark.to_string(),
        }
    }
}

/// Ordered threshold table, highest band first, ending at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeScale {
    bands: Vec<GradeBand>,
}

impl GradeScale {
    pub fn new(bands: Vec<GradeBand>) -> Result<Self, DomainError> {
        let Some(last) = bands.last() else {
            return Err(DomainError::InvalidGradeScale(
                "at least one band is required".to_string(),
            ));
        };

        if last.min_score != Decimal::ZERO {
            return Err(DomainError::InvalidGradeScale(format!(
                "lowest band must start at 0, found {}",
                last.min_score
            )));
        }

        for pair in bands.windows(2) {
            if pair[0].min_score <= pair[1].min_score {
                return Err(DomainError::InvalidGradeScale(format!(
                    "bands must be strictly descending: {} ({}) is not above {} ({})",
                    pair[0].letter, pair[0].min_score, pair[1].letter, pair[1].min_score
                )));
            }
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Band for a non-negative score. Negative input falls through to the lowest band.
    pub fn band_for(&self, score: Decimal) -> &GradeBand {
        let lowest = self.bands.len() - 1;
        self.bands
            .iter()
            .find(|band| score >= band.min_score)
            .unwrap_or(&self.bands[lowest])
    }

    pub fn letter_for(&self, score: Decimal) -> &GradeLetter {
        &self.band_for(score).letter
    }
}

impl Default for GradeScale {
    fn default() -> Self {
        Self {
            bands: vec![
                GradeBand::new(Decimal::from(70), "A", "Excellent"),
                GradeBand::new(Decimal::from(60), "B", "Very Good"),
                GradeBand::new(Decimal::from(50), "C", "Good"),
                GradeBand::new(Decimal::from(45), "D", "Fair"),
                GradeBand::new(Decimal::from(40), "E", "Pass"),
                GradeBand::new(Decimal::ZERO, "F", "Fail"),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBounds {
    pub ca_max: Decimal,
    pub exam_max: Decimal,
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self {
            ca_max: Decimal::from(30),
            exam_max: Decimal::from(70),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredSubject {
    pub ca_score: Option<Decimal>,
    pub exam_score: Option<Decimal>,
    pub total_score: Option<Decimal>,
    pub grade_letter: Option<GradeLetter>,
    pub remark: Option<String>,
}

impl ScoredSubject {
    pub fn is_gradable(&self) -> bool {
        self.total_score.is_some()
    }
}

/// Stateless score checks against configured bounds and a grade scale.
#[derive(Debug, Clone, Default)]
pub struct ScoreValidator {
    bounds: ScoreBounds,
    scale: GradeScale,
}

impl ScoreValidator {
    /// Scores are stored as DECIMAL(5,2).
    pub const MAX_DECIMAL_PLACES: u32 = 2;

    pub fn new(bounds: ScoreBounds, scale: GradeScale) -> Self {
        Self { bounds, scale }
    }

    pub fn scale(&self) -> &GradeScale {
        &self.scale
    }

    pub fn score_for(
        &self,
        ca: Option<Decimal>,
        exam: Option<Decimal>,
    ) -> Result<ScoredSubject, DomainError> {
        let ca = ca
            .map(|value| check_bound(ScoreComponent::ContinuousAssessment, value, self.bounds.ca_max))
            .transpose()?;
        let exam = exam
            .map(|value| check_bound(ScoreComponent::Exam, value, self.bounds.exam_max))
            .transpose()?;

        let total_score = match (ca, exam) {
            (Some(ca), Some(exam)) => Some(ca + exam),
            _ => None,
        };
        let band = total_score.map(|total| self.scale.band_for(total));

        Ok(ScoredSubject {
            ca_score: ca,
            exam_score: exam,
            total_score,
            grade_letter: band.map(|band| band.letter.clone()),
            remark: band.map(|band| band.remark.clone()),
        })
    }
}

fn check_bound(
    component: ScoreComponent,
    value: Decimal,
    max: Decimal,
) -> Result<Decimal, DomainError> {
    if value < Decimal::ZERO || value > max {
        return Err(DomainError::ScoreOutOfRange {
            component,
            value,
            max,
        });
    }
    if value.normalize().scale() > ScoreValidator::MAX_DECIMAL_PLACES {
        return Err(DomainError::TooManyDecimalPlaces { component, value });
    }
    Ok(value)
}
