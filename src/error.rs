use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::data::CourseId;

/// Failures that abort a generation run before or instead of producing
/// a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("solver found no solution: {0}")]
    SolverFailed(String),

    #[error("inconsistent grid: {0}")]
    InconsistentGrid(String),
}

impl GenerationError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        GenerationError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Non-fatal outcomes reported next to a best-effort schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum Diagnostic {
    /// Weekly hours exceed the total grid capacity.
    OverDemand {
        course_id: CourseId,
        requested: u32,
        capacity: u32,
        shortfall: u32,
    },
    /// Some or all placed hours of a course carry no staff.
    UnstaffedCourse {
        course_id: CourseId,
        eligible_staff: usize,
        unstaffed_hours: u32,
    },
    /// The grid ran out of empty cells before the course was fully placed.
    GridExhausted {
        course_id: CourseId,
        demand: u32,
        placed: u32,
        shortfall: u32,
    },
}

impl Diagnostic {
    /// Missing hours recorded by this diagnostic, if it is a placement shortfall.
    pub fn shortfall(&self) -> Option<(CourseId, u32)> {
        match self {
            Diagnostic::OverDemand {
                course_id,
                shortfall,
                ..
            }
            | Diagnostic::GridExhausted {
                course_id,
                shortfall,
                ..
            } => Some((*course_id, *shortfall)),
            Diagnostic::UnstaffedCourse { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::OverDemand { .. } => "OverDemand",
            Diagnostic::UnstaffedCourse { .. } => "UnstaffedCourse",
            Diagnostic::GridExhausted { .. } => "GridExhausted",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OverDemand {
                course_id,
                requested,
                capacity,
                shortfall,
            } => write!(
                f,
                "[{}] Course {} needs {} hours but the week only has {} slots; {} hours cannot be placed.",
                self.kind(),
                course_id,
                requested,
                capacity,
                shortfall
            ),
            Diagnostic::UnstaffedCourse {
                course_id,
                eligible_staff,
                unstaffed_hours,
            } => write!(
                f,
                "[{}] Course {} has {} placed hours without staff ({} eligible staff).",
                self.kind(),
                course_id,
                unstaffed_hours,
                eligible_staff
            ),
            Diagnostic::GridExhausted {
                course_id,
                demand,
                placed,
                shortfall,
            } => write!(
                f,
                "[{}] Course {} placed {} of {} hours before the grid filled up; {} hours missing.",
                self.kind(),
                course_id,
                placed,
                demand,
                shortfall
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let d = Diagnostic::GridExhausted {
            course_id: 4,
            demand: 20,
            placed: 10,
            shortfall: 10,
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "GridExhausted");
        assert_eq!(json["courseId"], 4);
        assert_eq!(json["shortfall"], 10);
    }

    #[test]
    fn unstaffed_is_not_a_shortfall() {
        let d = Diagnostic::UnstaffedCourse {
            course_id: 1,
            eligible_staff: 0,
            unstaffed_hours: 3,
        };
        assert_eq!(d.shortfall(), None);
        assert!(d.to_string().starts_with("[UnstaffedCourse]"));
    }
}
