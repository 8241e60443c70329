//! Per-course weekly demand and eligible staff.

use itertools::Itertools;
use log::{debug, warn};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use crate::data::{Course, CourseId, Staff};
use crate::error::{Diagnostic, GenerationError};

/// How many hours of one course must be placed, and who may teach them.
#[derive(Debug, Clone)]
pub struct CourseDemand<'a> {
    pub course: &'a Course,
    /// `hoursPerWeek` capped at grid capacity.
    pub demand: u32,
    /// Staff assigned to the course, ordered by id.
    pub eligible_staff: Vec<&'a Staff>,
}

impl CourseDemand<'_> {
    /// Ceiling of the weekly hours spread over `num_days`.
    pub fn daily_cap(&self, num_days: usize) -> u32 {
        self.course.hours_per_week.div_ceil(num_days.max(1) as u32)
    }
}

/// Everything a solver needs: demand in processing order plus the
/// diagnostics found while computing it.
#[derive(Debug, Clone)]
pub struct Problem<'a> {
    pub demands: Vec<CourseDemand<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Problem<'_> {
    pub fn total_demand(&self) -> u32 {
        self.demands.iter().map(|d| d.demand).sum()
    }

    pub fn demand_for(&self, course_id: CourseId) -> Option<&CourseDemand<'_>> {
        self.demands.iter().find(|d| d.course.id == course_id)
    }
}

/// Computes demand for every course against a grid of `capacity` cells.
///
/// Courses come out ordered by descending `hoursPerWeek`, ties broken by id,
/// so reruns on the same data walk them identically.
pub fn calculate_demand<'a>(
    courses: &'a [Course],
    staff: &'a [Staff],
    capacity: u32,
) -> Result<Problem<'a>, GenerationError> {
    let mut seen_courses = HashSet::new();
    for course in courses {
        if course.hours_per_week < 1 {
            return Err(GenerationError::invalid(format!(
                "course {} ({}) must need at least one hour per week",
                course.id, course.code
            )));
        }
        if !seen_courses.insert(course.id) {
            return Err(GenerationError::invalid(format!(
                "course id {} appears more than once",
                course.id
            )));
        }
    }

    let mut seen_staff = HashSet::new();
    for member in staff {
        if !seen_staff.insert(member.id) {
            return Err(GenerationError::invalid(format!(
                "staff id {} appears more than once",
                member.id
            )));
        }
        for course_id in member.assigned_course_ids.iter().filter(|id| !seen_courses.contains(*id)) {
            warn!(
                "Staff {} is assigned to unknown course {}; ignoring",
                member.id, course_id
            );
        }
    }

    // course -> staff, derived from the staff-owned relation
    let staff_by_course: HashMap<CourseId, Vec<&Staff>> = staff
        .iter()
        .sorted_by_key(|s| s.id)
        .flat_map(|s| s.assigned_course_ids.iter().map(move |c| (*c, s)))
        .into_group_map();

    let mut diagnostics = Vec::new();
    let demands = courses
        .iter()
        .sorted_by_key(|c| (Reverse(c.hours_per_week), c.id))
        .map(|course| {
            let demand = course.hours_per_week.min(capacity);
            if course.hours_per_week > capacity {
                diagnostics.push(Diagnostic::OverDemand {
                    course_id: course.id,
                    requested: course.hours_per_week,
                    capacity,
                    shortfall: course.hours_per_week - capacity,
                });
            }
            let eligible_staff = staff_by_course.get(&course.id).cloned().unwrap_or_default();
            debug!(
                "Course {} ({}): demand {}h, {} eligible staff",
                course.id,
                course.code,
                demand,
                eligible_staff.len()
            );
            CourseDemand {
                course,
                demand,
                eligible_staff,
            }
        })
        .collect();

    Ok(Problem {
        demands,
        diagnostics,
    })
}
