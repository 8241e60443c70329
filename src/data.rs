use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Diagnostic;

// Type aliases for clarity
pub type CourseId = u32;
pub type StaffId = u32;
pub type TimetableId = u32;

/// A day of the week, serialized by its English name ("Monday", ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// The fixed teaching week used when a timetable does not list its days.
    pub const TEACHING_WEEK: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn teaching_week() -> Vec<Weekday> {
    Weekday::TEACHING_WEEK.to_vec()
}

pub(crate) fn full_availability() -> BTreeSet<Weekday> {
    Weekday::TEACHING_WEEK.into_iter().collect()
}

/// A course that needs a fixed number of teaching hours every week.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub code: String,
    pub hours_per_week: u32,
    /// Empty means "no preference".
    #[serde(default)]
    pub preferred_days: BTreeSet<Weekday>,
}

/// A staff member. Owns the course assignment relation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub designation: String,
    /// Hard constraint. Defaults to the whole teaching week when omitted.
    #[serde(default = "full_availability")]
    pub available_days: BTreeSet<Weekday>,
    #[serde(default)]
    pub assigned_course_ids: BTreeSet<CourseId>,
}

impl Staff {
    pub fn is_available(&self, day: Weekday) -> bool {
        self.available_days.contains(&day)
    }

    pub fn teaches(&self, course_id: CourseId) -> bool {
        self.assigned_course_ids.contains(&course_id)
    }
}

/// Shape of the weekly grid a schedule is generated into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableConfig {
    pub hours_per_day: u32,
    #[serde(default = "teaching_week")]
    pub days: Vec<Weekday>,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 6,
            days: teaching_week(),
        }
    }
}

/// The complete input for one generation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInput {
    pub courses: Vec<Course>,
    pub staff: Vec<Staff>,
    pub timetable: TimetableConfig,
}

/// Clock times of a slot, formatted as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn from_hours(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start: format!("{:02}:00", start_hour),
            end: format!("{:02}:00", end_hour),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StaffSummary {
    pub id: StaffId,
    pub name: String,
}

/// One hour of one day. `course: None` renders as free time,
/// `staff: None` next to a course renders as unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Slot {
    pub time: TimeRange,
    pub course: Option<CourseSummary>,
    pub staff: Option<StaffSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Day {
    pub day: Weekday,
    pub slots: Vec<Slot>,
}

/// A generated weekly schedule, days in week order, slots in clock order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Schedule {
    pub days: Vec<Day>,
}

impl Schedule {
    pub fn slots(&self) -> impl Iterator<Item = (Weekday, &Slot)> {
        self.days
            .iter()
            .flat_map(|d| d.slots.iter().map(move |s| (d.day, s)))
    }

    /// Number of slots holding the given course.
    pub fn hours_for_course(&self, course_id: CourseId) -> usize {
        self.slots()
            .filter(|(_, s)| s.course.as_ref().is_some_and(|c| c.id == course_id))
            .count()
    }

    pub fn free_slots(&self) -> usize {
        self.slots().filter(|(_, s)| s.course.is_none()).count()
    }
}

/// Describes a soft preference that was not met in the final schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// The final output of a generation run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub schedule: Schedule,
    pub score: i32,
    pub diagnostics: Vec<Diagnostic>,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}

impl GenerationOutput {
    /// Courses that received less than their weekly demand, with the
    /// total missing hours for each.
    pub fn shortfalls(&self) -> Vec<(CourseId, u32)> {
        let mut totals: Vec<(CourseId, u32)> = Vec::new();
        for diagnostic in &self.diagnostics {
            if let Some((course_id, missing)) = diagnostic.shortfall() {
                match totals.iter_mut().find(|(id, _)| *id == course_id) {
                    Some((_, total)) => *total += missing,
                    None => totals.push((course_id, missing)),
                }
            }
        }
        totals
    }
}
