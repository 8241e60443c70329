//! In-memory catalog of courses, staff and timetables.
//!
//! Staff own the course assignment relation; course views derive their
//! staff list from it on every read. A generated schedule replaces the
//! previous one wholesale under the write lock.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

use crate::data::{
    full_availability, teaching_week, Course, CourseId, CourseSummary, GenerationInput, Schedule, Staff, StaffId,
    TimetableConfig, TimetableId, UnmetSoftConstraint, Weekday,
};
use crate::engine::{generate, EngineOptions};
use crate::error::{Diagnostic, GenerationError};
use crate::grid::validate_config;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u32 },

    #[error("invalid {0}")]
    Invalid(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub name: String,
    pub code: String,
    pub hours_per_week: u32,
    #[serde(default)]
    pub preferred_days: BTreeSet<Weekday>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default = "full_availability")]
    pub available_days: BTreeSet<Weekday>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimetable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub hours_per_day: u32,
    #[serde(default = "teaching_week")]
    pub days: Vec<Weekday>,
}

/// A course as clients see it, with the ids of the staff teaching it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    pub staff_ids: Vec<StaffId>,
}

/// A staff member with their assigned courses resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffView {
    #[serde(flatten)]
    pub staff: Staff,
    pub courses: Vec<CourseSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub id: TimetableId,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub config: TimetableConfig,
    /// Absent until the first generation.
    pub schedule: Option<Schedule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a generate call: the updated timetable plus the run's report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTimetable {
    #[serde(flatten)]
    pub timetable: Timetable,
    pub score: i32,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}

#[derive(Debug, Default)]
struct Catalog {
    last_id: u32,
    courses: BTreeMap<CourseId, Course>,
    staff: BTreeMap<StaffId, Staff>,
    timetables: BTreeMap<TimetableId, Timetable>,
}

impl Catalog {
    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }

    fn course_view(&self, course: &Course) -> CourseView {
        CourseView {
            course: course.clone(),
            staff_ids: self
                .staff
                .values()
                .filter(|s| s.teaches(course.id))
                .map(|s| s.id)
                .collect(),
        }
    }

    fn staff_view(&self, member: &Staff) -> StaffView {
        StaffView {
            staff: member.clone(),
            courses: member
                .assigned_course_ids
                .iter()
                .filter_map(|id| self.courses.get(id))
                .map(|c| CourseSummary {
                    id: c.id,
                    name: c.name.clone(),
                    code: c.code.clone(),
                })
                .collect(),
        }
    }

    fn staff_mut(&mut self, id: StaffId) -> StoreResult<&mut Staff> {
        self.staff
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "staff", id })
    }
}

fn require_text(field: &str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Invalid(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct Store {
    catalog: RwLock<Catalog>,
    generation_locks: Mutex<HashMap<TimetableId, Arc<Mutex<()>>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Catalog) -> T) -> T {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        f(&catalog)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Catalog) -> T) -> T {
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut catalog)
    }

    pub fn create_course(&self, new: NewCourse) -> StoreResult<CourseView> {
        require_text("course name", &new.name)?;
        require_text("course code", &new.code)?;
        if new.hours_per_week < 1 {
            return Err(StoreError::Invalid("hoursPerWeek must be at least 1".to_string()));
        }
        self.write(|catalog| {
            let course = Course {
                id: catalog.next_id(),
                name: new.name,
                code: new.code,
                hours_per_week: new.hours_per_week,
                preferred_days: new.preferred_days,
            };
            debug!("Created course {} ({})", course.id, course.code);
            let view = catalog.course_view(&course);
            catalog.courses.insert(course.id, course);
            Ok(view)
        })
    }

    pub fn list_courses(&self) -> Vec<CourseView> {
        self.read(|catalog| catalog.courses.values().map(|c| catalog.course_view(c)).collect())
    }

    pub fn get_course(&self, id: CourseId) -> StoreResult<CourseView> {
        self.read(|catalog| {
            catalog
                .courses
                .get(&id)
                .map(|c| catalog.course_view(c))
                .ok_or(StoreError::NotFound { entity: "course", id })
        })
    }

    /// Deletes a course and drops it from every staff assignment.
    pub fn delete_course(&self, id: CourseId) -> StoreResult<()> {
        self.write(|catalog| {
            catalog
                .courses
                .remove(&id)
                .ok_or(StoreError::NotFound { entity: "course", id })?;
            for member in catalog.staff.values_mut() {
                member.assigned_course_ids.remove(&id);
            }
            debug!("Deleted course {}", id);
            Ok(())
        })
    }

    pub fn create_staff(&self, new: NewStaff) -> StoreResult<StaffView> {
        require_text("staff name", &new.name)?;
        require_text("staff email", &new.email)?;
        self.write(|catalog| {
            let member = Staff {
                id: catalog.next_id(),
                name: new.name,
                email: new.email,
                designation: new.designation,
                available_days: new.available_days,
                assigned_course_ids: BTreeSet::new(),
            };
            debug!("Created staff {} ({})", member.id, member.email);
            let view = catalog.staff_view(&member);
            catalog.staff.insert(member.id, member);
            Ok(view)
        })
    }

    pub fn list_staff(&self) -> Vec<StaffView> {
        self.read(|catalog| catalog.staff.values().map(|s| catalog.staff_view(s)).collect())
    }

    pub fn get_staff(&self, id: StaffId) -> StoreResult<StaffView> {
        self.read(|catalog| {
            catalog
                .staff
                .get(&id)
                .map(|s| catalog.staff_view(s))
                .ok_or(StoreError::NotFound { entity: "staff", id })
        })
    }

    pub fn delete_staff(&self, id: StaffId) -> StoreResult<()> {
        self.write(|catalog| {
            catalog
                .staff
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::NotFound { entity: "staff", id })
        })
    }

    /// Adds a course to a staff member's assignments. Assigning twice is a no-op.
    pub fn assign_course(&self, staff_id: StaffId, course_id: CourseId) -> StoreResult<StaffView> {
        self.write(|catalog| {
            if !catalog.courses.contains_key(&course_id) {
                return Err(StoreError::NotFound {
                    entity: "course",
                    id: course_id,
                });
            }
            let member = catalog.staff_mut(staff_id)?;
            member.assigned_course_ids.insert(course_id);
            let member = member.clone();
            info!("Assigned course {} to staff {}", course_id, staff_id);
            Ok(catalog.staff_view(&member))
        })
    }

    pub fn remove_course(&self, staff_id: StaffId, course_id: CourseId) -> StoreResult<StaffView> {
        self.write(|catalog| {
            let member = catalog.staff_mut(staff_id)?;
            member.assigned_course_ids.remove(&course_id);
            let member = member.clone();
            info!("Removed course {} from staff {}", course_id, staff_id);
            Ok(catalog.staff_view(&member))
        })
    }

    pub fn create_timetable(&self, new: NewTimetable, day_start_hour: u32) -> StoreResult<Timetable> {
        require_text("timetable name", &new.name)?;
        let config = TimetableConfig {
            hours_per_day: new.hours_per_day,
            days: new.days,
        };
        validate_config(&config, day_start_hour)?;
        self.write(|catalog| {
            let timetable = Timetable {
                id: catalog.next_id(),
                name: new.name,
                description: new.description,
                config,
                schedule: None,
                diagnostics: Vec::new(),
            };
            debug!("Created timetable {} ({})", timetable.id, timetable.name);
            catalog.timetables.insert(timetable.id, timetable.clone());
            Ok(timetable)
        })
    }

    pub fn list_timetables(&self) -> Vec<Timetable> {
        self.read(|catalog| catalog.timetables.values().cloned().collect())
    }

    pub fn get_timetable(&self, id: TimetableId) -> StoreResult<Timetable> {
        self.read(|catalog| {
            catalog
                .timetables
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound { entity: "timetable", id })
        })
    }

    pub fn delete_timetable(&self, id: TimetableId) -> StoreResult<()> {
        self.write(|catalog| {
            catalog
                .timetables
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::NotFound { entity: "timetable", id })
        })?;
        self.forget_run_lock(id);
        Ok(())
    }

    /// Consistent copy of everything the engine needs for one timetable.
    pub fn snapshot(&self, id: TimetableId) -> StoreResult<GenerationInput> {
        self.read(|catalog| {
            let timetable = catalog
                .timetables
                .get(&id)
                .ok_or(StoreError::NotFound { entity: "timetable", id })?;
            Ok(GenerationInput {
                courses: catalog.courses.values().cloned().collect(),
                staff: catalog.staff.values().cloned().collect(),
                timetable: timetable.config.clone(),
            })
        })
    }

    /// Regenerates a timetable's schedule from the current catalog.
    ///
    /// Runs for the same timetable are serialized; the engine works on a
    /// snapshot outside the catalog lock, and the new schedule then replaces
    /// the old one in a single write.
    pub fn generate_timetable(&self, id: TimetableId, options: &EngineOptions) -> StoreResult<GeneratedTimetable> {
        if !self.read(|catalog| catalog.timetables.contains_key(&id)) {
            return Err(StoreError::NotFound { entity: "timetable", id });
        }
        let run_lock = Arc::clone(
            self.generation_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(id)
                .or_default(),
        );
        let _running = run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let result = self.regenerate(id, options);
        // the timetable was deleted while this run waited or ran
        if let Err(StoreError::NotFound { entity: "timetable", .. }) = result {
            self.forget_run_lock(id);
        }
        result
    }

    fn regenerate(&self, id: TimetableId, options: &EngineOptions) -> StoreResult<GeneratedTimetable> {
        let input = self.snapshot(id)?;
        let output = generate(&input, options)?;

        self.write(|catalog| {
            let timetable = catalog
                .timetables
                .get_mut(&id)
                .ok_or(StoreError::NotFound { entity: "timetable", id })?;
            timetable.schedule = Some(output.schedule);
            timetable.diagnostics = output.diagnostics;
            info!("Stored new schedule for timetable {}", id);
            Ok(GeneratedTimetable {
                timetable: timetable.clone(),
                score: output.score,
                unmet_soft_constraints: output.unmet_soft_constraints,
            })
        })
    }

    fn forget_run_lock(&self, id: TimetableId) {
        self.generation_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    #[cfg(test)]
    fn run_lock_count(&self) -> usize {
        self.generation_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
