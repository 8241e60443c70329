//! Turns a committed grid into the externally visible [`Schedule`].

use std::collections::HashMap;

use crate::data::{Course, CourseId, CourseSummary, Day, Schedule, Slot, Staff, StaffId, StaffSummary};
use crate::error::GenerationError;
use crate::grid::Grid;

/// Walks the grid in day/slot order, embedding course and staff summaries.
///
/// Fails only if the grid references unknown entities or binds a staff
/// member who does not teach the course or is away that day.
pub fn materialize(grid: &Grid, courses: &[Course], staff: &[Staff]) -> Result<Schedule, GenerationError> {
    let course_map: HashMap<CourseId, &Course> = courses.iter().map(|c| (c.id, c)).collect();
    let staff_map: HashMap<StaffId, &Staff> = staff.iter().map(|s| (s.id, s)).collect();

    let days = grid
        .rows()
        .map(|(day, cells)| -> Result<Day, GenerationError> {
            let slots = cells
                .iter()
                .map(|cell| -> Result<Slot, GenerationError> {
                    let Some(placement) = cell.placement else {
                        return Ok(Slot {
                            time: cell.time.clone(),
                            course: None,
                            staff: None,
                        });
                    };
                    let course = course_map.get(&placement.course_id).ok_or_else(|| {
                        GenerationError::InconsistentGrid(format!(
                            "unknown course {} on {} at {}",
                            placement.course_id, day, cell.time.start
                        ))
                    })?;
                    let member = placement
                        .staff_id
                        .map(|id| -> Result<StaffSummary, GenerationError> {
                            let member = staff_map.get(&id).ok_or_else(|| {
                                GenerationError::InconsistentGrid(format!(
                                    "unknown staff {} on {} at {}",
                                    id, day, cell.time.start
                                ))
                            })?;
                            if !member.teaches(course.id) || !member.is_available(day) {
                                return Err(GenerationError::InconsistentGrid(format!(
                                    "staff {} cannot teach course {} on {}",
                                    id, course.id, day
                                )));
                            }
                            Ok(StaffSummary {
                                id: member.id,
                                name: member.name.clone(),
                            })
                        })
                        .transpose()?;
                    Ok(Slot {
                        time: cell.time.clone(),
                        course: Some(CourseSummary {
                            id: course.id,
                            name: course.name.clone(),
                            code: course.code.clone(),
                        }),
                        staff: member,
                    })
                })
                .collect::<Result<Vec<_>, GenerationError>>()?;
            Ok(Day { day, slots })
        })
        .collect::<Result<Vec<_>, GenerationError>>()?;

    Ok(Schedule { days })
}
