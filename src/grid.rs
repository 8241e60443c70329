//! Slot grid: the empty `days x hoursPerDay` matrix a schedule is built in,
//! plus the occupancy bookkeeping the solvers commit into.

use log::debug;
use std::collections::{HashMap, HashSet};

use crate::data::{CourseId, StaffId, TimeRange, TimetableConfig, Weekday};
use crate::error::GenerationError;

pub const MIN_HOURS_PER_DAY: u32 = 1;
pub const MAX_HOURS_PER_DAY: u32 = 12;
pub const DEFAULT_DAY_START_HOUR: u32 = 9;

/// A committed (course, staff?) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub course_id: CourseId,
    pub staff_id: Option<StaffId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub time: TimeRange,
    pub placement: Option<Placement>,
}

/// Day/slot matrix. Indices are positions in `days()` and hour offsets from
/// the day start.
#[derive(Debug, Clone)]
pub struct Grid {
    days: Vec<Weekday>,
    hours_per_day: u32,
    cells: Vec<Vec<Cell>>,
    staff_bookings: HashSet<(StaffId, usize, usize)>,
    course_day_hours: HashMap<(CourseId, usize), u32>,
}

/// Builds the empty grid for a timetable. Days are put in week order.
pub fn build_grid(config: &TimetableConfig, day_start_hour: u32) -> Result<Grid, GenerationError> {
    validate_config(config, day_start_hour)?;

    let mut days = config.days.clone();
    days.sort();

    let cells = days
        .iter()
        .map(|_| {
            (0..config.hours_per_day)
                .map(|slot| {
                    let start = day_start_hour + slot;
                    Cell {
                        time: TimeRange::from_hours(start, start + 1),
                        placement: None,
                    }
                })
                .collect()
        })
        .collect();

    debug!(
        "Built {}x{} slot grid starting at {:02}:00",
        days.len(),
        config.hours_per_day,
        day_start_hour
    );

    Ok(Grid {
        days,
        hours_per_day: config.hours_per_day,
        cells,
        staff_bookings: HashSet::new(),
        course_day_hours: HashMap::new(),
    })
}

pub fn validate_config(config: &TimetableConfig, day_start_hour: u32) -> Result<(), GenerationError> {
    if !(MIN_HOURS_PER_DAY..=MAX_HOURS_PER_DAY).contains(&config.hours_per_day) {
        return Err(GenerationError::invalid(format!(
            "hoursPerDay must be between {} and {}, got {}",
            MIN_HOURS_PER_DAY, MAX_HOURS_PER_DAY, config.hours_per_day
        )));
    }
    if config.days.is_empty() {
        return Err(GenerationError::invalid("timetable has no teaching days"));
    }
    let unique: HashSet<Weekday> = config.days.iter().copied().collect();
    if unique.len() != config.days.len() {
        return Err(GenerationError::invalid("timetable lists a day more than once"));
    }
    if day_start_hour
        .checked_add(config.hours_per_day)
        .is_none_or(|end| end > 24)
    {
        return Err(GenerationError::invalid(format!(
            "a day starting at {:02}:00 cannot hold {} hours",
            day_start_hour, config.hours_per_day
        )));
    }
    Ok(())
}

impl Grid {
    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    pub fn hours_per_day(&self) -> u32 {
        self.hours_per_day
    }

    /// Total number of cells in the week.
    pub fn capacity(&self) -> u32 {
        self.hours_per_day * self.days.len() as u32
    }

    pub fn cell(&self, day: usize, slot: usize) -> Option<&Cell> {
        self.cells.get(day).and_then(|row| row.get(slot))
    }

    pub fn rows(&self) -> impl Iterator<Item = (Weekday, &[Cell])> {
        self.days.iter().copied().zip(self.cells.iter().map(Vec::as_slice))
    }

    pub fn is_empty_at(&self, day: usize, slot: usize) -> bool {
        self.cell(day, slot).is_some_and(|c| c.placement.is_none())
    }

    pub fn is_staff_booked(&self, staff_id: StaffId, day: usize, slot: usize) -> bool {
        self.staff_bookings.contains(&(staff_id, day, slot))
    }

    /// Empty cells in day-then-slot order.
    pub fn empty_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(d, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, c)| c.placement.is_none())
                .map(move |(s, _)| (d, s))
        })
    }

    pub fn is_full(&self) -> bool {
        self.empty_cells().next().is_none()
    }

    pub fn course_hours_on_day(&self, course_id: CourseId, day: usize) -> u32 {
        self.course_day_hours
            .get(&(course_id, day))
            .copied()
            .unwrap_or(0)
    }

    pub fn course_hours(&self, course_id: CourseId) -> u32 {
        (0..self.days.len())
            .map(|d| self.course_hours_on_day(course_id, d))
            .sum()
    }

    pub fn placement_at(&self, day: usize, slot: usize) -> Option<Placement> {
        self.cell(day, slot).and_then(|c| c.placement)
    }

    /// Commits a placement. The cell must exist and be empty, and the staff
    /// member (if any) must not already be booked at that time.
    pub fn place(&mut self, day: usize, slot: usize, placement: Placement) -> Result<(), GenerationError> {
        if let Some(staff_id) = placement.staff_id {
            if self.is_staff_booked(staff_id, day, slot) {
                return Err(GenerationError::InconsistentGrid(format!(
                    "staff {} double-booked at day {} slot {}",
                    staff_id, day, slot
                )));
            }
        }
        let cell = self
            .cells
            .get_mut(day)
            .and_then(|row| row.get_mut(slot))
            .ok_or_else(|| {
                GenerationError::InconsistentGrid(format!("no cell at day {} slot {}", day, slot))
            })?;
        if cell.placement.is_some() {
            return Err(GenerationError::InconsistentGrid(format!(
                "cell at day {} slot {} is already occupied",
                day, slot
            )));
        }
        cell.placement = Some(placement);

        if let Some(staff_id) = placement.staff_id {
            self.staff_bookings.insert((staff_id, day, slot));
        }
        *self
            .course_day_hours
            .entry((placement.course_id, day))
            .or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hours_per_day: u32) -> TimetableConfig {
        TimetableConfig {
            hours_per_day,
            ..TimetableConfig::default()
        }
    }

    #[test]
    fn builds_empty_grid_with_clock_times() {
        let grid = build_grid(&config(6), DEFAULT_DAY_START_HOUR).unwrap();
        assert_eq!(grid.num_days(), 5);
        assert_eq!(grid.capacity(), 30);
        assert_eq!(grid.empty_cells().count(), 30);

        let first = grid.cell(0, 0).unwrap();
        assert_eq!(first.time, TimeRange::from_hours(9, 10));
        let last = grid.cell(4, 5).unwrap();
        assert_eq!(last.time.start, "14:00");
        assert_eq!(last.time.end, "15:00");
    }

    #[test]
    fn rejects_out_of_range_hours() {
        assert!(matches!(
            build_grid(&config(0), DEFAULT_DAY_START_HOUR),
            Err(GenerationError::InvalidConfiguration { .. })
        ));
        assert!(build_grid(&config(13), DEFAULT_DAY_START_HOUR).is_err());
        assert!(build_grid(&config(12), DEFAULT_DAY_START_HOUR).is_ok());
    }

    #[test]
    fn rejects_empty_or_duplicate_days() {
        let empty = TimetableConfig {
            hours_per_day: 4,
            days: vec![],
        };
        assert!(build_grid(&empty, 9).is_err());

        let duplicate = TimetableConfig {
            hours_per_day: 4,
            days: vec![Weekday::Monday, Weekday::Monday],
        };
        assert!(build_grid(&duplicate, 9).is_err());
    }

    #[test]
    fn rejects_days_running_past_midnight() {
        assert!(build_grid(&config(12), 13).is_err());
        assert!(build_grid(&config(12), 12).is_ok());
        assert!(build_grid(&config(1), u32::MAX).is_err());
    }

    #[test]
    fn days_are_sorted_into_week_order() {
        let cfg = TimetableConfig {
            hours_per_day: 2,
            days: vec![Weekday::Friday, Weekday::Monday, Weekday::Wednesday],
        };
        let grid = build_grid(&cfg, 9).unwrap();
        assert_eq!(
            grid.days(),
            &[Weekday::Monday, Weekday::Wednesday, Weekday::Friday]
        );
    }

    #[test]
    fn place_tracks_occupancy_and_rejects_collisions() {
        let mut grid = build_grid(&config(2), 9).unwrap();
        let p = Placement {
            course_id: 1,
            staff_id: Some(7),
        };
        grid.place(0, 1, p).unwrap();
        assert!(!grid.is_empty_at(0, 1));
        assert!(grid.is_staff_booked(7, 0, 1));
        assert_eq!(grid.course_hours_on_day(1, 0), 1);
        assert_eq!(grid.course_hours(1), 1);

        let other = Placement {
            course_id: 2,
            staff_id: None,
        };
        assert!(grid.place(0, 1, other).is_err());
        assert!(grid.place(9, 0, other).is_err());
    }
}
