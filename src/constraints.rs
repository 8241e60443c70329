//! Hard placement predicate, soft placement ranking, and post-hoc evaluation
//! of a finished grid.

use itertools::Itertools;
use std::cmp::Reverse;

use crate::data::{Course, Staff, UnmetSoftConstraint};
use crate::demand::{CourseDemand, Problem};
use crate::grid::Grid;

/// Can `course` (taught by `staff`, if given) occupy `(day, slot)`?
///
/// Only hard constraints reject: the cell must be empty, and a staff
/// candidate must teach the course, be free at that time and be available
/// on that day.
pub fn can_place(grid: &Grid, course: &Course, staff: Option<&Staff>, day: usize, slot: usize) -> bool {
    if !grid.is_empty_at(day, slot) {
        return false;
    }
    match staff {
        None => true,
        Some(member) => {
            let Some(weekday) = grid.days().get(day) else {
                return false;
            };
            member.teaches(course.id)
                && member.is_available(*weekday)
                && !grid.is_staff_booked(member.id, day, slot)
        }
    }
}

/// Soft ranking of a candidate cell. Compares greater when better; fields
/// are compared in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlacementScore {
    /// The day holds fewer than `ceil(hoursPerWeek / numDays)` hours of the course.
    pub within_daily_cap: bool,
    pub preferred_day: bool,
    /// Fewer hours of the course already on the day ranks higher.
    pub day_load: Reverse<u32>,
    /// Next to an hour of the same course on the same day.
    pub contiguous: bool,
}

pub fn placement_score(grid: &Grid, demand: &CourseDemand<'_>, day: usize, slot: usize) -> PlacementScore {
    let course = demand.course;
    let load = grid.course_hours_on_day(course.id, day);
    let preferred_day = grid
        .days()
        .get(day)
        .is_some_and(|d| course.preferred_days.contains(d));
    let neighbour_is_same = |s: Option<usize>| {
        s.and_then(|s| grid.placement_at(day, s))
            .is_some_and(|p| p.course_id == course.id)
    };
    let contiguous = neighbour_is_same(slot.checked_sub(1)) || neighbour_is_same(Some(slot + 1));

    PlacementScore {
        within_daily_cap: load < demand.daily_cap(grid.num_days()),
        preferred_day,
        day_load: Reverse(load),
        contiguous,
    }
}

/// Scores a finished grid against the soft preferences and lists the ones
/// it misses.
///
/// +1 for every hour on a preferred day, -1 for every hour off one (courses
/// with no preference are neutral), -1 for every hour above the daily cap,
/// -1 for every extra block a course is split into on one day.
pub fn evaluate(grid: &Grid, problem: &Problem<'_>) -> (i32, Vec<UnmetSoftConstraint>) {
    let mut score = 0;
    let mut unmet = Vec::new();

    for demand in &problem.demands {
        let course = demand.course;
        let cap = demand.daily_cap(grid.num_days());

        if !course.preferred_days.is_empty() {
            let mut off_preference = 0;
            for (day_idx, day) in grid.days().iter().enumerate() {
                let hours = grid.course_hours_on_day(course.id, day_idx) as i32;
                if course.preferred_days.contains(day) {
                    score += hours;
                } else {
                    score -= hours;
                    off_preference += hours;
                }
            }
            if off_preference > 0 {
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Preferred Days".to_string(),
                    description: format!(
                        "Course {} ({}) has {} of {} hours outside its preferred days ({}).",
                        course.id,
                        course.code,
                        off_preference,
                        grid.course_hours(course.id),
                        course.preferred_days.iter().join(", ")
                    ),
                });
            }
        }

        for (day_idx, (day, cells)) in grid.rows().enumerate() {
            let hours = grid.course_hours_on_day(course.id, day_idx);
            if hours > cap {
                score -= (hours - cap) as i32;
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Even Distribution".to_string(),
                    description: format!(
                        "Course {} ({}) has {} hours on {}, more than the even share of {}.",
                        course.id, course.code, hours, day, cap
                    ),
                });
            }

            let blocks = cells
                .iter()
                .map(|c| c.placement.is_some_and(|p| p.course_id == course.id))
                .dedup()
                .filter(|occupied| *occupied)
                .count();
            if blocks > 1 {
                score -= (blocks - 1) as i32;
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Contiguous Hours".to_string(),
                    description: format!(
                        "Course {} ({}) is split into {} blocks on {}.",
                        course.id, course.code, blocks, day
                    ),
                });
            }
        }
    }

    (score, unmet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{TimetableConfig, Weekday};
    use crate::demand::calculate_demand;
    use crate::grid::{build_grid, Placement};
    use std::collections::BTreeSet;

    fn course(id: u32, hours: u32, preferred: &[Weekday]) -> Course {
        Course {
            id,
            name: format!("Course {}", id),
            code: format!("C{}", id),
            hours_per_week: hours,
            preferred_days: preferred.iter().copied().collect(),
        }
    }

    fn staff(id: u32, days: &[Weekday], courses: &[u32]) -> Staff {
        Staff {
            id,
            name: format!("Staff {}", id),
            email: String::new(),
            designation: String::new(),
            available_days: days.iter().copied().collect(),
            assigned_course_ids: courses.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn grid(hours_per_day: u32) -> Grid {
        build_grid(
            &TimetableConfig {
                hours_per_day,
                ..TimetableConfig::default()
            },
            9,
        )
        .unwrap()
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let mut g = grid(2);
        let c = course(1, 2, &[]);
        g.place(0, 0, Placement { course_id: 2, staff_id: None }).unwrap();
        assert!(!can_place(&g, &c, None, 0, 0));
        assert!(can_place(&g, &c, None, 0, 1));
    }

    #[test]
    fn staff_must_be_available_assigned_and_free() {
        let mut g = grid(2);
        let c = course(1, 2, &[]);
        let monday_only = staff(5, &[Weekday::Monday], &[1]);
        assert!(can_place(&g, &c, Some(&monday_only), 0, 0));
        assert!(!can_place(&g, &c, Some(&monday_only), 1, 0));

        let unassigned = staff(6, &Weekday::TEACHING_WEEK, &[]);
        assert!(!can_place(&g, &c, Some(&unassigned), 0, 0));

        g.place(0, 1, Placement { course_id: 2, staff_id: Some(5) }).unwrap();
        assert!(!can_place(&g, &c, Some(&monday_only), 0, 1));
    }

    #[test]
    fn preferred_day_and_spread_rank_higher() {
        let mut g = grid(3);
        let courses = vec![course(1, 5, &[Weekday::Tuesday])];
        let problem = calculate_demand(&courses, &[], g.capacity()).unwrap();
        let demand = &problem.demands[0];

        let monday = placement_score(&g, demand, 0, 0);
        let tuesday = placement_score(&g, demand, 1, 0);
        assert!(tuesday > monday);

        g.place(1, 0, Placement { course_id: 1, staff_id: None }).unwrap();
        // Tuesday is now at its even share of one hour.
        let tuesday_again = placement_score(&g, demand, 1, 1);
        let wednesday = placement_score(&g, demand, 2, 0);
        assert!(wednesday > tuesday_again);
        assert!(tuesday_again.contiguous);
    }

    #[test]
    fn evaluate_reports_misses() {
        let mut g = grid(4);
        let courses = vec![course(1, 3, &[Weekday::Monday])];
        let problem = calculate_demand(&courses, &[], g.capacity()).unwrap();
        let p = Placement { course_id: 1, staff_id: None };
        g.place(1, 0, p).unwrap();
        g.place(1, 2, p).unwrap();
        g.place(0, 0, p).unwrap();

        let (score, unmet) = evaluate(&g, &problem);
        // +1 Monday, -2 Tuesday, -1 over cap on Tuesday, -1 split on Tuesday
        assert_eq!(score, -3);
        let kinds: Vec<&str> = unmet.iter().map(|u| u.constraint_type.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["Preferred Days", "Even Distribution", "Contiguous Hours"]
        );
    }
}
