use log::{debug, trace, warn};

use crate::constraints::{can_place, placement_score, PlacementScore};
use crate::data::StaffId;
use crate::demand::{CourseDemand, Problem};
use crate::error::{Diagnostic, GenerationError};
use crate::grid::{Grid, Placement};

use super::{exhausted, Solver};

/// Greedy placement with local ranking.
///
/// Courses are taken in the order the demand calculator produced; each hour
/// goes to the best-ranked empty cell. Among cells tied on rank, the first
/// one an eligible staff member can take wins; if none can, the top cell is
/// used without staff. There is no backtracking: both hard constraints are
/// local to a cell, so a committed placement never has to be undone.
/// Worst case is O(cells x staff) per hour placed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySolver;

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&self, problem: &Problem<'_>, grid: &mut Grid) -> Result<Vec<Diagnostic>, GenerationError> {
        let mut diagnostics = Vec::new();

        for demand in &problem.demands {
            let course = demand.course;
            let mut placed = 0;
            while placed < demand.demand {
                let Some((day, slot, staff_id)) = next_placement(grid, demand) else {
                    warn!(
                        "Grid exhausted while placing course {} ({}): {} of {} hours placed",
                        course.id, course.code, placed, demand.demand
                    );
                    diagnostics.push(exhausted(course.id, demand.demand, placed));
                    break;
                };
                grid.place(
                    day,
                    slot,
                    Placement {
                        course_id: course.id,
                        staff_id,
                    },
                )?;
                trace!(
                    "Placed course {} on {} slot {} (staff {:?})",
                    course.id,
                    grid.days()[day],
                    slot,
                    staff_id
                );
                placed += 1;
            }
            debug!("Course {} placed {}/{} hours", course.id, placed, demand.demand);
        }

        Ok(diagnostics)
    }
}

fn next_placement(grid: &Grid, demand: &CourseDemand<'_>) -> Option<(usize, usize, Option<StaffId>)> {
    let course = demand.course;
    let candidates: Vec<(PlacementScore, usize, usize)> = grid
        .empty_cells()
        .filter(|&(day, slot)| can_place(grid, course, None, day, slot))
        .map(|(day, slot)| (placement_score(grid, demand, day, slot), day, slot))
        .collect();
    let best = candidates.iter().map(|(score, _, _)| *score).max()?;

    // candidates are already in day-then-slot order
    let tied: Vec<(usize, usize)> = candidates
        .iter()
        .filter(|(score, _, _)| *score == best)
        .map(|&(_, day, slot)| (day, slot))
        .collect();
    for &(day, slot) in &tied {
        if let Some(member) = demand
            .eligible_staff
            .iter()
            .copied()
            .find(|m| can_place(grid, course, Some(*m), day, slot))
        {
            return Some((day, slot, Some(member.id)));
        }
    }
    tied.first().map(|&(day, slot)| (day, slot, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Course, Staff, TimetableConfig, Weekday};
    use crate::demand::calculate_demand;
    use crate::grid::build_grid;
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

    fn run(courses: &[Course], members: &[Staff], hours_per_day: u32) -> (Grid, Vec<Diagnostic>) {
        let mut grid = build_grid(
            &TimetableConfig {
                hours_per_day,
                ..TimetableConfig::default()
            },
            9,
        )
        .unwrap();
        let problem = calculate_demand(courses, members, grid.capacity()).unwrap();
        let diagnostics = GreedySolver.solve(&problem, &mut grid).unwrap();
        (grid, diagnostics)
    }

    #[test]
    fn spreads_one_hour_per_day_starting_on_preferred_day() {
        let courses = vec![course(1, 5, &[Weekday::Wednesday])];
        let members = vec![staff(1, &Weekday::TEACHING_WEEK, &[1])];
        let (grid, diagnostics) = run(&courses, &members, 6);

        assert!(diagnostics.is_empty());
        for day in 0..5 {
            assert_eq!(grid.course_hours_on_day(1, day), 1);
        }
        assert_eq!(
            grid.placement_at(2, 0),
            Some(Placement {
                course_id: 1,
                staff_id: Some(1)
            })
        );
    }

    #[test]
    fn second_hour_on_a_day_is_contiguous() {
        let courses = vec![course(1, 10, &[])];
        let (grid, _) = run(&courses, &[], 6);
        for day in 0..5 {
            assert_eq!(grid.placement_at(day, 0).map(|p| p.course_id), Some(1));
            assert_eq!(grid.placement_at(day, 1).map(|p| p.course_id), Some(1));
        }
    }

    #[test]
    fn binds_staff_only_on_available_days() {
        let courses = vec![course(1, 5, &[])];
        let members = vec![staff(3, &[Weekday::Tuesday, Weekday::Thursday], &[1])];
        let (grid, _) = run(&courses, &members, 4);

        for (day, weekday) in grid.days().iter().enumerate() {
            let p = grid.placement_at(day, 0).unwrap();
            let staffed = matches!(weekday, Weekday::Tuesday | Weekday::Thursday);
            assert_eq!(p.staff_id.is_some(), staffed, "{}", weekday);
        }
    }

    #[test]
    fn shared_staff_is_never_double_booked() {
        let courses = vec![course(1, 5, &[]), course(2, 5, &[])];
        let members = vec![staff(8, &Weekday::TEACHING_WEEK, &[1, 2])];
        let (grid, _) = run(&courses, &members, 2);

        for day in 0..5 {
            let first = grid.placement_at(day, 0).unwrap();
            let second = grid.placement_at(day, 1).unwrap();
            assert_ne!(first.course_id, second.course_id);
            assert_eq!(first.staff_id, Some(8));
            assert_eq!(second.staff_id, Some(8));
        }
    }

    #[test]
    fn reports_exhaustion_and_moves_on() {
        let courses = vec![course(1, 20, &[]), course(2, 20, &[]), course(3, 1, &[])];
        let (grid, diagnostics) = run(&courses, &[], 6);

        assert!(grid.is_full());
        assert_eq!(grid.course_hours(1), 20);
        assert_eq!(grid.course_hours(2), 10);
        assert_eq!(grid.course_hours(3), 0);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::GridExhausted {
                    course_id: 2,
                    demand: 20,
                    placed: 10,
                    shortfall: 10
                },
                Diagnostic::GridExhausted {
                    course_id: 3,
                    demand: 1,
                    placed: 0,
                    shortfall: 1
                },
            ]
        );
    }
}
