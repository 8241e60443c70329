//! The generation pipeline: grid → demand → solver → schedule.

use log::{debug, info};
use std::time::Instant;

use crate::constraints::evaluate;
use crate::data::{Course, GenerationInput, GenerationOutput, Staff, TimetableConfig};
use crate::demand::{calculate_demand, Problem};
use crate::error::{Diagnostic, GenerationError};
use crate::grid::{build_grid, Grid, DEFAULT_DAY_START_HOUR};
use crate::materialize::materialize;
use crate::solver::{Solver, SolverKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub day_start_hour: u32,
    pub solver: SolverKind,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            day_start_hour: DEFAULT_DAY_START_HOUR,
            solver: SolverKind::Greedy,
        }
    }
}

/// Generates a weekly schedule from one consistent snapshot of courses,
/// staff and timetable configuration.
///
/// Only an invalid configuration (or an internal failure) is an error;
/// shortfalls and unstaffed hours come back as diagnostics next to the
/// best-effort schedule.
pub fn generate(input: &GenerationInput, options: &EngineOptions) -> Result<GenerationOutput, GenerationError> {
    let solver = options.solver.build();
    generate_with(
        &input.courses,
        &input.staff,
        &input.timetable,
        options.day_start_hour,
        solver.as_ref(),
    )
}

pub fn generate_with(
    courses: &[Course],
    staff: &[Staff],
    config: &TimetableConfig,
    day_start_hour: u32,
    solver: &dyn Solver,
) -> Result<GenerationOutput, GenerationError> {
    let start_time = Instant::now();

    let mut grid = build_grid(config, day_start_hour)?;
    let problem = calculate_demand(courses, staff, grid.capacity())?;
    info!(
        "Generating timetable with {} courses, {} staff and {} slots using the {} solver...",
        courses.len(),
        staff.len(),
        grid.capacity(),
        solver.name()
    );

    let mut diagnostics = problem.diagnostics.clone();
    diagnostics.extend(solver.solve(&problem, &mut grid)?);
    diagnostics.extend(unstaffed(&grid, &problem));

    let schedule = materialize(&grid, courses, staff)?;
    let (score, unmet_soft_constraints) = evaluate(&grid, &problem);

    info!(
        "Timetable generated in {:.2?}: {} free slots, score {}, {} diagnostics",
        start_time.elapsed(),
        schedule.free_slots(),
        score,
        diagnostics.len()
    );
    for diagnostic in &diagnostics {
        debug!("{}", diagnostic);
    }

    Ok(GenerationOutput {
        schedule,
        score,
        diagnostics,
        unmet_soft_constraints,
    })
}

fn unstaffed(grid: &Grid, problem: &Problem<'_>) -> Vec<Diagnostic> {
    problem
        .demands
        .iter()
        .filter_map(|demand| {
            let unstaffed_hours = grid
                .rows()
                .flat_map(|(_, cells)| cells.iter())
                .filter_map(|c| c.placement)
                .filter(|p| p.course_id == demand.course.id && p.staff_id.is_none())
                .count() as u32;
            let no_staff = demand.eligible_staff.is_empty();
            (no_staff || unstaffed_hours > 0).then(|| Diagnostic::UnstaffedCourse {
                course_id: demand.course.id,
                eligible_staff: demand.eligible_staff.len(),
                unstaffed_hours,
            })
        })
        .collect()
}
