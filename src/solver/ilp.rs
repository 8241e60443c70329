use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
};
use log::{info, trace};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::constraints::can_place;
use crate::data::StaffId;
use crate::demand::Problem;
use crate::error::{Diagnostic, GenerationError};
use crate::grid::{Grid, Placement};

use super::{exhausted, Solver};

/// Objective weights. Placement dominates so the solver never trades an
/// hour of teaching for a better preference score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IlpWeights {
    pub placement: f64,
    pub staffed: f64,
    pub preferred_day: f64,
    pub over_daily_cap: f64,
    pub lateness: f64,
}

impl Default for IlpWeights {
    fn default() -> Self {
        Self {
            placement: 100.0,
            staffed: 10.0,
            preferred_day: 3.0,
            over_daily_cap: 5.0,
            lateness: 0.01,
        }
    }
}

/// Exact solver on the HiGHS ILP backend.
///
/// Same hard constraints as the greedy solver, but maximizes the weighted
/// preference score over the whole week instead of hour by hour.
#[derive(Debug, Clone, Default)]
pub struct IlpSolver {
    pub weights: IlpWeights,
}

// (course index, day, slot)
type CellKey = (usize, usize, usize);

impl Solver for IlpSolver {
    fn name(&self) -> &'static str {
        "ilp"
    }

    fn solve(&self, problem: &Problem<'_>, grid: &mut Grid) -> Result<Vec<Diagnostic>, GenerationError> {
        let start_time = Instant::now();
        let cells: Vec<(usize, usize)> = grid.empty_cells().collect();

        if problem.total_demand() == 0 {
            return Ok(Vec::new());
        }
        if cells.is_empty() {
            return Ok(problem
                .demands
                .iter()
                .filter(|d| d.demand > 0)
                .map(|d| exhausted(d.course.id, d.demand, 0))
                .collect());
        }

        info!(
            "Setting up ILP model with {} courses and {} free cells...",
            problem.demands.len(),
            cells.len()
        );
        let mut vars = ProblemVariables::new();

        // x_cds = 1 if course c is in cell (d, s)
        // y_cpds = 1 if staff p teaches course c in cell (d, s)
        let mut course_vars: BTreeMap<CellKey, Variable> = BTreeMap::new();
        let mut staff_vars: BTreeMap<(CellKey, StaffId), Variable> = BTreeMap::new();
        let mut over_vars: BTreeMap<(usize, usize), Variable> = BTreeMap::new();

        for (ci, demand) in problem.demands.iter().enumerate() {
            let course = demand.course;
            for &(day, slot) in &cells {
                if !can_place(grid, course, None, day, slot) {
                    continue;
                }
                course_vars.insert((ci, day, slot), vars.add(variable().binary()));
                for member in &demand.eligible_staff {
                    if can_place(grid, course, Some(*member), day, slot) {
                        staff_vars.insert(((ci, day, slot), member.id), vars.add(variable().binary()));
                    }
                }
            }
            for day in 0..grid.num_days() {
                over_vars.insert((ci, day), vars.add(variable().min(0)));
            }
        }
        trace!(
            "Generated {} course variables and {} staff variables.",
            course_vars.len(),
            staff_vars.len()
        );

        let placed_score: Expression = course_vars.values().copied().sum();
        let staffed_score: Expression = staff_vars.values().copied().sum();
        let preferred_score: Expression = course_vars
            .iter()
            .filter(|((ci, day, _), _)| {
                let course = problem.demands[*ci].course;
                course.preferred_days.contains(&grid.days()[*day])
            })
            .map(|(_, var)| *var)
            .sum();
        let over_penalty: Expression = over_vars.values().copied().sum();
        let lateness_penalty: Expression = course_vars
            .iter()
            .map(|((_, _, slot), var)| (*slot as f64) * *var)
            .sum();

        let w = self.weights;
        let objective = w.placement * placed_score + w.staffed * staffed_score
            + w.preferred_day * preferred_score
            - w.over_daily_cap * over_penalty
            - w.lateness * lateness_penalty;

        let mut model = vars
            .maximise(objective)
            .using(default_solver)
            .set_option("threads", 1) // single thread and fixed seed keep reruns identical
            .set_option("random_seed", 1234)
            .set_option("log_to_console", false);

        // one course per cell
        for &(day, slot) in &cells {
            let occupied: Expression = course_vars
                .iter()
                .filter(|((_, d, s), _)| *d == day && *s == slot)
                .map(|(_, var)| *var)
                .sum();
            model.add_constraint(constraint!(occupied <= 1));
        }

        // at most the weekly demand per course
        for (ci, demand) in problem.demands.iter().enumerate() {
            let placed: Expression = course_vars
                .iter()
                .filter(|((c, _, _), _)| *c == ci)
                .map(|(_, var)| *var)
                .sum();
            model.add_constraint(constraint!(placed <= demand.demand as f64));

            let cap = demand.daily_cap(grid.num_days());
            for day in 0..grid.num_days() {
                let room_left = cap.saturating_sub(grid.course_hours_on_day(demand.course.id, day));
                let on_day: Expression = course_vars
                    .iter()
                    .filter(|((c, d, _), _)| *c == ci && *d == day)
                    .map(|(_, var)| *var)
                    .sum();
                let over: Expression = std::iter::once(over_vars[&(ci, day)]).sum();
                model.add_constraint(constraint!(on_day - over <= room_left as f64));
            }
        }

        // staff only where the course is, at most one staff per placement
        for (key, course_var) in &course_vars {
            let bound: Expression = staff_vars
                .iter()
                .filter(|((k, _), _)| k == key)
                .map(|(_, var)| *var)
                .sum();
            let course_var = *course_var;
            model.add_constraint(constraint!(bound <= course_var));
        }

        // no staff double-booking
        let mut bookings: BTreeMap<(StaffId, usize, usize), Vec<Variable>> = BTreeMap::new();
        for (((_, day, slot), staff_id), var) in &staff_vars {
            bookings.entry((*staff_id, *day, *slot)).or_default().push(*var);
        }
        for booked in bookings.into_values().filter(|v| v.len() > 1) {
            let busy: Expression = booked.into_iter().sum();
            model.add_constraint(constraint!(busy <= 1));
        }

        info!("Starting ILP solver...");
        let solution = model
            .solve()
            .map_err(|e| GenerationError::SolverFailed(e.to_string()))?;
        info!("Solution found in {:.2?}", start_time.elapsed());

        let mut placed = vec![0u32; problem.demands.len()];
        for (&(ci, day, slot), var) in &course_vars {
            if solution.value(*var) < 0.5 {
                continue;
            }
            let staff_id = staff_vars
                .range(((ci, day, slot), StaffId::MIN)..=((ci, day, slot), StaffId::MAX))
                .find(|(_, var)| solution.value(**var) > 0.5)
                .map(|((_, staff_id), _)| *staff_id);
            grid.place(
                day,
                slot,
                Placement {
                    course_id: problem.demands[ci].course.id,
                    staff_id,
                },
            )?;
            placed[ci] += 1;
        }

        Ok(problem
            .demands
            .iter()
            .zip(placed)
            .filter(|(d, p)| *p < d.demand)
            .map(|(d, p)| exhausted(d.course.id, d.demand, p))
            .collect())
    }
}
