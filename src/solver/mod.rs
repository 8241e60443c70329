//! Assignment solvers. Both fill the same [`Grid`] under the same hard
//! constraints; they differ only in how they chase the soft preferences.

mod greedy;
mod ilp;

pub use greedy::GreedySolver;
pub use ilp::{IlpSolver, IlpWeights};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::demand::Problem;
use crate::error::{Diagnostic, GenerationError};
use crate::grid::Grid;

pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Commits placements for every demand in `problem` into `grid` and
    /// returns the placement diagnostics (`GridExhausted`).
    fn solve(&self, problem: &Problem<'_>, grid: &mut Grid) -> Result<Vec<Diagnostic>, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Greedy,
    Ilp,
}

impl SolverKind {
    pub fn build(self) -> Box<dyn Solver> {
        match self {
            SolverKind::Greedy => Box::new(GreedySolver),
            SolverKind::Ilp => Box::new(IlpSolver::default()),
        }
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(SolverKind::Greedy),
            "ilp" => Ok(SolverKind::Ilp),
            other => Err(format!("unknown solver '{}', expected 'greedy' or 'ilp'", other)),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Greedy => f.write_str("greedy"),
            SolverKind::Ilp => f.write_str("ilp"),
        }
    }
}

pub(crate) fn exhausted(course_id: u32, demand: u32, placed: u32) -> Diagnostic {
    Diagnostic::GridExhausted {
        course_id,
        demand,
        placed,
        shortfall: demand - placed,
    }
}
