//! 0/1 selection problems with an exactly-one constraint
//!
//! Every feasible point of `Σx = 1` is a unit vector, so checking each
//! variable once against the extra constraints is an exact method.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

const DEADLINE_CHECK_INTERVAL: usize = 4096;

/// Extra linear constraint `Σ a_i x_i ≤ b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Coefficient per variable; missing entries count as 0
    pub coefficients: Vec<f64>,
    /// Right-hand side
    pub upper_bound: f64,
    /// Name used in logs
    pub label: String,
}

/// Binary variables, objective coefficients and side constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionProblem {
    costs: Vec<f64>,
    constraints: Vec<LinearConstraint>,
}

impl SelectionProblem {
    /// Problem minimizing `Σ costs_i x_i` subject to `Σ x_i = 1`
    pub fn new(costs: Vec<f64>) -> Self {
        Self {
            costs,
            constraints: Vec::new(),
        }
    }

    /// Add a side constraint
    pub fn with_constraint(mut self, constraint: LinearConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Number of binary variables
    pub fn variable_count(&self) -> usize {
        self.costs.len()
    }

    /// Objective coefficients
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Side constraints
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Whether setting only `x_index = 1` satisfies every side constraint
    pub fn admits(&self, index: usize) -> bool {
        self.constraints.iter().all(|c| {
            let coefficient = c.coefficients.get(index).copied().unwrap_or(0.0);
            coefficient <= c.upper_bound
        })
    }
}

/// Final solver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Proven optimum
    Optimal,
    /// No assignment satisfies the constraints
    Infeasible,
    /// Deadline reached before the search completed
    TimedOut,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStatus::Optimal => write!(f, "Optimal"),
            SolverStatus::Infeasible => write!(f, "Infeasible"),
            SolverStatus::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Solver result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    /// Final status
    pub status: SolverStatus,
    /// Index of the variable set to 1, only for `Optimal`
    pub chosen: Option<usize>,
    /// Objective value, only for `Optimal`
    pub objective: Option<f64>,
}

impl SolverOutcome {
    fn without_solution(status: SolverStatus) -> Self {
        Self {
            status,
            chosen: None,
            objective: None,
        }
    }
}

/// Solver for exactly-one selection problems
pub trait SelectionSolver: Send + Sync {
    /// Name reported in errors
    fn name(&self) -> &str;

    /// Solve, giving up with `TimedOut` once `deadline` has passed
    fn solve(&self, problem: &SelectionProblem, deadline: Option<Instant>) -> SolverOutcome;
}

/// Exact enumeration; ties go to the lowest variable index
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveSolver;

impl SelectionSolver for ExhaustiveSolver {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn solve(&self, problem: &SelectionProblem, deadline: Option<Instant>) -> SolverOutcome {
        let mut best: Option<(usize, f64)> = None;

        for (index, &cost) in problem.costs().iter().enumerate() {
            if index % DEADLINE_CHECK_INTERVAL == 0
                && deadline.is_some_and(|d| Instant::now() >= d)
            {
                return SolverOutcome::without_solution(SolverStatus::TimedOut);
            }
            if !cost.is_finite() || !problem.admits(index) {
                continue;
            }
            if best.map_or(true, |(_, b)| cost < b) {
                best = Some((index, cost));
            }
        }

        match best {
            Some((index, objective)) => SolverOutcome {
                status: SolverStatus::Optimal,
                chosen: Some(index),
                objective: Some(objective),
            },
            None => SolverOutcome::without_solution(SolverStatus::Infeasible),
        }
    }
}
