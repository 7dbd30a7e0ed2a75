//! Running a list of work orders.

use hashbrown::HashSet;
use manip_types::{OutcomeKind, WorkOrder};
use tracing::{debug, info, warn};

use crate::orchestrator::{Orchestrator, PickReport};

/// Which orders of a list to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    start_at: usize,
    skip: HashSet<usize>,
}

impl RunOptions {
    /// Runs every order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips every order before `index`.
    #[must_use]
    pub const fn with_start_at(mut self, index: usize) -> Self {
        self.start_at = index;
        self
    }

    /// Skips the order at `index`.
    #[must_use]
    pub fn with_skip(mut self, index: usize) -> Self {
        self.skip.insert(index);
        self
    }

    /// Returns the first index that runs.
    #[must_use]
    pub const fn start_at(&self) -> usize {
        self.start_at
    }

    /// Returns `true` if the order at `index` is not run.
    #[must_use]
    pub fn skips(&self, index: usize) -> bool {
        index < self.start_at || self.skip.contains(&index)
    }
}

/// Result of [`Orchestrator::run`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One report per order that ran, in list order.
    pub reports: Vec<PickReport>,
    /// Indices that were skipped.
    pub skipped: Vec<usize>,
    /// Set when the run ended early on an abort or stop request.
    pub stopped: bool,
}

impl RunSummary {
    /// Orders picked successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    /// Orders that ran and failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }
}

impl Orchestrator<'_> {
    /// Picks each order in turn.
    ///
    /// A failed order does not stop the run. An aborted order or a pending
    /// stop request does.
    pub fn run(&mut self, orders: &[WorkOrder], options: &RunOptions) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(orders = orders.len(), start_at = options.start_at(), "Starting run");
        for (index, order) in orders.iter().enumerate() {
            if options.skips(index) {
                debug!(index, order = %order, "Skipping order");
                summary.skipped.push(index);
                continue;
            }
            if self.engine().stop_signal().is_stop_requested() {
                warn!(index, "Stop requested, ending run");
                summary.stopped = true;
                break;
            }
            let report = self.pick(order);
            let aborted = report.outcome.kind() == OutcomeKind::Aborted;
            summary.reports.push(report);
            if aborted {
                warn!(index, order = %order, "Order aborted, ending run");
                summary.stopped = true;
                break;
            }
        }
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped.len(),
            stopped = summary.stopped,
            "Run finished"
        );
        summary
    }
}
