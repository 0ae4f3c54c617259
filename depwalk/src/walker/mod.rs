//! Concurrent walk over the dependency graph of a package.
//!
//! # Implementation
//!
//! A walk is a fixed pool of workers sharing three structures:
//! - [`TaskQueue`] with pending `(package, range, parent)` requests,
//! - [`Graph`] collecting nodes and edges, deduplicating nodes by [`NodeId`],
//! - [`PendingWork`] counting tasks which are queued or in flight.
//!
//! Each worker pops a task, fetches the package document, resolves the range, records the edge
//! from the parent, and, if it is the first one to claim the resolved node, records the node and
//! enqueues one child task per declared dependency. The number of tasks is unknown up front, so
//! instead of counting down a known total, the walker waits for [`PendingWork`] to drain.
//!
//! [`NodeId`]: crate::core::NodeId

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::core::config::{DEFAULT_CONCURRENCY, DEFAULT_IDLE_INTERVAL};
use crate::core::errors::WalkError;
use crate::core::{FetchFailurePolicy, PackageName, RegistryClient};

pub use graph::{Edge, Graph, GraphNode, ResolvedGraph};
pub use pending::PendingWork;
pub use queue::TaskQueue;
pub use task::Task;

mod graph;
mod pending;
mod queue;
mod task;
mod worker;

#[derive(Clone, Debug)]
pub struct WalkOptions {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// How long an idle worker waits before polling an empty queue again.
    pub idle_interval: Duration,
    pub fetch_failure_policy: FetchFailurePolicy,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            fetch_failure_policy: FetchFailurePolicy::default(),
        }
    }
}

pub struct Walker {
    client: Arc<dyn RegistryClient>,
    options: WalkOptions,
}

impl Walker {
    pub fn new(client: Arc<dyn RegistryClient>, options: WalkOptions) -> Self {
        Self { client, options }
    }

    /// Resolve the full transitive dependency graph of `package` at `range`.
    ///
    /// Branches which cannot be resolved are pruned and logged. Returns an error, and no graph,
    /// if a hard failure aborted the walk.
    ///
    /// Must be called within a tokio runtime. Dropping the returned future stops all workers of
    /// this walk.
    #[tracing::instrument(level = "debug", skip_all, fields(package = %package, range = %range))]
    pub async fn list(&self, package: PackageName, range: &str) -> Result<ResolvedGraph, WalkError> {
        let started = Instant::now();

        let shared = Arc::new(worker::Shared::new(
            self.client.clone(),
            self.options.clone(),
        ));
        // The pending counter starts at one, which accounts for this root task.
        shared.queue.push(Task::root(package.clone(), range));
        let _shutdown = ShutdownOnDrop(shared.clone());

        let mut stopped = shared.shutdown.subscribe();
        let workers = (0..self.options.concurrency.max(1))
            .map(|worker| tokio::spawn(worker::run(worker, shared.clone())))
            .collect::<Vec<_>>();

        tokio::select! {
            _ = shared.pending.drained() => debug!("all tasks processed"),
            // The flag only ever flips from `false` to `true`.
            _ = stopped.changed() => debug!("walk aborted"),
        }
        shared.request_shutdown();

        let mut join_error = None;
        for worker in workers {
            if let Err(err) = worker.await {
                if !err.is_cancelled() {
                    join_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = shared.take_failure() {
            return Err(err);
        }
        if let Some(err) = join_error {
            return Err(WalkError::WorkerJoin(err));
        }

        info!(
            "resolved {package} {range}: {} nodes, {} edges, {} pruned branches in {:.2?}",
            shared.graph.node_count(),
            shared.graph.edge_count(),
            shared.pruned.load(std::sync::atomic::Ordering::Relaxed),
            started.elapsed(),
        );
        Ok(shared.graph.snapshot())
    }
}

/// Requests shutdown of all workers once the walk is finished or its future is dropped.
struct ShutdownOnDrop(Arc<worker::Shared>);

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        self.0.request_shutdown();
    }
}
