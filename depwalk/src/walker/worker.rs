use std::any::Any;
use std::error::Error;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, trace, warn};

use crate::core::errors::{RegistryError, SoftFailure, WalkError};
use crate::core::{
    FetchFailurePolicy, NodeId, PackageDocument, PackageName, RegistryClient, RegistryResource,
};
use crate::resolver;
use crate::walker::{Graph, GraphNode, PendingWork, Task, TaskQueue, WalkOptions};

/// State shared by all workers of a single walk.
pub(crate) struct Shared {
    pub client: Arc<dyn RegistryClient>,
    pub options: WalkOptions,
    pub queue: TaskQueue,
    pub graph: Graph,
    pub pending: PendingWork,
    pub shutdown: watch::Sender<bool>,
    pub failure: Mutex<Option<WalkError>>,
    pub pruned: AtomicUsize,
}

impl Shared {
    pub fn new(client: Arc<dyn RegistryClient>, options: WalkOptions) -> Self {
        Self {
            client,
            options,
            queue: TaskQueue::new(),
            graph: Graph::new(),
            pending: PendingWork::new(1),
            shutdown: watch::channel(false).0,
            failure: Mutex::new(None),
            pruned: AtomicUsize::new(0),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Record a hard failure and stop the walk. Only the first failure is kept.
    fn abort(&self, err: WalkError) {
        error!("{}", display_chain(&err));
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(err);
        self.request_shutdown();
    }

    pub fn take_failure(&self) -> Option<WalkError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn prune(&self, task: &Task, failure: SoftFailure) {
        warn!("{}, skipping {task}", display_chain(&failure));
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    fn fetch_failure(&self, task: &Task, err: RegistryError) -> Result<Outcome, WalkError> {
        match self.options.fetch_failure_policy {
            FetchFailurePolicy::Prune => Ok(Outcome::Pruned(err.into())),
            FetchFailurePolicy::Abort => Err(WalkError::Aborted {
                task: task.clone(),
                source: err.into(),
            }),
        }
    }
}

enum Outcome {
    /// The task claimed a new node and enqueued its dependencies.
    Expanded { id: NodeId, children: usize },
    /// The resolved node has been claimed by another task already.
    Visited(NodeId),
    Pruned(SoftFailure),
}

/// Worker loop: pull tasks until shutdown is requested.
///
/// An empty queue does not end the loop, as other workers may still enqueue children. Instead,
/// the worker sleeps for the idle interval, waking up early if shutdown is requested meanwhile.
pub(crate) async fn run(worker: usize, shared: Arc<Shared>) {
    let mut shutdown = shared.shutdown.subscribe();
    trace!(worker, "worker started");

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        let Some(task) = shared.queue.try_pop() else {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(shared.options.idle_interval) => {}
            }
            continue;
        };

        let outcome = AssertUnwindSafe(process(&shared, &task))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(Outcome::Expanded { id, children })) => {
                debug!("expanded {id} with {children} dependencies");
            }
            Ok(Ok(Outcome::Visited(id))) => {
                trace!("{id} already visited");
            }
            Ok(Ok(Outcome::Pruned(failure))) => shared.prune(&task, failure),
            Ok(Err(err)) => shared.abort(err),
            Err(payload) => shared.abort(WalkError::WorkerPanicked {
                task: task.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }

        // Exactly once per dequeued task, after all of its children have been counted.
        shared.pending.decrement();
    }

    trace!(worker, "worker stopped");
}

#[tracing::instrument(level = "trace", skip_all, fields(task = %task))]
async fn process(shared: &Shared, task: &Task) -> Result<Outcome, WalkError> {
    // Fetch into a local value first: nothing shared is touched while waiting for the registry.
    let raw = match shared.client.fetch(&task.package).await {
        Ok(RegistryResource::Found(raw)) => raw,
        Ok(RegistryResource::NotFound) => {
            return Ok(Outcome::Pruned(SoftFailure::NotFound {
                name: task.package.clone(),
            }));
        }
        Err(err) => return shared.fetch_failure(task, err),
    };

    let document = match PackageDocument::parse(&task.package, &raw) {
        Ok(document) => document,
        Err(err) => return shared.fetch_failure(task, err),
    };

    let unresolvable = || -> Result<Outcome, WalkError> {
        Ok(Outcome::Pruned(SoftFailure::Unresolvable {
            name: task.package.clone(),
            range: task.range.clone(),
        }))
    };

    let Some(version) = resolver::resolve(
        &task.range,
        document.versions.keys().map(String::as_str),
        &document.dist_tags,
    ) else {
        return unresolvable();
    };
    // The `latest` fallback for pre-release only packages may point at an unpublished version.
    let Some(record) = document.version_record(&version) else {
        return unresolvable();
    };

    let id = NodeId::new(task.package.clone(), version);

    // Edges are recorded before claiming, so that every path into an already visited node is
    // still captured.
    if let Some(parent) = &task.parent {
        shared.graph.record_edge(parent.clone(), id.clone());
    }

    if !shared.graph.try_claim(&id) {
        return Ok(Outcome::Visited(id));
    }

    shared
        .graph
        .record_node(GraphNode::new(id.clone(), &document, record));

    let mut children = 0;
    for dependency in record.dependencies() {
        let package = match PackageName::try_new(&dependency.name) {
            Ok(package) => package,
            Err(source) => {
                let failure = SoftFailure::InvalidName {
                    name: dependency.name.clone(),
                    source,
                };
                warn!(
                    "{}, skipping `{} {}` (required by {id})",
                    display_chain(&failure),
                    dependency.name,
                    dependency.range
                );
                shared.pruned.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        shared.pending.increment();
        shared
            .queue
            .push(Task::child(package, dependency.range, id.clone()));
        children += 1;
    }

    Ok(Outcome::Expanded { id, children })
}

/// Formats an error together with all its causes, `outer: cause: root cause`.
fn display_chain(err: &(dyn Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
