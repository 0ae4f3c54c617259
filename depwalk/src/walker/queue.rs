use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::walker::Task;

/// Unbounded multi-producer, multi-consumer queue of pending tasks.
///
/// Popping never blocks: an empty queue does not mean the walk is over, because tasks in flight
/// may still produce children. Deciding when to stop is up to [`PendingWork`].
///
/// [`PendingWork`]: crate::walker::PendingWork
#[derive(Clone)]
pub struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, task: Task) {
        // The queue owns a receiver, so the channel cannot be disconnected.
        self.sender
            .send(task)
            .expect("task queue receiver must outlive its senders");
    }

    pub fn try_pop(&self) -> Option<Task> {
        match self.receiver.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::TaskQueue;
    use crate::core::PackageName;
    use crate::walker::Task;

    #[test]
    fn fifo() {
        let queue = TaskQueue::new();
        assert!(queue.try_pop().is_none());

        queue.push(Task::root(PackageName::new("a"), "*"));
        queue.clone().push(Task::root(PackageName::new("b"), "*"));

        assert_eq!(queue.try_pop().unwrap().package, PackageName::new("a"));
        assert_eq!(queue.try_pop().unwrap().package, PackageName::new("b"));
        assert!(queue.try_pop().is_none());
    }
}
