use flowmodel::{ComponentId, ConnectionId, FlowStateId};
use std::collections::VecDeque;

pub type TaskId = u64;

/// A unit of scheduled work: run `component` inside `flow_state`, optionally
/// recording the connection line that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTask {
    pub id: TaskId,
    pub flow_state: FlowStateId,
    pub component: ComponentId,
    pub connection: Option<ConnectionId>,
}

/// The single session-wide task queue. One ordered sequence across all flow
/// instances, so the debugger sees one linear "what happens next" view.
#[derive(Debug, Default)]
pub struct RunQueue {
    tasks: VecDeque<QueueTask>,
    next_id: TaskId,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(
        &mut self,
        flow_state: FlowStateId,
        component: ComponentId,
        connection: Option<ConnectionId>,
    ) -> TaskId {
        self.next_id += 1;
        let id = self.next_id;
        self.tasks.push_back(QueueTask {
            id,
            flow_state,
            component,
            connection,
        });
        id
    }

    /// Allocate a task that never enters the queue: an invoked action's
    /// start runs right away instead of waiting behind pending work.
    pub fn immediate(
        &mut self,
        flow_state: FlowStateId,
        component: ComponentId,
        connection: Option<ConnectionId>,
    ) -> QueueTask {
        self.next_id += 1;
        QueueTask {
            id: self.next_id,
            flow_state,
            component,
            connection,
        }
    }

    pub fn dequeue(&mut self) -> Option<QueueTask> {
        self.tasks.pop_front()
    }

    /// Put a task back at the head, keeping its identity.
    pub fn requeue_front(&mut self, task: QueueTask) {
        self.tasks.push_front(task);
    }

    /// Re-insert deferred tasks at the head, preserving their relative order
    /// ahead of anything newly enqueued.
    pub fn requeue_front_batch(&mut self, tasks: Vec<QueueTask>) {
        for task in tasks.into_iter().rev() {
            self.tasks.push_front(task);
        }
    }

    /// Drop every pending task belonging to a finished flow instance.
    pub fn purge_flow_state(&mut self, flow_state: FlowStateId) {
        self.tasks.retain(|t| t.flow_state != flow_state);
    }

    pub fn has_tasks_for(&self, flow_state: FlowStateId) -> bool {
        self.tasks.iter().any(|t| t.flow_state == flow_state)
    }

    pub fn front(&self) -> Option<&QueueTask> {
        self.tasks.front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueTask> {
        self.tasks.iter()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }
}
