use chrono::Utc;
use flowmodel::{ComponentId, FlowStateId, HistoryItem, HistoryKind};
use std::collections::VecDeque;

/// Bounded append-only debugger log. Every append is also streamed over the
/// event bus by the pump; this store backs the snapshot's recent tail.
#[derive(Debug)]
pub struct History {
    items: VecDeque<HistoryItem>,
    capacity: usize,
    next_id: u64,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            next_id: 0,
        }
    }

    pub fn push(
        &mut self,
        kind: HistoryKind,
        flow_state: Option<FlowStateId>,
        component: Option<ComponentId>,
        message: impl Into<String>,
    ) -> HistoryItem {
        self.next_id += 1;
        let item = HistoryItem {
            id: self.next_id,
            timestamp: Utc::now(),
            kind,
            flow_state,
            component,
            message: message.into(),
        };
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item.clone());
        item
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Last `n` items, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryItem> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryItem> {
        self.items.iter()
    }
}
