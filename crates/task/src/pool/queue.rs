//! Single work queue with two priority classes

use std::collections::VecDeque;
use zpress_core::CompressionTask;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling class of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Submitted closures whose result a caller may be waiting on
    Generic,
    /// Background compression jobs
    Compression,
}

impl Priority {
    const ORDER: [Priority; 2] = [Priority::Generic, Priority::Compression];

    fn lane(self) -> usize {
        match self {
            Priority::Generic => 0,
            Priority::Compression => 1,
        }
    }
}

pub(crate) enum WorkItem {
    Generic(Job),
    Compression(CompressionTask),
}

impl WorkItem {
    pub(crate) fn priority(&self) -> Priority {
        match self {
            WorkItem::Generic(_) => Priority::Generic,
            WorkItem::Compression(_) => Priority::Compression,
        }
    }
}

/// FIFO within a class; generic items always come out first
#[derive(Default)]
pub(crate) struct WorkQueue {
    lanes: [VecDeque<WorkItem>; 2],
    pub(crate) stopping: bool,
}

impl WorkQueue {
    pub(crate) fn push(&mut self, item: WorkItem) {
        self.lanes[item.priority().lane()].push_back(item);
    }

    pub(crate) fn pop(&mut self) -> Option<WorkItem> {
        Priority::ORDER
            .iter()
            .find_map(|priority| self.lanes[priority.lane()].pop_front())
    }

    pub(crate) fn len(&self, priority: Priority) -> usize {
        self.lanes[priority.lane()].len()
    }
}
