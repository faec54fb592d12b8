//! Level-ordered event queue and the scratch state of fault propagation

use crate::sim::values::PackedVal;

/// Queue of nodes to evaluate, returned by increasing level
///
/// A node is only present once in the queue.
#[derive(Clone, Debug)]
pub struct EventQueue {
    levels: Vec<Vec<usize>>,
    in_queue: Vec<bool>,
    cur_level: usize,
    nb_pending: usize,
}

impl EventQueue {
    /// Create a queue for nodes up to the given level
    pub fn new(max_level: usize, nb_nodes: usize) -> EventQueue {
        EventQueue {
            levels: vec![Vec::new(); max_level + 1],
            in_queue: vec![false; nb_nodes],
            cur_level: 0,
            nb_pending: 0,
        }
    }

    /// Add a node to the queue, if not already present
    pub fn put(&mut self, node: usize, level: usize) {
        if self.in_queue[node] {
            return;
        }
        self.in_queue[node] = true;
        self.levels[level].push(node);
        self.cur_level = self.cur_level.min(level);
        self.nb_pending += 1;
    }

    /// Remove a node with the lowest level from the queue
    pub fn get(&mut self) -> Option<usize> {
        if self.nb_pending == 0 {
            return None;
        }
        while self.levels[self.cur_level].is_empty() {
            self.cur_level += 1;
        }
        let node = self.levels[self.cur_level].pop()?;
        self.in_queue[node] = false;
        self.nb_pending -= 1;
        Some(node)
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.nb_pending == 0
    }

    /// Remove all nodes from the queue
    pub fn clear(&mut self) {
        for l in &mut self.levels[self.cur_level..] {
            for n in l.drain(..) {
                self.in_queue[n] = false;
            }
        }
        self.cur_level = 0;
        self.nb_pending = 0;
    }
}

/// Reusable state of a fault propagation
///
/// Owned by a simulator and passed to the propagation routines, so that two propagations
/// cannot run at the same time on the same state.
#[derive(Clone, Debug)]
pub struct SimScratch {
    /// Nodes to evaluate
    pub queue: EventQueue,
    /// Nodes whose faulty value was modified, to be restored afterwards
    pub clear_list: Vec<usize>,
    /// Value flip injected at a node, for each node
    pub flip: Vec<PackedVal>,
    /// Local observability of each node, if already computed
    pub lobs: Vec<Option<PackedVal>>,
    /// Nodes whose local observability is cached
    pub lobs_list: Vec<usize>,
}

impl SimScratch {
    /// Create the scratch state for a graph
    pub fn new(max_level: usize, nb_nodes: usize) -> SimScratch {
        SimScratch {
            queue: EventQueue::new(max_level, nb_nodes),
            clear_list: Vec::new(),
            flip: vec![PackedVal::ALL0; nb_nodes],
            lobs: vec![None; nb_nodes],
            lobs_list: Vec::new(),
        }
    }

    /// Forget the cached local observabilities
    pub fn clear_lobs(&mut self) {
        for n in self.lobs_list.drain(..) {
            self.lobs[n] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventQueue;

    #[test]
    fn test_order() {
        let mut q = EventQueue::new(3, 6);
        q.put(4, 3);
        q.put(1, 1);
        q.put(2, 2);
        q.put(1, 1);
        q.put(0, 1);
        let mut levels = Vec::new();
        while let Some(n) = q.get() {
            levels.push(match n {
                0 | 1 => 1,
                2 => 2,
                _ => 3,
            });
            if n == 2 {
                q.put(5, 3);
            }
        }
        assert_eq!(levels, vec![1, 1, 2, 3, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut q = EventQueue::new(2, 4);
        q.put(3, 2);
        q.put(1, 0);
        assert_eq!(q.get(), Some(1));
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.get(), None);
        q.put(3, 2);
        assert_eq!(q.get(), Some(3));
    }
}
