//! The search tree: a bounded arena of nodes shared by all workers.
//!
//! Nodes are allocated in contiguous ranges from a monotonic atomic bump
//! pointer and never freed individually. Parent/child topology is encoded by
//! index: a node's children occupy the slots `[first, first + count)`, and
//! both values live packed in a single atomic word that doubles as the
//! publication point. A worker that observes a non-zero child count through
//! the acquire load in [`Node::children`] is guaranteed to see every child
//! slot fully initialized, because the publishing thread wrote the slots
//! before its release compare-exchange.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::statistics::LockFreeStats;
use crate::state::{ChildBuffer, Float, GameMove};

/// Compact index of a node in the arena. The root is always slot 0.
pub type NodeIdx = u32;

/// A (state, incoming move) pair in the search tree.
///
/// The move cell is written only by the thread that allocated the slot,
/// before publication, or by tree maintenance while all workers are halted;
/// every other access is a read after an acquire load of the parent's child
/// word. This is the invariant that makes the `Sync` impl below sound.
pub struct Node<M: GameMove> {
    mv: UnsafeCell<M>,
    stats: LockFreeStats,
    rave: LockFreeStats,
    /// Packed `(first_child << 32) | child_count`; 0 = no children linked.
    children: AtomicU64,
}

unsafe impl<M: GameMove> Sync for Node<M> {}

fn pack_children(first: NodeIdx, count: u32) -> u64 {
    ((first as u64) << 32) | count as u64
}

impl<M: GameMove> Node<M> {
    fn new_unlinked() -> Self {
        Node {
            mv: UnsafeCell::new(M::null()),
            stats: LockFreeStats::default(),
            rave: LockFreeStats::default(),
            children: AtomicU64::new(0),
        }
    }

    /// The move leading into this node (null at the root).
    pub fn mv(&self) -> M {
        unsafe { *self.mv.get() }
    }

    /// Visit count. Only grows over the lifetime of a tree instance.
    pub fn visits(&self) -> Float {
        self.stats.count()
    }

    /// Running mean of backed-up evaluations, from the perspective of the
    /// player to move at this node's parent.
    pub fn value(&self) -> Float {
        self.stats.mean()
    }

    pub fn rave_visits(&self) -> Float {
        self.rave.count()
    }

    pub fn rave_value(&self) -> Float {
        self.rave.mean()
    }

    /// First child index and child count, or `None` while unexpanded.
    pub fn children(&self) -> Option<(NodeIdx, u32)> {
        let word = self.children.load(Ordering::Acquire);
        if word == 0 {
            None
        } else {
            Some(((word >> 32) as NodeIdx, word as u32))
        }
    }

    pub fn has_children(&self) -> bool {
        self.children.load(Ordering::Relaxed) != 0
    }

    pub(crate) fn add_value(&self, x: Float) {
        self.stats.add(x);
    }

    pub(crate) fn add_rave_value(&self, x: Float, weight: Float) {
        self.rave.add_weighted(x, weight);
    }

    pub(crate) fn set_value_mean(&self, mean: Float) {
        self.stats.set_mean(mean);
    }

    /// Initialize an unpublished slot. Safe only while no other thread can
    /// reach this node (freshly allocated range, or all workers halted).
    fn init(&self, mv: M, value: Float, count: Float) {
        unsafe {
            *self.mv.get() = mv;
        }
        self.stats.init(value, count);
        self.rave.init(value, count);
        self.children.store(0, Ordering::Relaxed);
    }

    fn copy_payload_from(&self, other: &Node<M>) {
        unsafe {
            *self.mv.get() = other.mv();
        }
        self.stats.init(other.value(), other.visits());
        self.rave.init(other.rave_value(), other.rave_visits());
        self.children.store(0, Ordering::Relaxed);
    }

    /// Publish a fully-initialized child range. Fails if another thread
    /// linked children first; the caller's range is then leaked, which the
    /// memory model tolerates.
    fn publish_children(&self, first: NodeIdx, count: u32) -> bool {
        self.children
            .compare_exchange(0, pack_children(first, count), Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }
}

pub(crate) enum LinkResult {
    /// Children linked; the range starts at the contained index.
    Linked(NodeIdx),
    /// Another thread linked children for this parent first.
    AlreadyLinked,
    /// The arena is exhausted.
    OutOfMemory,
}

/// Bounded node arena. Two instances exist per search so that one can serve
/// as the scratch buffer for subtree extraction and pruning.
pub struct Tree<M: GameMove> {
    nodes: Box<[Node<M>]>,
    next_free: AtomicU32,
}

/// How many nodes to copy between abort-predicate polls in subtree copies.
const COPY_CHECK_NODES: u32 = 512;

impl<M: GameMove> Tree<M> {
    pub fn new(max_nodes: usize) -> Self {
        let max_nodes = max_nodes.max(2).min(u32::MAX as usize - 1);
        let nodes: Box<[Node<M>]> = (0..max_nodes).map(|_| Node::new_unlinked()).collect();
        Tree {
            nodes,
            next_free: AtomicU32::new(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of allocated slots, including the root.
    pub fn nu_nodes(&self) -> usize {
        (self.next_free.load(Ordering::Relaxed) as usize).min(self.capacity())
    }

    pub fn root(&self) -> &Node<M> {
        &self.nodes[0]
    }

    pub fn node(&self, idx: NodeIdx) -> &Node<M> {
        &self.nodes[idx as usize]
    }

    /// Reset to a single root with the given value statistics. Must not run
    /// concurrently with workers.
    pub fn clear(&self, root_value: Float, root_count: Float) {
        self.next_free.store(1, Ordering::Relaxed);
        self.nodes[0].init(M::null(), root_value, root_count);
    }

    /// Reserve a contiguous range of `count` slots.
    fn allocate(&self, count: u32) -> Option<NodeIdx> {
        let first = self.next_free.fetch_add(count, Ordering::Relaxed);
        if first as usize + count as usize > self.capacity() {
            None
        } else {
            Some(first)
        }
    }

    /// Allocate and link the children declared in `buffer` under `parent`.
    ///
    /// Every child slot is fully written before the single release
    /// publication on the parent, so concurrent readers either see no
    /// children or all of them initialized.
    pub(crate) fn link_children(
        &self,
        parent: NodeIdx,
        buffer: &ChildBuffer<M>,
    ) -> LinkResult {
        let entries = buffer.entries();
        debug_assert!(!entries.is_empty());
        let parent_node = self.node(parent);
        if parent_node.has_children() {
            return LinkResult::AlreadyLinked;
        }
        let count = entries.len() as u32;
        let first = match self.allocate(count) {
            Some(first) => first,
            None => return LinkResult::OutOfMemory,
        };
        for (i, child) in entries.iter().enumerate() {
            self.node(first + i as u32).init(child.mv, child.value, child.count);
        }
        if parent_node.publish_children(first, count) {
            LinkResult::Linked(first)
        } else {
            LinkResult::AlreadyLinked
        }
    }

    /// Follow `moves` from the root, matching each against the children in
    /// allocation order.
    pub fn find_node(&self, moves: &[M]) -> Option<NodeIdx> {
        let mut idx = 0;
        'descend: for &mv in moves {
            let (first, count) = self.node(idx).children()?;
            for c in 0..count {
                if self.node(first + c).mv() == mv {
                    idx = first + c;
                    continue 'descend;
                }
            }
            return None;
        }
        Some(idx)
    }

    /// Deep-copy the subtree rooted at `from` into `dst` (which is cleared
    /// first), making the copied node the new root.
    ///
    /// All children of a copied node are copied so move lists stay intact,
    /// but the descendants of a child are only followed while the child's
    /// visit count is at least `min_count`; with `min_count` 0 the copy is
    /// isomorphic to the source. Returns `false` if the abort predicate
    /// fired or `dst` ran out of slots before completion; the partial result
    /// is retained in `dst`. Must not run concurrently with workers.
    pub fn copy_subtree(
        &self,
        dst: &Tree<M>,
        from: NodeIdx,
        min_count: Float,
        abort: &mut dyn FnMut() -> bool,
    ) -> bool {
        let src_root = self.node(from);
        dst.clear(0.0, 0.0);
        dst.root().copy_payload_from(src_root);
        if abort() {
            return false;
        }
        let mut countdown = COPY_CHECK_NODES;
        self.copy_children(dst, 0, from, min_count, abort, &mut countdown)
    }

    fn copy_children(
        &self,
        dst: &Tree<M>,
        dst_idx: NodeIdx,
        src_idx: NodeIdx,
        min_count: Float,
        abort: &mut dyn FnMut() -> bool,
        countdown: &mut u32,
    ) -> bool {
        let Some((first, count)) = self.node(src_idx).children() else {
            return true;
        };
        if *countdown <= count {
            *countdown = COPY_CHECK_NODES;
            if abort() {
                return false;
            }
        } else {
            *countdown -= count;
        }
        let Some(dst_first) = dst.allocate(count) else {
            return false;
        };
        for c in 0..count {
            dst.node(dst_first + c).copy_payload_from(self.node(first + c));
        }
        dst.node(dst_idx).publish_children(dst_first, count);
        for c in 0..count {
            if self.node(first + c).visits() >= min_count
                && !self.copy_children(dst, dst_first + c, first + c, min_count, abort, countdown)
            {
                return false;
            }
        }
        true
    }

    /// Copy the subtree rooted at `src_node` into `dst` without any count
    /// filter, used for subtree reuse between searches.
    pub fn extract_subtree(
        &self,
        dst: &Tree<M>,
        src_node: NodeIdx,
        abort: &mut dyn FnMut() -> bool,
    ) -> bool {
        self.copy_subtree(dst, src_node, 0.0, abort)
    }
}
