//! Parallel Monte Carlo Tree Search on a shared, memory-bounded tree.
//!
//! The search is driven by a pool of persistent worker threads that
//! cooperate lock-free on a single node arena. The controller thread
//! participates as worker 0; the remaining workers are spawned once at
//! construction and block on a channel between searches. Selection uses UCT
//! with optional RAVE and a Last-Good-Reply playout heuristic. When the
//! arena fills up, low-count subtrees are pruned into a scratch arena and
//! the search resumes; consecutive searches on follow-up positions can
//! reuse the relevant subtree the same way.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::{array, fmt, mem, thread};

use arrayvec::ArrayVec;

use crate::state::{Float, GameMove, MoveOf, SearchHost, MAX_PLAYERS};

pub mod bias;
pub mod reply;
pub mod statistics;
pub mod timer;
pub mod tree;
pub(crate) mod worker;

pub use self::statistics::{LockFreeStats, Statistics, COUNT_MAX};
pub use self::timer::{IntervalChecker, TimeSource, WallClock};
pub use self::tree::{Node, NodeIdx, Tree};

use self::reply::LastGoodReply;
use self::worker::Worker;

/// Default memory budget for the two node arenas together.
const DEFAULT_MEMORY: usize = 256 * 1024 * 1024;

/// Upper bound on the automatic thread count.
const DEFAULT_MAX_THREADS: usize = 8;

/// Simulation-rate guess used before the first search has measured one.
const DEFAULT_SIMS_PER_SEC: f64 = 100.0;

/// Budgets below this many seconds run single-threaded: the early lost
/// updates of a parallel start would waste most of such a search.
const MIN_PARALLEL_TIME: f64 = 0.5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchError {
    /// The root has no children: the position is terminal, or the search
    /// was aborted before the first expansion.
    NoMove,
    /// Subtree reuse was interrupted and the caller did not ask for a
    /// best-effort search.
    ReuseAborted,
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SearchError::NoMove => write!(f, "no move available"),
            SearchError::ReuseAborted => write!(f, "tree reuse was aborted"),
        }
    }
}

impl std::error::Error for SearchError {}

/// Search parameters. All of them except the excluded moves are
/// reuse-relevant: changing one between two searches invalidates the tree
/// of the first for reuse by the second.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSettings<M: GameMove> {
    exploration_constant: Float,
    expand_threshold: Float,
    rave: bool,
    rave_equivalence: Float,
    weight_rave_updates: bool,
    rave_check_same: bool,
    last_good_reply: bool,
    prune_full_tree: bool,
    prune_count_start: Float,
    memory: usize,
    deterministic: bool,
    nu_threads: usize,
    excluded_moves: Vec<M>,
}

impl<M: GameMove> Default for SearchSettings<M> {
    fn default() -> Self {
        SearchSettings {
            exploration_constant: 1.4,
            expand_threshold: 1.0,
            rave: true,
            rave_equivalence: 1000.0,
            weight_rave_updates: true,
            rave_check_same: false,
            last_good_reply: true,
            prune_full_tree: true,
            prune_count_start: 16.0,
            memory: DEFAULT_MEMORY,
            deterministic: false,
            nu_threads: 0,
            excluded_moves: vec![],
        }
    }
}

impl<M: GameMove> SearchSettings<M> {
    pub fn with_exploration_constant(mut self, value: Float) -> Self {
        self.exploration_constant = value;
        self
    }

    /// Minimum visit count a leaf must reach before it is expanded.
    pub fn with_expand_threshold(mut self, value: Float) -> Self {
        self.expand_threshold = value;
        self
    }

    pub fn with_rave(mut self, enable: bool) -> Self {
        self.rave = enable;
        self
    }

    pub fn with_rave_equivalence(mut self, value: Float) -> Self {
        self.rave_equivalence = value;
        self
    }

    pub fn with_weight_rave_updates(mut self, enable: bool) -> Self {
        self.weight_rave_updates = enable;
        self
    }

    pub fn with_rave_check_same(mut self, enable: bool) -> Self {
        self.rave_check_same = enable;
        self
    }

    pub fn with_last_good_reply(mut self, enable: bool) -> Self {
        self.last_good_reply = enable;
        self
    }

    /// Whether memory exhaustion prunes the tree and resumes; if disabled,
    /// the search simply ends when the arena is full.
    pub fn with_prune_full_tree(mut self, enable: bool) -> Self {
        self.prune_full_tree = enable;
        self
    }

    pub fn with_prune_count_start(mut self, value: Float) -> Self {
        self.prune_count_start = value;
        self
    }

    /// Memory budget in bytes for both node arenas together.
    pub fn with_memory(mut self, bytes: usize) -> Self {
        self.memory = bytes;
        self
    }

    /// Disable time-based dynamics. Results are reproducible only with a
    /// single thread and a fixed-seed domain.
    pub fn with_deterministic(mut self, enable: bool) -> Self {
        self.deterministic = enable;
        self
    }

    /// Number of worker threads; 0 picks `min(hardware parallelism, 8)`.
    pub fn with_threads(mut self, nu_threads: usize) -> Self {
        self.nu_threads = nu_threads;
        self
    }

    /// Moves never returned as the search result.
    pub fn exclude_moves(mut self, moves: Vec<M>) -> Self {
        self.excluded_moves = moves;
        self
    }

    /// Whether a tree built with `other` may be reused by a search with
    /// these settings.
    pub fn reuse_compatible(&self, other: &Self) -> bool {
        self.exploration_constant == other.exploration_constant
            && self.expand_threshold == other.expand_threshold
            && self.rave == other.rave
            && self.rave_equivalence == other.rave_equivalence
            && self.weight_rave_updates == other.weight_rave_updates
            && self.rave_check_same == other.rave_check_same
            && self.last_good_reply == other.last_good_reply
            && self.prune_full_tree == other.prune_full_tree
            && self.prune_count_start == other.prune_count_start
            && self.memory == other.memory
            && self.deterministic == other.deterministic
            && self.nu_threads == other.nu_threads
    }
}

/// State shared between the controller and all workers.
pub(crate) struct Shared<M: GameMove> {
    trees: [Tree<M>; 2],
    live: AtomicUsize,
    pub(crate) lgr: LastGoodReply<M>,
    pub(crate) abort: Arc<AtomicBool>,
    pub(crate) halt: AtomicBool,
    pub(crate) oom: AtomicBool,
    pub(crate) nu_simulations: AtomicUsize,
    pub(crate) root_values: [LockFreeStats; MAX_PLAYERS],
}

impl<M: GameMove> Shared<M> {
    pub(crate) fn live_tree(&self) -> &Tree<M> {
        &self.trees[self.live.load(Ordering::Relaxed) & 1]
    }

    fn scratch_tree(&self) -> &Tree<M> {
        &self.trees[(self.live.load(Ordering::Relaxed) & 1) ^ 1]
    }

    fn swap_trees(&self) {
        self.live.fetch_xor(1, Ordering::Relaxed);
    }
}

/// Per-search immutable snapshot handed to every worker.
pub(crate) struct Job {
    pub time: Arc<dyn TimeSource>,
    pub start_time: f64,
    pub max_count: Float,
    pub min_simulations: usize,
    pub max_time: f64,
    pub nu_players: usize,
    pub init_values: [Float; MAX_PLAYERS],
    pub exploration_constant: Float,
    pub expand_threshold: Float,
    pub rave: bool,
    pub rave_equivalence: Float,
    pub weight_rave_updates: bool,
    pub rave_check_same: bool,
    pub last_good_reply: bool,
    pub deterministic: bool,
}

enum WorkerMsg {
    Start { job: Arc<Job>, new_search: bool },
    Quit,
}

struct WorkerHandle {
    tx: mpsc::Sender<WorkerMsg>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Node count for a memory budget split over two arenas. Requests beyond
/// the machine's reported memory are clamped instead of failing later.
fn max_nodes_for_memory<M: GameMove>(memory: usize) -> usize {
    let node_size = mem::size_of::<Node<M>>();
    let mut memory = memory.max(4 * node_size);
    if memory >= 1 << 30 && sysinfo::IS_SUPPORTED_SYSTEM {
        let mut sys = sysinfo::System::new_all();
        sys.refresh_all();
        let total = sys.total_memory();
        if total > 0 && memory as u64 > total {
            log::warn!(
                "requested {}MB for the search trees, system reports {}MB, clamping",
                memory / (1024 * 1024),
                total / (1024 * 1024)
            );
            memory = (total / 2) as usize;
        }
    }
    memory / (2 * node_size)
}

/// A search instance: the host, the two node arenas, and the worker pool.
pub struct Search<H: SearchHost> {
    host: H,
    settings: SearchSettings<MoveOf<H>>,
    shared: Arc<Shared<MoveOf<H>>>,
    worker0: Worker<H::State>,
    threads: Vec<WorkerHandle>,
    done: mpsc::Receiver<()>,
    callback: Option<Box<dyn FnMut(f64, f64)>>,
    nu_threads: usize,
    /// Whether the tree holds a completed search with the current settings.
    tree_valid: bool,
    prune_min_count: Float,
    reuse_count: Float,
    last_move: Option<MoveOf<H>>,
    sims_per_sec: f64,
}

impl<H: SearchHost> Search<H> {
    pub fn new(host: H, settings: SearchSettings<MoveOf<H>>) -> Self {
        let nu_players = host.nu_players();
        assert!(nu_players >= 1 && nu_players <= MAX_PLAYERS);
        let nu_threads = if settings.nu_threads == 0 {
            thread::available_parallelism()
                .map_or(1, |n| n.get())
                .min(DEFAULT_MAX_THREADS)
        } else {
            settings.nu_threads
        };
        let max_nodes = max_nodes_for_memory::<MoveOf<H>>(settings.memory);
        let shared = Arc::new(Shared {
            trees: [Tree::new(max_nodes), Tree::new(max_nodes)],
            live: AtomicUsize::new(0),
            lgr: LastGoodReply::new(nu_players),
            abort: Arc::new(AtomicBool::new(false)),
            halt: AtomicBool::new(false),
            oom: AtomicBool::new(false),
            nu_simulations: AtomicUsize::new(0),
            root_values: array::from_fn(|_| LockFreeStats::default()),
        });
        shared.live_tree().clear(host.tie_value(), 0.0);

        let barrier = Arc::new(Barrier::new(nu_threads));
        let (done_tx, done_rx) = mpsc::channel();
        let mut threads = Vec::with_capacity(nu_threads - 1);
        for i in 1..nu_threads {
            let (tx, rx) = mpsc::channel::<WorkerMsg>();
            let mut worker = Worker::new(host.make_state(), nu_players);
            let shared = Arc::clone(&shared);
            let barrier = Arc::clone(&barrier);
            let done = done_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("search-worker-{}", i))
                .spawn(move || {
                    barrier.wait();
                    while let Ok(msg) = rx.recv() {
                        match msg {
                            WorkerMsg::Start { job, new_search } => {
                                worker.run(&shared, &job, new_search, None);
                                if done.send(()).is_err() {
                                    break;
                                }
                            }
                            WorkerMsg::Quit => break,
                        }
                    }
                })
                .expect("failed to spawn search worker thread");
            threads.push(WorkerHandle {
                tx,
                handle: Some(handle),
            });
        }
        // The controller participates in the barrier, so every worker is
        // parked on its channel once we pass it.
        barrier.wait();

        Search {
            worker0: Worker::new(host.make_state(), nu_players),
            prune_min_count: settings.prune_count_start,
            host,
            settings,
            shared,
            threads,
            done: done_rx,
            callback: None,
            nu_threads,
            tree_valid: false,
            reuse_count: 0.0,
            last_move: None,
            sims_per_sec: DEFAULT_SIMS_PER_SEC,
        }
    }

    /// Run a search and return the chosen move.
    ///
    /// Exactly one of `max_count` (simulation budget) and `max_time`
    /// (seconds) should be the active limit; pass a very large value for
    /// the other. At least `min_simulations` simulations are run before any
    /// early-termination predicate may end the search. `always_search`
    /// controls whether an aborted subtree reuse still leads to a
    /// best-effort search on the partial tree.
    pub fn search(
        &mut self,
        max_count: Float,
        min_simulations: usize,
        max_time: f64,
        time: Arc<dyn TimeSource>,
        always_search: bool,
    ) -> Result<MoveOf<H>, SearchError> {
        let start_time = time.now();
        let shared = Arc::clone(&self.shared);
        shared.abort.store(false, Ordering::Relaxed);
        shared.halt.store(false, Ordering::Relaxed);
        shared.oom.store(false, Ordering::Relaxed);
        shared.nu_simulations.store(0, Ordering::Relaxed);
        self.reuse_count = 0.0;
        self.prune_min_count = self.settings.prune_count_start;
        let nu_players = self.host.nu_players();
        let tie_value = self.host.tie_value();

        // Reuse the previous tree when the host declares the new root a
        // follow-up close enough for the old values to stay informative.
        let mut cleared = true;
        let mut reused_subtree = false;
        let mut sequence = Vec::new();
        let followup = self.host.check_followup(&mut sequence);
        if self.tree_valid && followup && sequence.len() <= nu_players {
            if sequence.is_empty() {
                self.reuse_count = shared.live_tree().root().visits();
                cleared = false;
            } else if let Some(node_idx) = shared.live_tree().find_node(&sequence) {
                if shared.live_tree().node(node_idx).children().is_some() {
                    let completed = {
                        let mut abort = || {
                            shared.abort.load(Ordering::Relaxed)
                                || time.now() - start_time > max_time
                        };
                        shared.live_tree().extract_subtree(
                            shared.scratch_tree(),
                            node_idx,
                            &mut abort,
                        )
                    };
                    if !completed && !always_search {
                        self.tree_valid = false;
                        return Err(SearchError::ReuseAborted);
                    }
                    let count = shared.scratch_tree().root().visits();
                    if count > 0.0 {
                        shared.swap_trees();
                        self.reuse_count = count;
                        cleared = false;
                        reused_subtree = true;
                    }
                }
            }
        }

        // Prior-knowledge estimate per player: the previous root values
        // when reusing, the tie value otherwise.
        let mut init_values = [tie_value; MAX_PLAYERS];
        if self.reuse_count > 0.0 {
            for (player, stats) in shared.root_values.iter().enumerate() {
                if stats.count() > 0.0 {
                    init_values[player] = stats.mean();
                }
            }
        }
        if cleared {
            shared.live_tree().clear(tie_value, 0.0);
            shared.lgr.clear();
        } else if reused_subtree {
            // The reused root's value was accumulated from another node's
            // perspective; its count stays.
            shared
                .live_tree()
                .root()
                .set_value_mean(init_values[self.host.to_play()]);
        }
        for stats in &shared.root_values {
            stats.init(tie_value, 0.0);
        }
        self.tree_valid = true;

        // Very short searches run single-threaded.
        let single = max_time < MIN_PARALLEL_TIME
            || (max_count as f64) < self.sims_per_sec.max(1.0) * MIN_PARALLEL_TIME;
        let threads_used = if single { 1 } else { self.nu_threads };

        let job = Arc::new(Job {
            time: Arc::clone(&time),
            start_time,
            max_count,
            min_simulations,
            max_time,
            nu_players,
            init_values,
            exploration_constant: self.settings.exploration_constant,
            expand_threshold: self.settings.expand_threshold,
            rave: self.settings.rave,
            rave_equivalence: self.settings.rave_equivalence,
            weight_rave_updates: self.settings.weight_rave_updates,
            rave_check_same: self.settings.rave_check_same,
            last_good_reply: self.settings.last_good_reply,
            deterministic: self.settings.deterministic,
        });

        let mut new_search = true;
        let mut callback_slot = self.callback.take();
        loop {
            shared.halt.store(false, Ordering::Relaxed);
            for handle in &self.threads[..threads_used - 1] {
                handle
                    .tx
                    .send(WorkerMsg::Start {
                        job: Arc::clone(&job),
                        new_search,
                    })
                    .expect("search worker thread terminated");
            }
            let callback = callback_slot
                .as_mut()
                .map(|c| &mut **c as &mut dyn FnMut(f64, f64));
            self.worker0.run(&shared, &job, new_search, callback);
            for _ in 1..threads_used {
                let _ = self.done.recv();
            }
            new_search = false;

            if shared.oom.swap(false, Ordering::Relaxed) && !shared.abort.load(Ordering::Relaxed)
            {
                if !self.settings.prune_full_tree {
                    log::info!("arena exhausted and pruning disabled, ending search");
                    break;
                }
                if !self.prune(&*time, max_time, start_time) {
                    break;
                }
                continue;
            }
            break;
        }
        self.callback = callback_slot;

        let elapsed = time.now() - start_time;
        let nu_simulations = shared.nu_simulations.load(Ordering::Relaxed);
        if elapsed > 0.0 && nu_simulations > 0 {
            self.sims_per_sec = nu_simulations as f64 / elapsed;
        }

        let mv = self.best_root_move().ok_or(SearchError::NoMove)?;
        self.last_move = Some(mv);
        Ok(mv)
    }

    /// Copy subtrees with sufficient counts into the scratch arena and make
    /// it the live tree. Returns false when the search should end: the copy
    /// was aborted, or pruning cannot reduce the tree below the cap.
    fn prune(&mut self, time: &dyn TimeSource, max_time: f64, start_time: f64) -> bool {
        let shared = Arc::clone(&self.shared);
        let before = shared.live_tree().nu_nodes();
        let completed = {
            let mut abort =
                || shared.abort.load(Ordering::Relaxed) || time.now() - start_time > max_time;
            shared.live_tree().copy_subtree(
                shared.scratch_tree(),
                0,
                self.prune_min_count,
                &mut abort,
            )
        };
        if !completed {
            log::info!("pruning aborted, ending search");
            return false;
        }
        shared.swap_trees();
        let after = shared.live_tree().nu_nodes();
        log::info!(
            "pruned tree with min count {}: {} -> {} nodes",
            self.prune_min_count,
            before,
            after
        );
        if after > before / 2 {
            self.prune_min_count = (self.prune_min_count * 2.0).min(COUNT_MAX / 2.0);
        }
        if after + 1 >= shared.live_tree().capacity() {
            log::warn!("pruning could not reduce the tree, ending search");
            return false;
        }
        true
    }

    fn best_root_move(&self) -> Option<MoveOf<H>> {
        best_root_child(self.shared.live_tree(), &self.settings.excluded_moves)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &SearchSettings<MoveOf<H>> {
        &self.settings
    }

    /// Read-only view of the current live tree.
    pub fn tree(&self) -> &Tree<MoveOf<H>> {
        self.shared.live_tree()
    }

    /// Simulations performed by the last search (reused counts excluded).
    pub fn nu_simulations(&self) -> usize {
        self.shared.nu_simulations.load(Ordering::Relaxed)
    }

    /// Per-player root evaluation statistics accumulated by the last search.
    pub fn root_values(&self) -> ArrayVec<Statistics, MAX_PLAYERS> {
        self.shared
            .root_values
            .iter()
            .take(self.host.nu_players())
            .map(LockFreeStats::snapshot)
            .collect()
    }

    /// Visit count carried over from the previous search's tree, 0 when
    /// nothing was reused.
    pub fn reuse_count(&self) -> Float {
        self.reuse_count
    }

    pub fn last_move(&self) -> Option<MoveOf<H>> {
        self.last_move
    }

    pub fn last_sims_per_sec(&self) -> f64 {
        self.sims_per_sec
    }

    /// Cooperative cancellation flag, shared with embedders. Setting it
    /// from any thread ends the running search after in-flight simulations
    /// complete their backup.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.abort)
    }

    /// Progress callback, invoked by worker 0 approximately every 0.1 s
    /// with (elapsed seconds, estimated remaining seconds).
    pub fn set_callback(&mut self, callback: impl FnMut(f64, f64) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn set_rave(&mut self, enable: bool) {
        if self.settings.rave != enable {
            self.settings.rave = enable;
            self.tree_valid = false;
        }
    }

    pub fn set_rave_equivalence(&mut self, value: Float) {
        if self.settings.rave_equivalence != value {
            self.settings.rave_equivalence = value;
            self.tree_valid = false;
        }
    }

    pub fn set_weight_rave_updates(&mut self, enable: bool) {
        if self.settings.weight_rave_updates != enable {
            self.settings.weight_rave_updates = enable;
            self.tree_valid = false;
        }
    }

    pub fn set_rave_check_same(&mut self, enable: bool) {
        if self.settings.rave_check_same != enable {
            self.settings.rave_check_same = enable;
            self.tree_valid = false;
        }
    }

    pub fn set_last_good_reply(&mut self, enable: bool) {
        if self.settings.last_good_reply != enable {
            self.settings.last_good_reply = enable;
            self.tree_valid = false;
        }
    }

    pub fn set_exploration_constant(&mut self, value: Float) {
        if self.settings.exploration_constant != value {
            self.settings.exploration_constant = value;
            self.tree_valid = false;
        }
    }

    pub fn set_expand_threshold(&mut self, value: Float) {
        if self.settings.expand_threshold != value {
            self.settings.expand_threshold = value;
            self.tree_valid = false;
        }
    }

    pub fn set_prune_full_tree(&mut self, enable: bool) {
        if self.settings.prune_full_tree != enable {
            self.settings.prune_full_tree = enable;
            self.tree_valid = false;
        }
    }

    pub fn set_prune_count_start(&mut self, value: Float) {
        if self.settings.prune_count_start != value {
            self.settings.prune_count_start = value;
            self.tree_valid = false;
        }
    }

    pub fn set_deterministic(&mut self, enable: bool) {
        if self.settings.deterministic != enable {
            self.settings.deterministic = enable;
            self.tree_valid = false;
        }
    }

    pub fn set_excluded_moves(&mut self, moves: Vec<MoveOf<H>>) {
        self.settings.excluded_moves = moves;
    }

    /// Principal variation of the live tree.
    pub fn pv(&self) -> Pv<MoveOf<H>> {
        Pv::new(self.shared.live_tree())
    }

    /// Write human-readable information about the best root children.
    pub fn write_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let tree = self.shared.live_tree();
        writeln!(
            out,
            "{} simulations, {} nodes, {} reused",
            self.nu_simulations(),
            tree.nu_nodes(),
            self.reuse_count
        )?;
        let Some((first, count)) = tree.root().children() else {
            return writeln!(out, "no children at root");
        };
        let mut children: Vec<NodeIdx> = (first..first + count).collect();
        children.sort_by(|&a, &b| {
            tree.node(b)
                .visits()
                .partial_cmp(&tree.node(a).visits())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for &idx in children.iter().take(8) {
            let child = tree.node(idx);
            let pv: Vec<String> = Pv { tree, node: idx }
                .map(|mv| self.host.move_string(mv))
                .collect();
            writeln!(
                out,
                "{}: {:.0} visits, {:.1}% value, {:.1}% rave, pv {}",
                self.host.move_string(child.mv()),
                child.visits(),
                child.value() * 100.0,
                child.rave_value() * 100.0,
                pv.join(" ")
            )?;
        }
        Ok(())
    }
}

impl<H: SearchHost> Drop for Search<H> {
    fn drop(&mut self) {
        for handle in &self.threads {
            let _ = handle.tx.send(WorkerMsg::Quit);
        }
        for handle in &mut self.threads {
            if let Some(join) = handle.handle.take() {
                let _ = join.join();
            }
        }
    }
}

/// The root child with the highest visit count, skipping `excluded`; ties
/// break towards the higher value, then towards earlier allocation.
pub(crate) fn best_root_child<M: GameMove>(tree: &Tree<M>, excluded: &[M]) -> Option<M> {
    let (first, count) = tree.root().children()?;
    let mut best: Option<(Float, Float, M)> = None;
    for c in 0..count {
        let child = tree.node(first + c);
        let mv = child.mv();
        if excluded.contains(&mv) {
            continue;
        }
        let better = match best {
            None => true,
            Some((visits, value, _)) => {
                child.visits() > visits || (child.visits() == visits && child.value() > value)
            }
        };
        if better {
            best = Some((child.visits(), child.value(), mv));
        }
    }
    best.map(|(_, _, mv)| mv)
}

/// Iterator over a tree's principal variation: the chain of highest-count
/// children, ties towards earlier allocation.
pub struct Pv<'a, M: GameMove> {
    tree: &'a Tree<M>,
    node: NodeIdx,
}

impl<'a, M: GameMove> Pv<'a, M> {
    pub fn new(tree: &'a Tree<M>) -> Self {
        Pv { tree, node: 0 }
    }
}

impl<M: GameMove> Iterator for Pv<'_, M> {
    type Item = M;

    fn next(&mut self) -> Option<M> {
        let (first, count) = self.tree.node(self.node).children()?;
        let mut best = first;
        for c in 1..count {
            if self.tree.node(first + c).visits() > self.tree.node(best).visits() {
                best = first + c;
            }
        }
        if self.tree.node(best).visits() <= 0.0 {
            return None;
        }
        self.node = best;
        Some(self.tree.node(best).mv())
    }
}
