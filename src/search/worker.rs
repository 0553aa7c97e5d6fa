//! The simulation worker: one selection → expansion → playout → backup
//! iteration, repeated until the shared halt flag is raised.

use std::sync::atomic::Ordering;

use super::bias::BiasTerm;
use super::statistics::COUNT_MAX;
use super::timer::IntervalChecker;
use super::tree::{LinkResult, Node, NodeIdx, Tree};
use super::{Job, Shared};
use crate::state::{ChildBuffer, Eval, Float, GameMove, SimulationState};

/// Ply marker for "move not played" in the first-play scratch.
const UNSET: u32 = u32::MAX;

/// Fixed expensive-check interval in deterministic mode.
const DETERMINISTIC_CHECK_INTERVAL: u32 = 1000;

/// Target seconds between expensive abort checks (and progress callbacks).
const CHECK_TIME_INTERVAL: f64 = 0.1;

enum SimOutcome {
    Done,
    /// The arena is full; the controller decides whether to prune.
    OutOfMemory,
    /// The root itself has no children; searching further is pointless.
    RootTerminal,
}

pub(crate) struct Worker<S: SimulationState> {
    state: S,
    path: Vec<NodeIdx>,
    /// Per (player, move id): ply of the move's first occurrence in the
    /// current simulation, reset after every RAVE update.
    first_play: Box<[u32]>,
    buffer: ChildBuffer<S::Move>,
    bias: BiasTerm,
}

impl<S: SimulationState> Worker<S> {
    pub(crate) fn new(state: S, nu_players: usize) -> Self {
        Worker {
            state,
            path: Vec::new(),
            first_play: vec![UNSET; nu_players * S::Move::RANGE].into_boxed_slice(),
            buffer: ChildBuffer::new(),
            bias: BiasTerm::new(0.0),
        }
    }

    /// Run simulations until the halt flag is raised. `callback` is only
    /// passed for worker 0 and receives (elapsed, estimated remaining) on
    /// the expensive-check path.
    pub(crate) fn run(
        &mut self,
        shared: &Shared<S::Move>,
        job: &Job,
        new_search: bool,
        mut callback: Option<&mut dyn FnMut(f64, f64)>,
    ) {
        if new_search {
            self.state.start_search();
        }
        self.bias = BiasTerm::new(job.exploration_constant);
        let mut checker = if job.deterministic {
            IntervalChecker::deterministic(DETERMINISTIC_CHECK_INTERVAL)
        } else {
            IntervalChecker::new(CHECK_TIME_INTERVAL)
        };
        checker.start(&*job.time);
        loop {
            if shared.halt.load(Ordering::Relaxed) {
                break;
            }
            let n = shared.nu_simulations.load(Ordering::Relaxed);
            if n as Float >= job.max_count {
                shared.halt.store(true, Ordering::Relaxed);
                break;
            }
            shared.nu_simulations.fetch_add(1, Ordering::Relaxed);
            match self.simulate(n, shared, job) {
                SimOutcome::Done => {}
                SimOutcome::OutOfMemory => {
                    // The abandoned iteration is not counted.
                    shared.nu_simulations.fetch_sub(1, Ordering::Relaxed);
                    shared.oom.store(true, Ordering::Relaxed);
                    shared.halt.store(true, Ordering::Relaxed);
                    break;
                }
                SimOutcome::RootTerminal => {
                    shared.halt.store(true, Ordering::Relaxed);
                    break;
                }
            }
            if checker.check(&*job.time) && self.check_abort_expensive(shared, job, &mut callback)
            {
                shared.halt.store(true, Ordering::Relaxed);
                break;
            }
        }
    }

    fn simulate(&mut self, n: usize, shared: &Shared<S::Move>, job: &Job) -> SimOutcome {
        let tree = shared.live_tree();
        self.state.start_simulation(n);
        let root_player = self.state.to_play();
        self.path.clear();
        self.path.push(0);
        let mut node_idx: NodeIdx = 0;

        // Selection: descend while children are linked.
        loop {
            let node = tree.node(node_idx);
            let Some((first, count)) = node.children() else {
                break;
            };
            let best = self.select_child(tree, node, first, count, job);
            self.state.play_in_tree(tree.node(best).mv());
            self.path.push(best);
            node_idx = best;
        }
        self.state.finish_in_tree();

        // Expansion: the root expands on its first visit, any other leaf
        // once its count exceeds the threshold.
        let leaf = tree.node(node_idx);
        let mut terminal = false;
        if node_idx == 0 || leaf.visits() > job.expand_threshold {
            let init_value = job.init_values[self.state.to_play()];
            self.buffer.clear();
            self.state.gen_children(&mut self.buffer, init_value);
            if self.buffer.is_empty() {
                terminal = true;
            } else {
                match tree.link_children(node_idx, &self.buffer) {
                    LinkResult::Linked(first) => {
                        let best = self.buffer.best_index();
                        let mv = self.buffer.entries()[best].mv;
                        self.state.play_expanded_child(mv);
                        self.path.push(first + best as u32);
                    }
                    // Another worker linked this leaf concurrently; the
                    // playout simply starts from the leaf.
                    LinkResult::AlreadyLinked => {}
                    LinkResult::OutOfMemory => return SimOutcome::OutOfMemory,
                }
            }
        }

        let eval = if terminal {
            self.state.evaluate_terminal()
        } else {
            self.state.start_playout();
            loop {
                let (reply_1, reply_2) = self.reply_candidates(shared, job);
                if !self.state.gen_and_play_playout_move(reply_1, reply_2) {
                    break;
                }
            }
            self.state.evaluate_playout()
        };
        debug_assert!(eval.len() >= job.nu_players);
        self.backup(tree, shared, job, root_player, &eval);

        if terminal && node_idx == 0 {
            SimOutcome::RootTerminal
        } else {
            SimOutcome::Done
        }
    }

    /// UCT+RAVE selection: maximize
    /// `beta * rave_value + (1 - beta) * value + bias`, first child wins
    /// ties.
    fn select_child(
        &mut self,
        tree: &Tree<S::Move>,
        node: &Node<S::Move>,
        first: NodeIdx,
        count: u32,
        job: &Job,
    ) -> NodeIdx {
        let node_count = node.visits();
        self.bias.start_iteration(node_count);
        let beta = if job.rave {
            (job.rave_equivalence / (3.0 * node_count + job.rave_equivalence)).sqrt()
        } else {
            0.0
        };
        let mut best = first;
        let mut best_value = Float::NEG_INFINITY;
        for c in 0..count {
            let child = tree.node(first + c);
            let value = beta * child.rave_value()
                + (1.0 - beta) * child.value()
                + self.bias.get(child.visits());
            if value > best_value {
                best_value = value;
                best = first + c;
            }
        }
        best
    }

    fn reply_candidates(&self, shared: &Shared<S::Move>, job: &Job) -> (S::Move, S::Move) {
        let null = S::Move::null();
        if !job.last_good_reply {
            return (null, null);
        }
        let n = self.state.move_count();
        if n == 0 {
            return (null, null);
        }
        let (_, last) = self.state.move_at(n - 1);
        if last.is_null() {
            return (null, null);
        }
        let second_last = if n >= 2 {
            self.state.move_at(n - 2).1
        } else {
            null
        };
        shared.lgr.get(self.state.to_play(), last, second_last)
    }

    fn backup(
        &mut self,
        tree: &Tree<S::Move>,
        shared: &Shared<S::Move>,
        job: &Job,
        root_player: usize,
        eval: &Eval,
    ) {
        // Each node receives the evaluation of the player who was to move
        // at its parent; the root, of the player to move at the root.
        tree.node(self.path[0]).add_value(eval[root_player]);
        for j in 1..self.path.len() {
            let (player, _) = self.state.move_at(j - 1);
            tree.node(self.path[j]).add_value(eval[player]);
        }
        if job.rave {
            self.update_rave(tree, job, eval);
        }
        for (player, stats) in shared.root_values.iter().enumerate().take(job.nu_players) {
            stats.add(eval[player]);
        }
        if job.last_good_reply {
            self.update_replies(shared, eval, job);
        }
    }

    fn update_rave(&mut self, tree: &Tree<S::Move>, job: &Job, eval: &Eval) {
        let range = S::Move::RANGE;
        let nu_moves = self.state.move_count();
        if nu_moves == 0 {
            return;
        }
        let len = nu_moves as Float;

        // Record each (player, move) first occurrence; reverse order so the
        // earliest ply wins by overwrite.
        for i in (0..nu_moves).rev() {
            let (player, mv) = self.state.move_at(i);
            if !mv.is_null() {
                self.first_play[player * range + mv.to_index()] = i as u32;
            }
        }

        let depth = (self.path.len() - 1).min(nu_moves);
        for i in 0..depth {
            let node = tree.node(self.path[i]);
            let Some((first, count)) = node.children() else {
                continue;
            };
            let (player, _) = self.state.move_at(i);
            for c in 0..count {
                let child = tree.node(first + c);
                let mv = child.mv();
                if mv.is_null() || self.state.skip_rave(mv) {
                    continue;
                }
                let first_play = self.first_play[player * range + mv.to_index()];
                if first_play == UNSET || (first_play as usize) < i {
                    continue;
                }
                // Skip the update if another player played the move first,
                // between this node and the mover's own first play.
                if job.rave_check_same
                    && (0..job.nu_players).any(|other| {
                        if other == player {
                            return false;
                        }
                        let other_first = self.first_play[other * range + mv.to_index()];
                        other_first != UNSET
                            && other_first as usize >= i
                            && other_first <= first_play
                    })
                {
                    continue;
                }
                let weight = if job.weight_rave_updates {
                    2.0 - (first_play as usize - i) as Float / len
                } else {
                    1.0
                };
                child.add_rave_value(eval[player], weight);
            }
        }

        for i in 0..nu_moves {
            let (player, mv) = self.state.move_at(i);
            if !mv.is_null() {
                self.first_play[player * range + mv.to_index()] = UNSET;
            }
        }
    }

    /// Walk the simulation's moves from the end: winners store their reply
    /// to the two preceding moves (so a player's earliest reply survives),
    /// losers forget theirs.
    fn update_replies(&self, shared: &Shared<S::Move>, eval: &Eval, job: &Job) {
        let nu_moves = self.state.move_count();
        if nu_moves < 2 {
            return;
        }
        let max = eval
            .iter()
            .take(job.nu_players)
            .fold(Float::MIN, |a, &b| a.max(b));
        for i in (1..nu_moves).rev() {
            let (player, reply) = self.state.move_at(i);
            let (_, last) = self.state.move_at(i - 1);
            if reply.is_null() || last.is_null() {
                continue;
            }
            let second_last = if i >= 2 {
                self.state.move_at(i - 2).1
            } else {
                S::Move::null()
            };
            if eval[player] >= max {
                shared.lgr.store(player, last, second_last, reply);
            } else {
                shared.lgr.forget(player, last, second_last);
            }
        }
    }

    fn check_abort_expensive(
        &mut self,
        shared: &Shared<S::Move>,
        job: &Job,
        callback: &mut Option<&mut dyn FnMut(f64, f64)>,
    ) -> bool {
        if shared.abort.load(Ordering::Relaxed) {
            return true;
        }
        let tree = shared.live_tree();
        if tree.root().visits() >= COUNT_MAX {
            log::info!("root visit count saturated, terminating search");
            return true;
        }
        let n = shared.nu_simulations.load(Ordering::Relaxed);
        let count_remaining = (job.max_count - n as Float).max(0.0);
        if job.deterministic {
            // No time-based dynamics: only the simulation budget counts.
            return n >= job.min_simulations && best_cannot_change(tree, count_remaining);
        }
        let elapsed = job.time.now() - job.start_time;
        if let Some(callback) = callback.as_mut() {
            let time_left = (job.max_time - elapsed).max(0.0);
            let count_left = if n > 0 {
                elapsed * count_remaining as f64 / n as f64
            } else {
                f64::MAX
            };
            callback(elapsed, time_left.min(count_left));
        }
        if n < job.min_simulations {
            return false;
        }
        if elapsed > job.max_time {
            return true;
        }
        let remaining = if elapsed > 0.0 {
            let by_time = ((job.max_time - elapsed) * n as f64 / elapsed) as Float;
            count_remaining.min(by_time)
        } else {
            count_remaining
        };
        best_cannot_change(tree, remaining)
    }
}

/// True when no allocation of `remaining` further visits to any root child
/// can change which child has the highest count.
pub(crate) fn best_cannot_change<M: GameMove>(tree: &Tree<M>, remaining: Float) -> bool {
    let Some((first, count)) = tree.root().children() else {
        return false;
    };
    if count == 1 {
        return true;
    }
    let mut m1 = 0.0;
    let mut m2 = 0.0;
    for c in 0..count {
        let visits = tree.node(first + c).visits();
        if visits > m1 {
            m2 = m1;
            m1 = visits;
        } else if visits > m2 {
            m2 = visits;
        }
    }
    m1 > m2 + remaining
}
