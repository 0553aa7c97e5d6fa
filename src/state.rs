//! Interfaces between the search core and the game domain.
//!
//! The search never inspects a board directly. Each worker thread owns a
//! [`SimulationState`] created through the embedder's [`SearchHost`], and
//! drives it through one simulation at a time: replaying the in-tree moves,
//! generating children on expansion, running a playout and producing a
//! per-player evaluation.

use std::fmt;

use arrayvec::ArrayVec;

/// Winning probability / evaluation type, also used for visit counts.
pub type Float = f32;

/// Player index, `< nu_players <= MAX_PLAYERS`.
pub type Player = usize;

/// Upper bound on the number of players in any supported game variant.
pub const MAX_PLAYERS: usize = 6;

/// Per-player evaluation of a finished simulation, values in `[0, 1]`.
pub type Eval = ArrayVec<Float, MAX_PLAYERS>;

/// Move representation used by the search.
///
/// A move is an opaque copyable value with a dense integer identifier.
/// `to_index` must return a value in `[0, RANGE)` for any non-null move, and
/// `from_index(m.to_index()) == m` must hold; the reply table relies on both.
pub trait GameMove: Copy + Eq + Send + Sync + 'static {
    /// Exclusive upper bound on `to_index`.
    const RANGE: usize;

    /// The "no move" value. Never passed to the domain as a move to play.
    fn null() -> Self;

    fn to_index(self) -> usize;

    fn from_index(index: usize) -> Self;

    fn is_null(self) -> bool {
        self == Self::null()
    }
}

/// One child declaration produced by the domain during expansion.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildInit<M> {
    pub mv: M,
    pub count: Float,
    pub value: Float,
}

/// Collects the child declarations for one node expansion.
///
/// Reused across simulations by each worker. The order in which children are
/// added is the order they occupy in the tree, which makes it the tie-break
/// order for selection.
pub struct ChildBuffer<M: GameMove> {
    children: Vec<ChildInit<M>>,
    best: usize,
}

impl<M: GameMove> ChildBuffer<M> {
    pub fn new() -> Self {
        ChildBuffer {
            children: Vec::new(),
            best: 0,
        }
    }

    /// Declare a child with its prior count and value estimate.
    pub fn add(&mut self, mv: M, count: Float, value: Float) {
        debug_assert!(!mv.is_null());
        debug_assert!(mv.to_index() < M::RANGE);
        if let Some(best) = self.children.get(self.best) {
            if value > best.value {
                self.best = self.children.len();
            }
        }
        self.children.push(ChildInit { mv, count, value });
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.best = 0;
    }

    pub(crate) fn entries(&self) -> &[ChildInit<M>] {
        &self.children
    }

    /// Index of the child with the highest prior value, first one on ties.
    pub(crate) fn best_index(&self) -> usize {
        self.best
    }
}

impl<M: GameMove> Default for ChildBuffer<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Domain state owned by a single worker thread.
///
/// The search calls these methods in a fixed order per simulation:
/// `start_simulation`, then `play_in_tree` for every selected move, then
/// `finish_in_tree`, optionally `gen_children` + `play_expanded_child`, then
/// `start_playout` and `gen_and_play_playout_move` until it returns `false`,
/// and finally `evaluate_playout` (or `evaluate_terminal` when expansion
/// produced no children). The move history queried through `move_count` /
/// `move_at` covers all moves of the current simulation, in-tree and playout.
pub trait SimulationState: Send + 'static {
    type Move: GameMove;

    /// Called once when a search begins, before any simulation.
    fn start_search(&mut self) {}

    /// Called at the start of simulation number `n`.
    fn start_simulation(&mut self, _n: usize) {}

    /// Generate the children of the current state.
    ///
    /// `init_value` is the search's current estimate for the player to move
    /// and may be used to scale prior values. Adding no children marks the
    /// state as terminal.
    fn gen_children(&mut self, buffer: &mut ChildBuffer<Self::Move>, init_value: Float);

    /// Play a move selected from already-expanded children.
    fn play_in_tree(&mut self, mv: Self::Move);

    /// The in-tree phase of the current simulation is complete.
    fn finish_in_tree(&mut self) {}

    /// Play a child that was created by `gen_children` in this simulation.
    fn play_expanded_child(&mut self, mv: Self::Move);

    /// The playout phase begins.
    fn start_playout(&mut self) {}

    /// Generate and play one playout move; `false` ends the playout.
    ///
    /// `reply_1` and `reply_2` are the 1-ply and 2-ply last-good-reply
    /// candidates for the player to move (null when absent or disabled); the
    /// domain is free to play one of them if legal, or ignore them.
    fn gen_and_play_playout_move(&mut self, reply_1: Self::Move, reply_2: Self::Move) -> bool;

    /// Evaluate the finished playout, one value per player in `[0, 1]`.
    fn evaluate_playout(&mut self) -> Eval;

    /// Evaluate the current state when expansion found no children.
    fn evaluate_terminal(&mut self) -> Eval;

    /// Number of moves played so far in the current simulation.
    fn move_count(&self) -> usize;

    /// The `i`-th move of the current simulation and the player who made it.
    fn move_at(&self, i: usize) -> (Player, Self::Move);

    /// The player to move in the current state.
    fn to_play(&self) -> Player;

    /// Exclude a move from RAVE updates (e.g. pass moves).
    fn skip_rave(&self, _mv: Self::Move) -> bool {
        false
    }

    /// Write a human-readable dump of the state, for diagnostics.
    fn dump(&self, _out: &mut dyn fmt::Write) -> fmt::Result {
        Ok(())
    }
}

/// The embedder side of the search: game constants, per-worker state
/// creation, and the follow-up relation between consecutive searches.
pub trait SearchHost {
    type State: SimulationState;

    /// Create a fresh simulation state for a worker thread. Each state must
    /// observe the same root position as the host at search time.
    fn make_state(&self) -> Self::State;

    fn nu_players(&self) -> usize;

    /// The player to move at the current root position.
    fn to_play(&self) -> Player;

    /// The evaluation corresponding to a 50% outcome.
    fn tie_value(&self) -> Float {
        0.5
    }

    /// Render a move for diagnostics output.
    fn move_string(&self, mv: <Self::State as SimulationState>::Move) -> String;

    /// Report whether the current root position follows the root of the
    /// previous search by the move sequence written into `sequence`
    /// (empty = same position). Called once at the start of every search;
    /// hosts that support subtree reuse typically record the current
    /// position here for the next call. The default declines.
    fn check_followup(
        &mut self,
        _sequence: &mut Vec<<Self::State as SimulationState>::Move>,
    ) -> bool {
        false
    }
}

/// Shorthand for the move type of a host's simulation state.
pub type MoveOf<H> = <<H as SearchHost>::State as SimulationState>::Move;
