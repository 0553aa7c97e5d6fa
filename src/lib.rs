//! A parallel Monte Carlo Tree Search engine core for polyomino placement
//! games (and any other game exposed through the [`state`] traits).
//!
//! The search builds a tree incrementally under a fixed memory budget,
//! selecting with UCT augmented by RAVE and a Last-Good-Reply playout
//! heuristic. A pool of persistent worker threads cooperates lock-free on
//! one shared tree; when the node arena fills up, low-count subtrees are
//! pruned and the search resumes, and consecutive searches on follow-up
//! positions reuse the relevant subtree.
//!
//! # Examples
//!
//! Search a one-shot two-armed game where the first arm pays 0.7:
//!
//! ```
//! use std::sync::Arc;
//!
//! use polymcts::search::{Search, SearchSettings, WallClock};
//! use polymcts::{ChildBuffer, Eval, Float, GameMove, Player, SearchHost, SimulationState};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//! struct Arm(u16);
//!
//! impl GameMove for Arm {
//!     const RANGE: usize = 2;
//!     fn null() -> Self {
//!         Arm(u16::MAX)
//!     }
//!     fn to_index(self) -> usize {
//!         self.0 as usize
//!     }
//!     fn from_index(index: usize) -> Self {
//!         Arm(index as u16)
//!     }
//! }
//!
//! struct Bandit {
//!     moves: Vec<(Player, Arm)>,
//! }
//!
//! impl SimulationState for Bandit {
//!     type Move = Arm;
//!
//!     fn start_simulation(&mut self, _n: usize) {
//!         self.moves.clear();
//!     }
//!     fn gen_children(&mut self, buffer: &mut ChildBuffer<Arm>, init_value: Float) {
//!         if self.moves.is_empty() {
//!             buffer.add(Arm(0), 0.0, init_value);
//!             buffer.add(Arm(1), 0.0, init_value);
//!         }
//!     }
//!     fn play_in_tree(&mut self, mv: Arm) {
//!         self.moves.push((0, mv));
//!     }
//!     fn play_expanded_child(&mut self, mv: Arm) {
//!         self.moves.push((0, mv));
//!     }
//!     fn gen_and_play_playout_move(&mut self, _reply_1: Arm, _reply_2: Arm) -> bool {
//!         false
//!     }
//!     fn evaluate_playout(&mut self) -> Eval {
//!         self.evaluate_terminal()
//!     }
//!     fn evaluate_terminal(&mut self) -> Eval {
//!         let mut eval = Eval::new();
//!         eval.push(if self.moves[0].1 == Arm(0) { 0.7 } else { 0.3 });
//!         eval
//!     }
//!     fn move_count(&self) -> usize {
//!         self.moves.len()
//!     }
//!     fn move_at(&self, i: usize) -> (Player, Arm) {
//!         self.moves[i]
//!     }
//!     fn to_play(&self) -> Player {
//!         0
//!     }
//! }
//!
//! struct BanditHost;
//!
//! impl SearchHost for BanditHost {
//!     type State = Bandit;
//!
//!     fn make_state(&self) -> Bandit {
//!         Bandit { moves: vec![] }
//!     }
//!     fn nu_players(&self) -> usize {
//!         1
//!     }
//!     fn to_play(&self) -> Player {
//!         0
//!     }
//!     fn move_string(&self, mv: Arm) -> String {
//!         format!("arm {}", mv.to_index())
//!     }
//! }
//!
//! let mut search = Search::new(BanditHost, SearchSettings::default().with_threads(1));
//! let mv = search
//!     .search(1000.0, 1, f64::MAX, Arc::new(WallClock::new()), true)
//!     .unwrap();
//! assert_eq!(mv, Arm(0));
//! ```

pub mod search;
pub mod state;
mod tests;

pub use search::{Search, SearchError, SearchSettings};
pub use state::{
    ChildBuffer, Eval, Float, GameMove, MoveOf, Player, SearchHost, SimulationState, MAX_PLAYERS,
};
