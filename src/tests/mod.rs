#[cfg(test)]
mod bias_tests;
#[cfg(test)]
mod reply_tests;

#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
use rand::rngs::SmallRng;
#[cfg(test)]
use rand::{Rng, SeedableRng};

#[cfg(test)]
use crate::search::{Search, SearchError, WallClock};
#[cfg(test)]
use crate::state::{
    ChildBuffer, Eval, Float, GameMove, MoveOf, Player, SearchHost, SimulationState,
};

#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ToyMove(pub u16);

#[cfg(test)]
impl GameMove for ToyMove {
    const RANGE: usize = 64;

    fn null() -> Self {
        ToyMove(u16::MAX)
    }

    fn to_index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        ToyMove(index as u16)
    }
}

/// Run a count-limited search with no time pressure.
#[cfg(test)]
pub(crate) fn run_search<H: SearchHost>(
    search: &mut Search<H>,
    max_count: Float,
    min_simulations: usize,
) -> Result<MoveOf<H>, SearchError> {
    search.search(
        max_count,
        min_simulations,
        f64::MAX,
        Arc::new(WallClock::new()),
        true,
    )
}

/// One-shot game: picking arm `i` scores `payoffs[i]`, single player.
#[cfg(test)]
pub(crate) struct BanditHost {
    pub payoffs: Vec<Float>,
}

#[cfg(test)]
pub(crate) struct BanditState {
    payoffs: Vec<Float>,
    moves: Vec<(Player, ToyMove)>,
}

#[cfg(test)]
impl SimulationState for BanditState {
    type Move = ToyMove;

    fn start_simulation(&mut self, _n: usize) {
        self.moves.clear();
    }

    fn gen_children(&mut self, buffer: &mut ChildBuffer<ToyMove>, init_value: Float) {
        if self.moves.is_empty() {
            for i in 0..self.payoffs.len() {
                buffer.add(ToyMove(i as u16), 0.0, init_value);
            }
        }
    }

    fn play_in_tree(&mut self, mv: ToyMove) {
        self.moves.push((0, mv));
    }

    fn play_expanded_child(&mut self, mv: ToyMove) {
        self.moves.push((0, mv));
    }

    fn gen_and_play_playout_move(&mut self, _reply_1: ToyMove, _reply_2: ToyMove) -> bool {
        false
    }

    fn evaluate_playout(&mut self) -> Eval {
        self.evaluate_terminal()
    }

    fn evaluate_terminal(&mut self) -> Eval {
        let mut eval = Eval::new();
        eval.push(match self.moves.first() {
            Some((_, mv)) => self.payoffs[mv.to_index()],
            None => 0.5,
        });
        eval
    }

    fn move_count(&self) -> usize {
        self.moves.len()
    }

    fn move_at(&self, i: usize) -> (Player, ToyMove) {
        self.moves[i]
    }

    fn to_play(&self) -> Player {
        0
    }
}

#[cfg(test)]
impl SearchHost for BanditHost {
    type State = BanditState;

    fn make_state(&self) -> BanditState {
        BanditState {
            payoffs: self.payoffs.clone(),
            moves: vec![],
        }
    }

    fn nu_players(&self) -> usize {
        1
    }

    fn to_play(&self) -> Player {
        0
    }

    fn move_string(&self, mv: ToyMove) -> String {
        format!("arm {}", mv.0)
    }
}

/// Alternating game with uniform branching, fixed length and a
/// deterministic pseudo-random evaluation of the full move path.
#[cfg(test)]
#[derive(Clone, Copy)]
pub(crate) struct UniformSpec {
    pub nu_players: usize,
    pub branching: u16,
    pub depth: usize,
    pub seed: u64,
}

#[cfg(test)]
pub(crate) struct UniformHost {
    spec: UniformSpec,
    position: Arc<Mutex<Vec<ToyMove>>>,
    last_position: Option<Vec<ToyMove>>,
    pub followup: bool,
}

#[cfg(test)]
impl UniformHost {
    pub fn new(spec: UniformSpec) -> Self {
        UniformHost {
            spec,
            position: Arc::new(Mutex::new(vec![])),
            last_position: None,
            followup: false,
        }
    }

    pub fn play(&mut self, mv: ToyMove) {
        self.position.lock().unwrap().push(mv);
    }
}

#[cfg(test)]
impl SearchHost for UniformHost {
    type State = UniformState;

    fn make_state(&self) -> UniformState {
        UniformState {
            spec: self.spec,
            position: Arc::clone(&self.position),
            prefix: vec![],
            moves: vec![],
            rng: SmallRng::seed_from_u64(self.spec.seed),
        }
    }

    fn nu_players(&self) -> usize {
        self.spec.nu_players
    }

    fn to_play(&self) -> Player {
        self.position.lock().unwrap().len() % self.spec.nu_players
    }

    fn move_string(&self, mv: ToyMove) -> String {
        format!("{}", mv.0)
    }

    fn check_followup(&mut self, sequence: &mut Vec<ToyMove>) -> bool {
        if !self.followup {
            return false;
        }
        let current = self.position.lock().unwrap().clone();
        let result = match &self.last_position {
            Some(last) if current.len() >= last.len() && current[..last.len()] == last[..] => {
                sequence.extend_from_slice(&current[last.len()..]);
                true
            }
            _ => false,
        };
        self.last_position = Some(current);
        result
    }
}

#[cfg(test)]
pub(crate) struct UniformState {
    spec: UniformSpec,
    position: Arc<Mutex<Vec<ToyMove>>>,
    prefix: Vec<ToyMove>,
    moves: Vec<(Player, ToyMove)>,
    rng: SmallRng,
}

#[cfg(test)]
impl UniformState {
    fn ply(&self) -> usize {
        self.prefix.len() + self.moves.len()
    }

    fn push(&mut self, mv: ToyMove) {
        let player = self.ply() % self.spec.nu_players;
        self.moves.push((player, mv));
    }

    fn evaluate(&self) -> Eval {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for mv in self
            .prefix
            .iter()
            .map(|mv| mv.0)
            .chain(self.moves.iter().map(|(_, mv)| mv.0))
        {
            hash = (hash ^ mv as u64).wrapping_mul(0x0000_0100_0000_01b3);
        }
        let value = (hash % 1000) as Float / 999.0;
        let mut eval = Eval::new();
        for player in 0..self.spec.nu_players {
            eval.push(if player == 0 { value } else { 1.0 - value });
        }
        eval
    }
}

#[cfg(test)]
impl SimulationState for UniformState {
    type Move = ToyMove;

    fn start_search(&mut self) {
        self.prefix = self.position.lock().unwrap().clone();
        self.rng = SmallRng::seed_from_u64(self.spec.seed);
    }

    fn start_simulation(&mut self, _n: usize) {
        self.moves.clear();
    }

    fn gen_children(&mut self, buffer: &mut ChildBuffer<ToyMove>, init_value: Float) {
        if self.ply() < self.spec.depth {
            for i in 0..self.spec.branching {
                buffer.add(ToyMove(i), 0.0, init_value);
            }
        }
    }

    fn play_in_tree(&mut self, mv: ToyMove) {
        self.push(mv);
    }

    fn play_expanded_child(&mut self, mv: ToyMove) {
        self.push(mv);
    }

    fn gen_and_play_playout_move(&mut self, _reply_1: ToyMove, _reply_2: ToyMove) -> bool {
        if self.ply() >= self.spec.depth {
            return false;
        }
        let mv = ToyMove(self.rng.gen_range(0..self.spec.branching));
        self.push(mv);
        true
    }

    fn evaluate_playout(&mut self) -> Eval {
        self.evaluate()
    }

    fn evaluate_terminal(&mut self) -> Eval {
        self.evaluate()
    }

    fn move_count(&self) -> usize {
        self.moves.len()
    }

    fn move_at(&self, i: usize) -> (Player, ToyMove) {
        self.moves[i]
    }

    fn to_play(&self) -> Player {
        self.ply() % self.spec.nu_players
    }
}

/// Single-player game with 8 arms where any simulation containing move 0,
/// in the tree or in the playout, is a win. With root-only expansion this
/// is the textbook case where RAVE credit from playouts separates the arms
/// long before direct sampling does.
#[cfg(test)]
pub(crate) struct RaveHost {
    pub seed: u64,
}

#[cfg(test)]
pub(crate) struct RaveState {
    seed: u64,
    moves: Vec<(Player, ToyMove)>,
    rng: SmallRng,
}

#[cfg(test)]
impl SimulationState for RaveState {
    type Move = ToyMove;

    fn start_search(&mut self) {
        self.rng = SmallRng::seed_from_u64(self.seed);
    }

    fn start_simulation(&mut self, _n: usize) {
        self.moves.clear();
    }

    fn gen_children(&mut self, buffer: &mut ChildBuffer<ToyMove>, init_value: Float) {
        if self.moves.is_empty() {
            for i in 0..8 {
                buffer.add(ToyMove(i), 0.0, init_value);
            }
        }
    }

    fn play_in_tree(&mut self, mv: ToyMove) {
        self.moves.push((0, mv));
    }

    fn play_expanded_child(&mut self, mv: ToyMove) {
        self.moves.push((0, mv));
    }

    fn gen_and_play_playout_move(&mut self, _reply_1: ToyMove, _reply_2: ToyMove) -> bool {
        if self.moves.len() >= 3 {
            return false;
        }
        let mv = ToyMove(self.rng.gen_range(0..8));
        self.moves.push((0, mv));
        true
    }

    fn evaluate_playout(&mut self) -> Eval {
        self.evaluate_terminal()
    }

    fn evaluate_terminal(&mut self) -> Eval {
        let won = self.moves.iter().any(|&(_, mv)| mv == ToyMove(0));
        let mut eval = Eval::new();
        eval.push(if won { 1.0 } else { 0.0 });
        eval
    }

    fn move_count(&self) -> usize {
        self.moves.len()
    }

    fn move_at(&self, i: usize) -> (Player, ToyMove) {
        self.moves[i]
    }

    fn to_play(&self) -> Player {
        0
    }
}

#[cfg(test)]
impl SearchHost for RaveHost {
    type State = RaveState;

    fn make_state(&self) -> RaveState {
        RaveState {
            seed: self.seed,
            moves: vec![],
            rng: SmallRng::seed_from_u64(self.seed),
        }
    }

    fn nu_players(&self) -> usize {
        1
    }

    fn to_play(&self) -> Player {
        0
    }

    fn move_string(&self, mv: ToyMove) -> String {
        format!("{}", mv.0)
    }
}

/// Single-player game whose playouts sleep, for wall-clock cancellation
/// tests.
#[cfg(test)]
pub(crate) struct SlowHost;

#[cfg(test)]
pub(crate) struct SlowState {
    moves: Vec<(Player, ToyMove)>,
    rng: SmallRng,
}

#[cfg(test)]
impl SimulationState for SlowState {
    type Move = ToyMove;

    fn start_simulation(&mut self, _n: usize) {
        self.moves.clear();
    }

    fn gen_children(&mut self, buffer: &mut ChildBuffer<ToyMove>, init_value: Float) {
        if self.moves.is_empty() {
            for i in 0..3 {
                buffer.add(ToyMove(i), 0.0, init_value);
            }
        }
    }

    fn play_in_tree(&mut self, mv: ToyMove) {
        self.moves.push((0, mv));
    }

    fn play_expanded_child(&mut self, mv: ToyMove) {
        self.moves.push((0, mv));
    }

    fn gen_and_play_playout_move(&mut self, _reply_1: ToyMove, _reply_2: ToyMove) -> bool {
        if self.moves.len() >= 20 {
            return false;
        }
        std::thread::sleep(std::time::Duration::from_micros(100));
        let mv = ToyMove(self.rng.gen_range(0..3));
        self.moves.push((0, mv));
        true
    }

    fn evaluate_playout(&mut self) -> Eval {
        self.evaluate_terminal()
    }

    fn evaluate_terminal(&mut self) -> Eval {
        let mut eval = Eval::new();
        eval.push(self.rng.gen_range(0.0..1.0));
        eval
    }

    fn move_count(&self) -> usize {
        self.moves.len()
    }

    fn move_at(&self, i: usize) -> (Player, ToyMove) {
        self.moves[i]
    }

    fn to_play(&self) -> Player {
        0
    }
}

#[cfg(test)]
impl SearchHost for SlowHost {
    type State = SlowState;

    fn make_state(&self) -> SlowState {
        SlowState {
            moves: vec![],
            rng: SmallRng::seed_from_u64(17),
        }
    }

    fn nu_players(&self) -> usize {
        1
    }

    fn to_play(&self) -> Player {
        0
    }

    fn move_string(&self, mv: ToyMove) -> String {
        format!("{}", mv.0)
    }
}
