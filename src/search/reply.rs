//! Last-Good-Reply table: per-player memory of moves that worked as an
//! immediate answer to a recent move sequence.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::state::{GameMove, Player};

/// Cap on the hashed 2-ply table, per player.
const MAX_HASHED_SLOTS: usize = 1 << 20;

const EMPTY: u32 = 0;

/// For each player, a 1-ply table keyed on the last move and a hashed 2-ply
/// table keyed on the last two moves. Each slot stores a move id (+1, 0 =
/// empty) in a relaxed atomic: updates race freely and lost writes are
/// acceptable given the table's heuristic role. A win stores the winner's
/// first reply for the key; a loss clears the key so a loser's reply never
/// survives.
pub struct LastGoodReply<M: GameMove> {
    nu_players: usize,
    reply_1: Box<[AtomicU32]>,
    reply_2: Box<[AtomicU32]>,
    hashed_slots: usize,
    hash_shift: u32,
    _marker: PhantomData<M>,
}

impl<M: GameMove> LastGoodReply<M> {
    pub fn new(nu_players: usize) -> Self {
        let hashed_slots = (M::RANGE * M::RANGE)
            .next_power_of_two()
            .clamp(1 << 10, MAX_HASHED_SLOTS);
        let reply_1 = (0..nu_players * M::RANGE)
            .map(|_| AtomicU32::new(EMPTY))
            .collect();
        let reply_2 = (0..nu_players * hashed_slots)
            .map(|_| AtomicU32::new(EMPTY))
            .collect();
        LastGoodReply {
            nu_players,
            reply_1,
            reply_2,
            hashed_slots,
            hash_shift: 64 - hashed_slots.trailing_zeros(),
            _marker: PhantomData,
        }
    }

    pub fn clear(&self) {
        for slot in self.reply_1.iter().chain(self.reply_2.iter()) {
            slot.store(EMPTY, Ordering::Relaxed);
        }
    }

    fn index_1(&self, player: Player, last: M) -> usize {
        player * M::RANGE + last.to_index()
    }

    fn index_2(&self, player: Player, last: M, second_last: M) -> usize {
        let key = (last.to_index() * M::RANGE + second_last.to_index()) as u64;
        let hash = (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> self.hash_shift) as usize;
        player * self.hashed_slots + hash
    }

    fn decode(slot: &AtomicU32) -> M {
        match slot.load(Ordering::Relaxed) {
            EMPTY => M::null(),
            id => M::from_index(id as usize - 1),
        }
    }

    /// The (1-ply, 2-ply) reply candidates for `player`; null when absent.
    /// `second_last` may be null, in which case only the 1-ply table is
    /// consulted.
    pub fn get(&self, player: Player, last: M, second_last: M) -> (M, M) {
        debug_assert!(player < self.nu_players);
        let reply_1 = Self::decode(&self.reply_1[self.index_1(player, last)]);
        let reply_2 = if second_last.is_null() {
            M::null()
        } else {
            Self::decode(&self.reply_2[self.index_2(player, last, second_last)])
        };
        (reply_1, reply_2)
    }

    pub fn store(&self, player: Player, last: M, second_last: M, reply: M) {
        debug_assert!(!reply.is_null());
        let id = reply.to_index() as u32 + 1;
        self.reply_1[self.index_1(player, last)].store(id, Ordering::Relaxed);
        if !second_last.is_null() {
            self.reply_2[self.index_2(player, last, second_last)].store(id, Ordering::Relaxed);
        }
    }

    pub fn forget(&self, player: Player, last: M, second_last: M) {
        self.reply_1[self.index_1(player, last)].store(EMPTY, Ordering::Relaxed);
        if !second_last.is_null() {
            self.reply_2[self.index_2(player, last, second_last)].store(EMPTY, Ordering::Relaxed);
        }
    }
}
