use crate::search::reply::LastGoodReply;
use crate::state::GameMove;
use crate::tests::ToyMove;

fn null() -> ToyMove {
    ToyMove::null()
}

#[test]
fn stores_and_retrieves_by_key() {
    let table = LastGoodReply::<ToyMove>::new(2);
    let (last, second_last, reply) = (ToyMove(3), ToyMove(4), ToyMove(5));
    assert_eq!(table.get(0, last, second_last), (null(), null()));

    table.store(0, last, second_last, reply);
    assert_eq!(table.get(0, last, second_last), (reply, reply));
    // The other player's table is untouched.
    assert_eq!(table.get(1, last, second_last), (null(), null()));
    // A different second-to-last move still hits the 1-ply slot.
    let (reply_1, reply_2) = table.get(0, last, ToyMove(9));
    assert_eq!(reply_1, reply);
    assert_eq!(reply_2, null());
}

#[test]
fn a_loss_forgets_the_reply() {
    let table = LastGoodReply::<ToyMove>::new(2);
    let (last, second_last, reply) = (ToyMove(3), ToyMove(4), ToyMove(5));
    table.store(0, last, second_last, reply);
    table.forget(0, last, second_last);
    assert_eq!(table.get(0, last, second_last), (null(), null()));
}

#[test]
fn null_second_last_uses_the_one_ply_slot_only() {
    let table = LastGoodReply::<ToyMove>::new(1);
    table.store(0, ToyMove(3), null(), ToyMove(5));
    assert_eq!(table.get(0, ToyMove(3), null()), (ToyMove(5), null()));
}

/// The simulation updater walks moves from the end of the playout, so for a
/// winner the store of their earliest reply lands last and survives.
#[test]
fn later_stores_overwrite_earlier_ones() {
    let table = LastGoodReply::<ToyMove>::new(1);
    table.store(0, ToyMove(3), ToyMove(4), ToyMove(5));
    table.store(0, ToyMove(3), ToyMove(4), ToyMove(6));
    assert_eq!(table.get(0, ToyMove(3), ToyMove(4)), (ToyMove(6), ToyMove(6)));
}

#[test]
fn clear_empties_every_slot() {
    let table = LastGoodReply::<ToyMove>::new(2);
    table.store(0, ToyMove(1), ToyMove(2), ToyMove(3));
    table.store(1, ToyMove(7), null(), ToyMove(8));
    table.clear();
    assert_eq!(table.get(0, ToyMove(1), ToyMove(2)), (null(), null()));
    assert_eq!(table.get(1, ToyMove(7), null()), (null(), null()));
}
