//! Shuffle order generation
//!
//! Fisher-Yates over playlist indices, with the active index pinned first so
//! turning shuffle on never changes what is playing, only what comes next.

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Shuffled play order over `0..len`, with `current` first when it is in range
pub fn shuffle_order(len: usize, current: Option<usize>) -> Vec<usize> {
    shuffle_order_with(len, current, &mut thread_rng())
}

/// [`shuffle_order`] with an explicit random source
pub fn shuffle_order_with<R: Rng + ?Sized>(
    len: usize,
    current: Option<usize>,
    rng: &mut R,
) -> Vec<usize> {
    let pinned = current.filter(|&index| index < len);
    let mut rest: Vec<usize> = (0..len).filter(|&index| Some(index) != pinned).collect();
    rest.shuffle(rng);

    match pinned {
        Some(index) => {
            let mut order = Vec::with_capacity(len);
            order.push(index);
            order.extend(rest);
            order
        }
        None => rest,
    }
}

/// Step from `current` within `order`, wrapping both ways
///
/// When `current` is not in the order the step starts from just outside it, so
/// forward lands on the first entry and backward on the last.
pub fn step(order: &[usize], current: Option<usize>, forward: bool) -> Option<usize> {
    if order.is_empty() {
        return None;
    }
    let len = order.len();
    let position = current.and_then(|index| order.iter().position(|&i| i == index));

    let next = match (position, forward) {
        (Some(p), true) => (p + 1) % len,
        (Some(p), false) => (p + len - 1) % len,
        (None, true) => 0,
        (None, false) => len - 1,
    };
    Some(order[next])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn current_index_comes_first() {
        let mut rng = StdRng::seed_from_u64(7);
        for current in 0..10 {
            let order = shuffle_order_with(10, Some(current), &mut rng);
            assert_eq!(order[0], current);
            assert_eq!(order.iter().collect::<HashSet<_>>().len(), 10);
        }
    }

    #[test]
    fn out_of_range_current_is_ignored() {
        let order = shuffle_order(4, Some(9));
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_playlist_has_empty_order() {
        assert!(shuffle_order(0, Some(0)).is_empty());
        assert_eq!(step(&[], Some(0), true), None);
    }

    #[test]
    fn step_wraps() {
        let order = [2, 0, 3, 1];
        assert_eq!(step(&order, Some(2), true), Some(0));
        assert_eq!(step(&order, Some(1), true), Some(2));
        assert_eq!(step(&order, Some(2), false), Some(1));
        assert_eq!(step(&order, None, true), Some(2));
        assert_eq!(step(&order, None, false), Some(1));
    }
}
