// ============================================================
// Layer 4 — Seeded Ratio Splitter
// ============================================================
// Shuffles items with a seeded RNG and splits them into as many
// parts as there are ratios (percentages summing to 100):
//
//   split_by_ratio(utts, &[90, 10], 1234) → [train, dev]
//
// Sizes are floor(n * r / 100); the remainder goes to the first
// split. Every later split with a non-zero ratio receives at
// least one item while the first split still has two or more.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom over a
// StdRng seeded from `seed`, so the same seed always yields the
// same split.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

pub fn split_by_ratio<T>(mut items: Vec<T>, ratios: &[u32], seed: u64) -> Vec<Vec<T>> {
    if ratios.is_empty() {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total = items.len();
    let mut counts: Vec<usize> = ratios
        .iter()
        .map(|&r| total * r as usize / 100)
        .collect();
    let assigned: usize = counts.iter().sum();
    counts[0] += total - assigned.min(total);

    for i in 1..counts.len() {
        if ratios[i] > 0 && counts[i] == 0 && counts[0] > 1 {
            counts[0] -= 1;
            counts[i] += 1;
        }
    }

    let mut parts = Vec::with_capacity(counts.len());
    let mut rest  = items;
    for &n in &counts {
        let tail = rest.split_off(n.min(rest.len()));
        parts.push(rest);
        rest = tail;
    }

    tracing::debug!("Split {} items into {:?}", total, counts);
    parts
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let parts = split_by_ratio(items, &[90, 10], 1);
        assert_eq!(parts[0].len(), 90);
        assert_eq!(parts[1].len(), 10);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..53).collect();
        let parts = split_by_ratio(items, &[70, 20, 10], 3);
        let mut all: Vec<usize> = parts.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, (0..53).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_by_ratio((0..20).collect::<Vec<_>>(), &[90, 10], 1234);
        let b = split_by_ratio((0..20).collect::<Vec<_>>(), &[90, 10], 1234);
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_corpus_keeps_a_dev_item() {
        let parts = split_by_ratio((0..4).collect::<Vec<_>>(), &[90, 10], 1234);
        assert_eq!(parts[0].len(), 3);
        assert_eq!(parts[1].len(), 1);
    }

    #[test]
    fn test_empty_dataset() {
        let parts = split_by_ratio(Vec::<usize>::new(), &[90, 10], 0);
        assert!(parts.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_full_training_split() {
        let parts = split_by_ratio((0..10).collect::<Vec<_>>(), &[100, 0], 0);
        assert_eq!(parts[0].len(), 10);
        assert!(parts[1].is_empty());
    }
}
