//! Cross-checks `SkipList` against a naive `Vec`-based reference model.

use proptest::prelude::*;
use reassembly_skiplist::{Range, SkipList, rand_level, Rnd};

/// Turns a set of non-negative gaps between consecutive points into disjoint, ascending ranges.
fn disjoint_ranges(gaps: &[u16]) -> Vec<Range> {
    let mut begin = 0_u64;
    let mut ranges = Vec::new();
    for &gap in gaps {
        let len = u64::from(gap) + 1; // never zero-length, so every range is distinct
        let end = begin + len;
        ranges.push(Range::new(begin, end));
        begin = end + 1; // leave a one-offset hole so ranges never touch
    }
    ranges
}

fn reference_lower_bound(ranges: &[Range], query: Range) -> Option<Range> {
    ranges
        .iter()
        .copied()
        .find(|r| r.begin >= query.begin || r.intersects(query))
}

proptest! {
    #[test]
    fn lower_bound_matches_a_linear_scan(
        gaps in prop::collection::vec(0_u16..50, 0..80),
        seed in any::<[u16; 3]>(),
        query_begin in 0_u64..5000,
        query_len in 0_u64..200,
    ) {
        let ranges = disjoint_ranges(&gaps);
        let mut rnd = Rnd::new(seed);
        let mut list: SkipList<()> = SkipList::new(10);

        for &range in &ranges {
            let level = rand_level(&mut rnd, 10);
            list.insert(range, (), level).unwrap();
        }

        let in_order: Vec<Range> = list.iter().map(|(r, _)| r).collect();
        prop_assert_eq!(&in_order, &ranges);

        let query = Range::new(query_begin, query_begin + query_len);
        let expected = reference_lower_bound(&ranges, query);
        let found = list.lower_bound(query).node.map(|id| list.range(id));
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn removing_every_node_empties_the_list(
        gaps in prop::collection::vec(0_u16..50, 1..40),
        seed in any::<[u16; 3]>(),
    ) {
        let ranges = disjoint_ranges(&gaps);
        let mut rnd = Rnd::new(seed);
        let mut list: SkipList<()> = SkipList::new(10);

        for &range in &ranges {
            let level = rand_level(&mut rnd, 10);
            list.insert(range, (), level).unwrap();
        }

        for _ in 0..ranges.len() {
            prop_assert!(list.pop_front().is_some());
        }
        prop_assert!(list.front().is_none());
    }
}
