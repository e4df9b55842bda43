use dao_period::Cycle;
use dao_types::Phase;
use proptest::prelude::*;

fn durations() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..50, 8).prop_filter("non-empty cycle", |d| d.iter().any(|x| *x > 0))
}

fn cycle(first: u64, d: &[u64]) -> Cycle {
    Cycle::from_durations(first, |p| if p == Phase::Undefined { 0 } else { d[p as usize - 1] }).unwrap()
}

proptest! {
    #[test]
    fn every_height_has_exactly_one_phase(first in 0u64..1_000_000, d in durations()) {
        let c = cycle(first, &d);
        for h in c.height_of_first_block()..=c.height_of_last_block() {
            let phase = c.phase_for_height(h).unwrap();
            let hits = Phase::ALL
                .iter()
                .filter(|p| c.phase_range(**p).is_some_and(|r| r.contains(&h)))
                .count();
            prop_assert_eq!(hits, 1);
            prop_assert!(c.phase_range(phase).unwrap().contains(&h));
        }
        prop_assert!(c.phase_for_height(c.height_of_last_block() + 1).is_none());
    }

    #[test]
    fn phase_ranges_are_contiguous(first in 0u64..1_000_000, d in durations()) {
        let c = cycle(first, &d);
        let ranges: Vec<_> = Phase::ALL.iter().filter_map(|p| c.phase_range(*p)).collect();
        prop_assert_eq!(*ranges[0].start(), c.height_of_first_block());
        prop_assert_eq!(*ranges[ranges.len() - 1].end(), c.height_of_last_block());
        for pair in ranges.windows(2) {
            prop_assert_eq!(*pair[0].end() + 1, *pair[1].start());
        }
    }
}
