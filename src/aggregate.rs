use ahash::RandomState;
use hashbrown::HashMap;

use crate::error::AggregateError;
use crate::reader::Batch;
use crate::record::parse_record;

/// Running `(min, max, sum, count)` for one key, all in exact tenths.
/// Invariants: `min <= max`, `count >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub min: i64,
    pub max: i64,
    pub sum: i64,
    pub count: u64,
}

impl Stats {
    #[inline]
    pub fn new(tenths: i64) -> Self {
        Self {
            min: tenths,
            max: tenths,
            sum: tenths,
            count: 1,
        }
    }

    #[inline]
    pub fn update(&mut self, tenths: i64) {
        self.min = self.min.min(tenths);
        self.max = self.max.max(tenths);
        self.sum += tenths;
        self.count += 1;
    }

    /// Associative, commutative combine of two per-key partials.
    #[inline]
    pub fn merge(&mut self, other: Stats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Per-key stats folded from a single batch. Owned by one worker until it
/// is handed to the merger, then never mutated again.
pub type PartialAggregate = HashMap<Box<str>, Stats, RandomState>;

/// Folds one batch into a fresh partial aggregate.
///
/// Fail-fast: the first malformed line aborts the whole batch and the
/// partially folded state is dropped.
pub fn fold_batch(batch: &Batch) -> Result<PartialAggregate, AggregateError> {
    let mut partial = PartialAggregate::default();
    for (line_no, line) in batch.lines() {
        match parse_record(line) {
            Ok(record) => {
                partial
                    .entry_ref(record.key)
                    .and_modify(|stats| stats.update(record.tenths))
                    .or_insert_with(|| Stats::new(record.tenths));
            }
            Err(kind) => {
                return Err(AggregateError::MalformedRecord {
                    line: line_no,
                    content: line.to_string(),
                    kind,
                })
            }
        }
    }
    Ok(partial)
}

/// Folds `partial` into `acc`, key by key. Keys absent on one side are
/// moved over from the other.
pub fn merge_partial(acc: &mut PartialAggregate, partial: PartialAggregate) {
    for (key, stats) in partial {
        acc.entry(key)
            .and_modify(|existing| existing.merge(stats))
            .or_insert(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MalformedKind;

    fn batch(first_line: u64, data: &str) -> Batch {
        Batch {
            first_line,
            data: data.to_string(),
        }
    }

    #[test]
    fn folds_min_max_sum_count() {
        let partial = fold_batch(&batch(1, "A;-10.0\nA;10.0\nA;0.0\nB;3.3\n")).unwrap();
        assert_eq!(
            partial["A"],
            Stats {
                min: -100,
                max: 100,
                sum: 0,
                count: 3
            }
        );
        assert_eq!(partial["B"], Stats::new(33));
    }

    #[test]
    fn empty_batch_folds_to_empty_partial() {
        assert!(fold_batch(&batch(1, "")).unwrap().is_empty());
    }

    #[test]
    fn fail_fast_reports_absolute_line_number() {
        let err = fold_batch(&batch(40, "A;1.0\nonlykey\nB;2.0\n")).unwrap_err();
        match err {
            AggregateError::MalformedRecord {
                line,
                content,
                kind,
            } => {
                assert_eq!(line, 41);
                assert_eq!(content, "onlykey");
                assert_eq!(kind, MalformedKind::MissingSeparator);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_moves_missing_keys_and_combines_shared_ones() {
        let mut acc = fold_batch(&batch(1, "A;1.0\nB;2.0\n")).unwrap();
        let other = fold_batch(&batch(3, "B;-4.0\nC;5.0\n")).unwrap();
        merge_partial(&mut acc, other);

        assert_eq!(acc["A"], Stats::new(10));
        assert_eq!(
            acc["B"],
            Stats {
                min: -40,
                max: 20,
                sum: -20,
                count: 2
            }
        );
        assert_eq!(acc["C"], Stats::new(50));
    }

    #[test]
    fn merge_is_associative_and_commutative() {
        let lines = [
            "A;1.5\n", "B;-2.0\n", "A;7.0\n", "C;0.0\n", "B;9.9\n", "A;-3.3\n",
        ];
        let parts: Vec<PartialAggregate> = lines
            .iter()
            .enumerate()
            .map(|(i, l)| fold_batch(&batch(i as u64 + 1, l)).unwrap())
            .collect();

        // one big batch is the reference
        let reference = fold_batch(&batch(1, &lines.concat())).unwrap();

        // left fold in input order
        let mut left = PartialAggregate::default();
        for p in parts.clone() {
            merge_partial(&mut left, p);
        }
        assert_eq!(left, reference);

        // reversed order, pairwise grouping
        let mut right = PartialAggregate::default();
        for pair in parts.clone().chunks(2).rev() {
            let mut group = PartialAggregate::default();
            for p in pair.iter().rev() {
                merge_partial(&mut group, p.clone());
            }
            merge_partial(&mut right, group);
        }
        assert_eq!(right, reference);
    }
}
