use std::io::{self, BufRead};

/// A line-aligned run of raw input, plus the 1-based number of its first
/// line. No record ever spans two batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub first_line: u64,
    pub data: String,
}

impl Batch {
    /// Iterates the complete lines of this batch with their absolute
    /// input line numbers.
    pub fn lines(&self) -> impl Iterator<Item = (u64, &str)> {
        self.data
            .lines()
            .enumerate()
            .map(|(offset, line)| (self.first_line + offset as u64, line))
    }
}

/// Splits a byte stream into batches of up to `batch_size` whole lines.
///
/// Lazy, finite, non-restartable: the stream is consumed sequentially and
/// each line lands in exactly one batch, in original order. An I/O error
/// ends iteration after being yielded once.
pub struct BatchReader<R> {
    inner: R,
    batch_size: usize,
    next_line: u64,
    done: bool,
}

impl<R: BufRead> BatchReader<R> {
    pub fn new(inner: R, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            next_line: 1,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for BatchReader<R> {
    type Item = io::Result<Batch>;

    fn next(&mut self) -> Option<io::Result<Batch>> {
        if self.done {
            return None;
        }
        let first_line = self.next_line;
        let mut data = String::new();
        let mut records = 0usize;
        while records < self.batch_size {
            // read_line keeps the trailing `\n`, so `data` stays a plain
            // concatenation of whole lines; a final unterminated line
            // still counts as a record
            match self.inner.read_line(&mut data) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => records += 1,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        if records == 0 {
            return None;
        }
        self.next_line += records as u64;
        Some(Ok(Batch { first_line, data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn batches(input: &str, batch_size: usize) -> Vec<Batch> {
        BatchReader::new(Cursor::new(input.to_string()), batch_size)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn batches_are_line_aligned_and_numbered() {
        let got = batches("a;1.0\nb;2.0\nc;3.0\nd;4.0\ne;5.0\n", 2);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].first_line, 1);
        assert_eq!(got[0].data, "a;1.0\nb;2.0\n");
        assert_eq!(got[1].first_line, 3);
        assert_eq!(got[2].first_line, 5);
        assert_eq!(got[2].data, "e;5.0\n");
    }

    #[test]
    fn final_unterminated_line_is_a_record() {
        let got = batches("a;1.0\nb;2.0", 10);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].lines().count(), 2);
        assert_eq!(got[0].lines().last(), Some((2, "b;2.0")));
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(batches("", 8).is_empty());
    }

    #[test]
    fn every_line_appears_exactly_once_in_order() {
        let input: String = (1..=17).map(|i| format!("k{i};0.{}\n", i % 10)).collect();
        for batch_size in [1, 2, 3, 16, 17, 100] {
            let joined: String = batches(&input, batch_size)
                .iter()
                .map(|b| b.data.as_str())
                .collect();
            assert_eq!(joined, input);
        }
    }

    #[test]
    fn batch_line_numbers_are_absolute() {
        let got = batches("a;1.0\nb;2.0\nc;3.0\n", 2);
        let numbered: Vec<(u64, String)> = got
            .iter()
            .flat_map(|b| b.lines().map(|(n, l)| (n, l.to_string())))
            .collect();
        assert_eq!(
            numbered,
            vec![
                (1, "a;1.0".to_string()),
                (2, "b;2.0".to_string()),
                (3, "c;3.0".to_string()),
            ]
        );
    }
}
