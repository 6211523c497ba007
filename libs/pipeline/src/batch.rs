use lpwrite_api::{Batch, Record};

/// Groups consecutive records into batches bounded by record count and size.
///
/// The open batch is closed when:
/// - appending the next record would push it past `max_bytes`;
/// - it holds `max_records` records;
/// - it reaches `max_bytes` on its own (this is how a single record larger
///   than `max_bytes` ends up alone in an oversized batch).
///
/// Records are never reordered, split, or rejected for size.
pub struct BatchBuilder {
    open: Batch,
    max_records: usize,
    max_bytes: usize,
}

impl BatchBuilder {
    /// Both limits are clamped to at least 1.
    pub fn new(max_records: usize, max_bytes: usize) -> Self {
        let max_records = max_records.max(1);
        Self {
            open: Batch::with_capacity(max_records.min(1024)),
            max_records,
            max_bytes: max_bytes.max(1),
        }
    }

    /// Добавить запись. Возвращает закрытый batch, если он готов к отправке.
    pub fn push(&mut self, record: Record) -> Option<Batch> {
        let mut closed = None;

        if !self.open.is_empty()
            && (self.open.len() >= self.max_records
                || self.open.size() + record.len() > self.max_bytes)
        {
            closed = Some(self.take_open());
        }

        self.open.push(record);

        if closed.is_none()
            && (self.open.len() >= self.max_records || self.open.size() >= self.max_bytes)
        {
            closed = Some(self.take_open());
        }
        closed
    }

    /// Close the open batch early (time-based flush). `None` if it is empty.
    pub fn take(&mut self) -> Option<Batch> {
        if self.open.is_empty() {
            None
        } else {
            Some(self.take_open())
        }
    }

    /// End of stream: the final partial batch, if any.
    pub fn finish(mut self) -> Option<Batch> {
        self.take()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Records currently held in the open batch.
    pub fn pending(&self) -> usize {
        self.open.len()
    }

    fn take_open(&mut self) -> Batch {
        std::mem::replace(&mut self.open, Batch::with_capacity(self.max_records.min(1024)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batches(records: Vec<Record>, max_records: usize, max_bytes: usize) -> std::vec::IntoIter<Batch> {
        let mut builder = BatchBuilder::new(max_records, max_bytes);
        let mut out: Vec<Batch> = records.into_iter().filter_map(|r| builder.push(r)).collect();
        out.extend(builder.finish());
        out.into_iter()
    }

    fn records(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|l| Record::from(*l)).collect()
    }

    fn lines(batch: &Batch) -> Vec<String> {
        batch
            .records()
            .iter()
            .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned())
            .collect()
    }

    #[test]
    fn everything_fits_in_one_batch() {
        let input = records(&["a v=1 1\n", "b v=2 2\n", "c v=3 3\n"]);
        let out: Vec<Batch> = batches(input, 10, 1000).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(lines(&out[0]), vec!["a v=1 1\n", "b v=2 2\n", "c v=3 3\n"]);
    }

    #[test]
    fn one_record_per_batch_keeps_order() {
        let input = records(&["m,tag=a v=1 1\n", "m,tag=b v=2 2\n"]);
        let out: Vec<Batch> = batches(input, 1, 1000).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(lines(&out[0]), vec!["m,tag=a v=1 1\n"]);
        assert_eq!(lines(&out[1]), vec!["m,tag=b v=2 2\n"]);
    }

    #[test]
    fn closes_before_exceeding_max_bytes() {
        // 6 bytes each, limit 13: two fit, the third starts a new batch.
        let input = records(&["a v=1\n", "b v=2\n", "c v=3\n", "d v=4\n"]);
        let out: Vec<Batch> = batches(input, 100, 13).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 2);
        assert_eq!(out[1].len(), 2);
        assert!(out.iter().all(|b| b.size() <= 13));
    }

    #[test]
    fn oversized_record_travels_alone() {
        let big = format!("big v=\"{}\"\n", "x".repeat(64));
        let input = vec![Record::from("a v=1\n"), Record::from(big.as_str()), Record::from("b v=2\n")];
        let out: Vec<Batch> = batches(input, 100, 16).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(lines(&out[0]), vec!["a v=1\n"]);
        assert_eq!(lines(&out[1]), vec![big.clone()]);
        assert_eq!(lines(&out[2]), vec!["b v=2\n"]);
    }

    #[test]
    fn single_oversized_record_is_one_batch() {
        let big = "x".repeat(100);
        let out: Vec<Batch> = batches(vec![Record::from(big.as_str())], 10, 10).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].size(), 100);
    }

    #[test]
    fn empty_input_produces_no_batches() {
        assert_eq!(batches(Vec::new(), 10, 10).count(), 0);
    }

    #[test]
    fn concatenation_reproduces_input() {
        let input = "cpu,host=a usage=1 1\ncpu,host=b usage=2 2\r\n\nmem free=3i 3\ndisk used=4";
        let recs: Vec<Record> = input
            .split_inclusive('\n')
            .map(Record::from)
            .collect();

        for (max_records, max_bytes) in [(1, 1), (2, 30), (3, 1000), (100, 5)] {
            let out: Vec<Batch> = batches(recs.clone(), max_records, max_bytes).collect();
            assert!(out.iter().all(|b| !b.is_empty()));
            assert!(out.iter().all(|b| b.len() <= max_records));
            let joined: Vec<u8> = out.iter().flat_map(|b| b.body()).collect();
            assert_eq!(joined, input.as_bytes());
        }
    }

    #[test]
    fn take_flushes_open_batch_early() {
        let mut builder = BatchBuilder::new(10, 1000);
        assert!(builder.take().is_none());
        assert!(builder.push(Record::from("a v=1\n")).is_none());
        assert_eq!(builder.pending(), 1);

        let early = builder.take().unwrap();
        assert_eq!(early.len(), 1);
        assert!(builder.is_empty());
        assert!(builder.finish().is_none());
    }

    #[test]
    fn zero_limits_are_clamped() {
        let out: Vec<Batch> = batches(records(&["a\n", "b\n"]), 0, 0).collect();
        assert_eq!(out.len(), 2);
    }
}
