//! Row buffer between fetching and emission

use crate::types::TableRow;

/// Buffers mapped rows until the batch size is reached
#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    batch_size: usize,
    buffer: Vec<TableRow>,
}

impl BatchAccumulator {
    /// Create an empty buffer flushing at `batch_size` rows
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size),
        }
    }

    /// Append rows
    pub fn add(&mut self, rows: impl IntoIterator<Item = TableRow>) {
        self.buffer.extend(rows);
    }

    /// Whether the buffer reached the batch size
    pub fn should_flush(&self) -> bool {
        self.buffer.len() >= self.batch_size
    }

    /// Take every buffered row, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<TableRow> {
        std::mem::take(&mut self.buffer)
    }

    /// Buffered rows
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Flush threshold
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputRow;

    fn rows(n: usize) -> Vec<TableRow> {
        (0..n).map(|_| TableRow::new("gifts", OutputRow::new())).collect()
    }

    #[test]
    fn test_should_flush_at_threshold() {
        let mut batch = BatchAccumulator::new(3);
        batch.add(rows(2));
        assert!(!batch.should_flush());

        batch.add(rows(1));
        assert!(batch.should_flush());

        batch.add(rows(2));
        assert!(batch.should_flush());
        assert_eq!(batch.len(), 5);
    }

    #[test]
    fn test_drain_empties_buffer() {
        let mut batch = BatchAccumulator::new(10);
        batch.add(rows(4));

        assert_eq!(batch.drain().len(), 4);
        assert!(batch.is_empty());
        assert!(batch.drain().is_empty());
    }

    #[test]
    fn test_zero_batch_size_flushes_every_row() {
        let mut batch = BatchAccumulator::new(0);
        assert_eq!(batch.batch_size(), 1);
        batch.add(rows(1));
        assert!(batch.should_flush());
    }
}
