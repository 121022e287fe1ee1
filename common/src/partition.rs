//! Static striding of a listing across a fixed number of workers
//!
//! Worker `i` of `n` owns the indices `i, i + n, i + 2n, ...` of the listing. Every worker walks
//! its own stride by simple addition, so there is no shared cursor and nothing to synchronize.
//! The assignment balances entry counts, not bytes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("number of workers must be at least 1")]
    NoWorkers,
}

/// Iterator over the listing indices owned by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stride {
    next: usize,
    step: usize,
    len: usize,
}

impl Stride {
    /// Indices owned by `worker` when `len` entries are striped over `workers` workers.
    ///
    /// Returns [`Error::NoWorkers`] when `workers` is 0.
    pub fn new(worker: usize, workers: usize, len: usize) -> Result<Self, Error> {
        if workers == 0 {
            return Err(Error::NoWorkers);
        }
        Ok(Self {
            next: worker,
            step: workers,
            len,
        })
    }
}

impl Iterator for Stride {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.len {
            return None;
        }
        let idx = self.next;
        // saturate so a huge step can't wrap around back into range
        self.next = self.next.saturating_add(self.step);
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next >= self.len {
            0
        } else {
            (self.len - self.next - 1) / self.step + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Stride {}

/// Split `len` entries into one [`Stride`] per worker.
pub fn partition(len: usize, workers: usize) -> Result<Vec<Stride>, Error> {
    if workers == 0 {
        return Err(Error::NoWorkers);
    }
    (0..workers)
        .map(|worker| Stride::new(worker, workers, len))
        .collect()
}
