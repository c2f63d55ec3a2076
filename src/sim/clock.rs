/// Interval counter of a simulation run.
///
/// Hands out interval indices `0..total` in order, each exactly once.
///
/// # Examples
///
/// ```
/// use smooth_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// assert_eq!(clock.tick(), Some(0));
/// assert_eq!(clock.remaining(), 2);
///
/// let mut rest = Vec::new();
/// clock.run(|i| rest.push(i));
/// assert_eq!(rest, vec![1, 2]);
/// assert!(clock.is_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock {
    /// Next interval to hand out
    next: usize,
    /// Number of intervals in the run
    total: usize,
}

impl Clock {
    /// Creates a clock for a run of `total` intervals.
    pub fn new(total: usize) -> Self {
        Self { next: 0, total }
    }

    /// Advances to the next interval.
    ///
    /// # Returns
    ///
    /// * `Some(i)` - The interval to simulate now
    /// * `None` - If every interval has been handed out
    pub fn tick(&mut self) -> Option<usize> {
        if self.next < self.total {
            let interval = self.next;
            self.next += 1;
            Some(interval)
        } else {
            None
        }
    }

    /// The interval the next [`tick`](Self::tick) hands out, without
    /// advancing.
    pub fn peek(&self) -> Option<usize> {
        (self.next < self.total).then_some(self.next)
    }

    pub fn remaining(&self) -> usize {
        self.total - self.next
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.total
    }

    /// Calls `f` for every remaining interval.
    pub fn run(&mut self, mut f: impl FnMut(usize)) {
        while let Some(interval) = self.tick() {
            f(interval);
        }
    }
}
