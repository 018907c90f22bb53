//! Bounded draining for hardware that must be spun on briefly.

/// Outcome of a bounded poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bounded<T> {
    /// Finished with a value after this many steps
    Done(T, usize),

    /// The cap was reached before finishing
    Exhausted(usize),
}

impl<T> Bounded<T> {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    pub fn attempts(&self) -> usize {
        match self {
            Self::Done(_, n) | Self::Exhausted(n) => *n,
        }
    }
}

/// Call `step` while it returns `true`, at most `cap` times.
///
/// Returns `Done((), n)` with the number of steps that returned `true`
/// if `step` signalled completion by returning `false` within the cap,
/// or `Exhausted(cap)` if it was still returning `true` at the cap.
pub fn bounded_drain(cap: usize, mut step: impl FnMut() -> bool) -> Bounded<()> {
    let mut n = 0;
    while n < cap {
        if !step() {
            return Bounded::Done((), n);
        }
        n += 1;
    }
    Bounded::Exhausted(cap)
}
