use hypernav_shared::{SIDE_COUNT, Side};

/// Tracks when every participating side has reached `Idle`.
///
/// Sides that are not enabled for the session are treated as permanently
/// idle, so a one-sided session rendezvouses on its single side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdleRendezvous {
    participating: [bool; SIDE_COUNT],
    idle: [bool; SIDE_COUNT],
}

impl IdleRendezvous {
    pub fn new(participating: [bool; SIDE_COUNT]) -> Self {
        Self {
            participating,
            idle: [true; SIDE_COUNT],
        }
    }

    /// Mark every participating side busy
    pub fn arm(&mut self) {
        for i in 0..SIDE_COUNT {
            self.idle[i] = !self.participating[i];
        }
    }

    pub fn report(&mut self, side: Side, idle: bool) {
        let i = side.index();
        if i < SIDE_COUNT {
            self.idle[i] = idle || !self.participating[i];
        }
    }

    pub fn is_participating(&self, side: Side) -> bool {
        self.participating.get(side.index()).copied().unwrap_or(false)
    }

    pub fn all_idle(&self) -> bool {
        self.idle.iter().all(|&x| x)
    }
}
