/// Per-slot cooldown for relay broadcasts.
///
/// A slot may fire at most once per `cooldown` rounds, however often it is asked.
#[derive(Debug, Clone)]
pub struct RelayLimiter {
    cooldown: u32,
    last: Vec<Option<u32>>,
}

impl RelayLimiter {
    pub fn new(slots: usize, cooldown: u32) -> Self {
        Self {
            cooldown,
            last: vec![None; slots],
        }
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn ready(&self, slot: usize, round: u32) -> bool {
        match self.last.get(slot) {
            Some(Some(last)) => round >= last.saturating_add(self.cooldown),
            Some(None) => true,
            None => false,
        }
    }

    /// Claims the window for `slot` if it is open. Returns whether the caller may broadcast.
    pub fn try_acquire(&mut self, slot: usize, round: u32) -> bool {
        if !self.ready(slot, round) {
            return false;
        }
        self.last[slot] = Some(round);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_acquire_per_window() {
        let mut limiter = RelayLimiter::new(4, 100);
        assert!(limiter.try_acquire(2, 5));
        assert!(!limiter.try_acquire(2, 5));
        assert!(!limiter.try_acquire(2, 104));
        assert!(limiter.try_acquire(2, 105));
        assert!(limiter.try_acquire(1, 6));
    }

    #[test]
    fn unknown_slots_never_fire() {
        let mut limiter = RelayLimiter::new(2, 10);
        assert!(!limiter.try_acquire(7, 0));
    }
}
