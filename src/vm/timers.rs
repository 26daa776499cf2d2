/// The two 8-bit countdown timers. Both decrement at 60 Hz, independent of
/// the instruction rate, and stop at zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timers {
    pub(crate) delay: u8,
    pub(crate) sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self { delay: 0, sound: 0 }
    }

    /// One 60 Hz tick.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// True while the beep should play.
    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn sound(&self) -> u8 {
        self.sound
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counts_down_to_zero_and_stays_there() {
        let mut timers = Timers::new();
        timers.delay = 2;

        timers.tick();
        assert_eq!(timers.delay(), 1);
        timers.tick();
        assert_eq!(timers.delay(), 0);
        timers.tick();
        assert_eq!(timers.delay(), 0);
    }

    #[test]
    fn sound_is_active_until_the_counter_expires() {
        let mut timers = Timers::new();
        assert!(!timers.sound_active());

        timers.sound = 3;
        for _ in 0..3 {
            assert!(timers.sound_active());
            timers.tick();
        }
        assert!(!timers.sound_active());
    }

    #[test]
    fn timer_reaches_zero_after_exactly_its_initial_value_in_ticks() {
        let mut timers = Timers::new();
        timers.delay = 60;

        for _ in 0..59 {
            timers.tick();
        }
        assert_ne!(timers.delay(), 0);
        timers.tick();
        assert_eq!(timers.delay(), 0);
    }
}
