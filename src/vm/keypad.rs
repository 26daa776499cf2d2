use crate::u4;

/// State of the 16-key hex keypad (true = held down).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; 16],
}

impl Keypad {
    pub fn new() -> Self {
        Self { keys: [false; 16] }
    }

    pub fn set(&mut self, key: u4, pressed: bool) {
        self.keys[key] = pressed;
    }

    pub fn is_pressed(&self, key: u4) -> bool {
        self.keys[key]
    }

    /// Copy of the current key levels, used as the reference point for
    /// edge detection.
    pub fn snapshot(&self) -> [bool; 16] {
        self.keys
    }

    /// Lowest key that is down now but was up in `before`, if any. A key
    /// already held in `before` is not an edge.
    pub fn newly_pressed(&self, before: &[bool; 16]) -> Option<u4> {
        (0..16)
            .map(u4::new)
            .find(|&key| self.keys[key] && !before[key])
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}
