use std::ops::{Index, IndexMut};

/// A 4-bit unsigned integer (nibble).
///
/// Used wherever an instruction field selects one of the 16 registers or
/// keys, so an out-of-range index is unrepresentable past the constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

/// A 12-bit unsigned integer (machine address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub struct u12(u16);

impl u12 {
    /// Creates a new `u12` from a `u16`.
    ///
    /// Panics if the value is greater than 0xFFF.
    pub const fn new(value: u16) -> Self {
        assert!(value <= 0x0FFF, "u12 value must be in range 0x000-0xFFF");
        Self(value)
    }

    /// Fallible constructor for values coming from user input.
    pub const fn try_new(value: u16) -> Option<Self> {
        if value <= 0x0FFF { Some(Self(value)) } else { None }
    }

    pub const fn value(self) -> u16 {
        self.0
    }
}

impl From<u12> for usize {
    fn from(v: u12) -> usize {
        v.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u4_round_trips_in_range_values() {
        for value in 0x0..=0xF {
            assert_eq!(u4::new(value).value(), value);
        }
    }

    #[test]
    #[should_panic]
    fn u4_rejects_out_of_range_values() {
        u4::new(0x10);
    }

    #[test]
    fn u4_indexes_sixteen_element_arrays() {
        let mut array = [0u8; 16];
        array[u4::new(0xF)] = 42;
        assert_eq!(array[u4::new(0xF)], 42);
        assert_eq!(array[u4::new(0x0)], 0);
    }

    #[test]
    fn u12_try_new_accepts_addresses_only() {
        assert_eq!(u12::try_new(0x0FFF), Some(u12::new(0x0FFF)));
        assert_eq!(u12::try_new(0x1000), None);
    }
}
