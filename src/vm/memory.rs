use super::MachineError;
use super::font::{FONT, FONT_END_ADDRESS, FONT_START_ADDRESS};

pub const MEMORY_SIZE: usize = 4096;

/// The 4 KiB address space. Every access is bounds checked; no program can
/// make the host panic through it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Zeroed memory with the font installed.
    pub fn new() -> Self {
        let mut bytes = [0; MEMORY_SIZE];
        bytes[FONT_START_ADDRESS as usize..FONT_END_ADDRESS as usize].copy_from_slice(&FONT);
        Self { bytes }
    }

    pub fn read(&self, addr: u16) -> Result<u8, MachineError> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(MachineError::MemoryFault { address: addr })
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), MachineError> {
        *self
            .bytes
            .get_mut(addr as usize)
            .ok_or(MachineError::MemoryFault { address: addr })? = value;
        Ok(())
    }

    /// Borrows `len` bytes starting at `addr`, validating the whole range
    /// up front.
    pub fn read_block(&self, addr: u16, len: usize) -> Result<&[u8], MachineError> {
        let start = addr as usize;
        self.bytes
            .get(start..start + len)
            .ok_or(MachineError::MemoryFault {
                address: fault_address(start),
            })
    }

    /// Copies `data` into memory at `addr`, validating the whole range
    /// before any byte is written.
    pub fn write_block(&mut self, addr: u16, data: &[u8]) -> Result<(), MachineError> {
        let start = addr as usize;
        self.bytes
            .get_mut(start..start + data.len())
            .ok_or(MachineError::MemoryFault {
                address: fault_address(start),
            })?
            .copy_from_slice(data);
        Ok(())
    }

    /// Clamped borrow for inspection tools; never faults.
    pub fn view(&self, addr: u16, len: usize) -> &[u8] {
        let start = (addr as usize).min(MEMORY_SIZE);
        let end = (start + len).min(MEMORY_SIZE);
        &self.bytes[start..end]
    }
}

/// First address of a failed range access: the base itself when it is
/// already out of bounds, otherwise the first byte past the end.
fn fault_address(start: usize) -> u16 {
    start.max(MEMORY_SIZE) as u16
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_memory_contains_the_font() {
        let memory = Memory::new();
        // Glyph for 0 sits at the base address
        assert_eq!(memory.read(FONT_START_ADDRESS).unwrap(), 0xF0);
        assert_eq!(
            memory.read_block(FONT_START_ADDRESS, FONT.len()).unwrap(),
            &FONT
        );
        assert_eq!(memory.read(0x200).unwrap(), 0);
    }

    #[test]
    fn single_byte_access_is_bounds_checked() {
        let mut memory = Memory::new();
        assert!(memory.write(4095, 0xAB).is_ok());
        assert_eq!(memory.read(4095).unwrap(), 0xAB);

        assert!(matches!(
            memory.read(4096),
            Err(MachineError::MemoryFault { address: 4096 })
        ));
        assert!(matches!(
            memory.write(4096, 0),
            Err(MachineError::MemoryFault { address: 4096 })
        ));
    }

    #[test]
    fn block_read_reports_first_faulting_address() {
        let memory = Memory::new();
        // Straddles the end of memory, 4096 is the first bad byte
        assert!(matches!(
            memory.read_block(4095, 2),
            Err(MachineError::MemoryFault { address: 4096 })
        ));
        // Entirely out of range, the base itself is bad
        assert!(matches!(
            memory.read_block(5000, 2),
            Err(MachineError::MemoryFault { address: 5000 })
        ));
    }

    #[test]
    fn failed_block_write_leaves_memory_untouched() {
        let mut memory = Memory::new();
        assert!(memory.write_block(4094, &[1, 2, 3]).is_err());
        assert_eq!(memory.read(4094).unwrap(), 0);
        assert_eq!(memory.read(4095).unwrap(), 0);
    }

    #[test]
    fn block_round_trip() {
        let mut memory = Memory::new();
        memory.write_block(0x300, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(
            memory.read_block(0x300, 4).unwrap(),
            &[0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn view_clamps_instead_of_faulting() {
        let memory = Memory::new();
        assert_eq!(memory.view(4090, 100).len(), 6);
        assert_eq!(memory.view(5000, 4), &[] as &[u8]);
        assert_eq!(memory.view(0, 16).len(), 16);
    }
}
