//! In-memory register transport used across the crate's unit tests.

use crate::hal::{RegisterTransport, TransportError};
use crate::types::{C_REG_COMMAND_WINDOW, command_window};
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

/// A fake register space with optional scripted reads of the command-window
/// status and payload registers.
#[derive(Debug)]
pub(crate) struct MockTransport {
    registers: BTreeMap<u16, [u8; 2]>,
    status_script: VecDeque<u16>,
    payload_script: VecDeque<u16>,
    /// Every `write_registers` call, in order.
    pub writes: Vec<(u16, Vec<u8>)>,
    /// Number of reads of the command/status register.
    pub status_reads: u32,
    /// Number of reads of the first payload register.
    pub payload_reads: u32,
    /// When set, every transport call fails.
    pub fail: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            registers: BTreeMap::new(),
            status_script: VecDeque::new(),
            payload_script: VecDeque::new(),
            writes: Vec::new(),
            status_reads: 0,
            payload_reads: 0,
            fail: false,
        }
    }

    pub fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value.to_be_bytes());
    }

    pub fn set_register_bytes(&mut self, address: u16, data: &[u8]) {
        for (i, chunk) in data.chunks(2).enumerate() {
            let mut reg = [0u8; 2];
            reg[..chunk.len()].copy_from_slice(chunk);
            self.registers.insert(address + i as u16, reg);
        }
    }

    pub fn register(&self, address: u16) -> u16 {
        let bytes = self.registers.get(&address).copied().unwrap_or_default();
        u16::from_be_bytes(bytes)
    }

    /// Values returned by successive reads of the status register; once the
    /// script is exhausted, reads fall back to the stored register value
    /// (i.e. the echoed command code).
    pub fn script_status(&mut self, statuses: &[u16]) {
        self.status_script.extend(statuses.iter().copied());
    }

    /// Values returned by successive reads of the first payload register.
    pub fn script_payload(&mut self, values: &[u16]) {
        self.payload_script.extend(values.iter().copied());
    }

    fn register_bytes(&mut self, address: u16) -> [u8; 2] {
        if address == C_REG_COMMAND_WINDOW + command_window::COMMAND {
            self.status_reads += 1;
            if let Some(status) = self.status_script.pop_front() {
                self.registers.insert(address, status.to_be_bytes());
            }
        }
        if address == C_REG_COMMAND_WINDOW + command_window::PAYLOAD {
            self.payload_reads += 1;
            if let Some(value) = self.payload_script.pop_front() {
                self.registers.insert(address, value.to_be_bytes());
            }
        }
        self.registers.get(&address).copied().unwrap_or_default()
    }
}

impl RegisterTransport for MockTransport {
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        if self.fail {
            return Err(TransportError::Io);
        }
        let mut out = Vec::with_capacity(count as usize * 2);
        for i in 0..count {
            out.extend_from_slice(&self.register_bytes(address + i));
        }
        Ok(out)
    }

    fn write_registers(&mut self, address: u16, data: &[u8]) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Io);
        }
        if data.len() % 2 != 0 {
            return Err(TransportError::InvalidResponse("odd byte count"));
        }
        self.set_register_bytes(address, data);
        self.writes.push((address, data.to_vec()));
        Ok(())
    }
}
