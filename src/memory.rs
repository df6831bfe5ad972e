// Copyright (C) 2014 The 6502-rs Developers
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions
// are met:
// 1. Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
// 2. Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
// 3. Neither the names of the copyright holders nor the names of any
//    contributors may be used to endorse or promote products derived from this
//    software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
// ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE
// LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR
// CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF
// SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS
// INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN
// CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE)
// ARISING IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
// POSSIBILITY OF SUCH DAMAGE.

use bitflags::bitflags;

pub const STACK_ADDRESS_LO: u16 = 0x0100;
pub const STACK_ADDRESS_HI: u16 = 0x01FF;

/// NMI vector, little-endian pointer at $FFFA/$FFFB.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector, little-endian pointer at $FFFC/$FFFD.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ and BRK vector, little-endian pointer at $FFFE/$FFFF.
pub const IRQ_VECTOR: u16 = 0xFFFE;

bitflags! {
    /// Pending interrupt sources.
    ///
    /// The bus reports these from [`Bus::clock`]; the CPU keeps them latched
    /// until the corresponding service routine is entered. NMI outranks IRQ,
    /// and a latched IRQ is held (not dropped) while the I flag masks it.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct Interrupts: u8 {
        const IRQ = 1 << 0;
        const NMI = 1 << 1;
    }
}

/// The memory bus capability the CPU executes against.
///
/// The core never keeps a shadow copy of memory and never batches accesses:
/// every operand load and store goes through `get_byte`/`set_byte`, one call
/// per bus tick. Reads may have peripheral-side effects, so the core never
/// reads an address it would not read on real hardware.
pub trait Bus {
    fn get_byte(&mut self, address: u16) -> u8;

    fn set_byte(&mut self, address: u16, value: u8);

    /// Advance bus-side peripherals by `cycles` ticks.
    ///
    /// Called exactly once at the end of every [`CPU::step`], after all of
    /// that step's reads and writes. Returns whatever interrupt edges the
    /// peripherals raised during the window; the CPU latches them and
    /// honours them at the next step.
    ///
    /// [`CPU::step`]: crate::cpu::CPU::step
    fn clock(&mut self, cycles: u32) -> Interrupts {
        let _ = cycles;
        Interrupts::empty()
    }

    /// Bulk store, used by hosts and tests to preload programs. Not metered
    /// and not part of the CPU's execution contract.
    fn set_bytes(&mut self, start: u16, values: &[u8]) {
        for (offset, &value) in values.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            self.set_byte(start.wrapping_add(offset as u16), value);
        }
    }
}

const MEMORY_SIZE: usize = 0x1_0000;

/// A flat 64 KiB of RAM with no attached peripherals.
///
/// Suitable for tests and simple hosts; its `clock` never raises an
/// interrupt.
#[derive(Clone)]
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    #[must_use]
    pub const fn new() -> Memory {
        Memory {
            bytes: [0; MEMORY_SIZE],
        }
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}

impl core::fmt::Debug for Memory {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "Memory {{ 64 KiB }}")
    }
}

impl Bus for Memory {
    fn get_byte(&mut self, address: u16) -> u8 {
        self.bytes[address as usize]
    }

    fn set_byte(&mut self, address: u16, value: u8) {
        self.bytes[address as usize] = value;
    }

    fn set_bytes(&mut self, start: u16, values: &[u8]) {
        let start = start as usize;
        let end = start + values.len();
        self.bytes[start..end].copy_from_slice(values);
    }
}
