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

//! ## Cycle accounting
//!
//! Every bus read and every bus write costs exactly one tick, metered in the
//! private `read_byte`/`write_byte` helpers; nothing else is counted. The
//! 65C02's page-cross and branch-taken penalty cycles are not modelled. The
//! count accumulated while an instruction (or interrupt entry) executes is
//! what [`CPU::step`] hands to the bus's `clock` hook and returns to the
//! host.
//!
//! ## Decimal mode
//!
//! Decimal mode is not implemented in this revision. ADC and SBC perform
//! binary arithmetic regardless of the D flag; SED/CLD still move the flag
//! itself, and interrupt entry clears it the way the 65C02 does.

use crate::instruction::{self, AddressingMode, DecodedInstr, Instruction, OpInput};
use crate::memory::{Bus, Interrupts, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::registers::{Registers, StackPointer, Status, StatusArgs};

#[derive(Clone)]
pub struct CPU<M>
where
    M: Bus,
{
    /// CPU registers including program counter, stack pointer, accumulator,
    /// index registers, and status flags
    pub registers: Registers,
    /// Memory bus that the CPU reads from and writes to
    pub memory: M,
    /// Bus ticks consumed so far by the instruction or interrupt entry
    /// currently executing. Zeroed at the end of every `step`.
    cycles: u32,
    /// Interrupt sources latched from the bus (or from `request_irq`/
    /// `request_nmi`) and not yet serviced.
    pending: Interrupts,
    /// While set, instruction execution is suppressed; interrupts are still
    /// serviced. No opcode sets this; it is a hook for the host, and
    /// `reset` clears it.
    halted: bool,
}

impl<M: Bus> CPU<M> {
    pub fn new(memory: M) -> CPU<M> {
        CPU {
            registers: Registers::new(),
            memory,
            cycles: 0,
            pending: Interrupts::empty(),
            halted: false,
        }
    }

    /// Perform the 65C02 reset sequence.
    ///
    /// The observable result: SP at $FD, interrupts disabled, PC loaded from
    /// the reset vector at $FFFC/$FFFD, and a previously halted processor
    /// running again. The vector reads happen outside any `step`, so they
    /// are not metered.
    pub fn reset(&mut self) {
        self.halted = false;
        self.pending = Interrupts::empty();

        // Real hardware gets here by three fake stack pushes; only the end
        // state is modelled.
        self.registers.stack_pointer = StackPointer(0xFD);

        self.registers.status.insert(Status::PS_DISABLE_INTERRUPTS);

        let reset_vector_low = self.memory.get_byte(RESET_VECTOR);
        let reset_vector_high = self.memory.get_byte(RESET_VECTOR.wrapping_add(1));
        self.registers.program_counter = u16::from_le_bytes([reset_vector_low, reset_vector_high]);
    }

    /// Advance the CPU by exactly one unit of work and clock the bus.
    ///
    /// One unit of work is either an interrupt entry or one instruction.
    /// A pending NMI is always serviced first; a pending IRQ is serviced
    /// only while the I flag is clear, and stays latched otherwise. The
    /// number of bus ticks consumed is passed to [`Bus::clock`], whose
    /// reported interrupt edges are merged into the latch, and then
    /// returned.
    pub fn step(&mut self) -> u32 {
        if self.pending.contains(Interrupts::NMI) {
            self.enter_interrupt(Interrupts::NMI, NMI_VECTOR);
        } else if self.pending.contains(Interrupts::IRQ)
            && !self.registers.status.contains(Status::PS_DISABLE_INTERRUPTS)
        {
            self.enter_interrupt(Interrupts::IRQ, IRQ_VECTOR);
        } else if !self.halted {
            let decoded_instr = self.fetch_next_and_decode();
            self.execute_instruction(decoded_instr);
        }

        let elapsed = self.cycles;
        self.cycles = 0;

        let raised = self.memory.clock(elapsed);
        self.pending.insert(raised);

        elapsed
    }

    /// Latch an IRQ, as if the bus had reported one from `clock`.
    pub fn request_irq(&mut self) {
        self.pending.insert(Interrupts::IRQ);
    }

    /// Latch an NMI, as if the bus had reported one from `clock`.
    pub fn request_nmi(&mut self) {
        self.pending.insert(Interrupts::NMI);
    }

    /// Suppress instruction execution until the next `reset`. Pending
    /// interrupts are still serviced.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Hardware interrupt entry for `source`, vectoring through `vector`.
    ///
    /// The pushed copy of P has B clear (only BRK pushes it set), and the
    /// sequence sets I and clears D before loading the new PC.
    fn enter_interrupt(&mut self, source: Interrupts, vector: u16) {
        self.pending.remove(source);

        for b in self.registers.program_counter.to_be_bytes() {
            self.push_on_stack(b);
        }
        self.push_on_stack(self.registers.status.bits());

        self.registers.status.insert(Status::PS_DISABLE_INTERRUPTS);
        self.registers.status.remove(Status::PS_DECIMAL_MODE);

        let vector_bytes = self.read_address(vector);
        self.registers.program_counter = u16::from_le_bytes(vector_bytes);
    }

    /// Fetch the opcode at PC and resolve its operand.
    ///
    /// Opcodes the 65C02 map leaves unassigned (and the few this revision
    /// does not honour) come back as a one-byte NOP; decode never fails and
    /// never stalls the processor.
    pub fn fetch_next_and_decode(&mut self) -> DecodedInstr {
        let opcode = self.fetch_byte();

        let Some((instr, am)) = instruction::decode(opcode) else {
            log::debug!("undefined opcode {opcode:#04x}, executing as NOP");
            return (Instruction::NOP, OpInput::UseImplied);
        };

        let x = self.registers.index_x;
        let y = self.registers.index_y;

        let am_out = match am {
            AddressingMode::Accumulator | AddressingMode::Implied => {
                // Always the same -- no input
                OpInput::UseImplied
            }
            AddressingMode::Immediate => OpInput::UseImmediate(self.fetch_byte()),
            AddressingMode::Relative => {
                // Sign-extended into a u16 so the branch target is a plain
                // wrapping add against PC.
                let offset = self.fetch_byte();
                let sign_extend = if offset & 0x80 == 0x80 { 0xFFu8 } else { 0x00 };
                OpInput::UseRelative(u16::from_le_bytes([offset, sign_extend]))
            }
            AddressingMode::ZeroPage => OpInput::UseAddress(u16::from(self.fetch_byte())),
            AddressingMode::ZeroPageX => {
                // Index wraps within page zero.
                OpInput::UseAddress(u16::from(self.fetch_byte().wrapping_add(x)))
            }
            AddressingMode::ZeroPageY => {
                OpInput::UseAddress(u16::from(self.fetch_byte().wrapping_add(y)))
            }
            AddressingMode::Absolute => OpInput::UseAddress(self.fetch_address()),
            AddressingMode::AbsoluteX => {
                OpInput::UseAddress(self.fetch_address().wrapping_add(u16::from(x)))
            }
            AddressingMode::AbsoluteY => {
                OpInput::UseAddress(self.fetch_address().wrapping_add(u16::from(y)))
            }
            AddressingMode::Indirect => {
                // The pointer is followed with a true 16-bit increment; the
                // NMOS page-wrap bug does not exist on the 65C02.
                let pointer = self.fetch_address();
                let slice = self.read_address(pointer);
                OpInput::UseAddress(u16::from_le_bytes(slice))
            }
            AddressingMode::AbsoluteIndexedIndirect => {
                let pointer = self.fetch_address().wrapping_add(u16::from(x));
                let slice = self.read_address(pointer);
                OpInput::UseAddress(u16::from_le_bytes(slice))
            }
            AddressingMode::IndexedIndirectX => {
                let zero_page_start = self.fetch_byte().wrapping_add(x);
                let slice = self.read_zero_page_address(zero_page_start);
                OpInput::UseAddress(u16::from_le_bytes(slice))
            }
            AddressingMode::IndirectIndexedY => {
                let zero_page_start = self.fetch_byte();
                let slice = self.read_zero_page_address(zero_page_start);
                OpInput::UseAddress(u16::from_le_bytes(slice).wrapping_add(u16::from(y)))
            }
            AddressingMode::ZeroPageIndirect => {
                let zero_page_start = self.fetch_byte();
                let slice = self.read_zero_page_address(zero_page_start);
                OpInput::UseAddress(u16::from_le_bytes(slice))
            }
        };

        (instr, am_out)
    }

    pub fn execute_instruction(&mut self, decoded_instr: DecodedInstr) {
        match decoded_instr {
            (Instruction::ADC, OpInput::UseImmediate(val)) => {
                log::debug!("add with carry immediate: {val}");
                self.add_with_carry(val);
            }
            (Instruction::ADC, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                log::debug!("add with carry. address: {addr:04X}. value: {val}");
                self.add_with_carry(val);
            }

            (Instruction::AND, OpInput::UseImmediate(val)) => {
                self.and(val);
            }
            (Instruction::AND, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                self.and(val);
            }

            (Instruction::ASL, OpInput::UseImplied) => {
                // Accumulator mode
                let mut val = self.registers.accumulator;
                CPU::<M>::shift_left_with_flags(&mut val, &mut self.registers.status);
                self.registers.accumulator = val;
            }
            (Instruction::ASL, OpInput::UseAddress(addr)) => {
                let mut operand: u8 = self.read_byte(addr);
                CPU::<M>::shift_left_with_flags(&mut operand, &mut self.registers.status);
                self.write_byte(addr, operand);
            }

            (Instruction::BCC, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_carry_clear(addr);
            }

            (Instruction::BCS, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_carry_set(addr);
            }

            (Instruction::BEQ, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_equal(addr);
            }

            (Instruction::BNE, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_not_equal(addr);
            }

            (Instruction::BIT, OpInput::UseImmediate(val)) => {
                // Immediate BIT only touches Z; N and V are left alone.
                self.registers.status.set_with_mask(
                    Status::PS_ZERO,
                    Status::new(StatusArgs {
                        zero: 0 == (self.registers.accumulator & val),
                        ..StatusArgs::none()
                    }),
                );
            }
            (Instruction::BIT, OpInput::UseAddress(addr)) => {
                let a: u8 = self.registers.accumulator;
                let m: u8 = self.read_byte(addr);

                // Z from the and, N and V copied straight out of bits 7
                // and 6 of the operand.
                self.registers.status.set_with_mask(
                    Status::PS_ZERO | Status::PS_NEGATIVE | Status::PS_OVERFLOW,
                    Status::new(StatusArgs {
                        zero: 0 == (a & m),
                        negative: 0 != (0x80 & m),
                        overflow: 0 != (0x40 & m),
                        ..StatusArgs::none()
                    }),
                );
            }

            (Instruction::BMI, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                log::debug!("branch if minus relative. address: {addr:04X}");
                self.branch_if_minus(addr);
            }

            (Instruction::BPL, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_positive(addr);
            }

            (Instruction::BRA, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch(addr);
            }

            (Instruction::BRK, OpInput::UseImplied) => {
                // Software interrupt. PC is past the opcode already; the
                // pushed return address skips the padding byte as well. The
                // pushed copy of P carries B set; the live register never
                // holds it.
                for b in self
                    .registers
                    .program_counter
                    .wrapping_add(1)
                    .to_be_bytes()
                {
                    self.push_on_stack(b);
                }
                self.push_on_stack((self.registers.status | Status::PS_BRK).bits());

                self.registers.status.insert(Status::PS_DISABLE_INTERRUPTS);
                self.registers.status.remove(Status::PS_DECIMAL_MODE);

                let vector_bytes = self.read_address(IRQ_VECTOR);
                self.registers.program_counter = u16::from_le_bytes(vector_bytes);
            }

            (Instruction::BVC, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_overflow_clear(addr);
            }

            (Instruction::BVS, OpInput::UseRelative(rel)) => {
                let addr = self.registers.program_counter.wrapping_add(rel);
                self.branch_if_overflow_set(addr);
            }

            (Instruction::CLC, OpInput::UseImplied) => {
                self.unset_flag(Status::PS_CARRY);
            }
            (Instruction::CLD, OpInput::UseImplied) => {
                self.unset_flag(Status::PS_DECIMAL_MODE);
            }
            (Instruction::CLI, OpInput::UseImplied) => {
                self.unset_flag(Status::PS_DISABLE_INTERRUPTS);
            }
            (Instruction::CLV, OpInput::UseImplied) => {
                self.unset_flag(Status::PS_OVERFLOW);
            }

            (Instruction::CMP, OpInput::UseImmediate(val)) => {
                self.compare_with_a_register(val);
            }
            (Instruction::CMP, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                self.compare_with_a_register(val);
            }

            (Instruction::CPX, OpInput::UseImmediate(val)) => {
                self.compare_with_x_register(val);
            }
            (Instruction::CPX, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                self.compare_with_x_register(val);
            }

            (Instruction::CPY, OpInput::UseImmediate(val)) => {
                self.compare_with_y_register(val);
            }
            (Instruction::CPY, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                self.compare_with_y_register(val);
            }

            (Instruction::DEC, OpInput::UseImplied) => {
                // Accumulator mode, a 65C02 addition.
                CPU::<M>::decrement(&mut self.registers.accumulator, &mut self.registers.status);
            }
            (Instruction::DEC, OpInput::UseAddress(addr)) => {
                let mut operand: u8 = self.read_byte(addr);
                CPU::<M>::decrement(&mut operand, &mut self.registers.status);
                self.write_byte(addr, operand);
            }

            (Instruction::DEX, OpInput::UseImplied) => {
                CPU::<M>::decrement(&mut self.registers.index_x, &mut self.registers.status);
            }
            (Instruction::DEY, OpInput::UseImplied) => {
                CPU::<M>::decrement(&mut self.registers.index_y, &mut self.registers.status);
            }

            (Instruction::EOR, OpInput::UseImmediate(val)) => {
                self.exclusive_or(val);
            }
            (Instruction::EOR, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                self.exclusive_or(val);
            }

            (Instruction::INC, OpInput::UseImplied) => {
                // Accumulator mode, a 65C02 addition.
                CPU::<M>::increment(&mut self.registers.accumulator, &mut self.registers.status);
            }
            (Instruction::INC, OpInput::UseAddress(addr)) => {
                let mut operand: u8 = self.read_byte(addr);
                CPU::<M>::increment(&mut operand, &mut self.registers.status);
                self.write_byte(addr, operand);
            }
            (Instruction::INX, OpInput::UseImplied) => {
                CPU::<M>::increment(&mut self.registers.index_x, &mut self.registers.status);
            }
            (Instruction::INY, OpInput::UseImplied) => {
                CPU::<M>::increment(&mut self.registers.index_y, &mut self.registers.status);
            }

            (Instruction::JMP, OpInput::UseAddress(addr)) => self.jump(addr),

            (Instruction::JSR, OpInput::UseAddress(addr)) => {
                for b in self
                    .registers
                    .program_counter
                    .wrapping_sub(1)
                    .to_be_bytes()
                {
                    self.push_on_stack(b);
                }
                self.jump(addr);
            }

            (Instruction::LDA, OpInput::UseImmediate(val)) => {
                log::debug!("load A immediate: {val}");
                self.load_accumulator(val);
            }
            (Instruction::LDA, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                log::debug!("load A. address: {addr:04X}. value: {val}");
                self.load_accumulator(val);
            }

            (Instruction::LDX, OpInput::UseImmediate(val)) => {
                log::debug!("load X immediate: {val}");
                self.load_x_register(val);
            }
            (Instruction::LDX, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                log::debug!("load X. address: {addr:04X}. value: {val}");
                self.load_x_register(val);
            }

            (Instruction::LDY, OpInput::UseImmediate(val)) => {
                log::debug!("load Y immediate: {val}");
                self.load_y_register(val);
            }
            (Instruction::LDY, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                log::debug!("load Y. address: {addr:04X}. value: {val}");
                self.load_y_register(val);
            }

            (Instruction::LSR, OpInput::UseImplied) => {
                // Accumulator mode
                let mut val = self.registers.accumulator;
                CPU::<M>::shift_right_with_flags(&mut val, &mut self.registers.status);
                self.registers.accumulator = val;
            }
            (Instruction::LSR, OpInput::UseAddress(addr)) => {
                let mut operand: u8 = self.read_byte(addr);
                CPU::<M>::shift_right_with_flags(&mut operand, &mut self.registers.status);
                self.write_byte(addr, operand);
            }

            (Instruction::NOP, OpInput::UseImplied) => {
                log::debug!("NOP instruction");
            }

            (Instruction::ORA, OpInput::UseImmediate(val)) => {
                self.inclusive_or(val);
            }
            (Instruction::ORA, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                self.inclusive_or(val);
            }

            (Instruction::PHA, OpInput::UseImplied) => {
                // Push accumulator
                let val = self.registers.accumulator;
                self.push_on_stack(val);
            }
            (Instruction::PHP, OpInput::UseImplied) => {
                // Push status. PHP pushes B and bit 5 set, like BRK does.
                let val = (self.registers.status | Status::PS_BRK | Status::PS_UNUSED).bits();
                self.push_on_stack(val);
            }
            (Instruction::PHX, OpInput::UseImplied) => {
                // Push X
                let val = self.registers.index_x;
                self.push_on_stack(val);
            }
            (Instruction::PHY, OpInput::UseImplied) => {
                // Push Y
                let val = self.registers.index_y;
                self.push_on_stack(val);
            }

            (Instruction::PLA, OpInput::UseImplied) => {
                // Pull accumulator
                let val: u8 = self.pull_from_stack();
                self.load_accumulator(val);
            }
            (Instruction::PLP, OpInput::UseImplied) => {
                // Pull status. The pushed B bit is discarded and bit 5
                // stays high.
                let val: u8 = self.pull_from_stack();
                self.registers.status = CPU::<M>::status_from_pushed(val);
            }
            (Instruction::PLX, OpInput::UseImplied) => {
                // Pull index X
                let val: u8 = self.pull_from_stack();
                self.load_x_register(val);
            }
            (Instruction::PLY, OpInput::UseImplied) => {
                // Pull index Y
                let val: u8 = self.pull_from_stack();
                self.load_y_register(val);
            }

            (Instruction::ROL, OpInput::UseImplied) => {
                // Accumulator mode
                let mut val = self.registers.accumulator;
                CPU::<M>::rotate_left_with_flags(&mut val, &mut self.registers.status);
                self.registers.accumulator = val;
            }
            (Instruction::ROL, OpInput::UseAddress(addr)) => {
                let mut operand: u8 = self.read_byte(addr);
                CPU::<M>::rotate_left_with_flags(&mut operand, &mut self.registers.status);
                self.write_byte(addr, operand);
            }
            (Instruction::ROR, OpInput::UseImplied) => {
                // Accumulator mode
                let mut val = self.registers.accumulator;
                CPU::<M>::rotate_right_with_flags(&mut val, &mut self.registers.status);
                self.registers.accumulator = val;
            }
            (Instruction::ROR, OpInput::UseAddress(addr)) => {
                let mut operand: u8 = self.read_byte(addr);
                CPU::<M>::rotate_right_with_flags(&mut operand, &mut self.registers.status);
                self.write_byte(addr, operand);
            }

            (Instruction::RTI, OpInput::UseImplied) => {
                // Pull status, then PC. Unlike RTS there is no +1 on the
                // popped address.
                let val: u8 = self.pull_from_stack();
                self.registers.status = CPU::<M>::status_from_pushed(val);
                let pcl: u8 = self.pull_from_stack();
                let pch: u8 = self.pull_from_stack();
                self.registers.program_counter = u16::from_le_bytes([pcl, pch]);
            }
            (Instruction::RTS, OpInput::UseImplied) => {
                let pcl: u8 = self.pull_from_stack();
                let pch: u8 = self.pull_from_stack();
                self.registers.program_counter = u16::from_le_bytes([pcl, pch]).wrapping_add(1);
            }

            (Instruction::SBC, OpInput::UseImmediate(val)) => {
                log::debug!("subtract with carry immediate: {val}");
                self.subtract_with_carry(val);
            }
            (Instruction::SBC, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);
                log::debug!("subtract with carry. address: {addr:04X}. value: {val}");
                self.subtract_with_carry(val);
            }

            (Instruction::SEC, OpInput::UseImplied) => {
                self.set_flag(Status::PS_CARRY);
            }
            (Instruction::SED, OpInput::UseImplied) => {
                self.set_flag(Status::PS_DECIMAL_MODE);
            }
            (Instruction::SEI, OpInput::UseImplied) => {
                self.set_flag(Status::PS_DISABLE_INTERRUPTS);
            }

            (Instruction::STA, OpInput::UseAddress(addr)) => {
                self.write_byte(addr, self.registers.accumulator);
            }
            (Instruction::STX, OpInput::UseAddress(addr)) => {
                self.write_byte(addr, self.registers.index_x);
            }
            (Instruction::STY, OpInput::UseAddress(addr)) => {
                self.write_byte(addr, self.registers.index_y);
            }
            (Instruction::STZ, OpInput::UseAddress(addr)) => {
                self.write_byte(addr, 0);
            }

            (Instruction::TAX, OpInput::UseImplied) => {
                let val = self.registers.accumulator;
                self.load_x_register(val);
            }
            (Instruction::TAY, OpInput::UseImplied) => {
                let val = self.registers.accumulator;
                self.load_y_register(val);
            }
            (Instruction::TSX, OpInput::UseImplied) => {
                let StackPointer(val) = self.registers.stack_pointer;
                self.load_x_register(val);
            }
            (Instruction::TXA, OpInput::UseImplied) => {
                let val = self.registers.index_x;
                self.load_accumulator(val);
            }
            (Instruction::TXS, OpInput::UseImplied) => {
                // Note that this is the only 'transfer' instruction that
                // does NOT set the zero and negative flags. (Because the
                // target is the stack pointer)
                let val = self.registers.index_x;
                self.registers.stack_pointer = StackPointer(val);
            }
            (Instruction::TYA, OpInput::UseImplied) => {
                let val = self.registers.index_y;
                self.load_accumulator(val);
            }

            (Instruction::TRB, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);

                // The zero flag is set based on the result of the 'and'.
                self.registers.status.set_with_mask(
                    Status::PS_ZERO,
                    Status::new(StatusArgs {
                        zero: 0 == (self.registers.accumulator & val),
                        ..StatusArgs::none()
                    }),
                );

                // The 1's in the accumulator clear the corresponding bits
                // in the operand
                let res = (self.registers.accumulator ^ 0xff) & val;
                self.write_byte(addr, res);
            }
            (Instruction::TSB, OpInput::UseAddress(addr)) => {
                let val = self.read_byte(addr);

                // The zero flag is set based on the result of the 'and'.
                self.registers.status.set_with_mask(
                    Status::PS_ZERO,
                    Status::new(StatusArgs {
                        zero: 0 == (self.registers.accumulator & val),
                        ..StatusArgs::none()
                    }),
                );

                // The 1's in the accumulator set the corresponding bits in
                // the operand
                let res = self.registers.accumulator | val;
                self.write_byte(addr, res);
            }

            (_, _) => {
                log::debug!(
                    "attempting to execute unimplemented or invalid \
                     instruction"
                );
            }
        }
    }

    // =========================================================================
    // Metered bus access
    // =========================================================================

    /// Read one byte through the bus, counting one tick.
    fn read_byte(&mut self, address: u16) -> u8 {
        self.cycles = self.cycles.wrapping_add(1);
        self.memory.get_byte(address)
    }

    /// Write one byte through the bus, counting one tick.
    fn write_byte(&mut self, address: u16, value: u8) {
        self.cycles = self.cycles.wrapping_add(1);
        self.memory.set_byte(address, value);
    }

    /// Fetch the next byte at PC and advance it.
    fn fetch_byte(&mut self) -> u8 {
        let val = self.read_byte(self.registers.program_counter);
        self.registers.program_counter = self.registers.program_counter.wrapping_add(1);
        val
    }

    /// Fetch a little-endian 16-bit operand from PC.
    fn fetch_address(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    /// Read a 16-bit little-endian pointer with a full 16-bit increment for
    /// the high byte.
    fn read_address(&mut self, addr: u16) -> [u8; 2] {
        let lo = self.read_byte(addr);
        let hi = self.read_byte(addr.wrapping_add(1));
        [lo, hi]
    }

    /// Read a 16-bit little-endian pointer out of page zero; the high
    /// pointer byte wraps within the page.
    fn read_zero_page_address(&mut self, addr: u8) -> [u8; 2] {
        let lo = self.read_byte(u16::from(addr));
        let hi = self.read_byte(u16::from(addr.wrapping_add(1)));
        [lo, hi]
    }

    fn push_on_stack(&mut self, val: u8) {
        let addr = self.registers.stack_pointer.to_u16();
        self.write_byte(addr, val);
        self.registers.stack_pointer.decrement();
    }

    fn pull_from_stack(&mut self) -> u8 {
        self.registers.stack_pointer.increment();
        let addr = self.registers.stack_pointer.to_u16();
        self.read_byte(addr)
    }

    // =========================================================================
    // ALU and flag helpers
    // =========================================================================

    /// Checks if a given `u8` value should be interpreted as negative when
    /// considered as `i8`: that is, whether its most significant bit is set.
    const fn value_is_negative(value: u8) -> bool {
        value > 127
    }

    /// A pushed status byte turned back into the live register: the B bit
    /// only exists on the stack and bit 5 is hardwired high.
    fn status_from_pushed(bits: u8) -> Status {
        let mut status = Status::from_bits_truncate(bits);
        status.remove(Status::PS_BRK);
        status.insert(Status::PS_UNUSED);
        status
    }

    fn set_flags_from_u8(status: &mut Status, value: u8) {
        let is_zero = value == 0;
        let is_negative = Self::value_is_negative(value);

        status.set_with_mask(
            Status::PS_ZERO | Status::PS_NEGATIVE,
            Status::new(StatusArgs {
                zero: is_zero,
                negative: is_negative,
                ..StatusArgs::none()
            }),
        );
    }

    fn shift_left_with_flags(p_val: &mut u8, status: &mut Status) {
        let mask = 1 << 7;
        let is_bit_7_set = (*p_val & mask) == mask;
        *p_val <<= 1;
        status.set_with_mask(
            Status::PS_CARRY,
            Status::new(StatusArgs {
                carry: is_bit_7_set,
                ..StatusArgs::none()
            }),
        );
        CPU::<M>::set_flags_from_u8(status, *p_val);
    }

    fn shift_right_with_flags(p_val: &mut u8, status: &mut Status) {
        let mask = 1;
        let is_bit_0_set = (*p_val & mask) == mask;
        *p_val >>= 1;
        status.set_with_mask(
            Status::PS_CARRY,
            Status::new(StatusArgs {
                carry: is_bit_0_set,
                ..StatusArgs::none()
            }),
        );
        CPU::<M>::set_flags_from_u8(status, *p_val);
    }

    fn rotate_left_with_flags(p_val: &mut u8, status: &mut Status) {
        let is_carry_set = status.contains(Status::PS_CARRY);
        let mask = 1 << 7;
        let is_bit_7_set = (*p_val & mask) == mask;
        *p_val = (*p_val << 1) + u8::from(is_carry_set);
        status.set_with_mask(
            Status::PS_CARRY,
            Status::new(StatusArgs {
                carry: is_bit_7_set,
                ..StatusArgs::none()
            }),
        );
        CPU::<M>::set_flags_from_u8(status, *p_val);
    }

    fn rotate_right_with_flags(p_val: &mut u8, status: &mut Status) {
        let is_carry_set = status.contains(Status::PS_CARRY);
        let mask = 1;
        let is_bit_0_set = (*p_val & mask) == mask;
        *p_val = (*p_val >> 1) + if is_carry_set { 1 << 7 } else { 0 };
        status.set_with_mask(
            Status::PS_CARRY,
            Status::new(StatusArgs {
                carry: is_bit_0_set,
                ..StatusArgs::none()
            }),
        );
        CPU::<M>::set_flags_from_u8(status, *p_val);
    }

    fn increment(val: &mut u8, flags: &mut Status) {
        let value_new = val.wrapping_add(1);
        *val = value_new;
        CPU::<M>::set_flags_from_u8(flags, value_new);
    }

    fn decrement(val: &mut u8, flags: &mut Status) {
        let value_new = val.wrapping_sub(1);
        *val = value_new;
        CPU::<M>::set_flags_from_u8(flags, value_new);
    }

    fn set_u8_with_flags(mem: &mut u8, status: &mut Status, value: u8) {
        *mem = value;
        CPU::<M>::set_flags_from_u8(status, value);
    }

    fn load_accumulator(&mut self, value: u8) {
        CPU::<M>::set_u8_with_flags(
            &mut self.registers.accumulator,
            &mut self.registers.status,
            value,
        );
    }

    fn load_x_register(&mut self, value: u8) {
        CPU::<M>::set_u8_with_flags(
            &mut self.registers.index_x,
            &mut self.registers.status,
            value,
        );
    }

    fn load_y_register(&mut self, value: u8) {
        CPU::<M>::set_u8_with_flags(
            &mut self.registers.index_y,
            &mut self.registers.status,
            value,
        );
    }

    /// Shorthand for checking if a specific flag is set in the status register
    #[inline]
    fn get_flag(&self, flag: Status) -> bool {
        self.registers.status.contains(flag)
    }

    /// Shorthand for setting a specific flag in the status register
    #[inline]
    fn set_flag(&mut self, flag: Status) {
        self.registers.status.or(flag);
    }

    /// Shorthand for clearing a specific flag in the status register
    #[inline]
    fn unset_flag(&mut self, flag: Status) {
        self.registers.status.and(!flag);
    }

    /// Executes the following calculation: A + M + C (Add with Carry).
    ///
    /// Carry comes from bit 8 of the 9-bit sum; overflow is the usual
    /// two's-complement rule, set when the addends agree in sign and the
    /// result does not. Decimal mode is not implemented in this revision,
    /// so the D flag is ignored and the arithmetic is always binary.
    fn add_with_carry(&mut self, value: u8) {
        let a = self.registers.accumulator;
        let carry = u8::from(self.get_flag(Status::PS_CARRY));

        let sum = u16::from(a) + u16::from(value) + u16::from(carry);
        #[allow(clippy::cast_possible_truncation)]
        let result = sum as u8;

        let did_carry = sum > 0xFF;
        let did_overflow = (!(a ^ value) & (a ^ result)) & 0x80 != 0;

        self.registers.status.set_with_mask(
            Status::PS_CARRY | Status::PS_OVERFLOW,
            Status::new(StatusArgs {
                carry: did_carry,
                overflow: did_overflow,
                ..StatusArgs::none()
            }),
        );

        self.load_accumulator(result);
    }

    /// Executes the following calculation: A - M - (1 - C) (Subtract with
    /// Carry), which on the 6502 family is exactly ADC with the operand
    /// inverted.
    fn subtract_with_carry(&mut self, value: u8) {
        self.add_with_carry(!value);
    }

    fn and(&mut self, value: u8) {
        let a_after = self.registers.accumulator & value;
        self.load_accumulator(a_after);
    }

    fn exclusive_or(&mut self, val: u8) {
        let a_after = self.registers.accumulator ^ val;
        self.load_accumulator(a_after);
    }

    fn inclusive_or(&mut self, val: u8) {
        let a_after = self.registers.accumulator | val;
        self.load_accumulator(a_after);
    }

    // From http://www.6502.org/tutorials/compare_beyond.html:
    //   If the Z flag is 0, then A <> NUM and BNE will branch
    //   If the Z flag is 1, then A = NUM and BEQ will branch
    //   If the C flag is 0, then A (unsigned) < NUM (unsigned) and BCC will branch
    //   If the C flag is 1, then A (unsigned) >= NUM (unsigned) and BCS will branch
    //   ...
    //   The N flag contains most significant bit of the subtraction result.
    fn compare(&mut self, r: u8, val: u8) {
        let diff = r.wrapping_sub(val);
        self.registers.status.set_with_mask(
            Status::PS_CARRY | Status::PS_ZERO | Status::PS_NEGATIVE,
            Status::new(StatusArgs {
                carry: r >= val,
                zero: r == val,
                negative: Self::value_is_negative(diff),
                ..StatusArgs::none()
            }),
        );
    }

    fn compare_with_a_register(&mut self, val: u8) {
        let a = self.registers.accumulator;
        self.compare(a, val);
    }

    fn compare_with_x_register(&mut self, val: u8) {
        let x = self.registers.index_x;
        self.compare(x, val);
    }

    fn compare_with_y_register(&mut self, val: u8) {
        let y = self.registers.index_y;
        self.compare(y, val);
    }

    fn jump(&mut self, addr: u16) {
        self.registers.program_counter = addr;
    }

    fn branch(&mut self, addr: u16) {
        self.registers.program_counter = addr;
    }

    fn branch_if_carry_clear(&mut self, addr: u16) {
        if !self.registers.status.contains(Status::PS_CARRY) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_carry_set(&mut self, addr: u16) {
        if self.registers.status.contains(Status::PS_CARRY) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_equal(&mut self, addr: u16) {
        if self.registers.status.contains(Status::PS_ZERO) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_not_equal(&mut self, addr: u16) {
        if !self.registers.status.contains(Status::PS_ZERO) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_minus(&mut self, addr: u16) {
        if self.registers.status.contains(Status::PS_NEGATIVE) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_positive(&mut self, addr: u16) {
        if !self.registers.status.contains(Status::PS_NEGATIVE) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_overflow_clear(&mut self, addr: u16) {
        if !self.registers.status.contains(Status::PS_OVERFLOW) {
            self.registers.program_counter = addr;
        }
    }

    fn branch_if_overflow_set(&mut self, addr: u16) {
        if self.registers.status.contains(Status::PS_OVERFLOW) {
            self.registers.program_counter = addr;
        }
    }
}

impl<M: Bus> core::fmt::Debug for CPU<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "CPU {{ registers: {:?} }}", self.registers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory as Ram;

    #[test]
    fn add_with_carry_test() {
        let mut cpu = CPU::new(Ram::new());

        // 0 + 0 with carry clear
        cpu.registers.accumulator = 0;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.add_with_carry(0);
        assert_eq!(cpu.registers.accumulator, 0);
        assert!(!cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_OVERFLOW));

        // 0 + 1 with carry set
        cpu.registers.accumulator = 0;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.add_with_carry(1);
        assert_eq!(cpu.registers.accumulator, 2);
        assert!(!cpu.registers.status.contains(Status::PS_CARRY));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_OVERFLOW));

        // 0x7F + 0x01 (overflow case)
        cpu.registers.accumulator = 0x7F;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.add_with_carry(0x01);
        assert_eq!(cpu.registers.accumulator, 0x80);
        assert!(!cpu.registers.status.contains(Status::PS_CARRY));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(cpu.registers.status.contains(Status::PS_OVERFLOW));

        // 0xFF + 0x01: carry out, zero result
        cpu.registers.accumulator = 0xFF;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.add_with_carry(0x01);
        assert_eq!(cpu.registers.accumulator, 0x00);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_OVERFLOW));

        // 0x80 + 0x80: negative overflow
        cpu.registers.accumulator = 0x80;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.add_with_carry(0x80);
        assert_eq!(cpu.registers.accumulator, 0x00);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(cpu.registers.status.contains(Status::PS_OVERFLOW));
    }

    #[test]
    fn decimal_flag_is_ignored_by_arithmetic() {
        // This revision performs binary arithmetic regardless of D.
        let mut cpu = CPU::new(Ram::new());
        cpu.registers.status.insert(Status::PS_DECIMAL_MODE);

        cpu.registers.accumulator = 0x09;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.add_with_carry(0x01);
        assert_eq!(cpu.registers.accumulator, 0x0A);
    }

    #[test]
    fn solid65_adc_immediate() {
        let mut cpu = CPU::new(Ram::new());

        // Adding $FF plus carry should be the same as adding $00 and no
        // carry, so these three instructions should leave the carry flag
        // unaffected, i.e. set.
        cpu.execute_instruction((Instruction::LDA, OpInput::UseImmediate(0x9c)));
        cpu.execute_instruction((Instruction::SEC, OpInput::UseImplied));
        cpu.execute_instruction((Instruction::ADC, OpInput::UseImmediate(0xff)));

        assert_eq!(cpu.registers.accumulator, 0x9c);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
    }

    #[test]
    fn subtract_with_carry_test() {
        let mut cpu = CPU::new(Ram::new());

        // 0 - 0 with carry set (no borrow)
        cpu.registers.accumulator = 0;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.subtract_with_carry(0);
        assert_eq!(cpu.registers.accumulator, 0);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_OVERFLOW));

        // 0 - 1 with carry set: borrow out
        cpu.registers.accumulator = 0;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.subtract_with_carry(1);
        assert_eq!(cpu.registers.accumulator, 0xFF);
        assert!(!cpu.registers.status.contains(Status::PS_CARRY));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_OVERFLOW));

        // 0x80 - 0x01 with carry set: signed overflow
        cpu.registers.accumulator = 0x80;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.subtract_with_carry(0x01);
        assert_eq!(cpu.registers.accumulator, 0x7F);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(cpu.registers.status.contains(Status::PS_OVERFLOW));
    }

    #[test]
    fn adc_then_sbc_restores_accumulator() {
        let mut cpu = CPU::new(Ram::new());

        // With carry in and no carry out, SBC of the same operand with the
        // resulting carry undoes the ADC.
        cpu.registers.accumulator = 0x37;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.add_with_carry(0x2C);
        assert_eq!(cpu.registers.accumulator, 0x64);
        cpu.subtract_with_carry(0x2C);
        assert_eq!(cpu.registers.accumulator, 0x37);
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));

        // Carry-out case: the carry produced by the ADC feeds the SBC.
        cpu.registers.accumulator = 0xF0;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.add_with_carry(0x20);
        assert_eq!(cpu.registers.accumulator, 0x10);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        cpu.subtract_with_carry(0x20);
        assert_eq!(cpu.registers.accumulator, 0xF0);
    }

    #[test]
    fn and_test() {
        let mut cpu = CPU::new(Ram::new());

        cpu.registers.accumulator = 0;
        cpu.and(0xff);
        assert_eq!(cpu.registers.accumulator, 0);
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.registers.accumulator = 0xff;
        cpu.and(0x0f);
        assert_eq!(cpu.registers.accumulator, 0x0f);
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.registers.accumulator = 0xff;
        cpu.and(0x80);
        assert_eq!(cpu.registers.accumulator, 0x80);
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
    }

    #[test]
    fn compare_sets_same_flags_as_subtract() {
        for (a, m) in [(0x10u8, 0x10u8), (0x10, 0x20), (0x20, 0x10), (0x80, 0x01)] {
            let mut cmp_cpu = CPU::new(Ram::new());
            cmp_cpu.registers.accumulator = a;
            cmp_cpu.execute_instruction((Instruction::CMP, OpInput::UseImmediate(m)));
            // The compare must not write the accumulator.
            assert_eq!(cmp_cpu.registers.accumulator, a);

            let mut sbc_cpu = CPU::new(Ram::new());
            sbc_cpu.registers.accumulator = a;
            sbc_cpu.execute_instruction((Instruction::SEC, OpInput::UseImplied));
            sbc_cpu.execute_instruction((Instruction::SBC, OpInput::UseImmediate(m)));

            for flag in [Status::PS_NEGATIVE, Status::PS_ZERO, Status::PS_CARRY] {
                assert_eq!(
                    cmp_cpu.registers.status.contains(flag),
                    sbc_cpu.registers.status.contains(flag),
                    "flag mismatch for A={a:#04x} M={m:#04x}"
                );
            }
        }
    }

    #[test]
    fn decrement_memory_test() {
        let mut cpu = CPU::new(Ram::new());
        let addr: u16 = 0xA1B2;

        cpu.memory.set_byte(addr, 5);

        cpu.execute_instruction((Instruction::DEC, OpInput::UseAddress(addr)));
        assert_eq!(cpu.memory.get_byte(addr), 4);
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.memory.set_byte(addr, 1);
        cpu.execute_instruction((Instruction::DEC, OpInput::UseAddress(addr)));
        assert_eq!(cpu.memory.get_byte(addr), 0);
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.execute_instruction((Instruction::DEC, OpInput::UseAddress(addr)));
        assert_eq!(cpu.memory.get_byte(addr), 0xFF);
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
    }

    #[test]
    fn increment_and_decrement_accumulator() {
        // INC A / DEC A are 65C02 additions.
        let mut cpu = CPU::new(Ram::new());

        cpu.registers.accumulator = 0x7F;
        cpu.execute_instruction((Instruction::INC, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x80);
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.execute_instruction((Instruction::DEC, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x7F);
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.registers.accumulator = 0x01;
        cpu.execute_instruction((Instruction::DEC, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x00);
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
    }

    #[test]
    fn logical_shift_right_test() {
        let mut cpu = CPU::new(Ram::new());

        cpu.execute_instruction((Instruction::LDA, OpInput::UseImmediate(1)));
        cpu.execute_instruction((Instruction::LSR, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));

        cpu.execute_instruction((Instruction::LDA, OpInput::UseImmediate(0x80)));
        cpu.execute_instruction((Instruction::LSR, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x40);
        assert!(!cpu.registers.status.contains(Status::PS_CARRY));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
    }

    #[test]
    fn rotate_feeds_carry_into_vacated_bit() {
        let mut cpu = CPU::new(Ram::new());

        cpu.registers.accumulator = 0x40;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.execute_instruction((Instruction::ROL, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x81);
        assert!(!cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.registers.accumulator = 0x01;
        cpu.registers.status.insert(Status::PS_CARRY);
        cpu.execute_instruction((Instruction::ROR, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x80);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
    }

    #[test]
    fn shift_memory_operand_reads_then_writes() {
        let mut cpu = CPU::new(Ram::new());
        cpu.memory.set_byte(0x0010, 0x81);

        cpu.execute_instruction((Instruction::ASL, OpInput::UseAddress(0x0010)));
        assert_eq!(cpu.memory.get_byte(0x0010), 0x02);
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
    }

    #[test]
    fn php_sets_bits_4_and_5() {
        let mut cpu = CPU::new(Ram::new());
        cpu.execute_instruction((Instruction::PHP, OpInput::UseImplied));
        cpu.execute_instruction((Instruction::PLA, OpInput::UseImplied));
        cpu.execute_instruction((Instruction::AND, OpInput::UseImmediate(0x30)));

        assert_eq!(cpu.registers.accumulator, 0x30);
    }

    #[test]
    fn plp_ignores_pushed_break_flag() {
        let mut cpu = CPU::new(Ram::new());
        cpu.execute_instruction((Instruction::LDA, OpInput::UseImmediate(0xFF)));
        cpu.execute_instruction((Instruction::PHA, OpInput::UseImplied));
        cpu.execute_instruction((Instruction::PLP, OpInput::UseImplied));

        assert!(!cpu.registers.status.contains(Status::PS_BRK));
        assert!(cpu.registers.status.contains(Status::PS_UNUSED));
        assert!(cpu.registers.status.contains(Status::PS_CARRY));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
    }

    #[test]
    fn stack_push_pull_round_trip() {
        let mut cpu = CPU::new(Ram::new());
        let sp_before = cpu.registers.stack_pointer;

        cpu.execute_instruction((Instruction::LDA, OpInput::UseImmediate(0xC3)));
        cpu.execute_instruction((Instruction::PHA, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0xC3);

        cpu.execute_instruction((Instruction::LDA, OpInput::UseImmediate(0x00)));
        cpu.execute_instruction((Instruction::PLA, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0xC3);
        assert_eq!(cpu.registers.stack_pointer, sp_before);
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
    }

    #[test]
    fn push_pull_x_and_y() {
        let mut cpu = CPU::new(Ram::new());

        cpu.execute_instruction((Instruction::LDX, OpInput::UseImmediate(0x80)));
        cpu.execute_instruction((Instruction::PHX, OpInput::UseImplied));
        cpu.execute_instruction((Instruction::LDX, OpInput::UseImmediate(0x00)));
        cpu.execute_instruction((Instruction::PLX, OpInput::UseImplied));
        assert_eq!(cpu.registers.index_x, 0x80);
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.execute_instruction((Instruction::LDY, OpInput::UseImmediate(0x00)));
        cpu.execute_instruction((Instruction::PHY, OpInput::UseImplied));
        cpu.execute_instruction((Instruction::LDY, OpInput::UseImmediate(0x7F)));
        cpu.execute_instruction((Instruction::PLY, OpInput::UseImplied));
        assert_eq!(cpu.registers.index_y, 0x00);
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
    }

    #[test]
    fn txs_does_not_change_flags() {
        let mut cpu = CPU::new(Ram::new());
        let flags_before = cpu.registers.status;

        cpu.registers.index_x = 0x80;
        cpu.execute_instruction((Instruction::TXS, OpInput::UseImplied));
        assert_eq!(cpu.registers.stack_pointer, StackPointer(0x80));
        assert_eq!(cpu.registers.status, flags_before);
    }

    #[test]
    fn bit_immediate_sets_only_zero() {
        let mut cpu = CPU::new(Ram::new());
        cpu.registers
            .status
            .insert(Status::PS_NEGATIVE | Status::PS_OVERFLOW);

        cpu.registers.accumulator = 0x0F;
        cpu.execute_instruction((Instruction::BIT, OpInput::UseImmediate(0xF0)));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        // N and V survive the immediate form.
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(cpu.registers.status.contains(Status::PS_OVERFLOW));
    }

    #[test]
    fn bit_memory_copies_operand_high_bits() {
        let mut cpu = CPU::new(Ram::new());
        cpu.memory.set_byte(0x0042, 0xC0);

        cpu.registers.accumulator = 0x3F;
        cpu.execute_instruction((Instruction::BIT, OpInput::UseAddress(0x0042)));
        assert!(cpu.registers.status.contains(Status::PS_ZERO));
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(cpu.registers.status.contains(Status::PS_OVERFLOW));
    }

    #[test]
    fn tsb_sets_and_trb_clears_accumulator_bits() {
        let mut cpu = CPU::new(Ram::new());
        let addr: u16 = 0x0080;

        cpu.memory.set_byte(addr, 0x22);
        cpu.registers.accumulator = 0x41;
        cpu.execute_instruction((Instruction::TSB, OpInput::UseAddress(addr)));
        assert_eq!(cpu.memory.get_byte(addr), 0x63);
        assert!(cpu.registers.status.contains(Status::PS_ZERO));

        cpu.execute_instruction((Instruction::TRB, OpInput::UseAddress(addr)));
        assert_eq!(cpu.memory.get_byte(addr), 0x22);
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
    }

    #[test]
    fn stz_stores_zero_without_touching_flags() {
        let mut cpu = CPU::new(Ram::new());
        cpu.memory.set_byte(0x0033, 0xAA);
        cpu.registers.status.insert(Status::PS_NEGATIVE);
        let flags_before = cpu.registers.status;

        cpu.execute_instruction((Instruction::STZ, OpInput::UseAddress(0x0033)));
        assert_eq!(cpu.memory.get_byte(0x0033), 0x00);
        assert_eq!(cpu.registers.status, flags_before);
    }

    #[test]
    fn bra_branches_unconditionally() {
        let mut cpu = CPU::new(Ram::new());

        cpu.registers.program_counter = 0x1000;
        cpu.execute_instruction((Instruction::BRA, OpInput::UseRelative(0x0010)));
        assert_eq!(cpu.registers.program_counter, 0x1010);

        // Negative displacement, sign-extended by the decoder.
        cpu.execute_instruction((Instruction::BRA, OpInput::UseRelative(0xFFF0)));
        assert_eq!(cpu.registers.program_counter, 0x1000);
    }

    #[test]
    fn branches_follow_their_condition() {
        let mut cpu = CPU::new(Ram::new());

        cpu.registers.program_counter = 0x2000;
        cpu.registers.status.remove(Status::PS_CARRY);
        cpu.execute_instruction((Instruction::BCS, OpInput::UseRelative(0x0010)));
        assert_eq!(cpu.registers.program_counter, 0x2000);
        cpu.execute_instruction((Instruction::BCC, OpInput::UseRelative(0x0010)));
        assert_eq!(cpu.registers.program_counter, 0x2010);

        cpu.registers.status.insert(Status::PS_ZERO);
        cpu.execute_instruction((Instruction::BEQ, OpInput::UseRelative(0x0010)));
        assert_eq!(cpu.registers.program_counter, 0x2020);
        cpu.execute_instruction((Instruction::BNE, OpInput::UseRelative(0x0010)));
        assert_eq!(cpu.registers.program_counter, 0x2020);
    }

    #[test]
    fn transfers_set_flags_from_destination() {
        let mut cpu = CPU::new(Ram::new());

        cpu.registers.accumulator = 0x80;
        cpu.execute_instruction((Instruction::TAX, OpInput::UseImplied));
        assert_eq!(cpu.registers.index_x, 0x80);
        assert!(cpu.registers.status.contains(Status::PS_NEGATIVE));

        cpu.registers.index_y = 0x00;
        cpu.execute_instruction((Instruction::TYA, OpInput::UseImplied));
        assert_eq!(cpu.registers.accumulator, 0x00);
        assert!(cpu.registers.status.contains(Status::PS_ZERO));

        cpu.registers.stack_pointer = StackPointer(0x42);
        cpu.execute_instruction((Instruction::TSX, OpInput::UseImplied));
        assert_eq!(cpu.registers.index_x, 0x42);
        assert!(!cpu.registers.status.contains(Status::PS_NEGATIVE));
        assert!(!cpu.registers.status.contains(Status::PS_ZERO));
    }
}
