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

//! When the Western Design Center shipped the 65C02 in 1983, it was the
//! second life of [Chuck Peddle]'s 1975 design: the same programmer-visible
//! machine, redone in CMOS by Bill Mensch with the worst NMOS warts filed
//! off. The indirect `JMP` no longer wrapped its pointer at a page boundary,
//! interrupt entry finally cleared the decimal flag, and a handful of new
//! instructions (`BRA`, `STZ`, `PHX`, `TRB`, ...) rounded out the
//! instruction set. The chip went on to power the Apple IIc and IIe and an
//! enormous population of embedded systems, where it is still sold today.
//!
//! This crate emulates that processor at instruction level. The CPU owns its
//! six registers and nothing else; all memory and I/O live behind the
//! [`Bus`](memory::Bus) capability supplied by the host, and every bus
//! access is metered so that [`step`](cpu::CPU::step) can report exactly how
//! many ticks the executed instruction consumed. The host drives the CPU in
//! a loop and uses the returned tick counts to pace video, audio and timer
//! peripherals.
//!
//! Interrupt lines are latched, not sampled: the bus returns asserted
//! IRQ/NMI edges from its `clock` hook, the CPU merges them into a pending
//! mask and services them at the next instruction boundary with the 65C02
//! sequence (push PC and P, set I, clear D, load the vector).
//!
//! [Chuck Peddle]: https://en.wikipedia.org/wiki/Chuck_Peddle

#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![allow(clippy::module_name_repetitions, clippy::needless_doctest_main)]
// Registers and ops follow the 6502 naming convention and have similar names
// at times
#![allow(clippy::similar_names)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![no_std]

#[doc = include_str!("../README.md")]
pub mod cpu;
pub mod instruction;
pub mod memory;
pub mod registers;
