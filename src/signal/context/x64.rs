// CLASSIFICATION: COMMUNITY
// Filename: x64.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! X64 register snapshot and the Linux `mcontext_t.gregs` layout.

use super::MachineContext;

pub const REG_R8: usize = 0;
pub const REG_R9: usize = 1;
pub const REG_R10: usize = 2;
pub const REG_R11: usize = 3;
pub const REG_R12: usize = 4;
pub const REG_R13: usize = 5;
pub const REG_R14: usize = 6;
pub const REG_R15: usize = 7;
pub const REG_RDI: usize = 8;
pub const REG_RSI: usize = 9;
pub const REG_RBP: usize = 10;
pub const REG_RBX: usize = 11;
pub const REG_RDX: usize = 12;
pub const REG_RAX: usize = 13;
pub const REG_RCX: usize = 14;
pub const REG_RSP: usize = 15;
pub const REG_RIP: usize = 16;
pub const REG_EFL: usize = 17;
pub const REG_CSGSFS: usize = 18;
pub const REG_ERR: usize = 19;
pub const REG_TRAPNO: usize = 20;
pub const REG_OLDMASK: usize = 21;
pub const REG_CR2: usize = 22;
pub const NGREG: usize = 23;

// REG_CSGSFS windows: cs in 15..0, gs in 31..16, fs in 47..32.
const SELECTOR_MASK: u64 = 0xFFFF;
const GS_SHIFT: u32 = 16;
const FS_SHIFT: u32 = 32;
const SELECTOR_WINDOWS: u64 = 0xFFFF_FFFF_FFFF;

/// Leading `gregs` block of the Linux x86_64 `mcontext_t`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct X64NativeContext {
    pub gregs: [u64; NGREG],
}

const _: () = assert!(std::mem::size_of::<X64NativeContext>() == NGREG * 8);

/// `EFI_SYSTEM_CONTEXT_X64` subset exposed to signal callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct X64Context {
    pub cr2: u64,
    pub rflags: u64,
    pub rip: u64,
    pub cs: u64,
    pub fs: u64,
    pub gs: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rbp: u64,
    pub rsp: u64,
    pub rbx: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rax: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

impl MachineContext for X64Context {
    type Native = X64NativeContext;

    fn capture(native: &X64NativeContext) -> Self {
        let g = &native.gregs;
        let csgsfs = g[REG_CSGSFS];
        Self {
            cr2: g[REG_CR2],
            rflags: g[REG_EFL],
            rip: g[REG_RIP],
            cs: csgsfs & SELECTOR_MASK,
            fs: (csgsfs >> FS_SHIFT) & SELECTOR_MASK,
            gs: (csgsfs >> GS_SHIFT) & SELECTOR_MASK,
            rdi: g[REG_RDI],
            rsi: g[REG_RSI],
            rbp: g[REG_RBP],
            rsp: g[REG_RSP],
            rbx: g[REG_RBX],
            rdx: g[REG_RDX],
            rcx: g[REG_RCX],
            rax: g[REG_RAX],
            r8: g[REG_R8],
            r9: g[REG_R9],
            r10: g[REG_R10],
            r11: g[REG_R11],
            r12: g[REG_R12],
            r13: g[REG_R13],
            r14: g[REG_R14],
            r15: g[REG_R15],
        }
    }

    fn commit(&self, native: &mut X64NativeContext) {
        let g = &mut native.gregs;
        g[REG_CR2] = self.cr2;
        g[REG_EFL] = self.rflags;
        g[REG_RIP] = self.rip;
        // bits 63..48 are not part of the snapshot and stay as the kernel wrote them
        g[REG_CSGSFS] = (g[REG_CSGSFS] & !SELECTOR_WINDOWS)
            | (self.cs & SELECTOR_MASK)
            | ((self.gs & SELECTOR_MASK) << GS_SHIFT)
            | ((self.fs & SELECTOR_MASK) << FS_SHIFT);
        g[REG_RDI] = self.rdi;
        g[REG_RSI] = self.rsi;
        g[REG_RBP] = self.rbp;
        g[REG_RSP] = self.rsp;
        g[REG_RBX] = self.rbx;
        g[REG_RDX] = self.rdx;
        g[REG_RCX] = self.rcx;
        g[REG_RAX] = self.rax;
        g[REG_R8] = self.r8;
        g[REG_R9] = self.r9;
        g[REG_R10] = self.r10;
        g[REG_R11] = self.r11;
        g[REG_R12] = self.r12;
        g[REG_R13] = self.r13;
        g[REG_R14] = self.r14;
        g[REG_R15] = self.r15;
    }

    fn program_counter(&self) -> u64 {
        self.rip
    }

    fn set_program_counter(&mut self, pc: u64) {
        self.rip = pc;
    }

    fn stack_pointer(&self) -> u64 {
        self.rsp
    }

    fn set_return_value(&mut self, value: u64) {
        self.rax = value;
    }
}
