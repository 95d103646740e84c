// CLASSIFICATION: COMMUNITY
// Filename: ia32.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! IA32 register snapshot and the Linux i386 `mcontext_t` layout.

use super::MachineContext;

pub const REG_GS: usize = 0;
pub const REG_FS: usize = 1;
pub const REG_ES: usize = 2;
pub const REG_DS: usize = 3;
pub const REG_EDI: usize = 4;
pub const REG_ESI: usize = 5;
pub const REG_EBP: usize = 6;
pub const REG_ESP: usize = 7;
pub const REG_EBX: usize = 8;
pub const REG_EDX: usize = 9;
pub const REG_ECX: usize = 10;
pub const REG_EAX: usize = 11;
pub const REG_TRAPNO: usize = 12;
pub const REG_ERR: usize = 13;
pub const REG_EIP: usize = 14;
pub const REG_CS: usize = 15;
pub const REG_EFL: usize = 16;
pub const REG_UESP: usize = 17;
pub const REG_SS: usize = 18;
pub const NGREG: usize = 19;

/// Linux i386 `mcontext_t`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ia32NativeContext {
    pub gregs: [u32; NGREG],
    pub fpregs: u32,
    pub oldmask: u32,
    pub cr2: u32,
}

const _: () = assert!(std::mem::size_of::<Ia32NativeContext>() == (NGREG + 3) * 4);

/// `EFI_SYSTEM_CONTEXT_IA32` subset exposed to signal callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ia32Context {
    pub cr2: u32,
    pub eflags: u32,
    pub eip: u32,
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub cs: u32,
    pub ss: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

impl MachineContext for Ia32Context {
    type Native = Ia32NativeContext;

    fn capture(native: &Ia32NativeContext) -> Self {
        let g = &native.gregs;
        Self {
            cr2: native.cr2,
            eflags: g[REG_EFL],
            eip: g[REG_EIP],
            gs: g[REG_GS],
            fs: g[REG_FS],
            es: g[REG_ES],
            ds: g[REG_DS],
            cs: g[REG_CS],
            ss: g[REG_SS],
            edi: g[REG_EDI],
            esi: g[REG_ESI],
            ebp: g[REG_EBP],
            esp: g[REG_ESP],
            ebx: g[REG_EBX],
            edx: g[REG_EDX],
            ecx: g[REG_ECX],
            eax: g[REG_EAX],
        }
    }

    fn commit(&self, native: &mut Ia32NativeContext) {
        native.cr2 = self.cr2;
        let g = &mut native.gregs;
        g[REG_EFL] = self.eflags;
        g[REG_EIP] = self.eip;
        g[REG_GS] = self.gs;
        g[REG_FS] = self.fs;
        g[REG_ES] = self.es;
        g[REG_DS] = self.ds;
        g[REG_CS] = self.cs;
        g[REG_SS] = self.ss;
        g[REG_EDI] = self.edi;
        g[REG_ESI] = self.esi;
        g[REG_EBP] = self.ebp;
        g[REG_ESP] = self.esp;
        g[REG_EBX] = self.ebx;
        g[REG_EDX] = self.edx;
        g[REG_ECX] = self.ecx;
        g[REG_EAX] = self.eax;
    }

    fn program_counter(&self) -> u64 {
        u64::from(self.eip)
    }

    fn set_program_counter(&mut self, pc: u64) {
        self.eip = pc as u32;
    }

    fn stack_pointer(&self) -> u64 {
        u64::from(self.esp)
    }

    fn set_return_value(&mut self, value: u64) {
        self.eax = value as u32;
    }
}
