// CLASSIFICATION: COMMUNITY
// Filename: arm.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! ARM32 register snapshot and the Linux `struct sigcontext` layout.

use super::MachineContext;

/// Linux ARM `mcontext_t` (`struct sigcontext`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArmNativeContext {
    pub trap_no: u32,
    pub error_code: u32,
    pub oldmask: u32,
    pub arm_r0: u32,
    pub arm_r1: u32,
    pub arm_r2: u32,
    pub arm_r3: u32,
    pub arm_r4: u32,
    pub arm_r5: u32,
    pub arm_r6: u32,
    pub arm_r7: u32,
    pub arm_r8: u32,
    pub arm_r9: u32,
    pub arm_r10: u32,
    pub arm_fp: u32,
    pub arm_ip: u32,
    pub arm_sp: u32,
    pub arm_lr: u32,
    pub arm_pc: u32,
    pub arm_cpsr: u32,
    pub fault_address: u32,
}

const _: () = assert!(std::mem::size_of::<ArmNativeContext>() == 21 * 4);

/// `EFI_SYSTEM_CONTEXT_ARM` subset exposed to signal callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArmContext {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r12: u32,
    pub sp: u32,
    pub lr: u32,
    pub pc: u32,
    pub cpsr: u32,
}

impl MachineContext for ArmContext {
    type Native = ArmNativeContext;

    fn capture(native: &ArmNativeContext) -> Self {
        Self {
            r0: native.arm_r0,
            r1: native.arm_r1,
            r2: native.arm_r2,
            r3: native.arm_r3,
            r4: native.arm_r4,
            r5: native.arm_r5,
            r6: native.arm_r6,
            r7: native.arm_r7,
            r8: native.arm_r8,
            r9: native.arm_r9,
            r10: native.arm_r10,
            r11: native.arm_fp,
            r12: native.arm_ip,
            sp: native.arm_sp,
            lr: native.arm_lr,
            pc: native.arm_pc,
            cpsr: native.arm_cpsr,
        }
    }

    fn commit(&self, native: &mut ArmNativeContext) {
        native.arm_r0 = self.r0;
        native.arm_r1 = self.r1;
        native.arm_r2 = self.r2;
        native.arm_r3 = self.r3;
        native.arm_r4 = self.r4;
        native.arm_r5 = self.r5;
        native.arm_r6 = self.r6;
        native.arm_r7 = self.r7;
        native.arm_r8 = self.r8;
        native.arm_r9 = self.r9;
        native.arm_r10 = self.r10;
        native.arm_fp = self.r11;
        native.arm_ip = self.r12;
        native.arm_sp = self.sp;
        native.arm_lr = self.lr;
        native.arm_pc = self.pc;
        native.arm_cpsr = self.cpsr;
    }

    fn program_counter(&self) -> u64 {
        u64::from(self.pc)
    }

    fn set_program_counter(&mut self, pc: u64) {
        self.pc = pc as u32;
    }

    fn stack_pointer(&self) -> u64 {
        u64::from(self.sp)
    }

    fn set_return_value(&mut self, value: u64) {
        self.r0 = value as u32;
    }
}
