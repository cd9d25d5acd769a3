use std::sync::Arc;

use hwdbg_arch_amd64::{Amd64, Registers, Rflags};
use hwdbg_core::ExceptionContext;

use super::mock::MockDriver;
use crate::{BreakpointManager, SingleStepController, SingleStepHandler};

type Controller = SingleStepController<MockDriver>;

fn noop_handler() -> SingleStepHandler<MockDriver> {
    Arc::new(|_: &BreakpointManager<MockDriver>, _: &mut ExceptionContext<'_, Amd64>| {})
}

#[test]
fn single_step_mode() {
    let controller = Controller::new(false);
    let mut registers = Registers::default();

    controller.set_single_step_mode(&mut registers, noop_handler());
    assert!(registers.rflags.trap());
    assert!(!registers.dr7.local_exact_breakpoint());
    assert!(controller.handler().is_some());

    controller.clear_single_step_mode(&mut registers);
    assert!(!registers.rflags.trap());
    assert!(controller.handler().is_some());

    assert!(controller.remove_handler().is_some());
    assert!(controller.handler().is_none());
    assert!(controller.remove_handler().is_none());
}

#[test]
fn single_step_mode_with_branch_trace() {
    let controller = Controller::new(true);
    let mut registers = Registers::default();

    controller.set_single_step_mode(&mut registers, noop_handler());
    assert!(registers.rflags.trap());
    assert!(registers.dr7.local_exact_breakpoint());
    assert!(registers.dr7.global_exact_breakpoint());
}

#[test]
fn trace_flag() {
    let controller = Controller::new(false);
    assert!(!controller.is_tracing());

    controller.start_trace();
    assert!(controller.is_tracing());

    controller.stop_trace();
    assert!(!controller.is_tracing());
}

#[test]
fn resume_flag() {
    let mut registers = Registers::default();

    Controller::resume_from_breakpoint(&mut registers);
    assert!(registers.rflags.resume());
    assert_eq!(registers.rflags.0, Rflags::RESUME);
}

#[test]
fn status_flags() {
    let mut registers = Registers::default();

    Controller::set_zero_flag(&mut registers);
    Controller::set_carry_flag(&mut registers);
    assert!(registers.rflags.zero());
    assert!(registers.rflags.carry());
    assert!(!registers.rflags.sign());

    Controller::flip_zero_flag(&mut registers);
    Controller::flip_sign_flag(&mut registers);
    assert!(!registers.rflags.zero());
    assert!(registers.rflags.sign());

    Controller::clear_sign_flag(&mut registers);
    Controller::clear_carry_flag(&mut registers);
    Controller::clear_zero_flag(&mut registers);
    assert_eq!(registers.rflags, Rflags::default());

    Controller::set_sign_flag(&mut registers);
    Controller::flip_carry_flag(&mut registers);
    assert_eq!(registers.rflags.0, Rflags::SIGN | Rflags::CARRY);
}
