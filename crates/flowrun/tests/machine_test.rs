use flowmodel::{RuntimeAction, RuntimeMode};
use flowrun::StateMachine;

#[test]
fn run_pause_resume_cycle() {
    let mut machine = StateMachine::new(false);
    assert_eq!(machine.mode(), RuntimeMode::Paused);

    assert!(machine.transition(RuntimeAction::Run));
    assert_eq!(machine.mode(), RuntimeMode::Running);
    assert!(!machine.debugger_active());

    assert!(machine.transition(RuntimeAction::Pause));
    assert_eq!(machine.mode(), RuntimeMode::Paused);
    assert!(machine.debugger_active(), "pausing attaches the debugger");

    assert!(machine.transition(RuntimeAction::Resume));
    assert_eq!(machine.mode(), RuntimeMode::Running);
    assert!(machine.debugger_active(), "resume keeps the debugger attached");
}

#[test]
fn single_step_resolves_back_to_paused() {
    let mut machine = StateMachine::new(true);
    assert!(machine.transition(RuntimeAction::SingleStep));
    assert_eq!(machine.mode(), RuntimeMode::SingleStepping);

    assert!(machine.finish_single_step());
    assert_eq!(machine.mode(), RuntimeMode::Paused);
    // Only a pending step resolves.
    assert!(!machine.finish_single_step());
}

#[test]
fn invalid_transitions_are_ignored() {
    let mut machine = StateMachine::new(false);
    // Pause is only valid from Running.
    assert!(!machine.transition(RuntimeAction::Pause));
    assert_eq!(machine.mode(), RuntimeMode::Paused);

    machine.transition(RuntimeAction::Run);
    // Run is only valid from Paused.
    assert!(!machine.transition(RuntimeAction::Run));
    assert!(!machine.transition(RuntimeAction::SingleStep));
    assert_eq!(machine.mode(), RuntimeMode::Running);
}

#[test]
fn stop_is_terminal_from_any_mode() {
    let mut machine = StateMachine::new(false);
    machine.transition(RuntimeAction::Run);
    assert!(machine.transition(RuntimeAction::Stop));
    assert!(machine.is_stopped());

    for action in [
        RuntimeAction::Run,
        RuntimeAction::Pause,
        RuntimeAction::Resume,
        RuntimeAction::SingleStep,
        RuntimeAction::Stop,
    ] {
        assert!(!machine.transition(action));
        assert!(machine.is_stopped());
    }
}

#[test]
fn force_pause_applies_from_running_only_while_live() {
    let mut machine = StateMachine::new(true);
    machine.transition(RuntimeAction::Run);
    machine.force_pause();
    assert_eq!(machine.mode(), RuntimeMode::Paused);

    machine.transition(RuntimeAction::Stop);
    machine.force_pause();
    assert!(machine.is_stopped());
}

#[test]
fn first_error_wins() {
    let mut machine = StateMachine::new(false);
    machine.record_error("first");
    machine.record_error("second");
    assert_eq!(machine.error(), Some("first"));
}
