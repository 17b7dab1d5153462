//! VM power decision table.

use crate::model::{Action, DesiredPower, PowerState};

/// Decide which action, if any, moves a VM from `current` toward `desired`.
///
/// Transitional states (`Other`) are never acted on so an in-flight
/// transition is not raced. Applying the result and re-deciding yields
/// `None`.
pub fn decide(desired: &DesiredPower, current: &PowerState) -> Option<Action> {
    match (desired, current) {
        // Wanted on, currently suspended → resume
        (DesiredPower::On, PowerState::Paused) => Some(Action::Resume),
        // Wanted on, currently stopped → start
        (DesiredPower::On, PowerState::Stopped) => Some(Action::Start),
        // Wanted off, currently running → suspend (not stop)
        (DesiredPower::Off, PowerState::Running) => Some(Action::Suspend),
        // Already there, transitioning, or nothing sensible to do
        (DesiredPower::On, PowerState::Running | PowerState::Other(_))
        | (DesiredPower::Off, PowerState::Paused | PowerState::Stopped | PowerState::Other(_))
        | (DesiredPower::Unrecognized(_), _) => None,
    }
}
