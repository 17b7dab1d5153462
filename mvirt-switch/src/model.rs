//! Desired/actual state and the directives derived from them.
//!
//! Both state maps are keyed by entity name, which is the join key between
//! Home Assistant and the hypervisor. They are rebuilt every cycle.

use std::collections::HashMap;
use std::fmt;

/// Hypervisor VM identifier (`qm` VMID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VmId(pub u32);

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target power posture declared by the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredPower {
    On,
    Off,
    /// Any value other than exactly "on" or "off". Never acted upon.
    Unrecognized(String),
}

impl DesiredPower {
    pub fn parse(value: &str) -> Self {
        match value {
            "on" => DesiredPower::On,
            "off" => DesiredPower::Off,
            other => DesiredPower::Unrecognized(other.to_string()),
        }
    }
}

/// Power state reported by the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    Running,
    Stopped,
    Paused,
    /// Transitional or unknown states, kept verbatim for logging.
    Other(String),
}

impl PowerState {
    pub fn parse(value: &str) -> Self {
        match value {
            "running" => PowerState::Running,
            "stopped" => PowerState::Stopped,
            "paused" => PowerState::Paused,
            other => PowerState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Running => write!(f, "running"),
            PowerState::Stopped => write!(f, "stopped"),
            PowerState::Paused => write!(f, "paused"),
            PowerState::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A VM as seen by the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRecord {
    pub handle: VmId,
    pub power_state: PowerState,
}

/// Entity name -> desired power.
pub type DesiredState = HashMap<String, DesiredPower>;

/// Entity name -> hypervisor record.
pub type ActualState = HashMap<String, VmRecord>;

/// Power transition applied to a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Resume,
    Start,
    Suspend,
}

impl Action {
    /// `qm` subcommand for this action.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Resume => "resume",
            Action::Start => "start",
            Action::Suspend => "suspend",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// A single transition to apply in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub handle: VmId,
    pub action: Action,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_power_is_exact_match() {
        assert_eq!(DesiredPower::parse("on"), DesiredPower::On);
        assert_eq!(DesiredPower::parse("off"), DesiredPower::Off);
        assert_eq!(
            DesiredPower::parse("ON"),
            DesiredPower::Unrecognized("ON".to_string())
        );
        assert_eq!(
            DesiredPower::parse("unavailable"),
            DesiredPower::Unrecognized("unavailable".to_string())
        );
    }

    #[test]
    fn test_power_state_parse() {
        assert_eq!(PowerState::parse("running"), PowerState::Running);
        assert_eq!(PowerState::parse("stopped"), PowerState::Stopped);
        assert_eq!(PowerState::parse("paused"), PowerState::Paused);
        assert_eq!(
            PowerState::parse("prelaunch"),
            PowerState::Other("prelaunch".to_string())
        );
    }

    #[test]
    fn test_directive_display() {
        let d = Directive {
            handle: VmId(100),
            action: Action::Resume,
        };
        assert_eq!(d.to_string(), "resume 100");
    }
}
