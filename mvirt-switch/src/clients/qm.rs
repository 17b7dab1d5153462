//! Client for the Proxmox `qm` command.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ActualStateProvider, Actuator};
use crate::error::{ActuationError, ProviderError};
use crate::model::{ActualState, Directive, PowerState, VmId, VmRecord};

/// A VM line from `qm list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInfo {
    pub id: VmId,
    pub name: String,
    pub state: PowerState,
}

/// Client invoking `qm` on the local host.
#[derive(Debug, Clone)]
pub struct QmClient {
    binary: PathBuf,
}

impl QmClient {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.binary.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// List all VMs on this host.
    pub async fn list_vms(&self) -> Result<Vec<VmInfo>, ProviderError> {
        let args = ["list", "--full"];
        let command = self.command_line(&args);
        debug!("Running {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| ProviderError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProviderError::Command {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_vm_list(&stdout))
    }

    /// Run `qm <verb> <vmid>`.
    pub async fn run(&self, directive: &Directive) -> Result<(), ActuationError> {
        let Directive { handle, action } = *directive;
        let id = handle.to_string();
        info!("{}", self.command_line(&[action.verb(), id.as_str()]));

        let output = Command::new(&self.binary)
            .args([action.verb(), id.as_str()])
            .output()
            .await
            .map_err(|source| ActuationError::Spawn {
                handle,
                action,
                source,
            })?;

        if !output.status.success() {
            return Err(ActuationError::Failed {
                handle,
                action,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ActualStateProvider for QmClient {
    async fn fetch(&self) -> Result<ActualState, ProviderError> {
        let vms = self.list_vms().await?;
        Ok(actual_from_vms(vms))
    }
}

#[async_trait]
impl Actuator for QmClient {
    async fn apply(&self, directive: &Directive) -> Result<(), ActuationError> {
        self.run(directive).await
    }
}

/// Parse `qm list` output.
///
/// Takes the first three whitespace-separated tokens of each line as
/// VMID, name and status; further columns are ignored. Lines whose first
/// token is not a VMID (the header, blank lines) are skipped.
///
/// ```text
///       VMID NAME                 STATUS     MEM(MB)    BOOTDISK(GB) PID
///        100 tax                  running    6144              60.00 1954081
/// ```
pub fn parse_vm_list(output: &str) -> Vec<VmInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let parsed = match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(id), Some(name), Some(state)) if id.bytes().all(|b| b.is_ascii_digit()) => {
                    id.parse::<u32>().ok().map(|id| VmInfo {
                        id: VmId(id),
                        name: name.to_string(),
                        state: PowerState::parse(state),
                    })
                }
                _ => None,
            };
            if parsed.is_none() && !line.trim().is_empty() {
                debug!("Skipping qm list line: {:?}", line);
            }
            parsed
        })
        .collect()
}

/// Index VMs by name. Later entries win on duplicate names.
pub fn actual_from_vms(vms: impl IntoIterator<Item = VmInfo>) -> ActualState {
    let mut actual = ActualState::new();
    for vm in vms {
        let record = VmRecord {
            handle: vm.id,
            power_state: vm.state,
        };
        if let Some(previous) = actual.insert(vm.name.clone(), record) {
            warn!(
                "Duplicate VM name {} (VMIDs {} and {}), using {}",
                vm.name, previous.handle, vm.id, vm.id
            );
        }
    }
    actual
}
