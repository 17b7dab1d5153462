//! mvirt-switch: keeps VM power states in sync with Home Assistant.
//!
//! Every cycle the agent reads `input_boolean.proxmox_<host>_<vm>` flags
//! from Home Assistant and the VM list from `qm`, then resumes, starts or
//! suspends VMs whose power state does not match their flag.

pub mod agent;
pub mod clients;
pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
