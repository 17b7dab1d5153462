//! Reconciliation of desired power flags against hypervisor state.
//!
//! Pure: compares the two maps joined by entity name and returns the
//! directives needed to converge. Applying them is the actuator's job.

pub mod vm;

use tracing::{debug, warn};

use crate::model::{ActualState, DesiredState, Directive, PowerState, VmRecord};

/// Compute the directives that move `actual` toward `desired`.
///
/// Only names present in both maps are considered. At most one directive is
/// produced per entity. Output is ordered by VM id.
pub fn reconcile(desired: &DesiredState, actual: &ActualState) -> Vec<Directive> {
    let mut directives: Vec<Directive> = desired
        .iter()
        .filter_map(|(name, want)| {
            let VmRecord {
                handle,
                power_state,
            } = actual.get(name)?;

            if let PowerState::Other(state) = power_state {
                debug!("VM {} ({}) is {}, leaving it alone", name, handle, state);
            }

            vm::decide(want, power_state).map(|action| Directive {
                handle: *handle,
                action,
            })
        })
        .collect();

    directives.sort_by(|a, b| {
        a.handle
            .cmp(&b.handle)
            .then_with(|| a.action.verb().cmp(b.action.verb()))
    });
    for dropped in drop_duplicate_handles(&mut directives) {
        warn!(
            "VM {} is targeted by more than one entity, dropping {}",
            dropped.handle, dropped
        );
    }
    directives
}

/// Keep the first directive per VMID in an id-sorted list and return the
/// ones removed.
fn drop_duplicate_handles(directives: &mut Vec<Directive>) -> Vec<Directive> {
    let mut dropped = Vec::new();
    directives.dedup_by(|later, kept| {
        let duplicate = later.handle == kept.handle;
        if duplicate {
            dropped.push(*later);
        }
        duplicate
    });
    dropped
}
