//! Narrowing a slot's advertised mechanisms to usable signing mechanisms

use crate::model::{KeyFamily, MechanismDescriptor, MechanismInfo};

/// Keep sign-capable mechanisms that are valid for `family`
///
/// Slot order is preserved, so the first entry is the natural default.
pub fn filter_mechanisms(infos: &[MechanismInfo], family: KeyFamily) -> Vec<MechanismDescriptor> {
    infos
        .iter()
        .filter(|info| info.can_sign && family.allows(info.id))
        .map(|info| MechanismDescriptor::from(*info))
        .collect()
}
