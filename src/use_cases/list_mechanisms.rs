//! Signing mechanisms a token offers for its own key

use tracing::{debug, warn};

use crate::error::TokenSignResult;
use crate::logic::filter_mechanisms;
use crate::model::{MechanismDescriptor, SlotId};
use crate::ports::{RuntimeLoader, TokenRuntime};

use super::resolve_key::key_family_on;
use super::session::locate_slot;

/// Mechanisms of `slot` that can sign and fit the token's key family
///
/// Order follows the slot's advertised order; callers use the first entry
/// as the default. A mechanism whose info cannot be read is skipped.
pub fn list_signing_mechanisms<L: RuntimeLoader>(
    loader: &L,
    slot: SlotId,
) -> TokenSignResult<Vec<MechanismDescriptor>> {
    let runtime = loader.load()?;
    let slot = locate_slot(&runtime, slot)?;
    let family = key_family_on(&runtime, slot);

    let advertised = runtime.mechanism_list(slot)?;
    let infos: Vec<_> = advertised
        .into_iter()
        .filter_map(|mechanism| match runtime.mechanism_info(slot, mechanism) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Skipping {} on slot {}: {}", mechanism, slot, e);
                None
            }
        })
        .collect();

    let mechanisms = filter_mechanisms(&infos, family);
    debug!(
        "{} of {} mechanisms usable with the {} key on slot {}",
        mechanisms.len(),
        infos.len(),
        family,
        slot
    );
    Ok(mechanisms)
}
