//! Token identity as seen by the runtime when it was enumerated

use std::fmt;

/// Runtime identifier of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SlotId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token present in a slot at enumeration time
///
/// Handles are plain values: they are returned by `list_tokens` and passed
/// back by the caller. A handle goes stale when the token is pulled out;
/// every operation re-resolves the live slot and fails with
/// `TokenError::NotFound` instead of touching a dead slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHandle {
    pub slot_id: SlotId,
    pub label: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

impl TokenHandle {
    /// Build a handle from raw token info fields
    ///
    /// PKCS#11 pads these fields with blanks, so they are trimmed here.
    pub fn new(
        slot_id: impl Into<SlotId>,
        label: &str,
        manufacturer: &str,
        model: &str,
        serial_number: &str,
    ) -> Self {
        Self {
            slot_id: slot_id.into(),
            label: label.trim().to_string(),
            manufacturer: manufacturer.trim().to_string(),
            model: model.trim().to_string(),
            serial_number: serial_number.trim().to_string(),
        }
    }

    /// A handle that only carries the slot id, for callers that got the id
    /// from somewhere other than `list_tokens` (e.g. a command line flag)
    pub fn from_slot(slot_id: impl Into<SlotId>) -> Self {
        Self::new(slot_id, "", "", "", "")
    }
}

impl fmt::Display for TokenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot {}: {} ({} {}, serial {})",
            self.slot_id, self.label, self.manufacturer, self.model, self.serial_number
        )
    }
}
