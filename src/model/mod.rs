mod key_family;
mod mechanism;
mod object;
mod pin;
mod signature;
mod token;

pub use key_family::KeyFamily;
pub use mechanism::{MechanismDescriptor, MechanismError, MechanismId, MechanismInfo};
pub use object::{ObjectClass, ObjectQuery, SessionMode};
pub use pin::{Pin, PinError};
pub use signature::{ArtifactError, SignatureArtifact};
pub use token::{SlotId, TokenHandle};
