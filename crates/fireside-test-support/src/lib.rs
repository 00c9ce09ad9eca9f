//! Shared test doubles for the Fireside session engine.

mod clock;
mod illustrate;
mod narrate;
mod rng;
mod store;
mod transport;

pub use clock::FixedClock;
pub use illustrate::{FailingIllustrator, RecordingIllustrator};
pub use narrate::{FailingNarrator, ScriptedNarrator};
pub use rng::{MockRng, SequenceRng};
pub use store::FailingRecordStore;
pub use transport::{LoopbackTransport, RecordingTransport};
