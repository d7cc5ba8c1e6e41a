pub mod capability;
pub mod error;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use capability::{InputCapture, PresentationSurface, Reporter};
pub use error::{ExperimentError, Result};
pub use phase::{SessionPhase, TrialState};
pub use stimulus::{Drawable, Layout, Side, Tone};
pub use trial::{Key, ResponseKeys, TrialOutcome, TrialSpec, Validity};
