pub mod buffer;
pub mod detector;
pub mod phase;
pub mod session;
pub mod trace;

pub use buffer::{FullSwing, PhaseBuffer};
pub use detector::{SwingDetector, SwingEvent, REQUIRED_KEYPOINTS};
pub use phase::SwingPhase;
pub use session::{offer_frame, SessionEvent, SwingSession};
pub use trace::{read_trace, write_trace, SyntheticSwing};
