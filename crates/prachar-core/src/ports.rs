//! Port definitions for Hexagonal Architecture
//!
//! These traits define the boundaries between the publishing core and its
//! collaborators: the messaging surface and the durable step log.

pub mod step_log;
pub mod surface;

pub use step_log::{StepEvent, StepLogError, StepLogPort, StepOperation, StepPhase};
pub use surface::{
    MessageId, MessagingSurfacePort, SendMediaRequest, SurfaceError, SurfaceErrorKind,
    SurfaceReceipt,
};
