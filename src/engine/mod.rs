// ABOUTME: Container engine boundary: capability trait, bollard adapter, endpoint detection.
// ABOUTME: Everything above this module talks to the engine through EngineClient only.

mod bollard;
mod client;
mod detection;
mod error;

pub use self::bollard::{BollardEngine, DEFAULT_CALL_TIMEOUT};
pub use client::{
    ContainerInspection, ContainerSpec, CreatedContainer, EngineClient, EngineInfo, OutputChunk,
    OutputStream, ServerVersion, WaitCondition,
};
pub use detection::{DetectionError, EngineEndpoint, EngineKind, detect_local};
pub use error::EngineError;
