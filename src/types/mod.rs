// ABOUTME: Validated domain types shared by the engine, runner, and probe.
// ABOUTME: Container ids and names, image references, bind mounts, API versions.

mod api_version;
mod bind_mount;
mod container_name;
mod id;
mod image_ref;

pub use api_version::{ApiVersion, ParseApiVersionError};
pub use bind_mount::{BindMount, BindMountError, MountMode};
pub use container_name::{ContainerName, ContainerNameError};
pub use id::ContainerId;
pub use image_ref::{ImageRef, ParseImageRefError};
