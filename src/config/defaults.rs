// ABOUTME: Well-known names and addresses of the cluster being brought up.
// ABOUTME: Used as defaults by the settings file, the CLI, and the pre-flight chain.

/// Oldest engine API version the cluster images are known to work with.
pub const MIN_API_VERSION: &[u64] = &[1, 22];

/// Service network the engine must treat as an insecure registry range.
pub const INSECURE_REGISTRY_CIDR: &str = "172.30.0.0/16";

/// Cluster IP of the integrated registry, always exempt from proxying.
pub const REGISTRY_CLUSTER_IP: &str = "172.30.1.1";

/// Name of the long-lived cluster container.
pub const WORKLOAD_CONTAINER: &str = "origin";

pub const DEFAULT_IMAGE_PREFIX: &str = "openshift";
pub const ORIGIN_IMAGE_NAME: &str = "origin";
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Host binary required when ports are forwarded instead of bound directly.
pub const HELPER_BINARY: &str = "socat";

/// Settings file looked up in the working directory.
pub const SETTINGS_FILENAME: &str = "cluster-up.yml";
