/// Marks the end of every GUI RPC message on the wire.
pub const RPC_TERMINATOR: u8 = 3;

pub const DEFAULT_RPC_HOST: &str = "localhost";
pub const DEFAULT_RPC_PORT: u16 = 31416;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9109";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

pub const METRIC_PREFIX: &str = "boinc_client_";
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Substring of a result's resource description that identifies coprocessor (GPU) work.
pub const GPU_RESOURCE_MARKER: &str = "GPU";
