/// Default configuration constants used across the system.

/// Default API port.
pub const DEFAULT_API_PORT: u16 = 9000;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Datastore file name under the state directory.
pub const STORE_FILE_NAME: &str = "harbormaster.db";

/// Length of the generated JWT secret when none is configured.
pub const GENERATED_JWT_SECRET_LEN: usize = 32;
