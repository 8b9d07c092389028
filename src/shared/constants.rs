/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default number of results returned by a file search
pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

// =============================================================================
// STORAGE CONSTANTS
// =============================================================================

/// Public URL prefix for files written by the local disk provider
pub const LOCAL_URL_PREFIX: &str = "/uploads";

/// Marker file written and removed by storage connectivity tests
pub const CONNECTION_TEST_MARKER: &str = ".connection-test";

/// Header carrying the caller's owner id
pub const OWNER_ID_HEADER: &str = "x-owner-id";
