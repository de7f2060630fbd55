//! Sheets API constants

/// Default REST endpoint for the Sheets v4 API
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// How cell input is interpreted on write (numbers, booleans and dates are parsed as typed in the UI)
pub const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// Appends always insert new rows instead of overwriting blank ones
pub const INSERT_DATA_OPTION: &str = "INSERT_ROWS";

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Metadata fields requested when resolving sheet ids
pub const METADATA_FIELDS: &str = "properties.title,sheets.properties";
