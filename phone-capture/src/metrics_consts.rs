pub const LINES_READ: &str = "phone_capture_lines_read";
pub const BLANK_LINES: &str = "phone_capture_blank_lines";
pub const MATCHES_FOUND: &str = "phone_capture_matches_found";
pub const MESSAGES_PUBLISHED: &str = "phone_capture_messages_published";
pub const DELIVERIES_SUCCEEDED: &str = "phone_capture_deliveries_succeeded";
pub const DELIVERIES_FAILED: &str = "phone_capture_deliveries_failed";
pub const IN_FLIGHT_DROPPED: &str = "phone_capture_in_flight_dropped";
