//! Script tag extraction

use crate::patterns::TAGGED_INSERT;

/// Find the script's short identifier
///
/// The tag is the first `temp_id` value inserted by the script, i.e. the
/// `'<tag>'` in `INSERT INTO <table> (temp_id, ...) VALUES ('<tag>', ...)`.
#[must_use]
pub fn extract_script_tag(body: &str) -> Option<&str> {
    TAGGED_INSERT
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|tag| tag.as_str())
}
