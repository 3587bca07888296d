//! Outbound adapters implementing domain ports for external services.
//!
//! - **directory**: the HR directory REST API (`DirectorySource`)
//! - **identity**: the local identity service (`IdentitySource`)
//!
//! Adapters are thin translators between wire formats and domain types. They
//! contain no business logic.

pub mod directory;
pub mod identity;

/// Whitespace-compacted, length-capped rendering of an error body for logs.
fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::body_preview;

    #[test]
    fn preview_compacts_and_truncates() {
        assert_eq!(body_preview(b"  a\n\n b  "), "a b");
        let long = "x".repeat(200);
        let preview = body_preview(long.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }
}
