//! Phone number search keys

/// Country code stripped before searching the directory
pub const COUNTRY_CODE: &str = "380";

/// Turn a raw number from the stream into a directory search key.
///
/// The directory stores numbers in mixed formats, so the search matches on
/// the number's tail. A leading `380` country code is dropped to keep the key
/// format-neutral.
///
/// ```rust
/// use callnotify_core::enrichment::phone::search_key;
///
/// assert_eq!(search_key("380501234567"), "501234567");
/// assert_eq!(search_key(" 0501234567 "), "0501234567");
/// ```
pub fn search_key(raw: &str) -> &str {
    let number = raw.trim();
    number.strip_prefix(COUNTRY_CODE).unwrap_or(number)
}
