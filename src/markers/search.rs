use super::marker::Marker;

/// Maximum number of results returned by [`search`].
pub const MAX_RESULTS: usize = 10;

/// Case-insensitive substring match on the display name of placed markers.
///
/// An empty or blank query matches nothing.
pub fn search<'a>(markers: &'a [Marker], query: &str) -> Vec<&'a Marker> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    markers
        .iter()
        .filter(|m| m.is_placed())
        .filter(|m| m.display_name().to_lowercase().contains(&query))
        .take(MAX_RESULTS)
        .collect()
}
