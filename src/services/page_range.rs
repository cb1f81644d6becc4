use std::collections::BTreeSet;

/// Parse a 1-based page-range expression like `"1-3, 5, 7-10"` into sorted,
/// unique 0-based page indices below `total_pages`.
///
/// Malformed tokens are skipped rather than reported, and a reversed range such
/// as `5-2` selects nothing.
pub fn parse_page_range(input: &str, total_pages: usize) -> Vec<usize> {
    let mut pages = BTreeSet::new();

    if total_pages == 0 {
        return Vec::new();
    }

    for part in input.split(',') {
        let token: String = part.chars().filter(|c| !c.is_whitespace()).collect();
        if token.is_empty() {
            continue;
        }

        let Some((start, end)) = parse_token(&token) else {
            tracing::debug!(token = %token, "Skipping malformed page range token");
            continue;
        };

        // Clamp to the document so huge ranges never iterate past the last page
        let first = start.max(1);
        let last = end.min(total_pages as u64);
        for page in first..=last {
            pages.insert(page as usize - 1);
        }
    }

    pages.into_iter().collect()
}

/// Inclusive 1-based bounds of a single token, or `None` when it is malformed.
fn parse_token(token: &str) -> Option<(u64, u64)> {
    let bounds: Vec<&str> = token.split('-').collect();
    match bounds.as_slice() {
        [single] => {
            let page = single.parse::<u64>().ok()?;
            Some((page, page))
        }
        [start, end] => {
            let start = start.parse::<u64>().ok()?;
            let end = end.parse::<u64>().ok()?;
            Some((start, end))
        }
        _ => None,
    }
}
