//! Deterministic ranking and pagination of search results.
//!
//! Bars are ordered by rating (highest first), then distance (closest
//! first), then provider id. The order depends only on the bars
//! themselves, so repeated searches paginate identically.

use crate::error::PageError;
use barbot_core::Bar;
use std::cmp::Ordering;

/// Total order used for ranking.
fn compare(a: &Bar, b: &Bar) -> Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| a.distance_meters.total_cmp(&b.distance_meters))
        .then_with(|| a.id.cmp(&b.id))
}

/// Ranks bars by rating, distance, and id.
#[must_use]
pub fn rank(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by(compare);
    bars
}

/// Number of pages needed to show `len` results; an empty result still
/// has one (empty) page.
#[must_use]
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Index of the last page for `len` results.
#[must_use]
pub fn last_page(len: usize, page_size: usize) -> usize {
    page_count(len, page_size) - 1
}

/// Returns the bars on page `page_index`.
///
/// # Errors
///
/// Returns [`PageError::InvalidPage`] if `page_size` is zero or the page
/// starts beyond the end of `ranked`.
pub fn paginate(ranked: &[Bar], page_index: usize, page_size: usize) -> Result<&[Bar], PageError> {
    let invalid = || PageError::InvalidPage {
        page_index,
        page_size,
        len: ranked.len(),
    };

    if page_size == 0 {
        return Err(invalid());
    }
    let start = page_index.checked_mul(page_size).ok_or_else(invalid)?;
    if start > ranked.len() {
        return Err(invalid());
    }
    let end = start.saturating_add(page_size).min(ranked.len());
    Ok(&ranked[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use barbot_core::Location;
    use std::collections::BTreeSet;

    fn bar(id: &str, rating: f64, distance: f64) -> Bar {
        Bar {
            id: id.to_string(),
            name: id.to_string(),
            coordinates: Location::new(40.0, -73.0),
            rating,
            distance_meters: distance,
            address: String::new(),
            phone: None,
            categories: BTreeSet::new(),
        }
    }

    fn ids(bars: &[Bar]) -> Vec<&str> {
        bars.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn ranks_by_rating_then_distance() {
        let bars = vec![
            bar("bar_a", 4.5, 200.0),
            bar("bar_b", 4.0, 150.0),
            bar("bar_c", 4.5, 300.0),
        ];

        let ranked = rank(bars);

        assert_eq!(ids(&ranked), vec!["bar_a", "bar_c", "bar_b"]);
    }

    #[test]
    fn full_ties_break_by_id() {
        let ranked = rank(vec![bar("z", 4.0, 10.0), bar("m", 4.0, 10.0), bar("a", 4.0, 10.0)]);
        assert_eq!(ids(&ranked), vec!["a", "m", "z"]);
    }

    #[test]
    fn ranking_is_idempotent_and_order_independent() {
        let bars = vec![
            bar("a", 3.0, 50.0),
            bar("b", 5.0, 500.0),
            bar("c", 5.0, 100.0),
            bar("d", 3.0, 50.0),
        ];
        let mut reversed = bars.clone();
        reversed.reverse();

        let once = rank(bars);
        assert_eq!(rank(once.clone()), once);
        assert_eq!(rank(reversed), once);
    }

    #[test]
    fn pages_concatenate_to_full_sequence() {
        let ranked = rank(
            (0..13)
                .map(|i| bar(&format!("b{i:02}"), f64::from(i % 5), f64::from(i)))
                .collect(),
        );

        for page_size in 1..=14 {
            let rebuilt: Vec<Bar> = (0..page_count(ranked.len(), page_size))
                .flat_map(|page| {
                    paginate(&ranked, page, page_size)
                        .expect("valid page")
                        .to_vec()
                })
                .collect();
            assert_eq!(rebuilt, ranked, "page size {page_size}");
        }
    }

    #[test]
    fn paginate_rejects_pages_past_the_end() {
        let ranked = rank(vec![bar("a", 1.0, 1.0), bar("b", 1.0, 2.0)]);

        assert_eq!(paginate(&ranked, 1, 2).expect("empty tail page").len(), 0);
        assert!(matches!(
            paginate(&ranked, 2, 2),
            Err(PageError::InvalidPage { page_index: 2, .. })
        ));
        assert!(paginate(&ranked, 0, 0).is_err());
        assert!(paginate(&ranked, usize::MAX, 2).is_err());
    }

    #[test]
    fn page_count_and_last_page() {
        assert_eq!(page_count(0, 6), 1);
        assert_eq!(page_count(6, 6), 1);
        assert_eq!(page_count(7, 6), 2);
        assert_eq!(last_page(0, 6), 0);
        assert_eq!(last_page(13, 6), 2);
    }
}
