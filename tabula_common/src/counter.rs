//! Counter strings shown next to the filter box and the table header

/// Text for the filter match counter.
///
/// A server side table only knows the size of the current page and the page
/// count, so with more than one page the count is a lower bound.
pub fn filter_counter_text(
    item_count: usize,
    pages_count: u32,
    page_size: u32,
) -> String {
    let count = if pages_count > 1 {
        format!("{}+", u64::from(page_size) * u64::from(pages_count - 1))
    } else {
        item_count.to_string()
    };

    if count == "1" {
        "1 match".to_string()
    } else {
        format!("{count} matches")
    }
}

/// Text for the header counter, such as `(120+)` or `(2/120+)`.
///
/// `selected_count` is the whole selection, including ids the next reload
/// may still drop.
pub fn header_counter_text(total_count: u64, selected_count: usize) -> String {
    if selected_count > 0 {
        format!("({selected_count}/{total_count}+)")
    } else {
        format!("({total_count}+)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_counter() {
        assert_eq!(filter_counter_text(1, 1, 30), "1 match");
        assert_eq!(filter_counter_text(0, 0, 30), "0 matches");
        assert_eq!(filter_counter_text(12, 1, 30), "12 matches");
        assert_eq!(filter_counter_text(30, 4, 30), "90+ matches");
    }

    #[test]
    fn header_counter() {
        assert_eq!(header_counter_text(150, 0), "(150+)");
        assert_eq!(header_counter_text(150, 3), "(3/150+)");
    }
}
