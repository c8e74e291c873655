use crate::result_set::QueryRow;

/// Case-insensitive "any cell contains" predicate over result rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowFilter {
    text: String,
    needle: String,
}

impl RowFilter {
    /// Keeps every row.
    #[must_use]
    pub fn pass_through() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let needle = text.to_lowercase();
        Self { text, needle }
    }

    /// The filter text as typed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.needle.is_empty()
    }

    #[must_use]
    pub fn matches(&self, row: &QueryRow) -> bool {
        if self.is_pass_through() {
            return true;
        }
        row.values
            .iter()
            .any(|cell| cell.to_lowercase().contains(&self.needle))
    }

    /// Indices into `rows` that pass, in ascending order.
    #[must_use]
    pub fn matching_indices(&self, rows: &[QueryRow]) -> Vec<usize> {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| self.matches(row))
            .map(|(index, _)| index)
            .collect()
    }
}

#[must_use]
pub fn filter_rows<'a>(rows: &'a [QueryRow], text: &str) -> Vec<&'a QueryRow> {
    let filter = RowFilter::new(text);
    rows.iter().filter(|row| filter.matches(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::{filter_rows, RowFilter};
    use crate::result_set::QueryRow;

    fn sample_rows() -> Vec<QueryRow> {
        vec![
            ["1", "Alice"].into_iter().collect(),
            ["2", "bob"].into_iter().collect(),
            ["3", "Bobby Tables"].into_iter().collect(),
            ["4"].into_iter().collect(),
        ]
    }

    #[test]
    fn empty_text_keeps_all_rows_in_order() {
        let rows = sample_rows();
        let kept = filter_rows(&rows, "");
        assert_eq!(kept, rows.iter().collect::<Vec<_>>());
    }

    #[test]
    fn matches_any_cell_as_substring() {
        let rows = vec![
            ["1", "Alice"].into_iter().collect::<QueryRow>(),
            ["2", "bob"].into_iter().collect(),
        ];

        let by_b = filter_rows(&rows, "b");
        assert_eq!(by_b, vec![&rows[1]]);

        let by_one = filter_rows(&rows, "1");
        assert_eq!(by_one, vec![&rows[0]]);
    }

    #[test]
    fn matching_ignores_case_of_filter_and_cells() {
        let rows = sample_rows();
        for text in ["bob", "BOB", "Bob", "ali", "ALICE", "tables"] {
            assert_eq!(
                filter_rows(&rows, text),
                filter_rows(&rows, &text.to_uppercase())
            );
            assert_eq!(
                filter_rows(&rows, text),
                filter_rows(&rows, &text.to_lowercase())
            );
        }
        assert_eq!(filter_rows(&rows, "BOB").len(), 2);
    }

    #[test]
    fn result_is_an_ordered_subsequence_and_idempotent() {
        let rows = sample_rows();
        let filter = RowFilter::new("b");
        let indices = filter.matching_indices(&rows);
        assert_eq!(indices, vec![1, 2]);
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));

        let once: Vec<QueryRow> = filter_rows(&rows, "b").into_iter().cloned().collect();
        let twice: Vec<QueryRow> = filter_rows(&once, "b").into_iter().cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn no_match_yields_empty_view() {
        let rows = sample_rows();
        assert!(filter_rows(&rows, "zzz").is_empty());
    }

    #[test]
    fn filter_keeps_text_as_typed() {
        let filter = RowFilter::pass_through();
        assert!(filter.is_pass_through());
        assert_eq!(filter.text(), "");
        assert_eq!(RowFilter::new("MiXeD").text(), "MiXeD");
    }
}
