use crate::filter::RowFilter;
use crate::result_set::{QueryRow, ResultSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridState {
    Empty,
    Populated,
}

/// The result grid: the column set and master rows of the last successful
/// query, plus the rows currently shown through the active filter.
#[derive(Debug, Clone)]
pub struct GridModel {
    state: GridState,
    columns: Vec<String>,
    rows: Vec<QueryRow>,
    filter: RowFilter,
    visible: Vec<usize>,
}

impl Default for GridModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GridModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: GridState::Empty,
            columns: Vec::new(),
            rows: Vec::new(),
            filter: RowFilter::pass_through(),
            visible: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> GridState {
        self.state
    }

    /// Replaces columns and rows wholesale and resets the filter to show all.
    /// Every row is cut or padded to the column count so the filter only
    /// sees cells that are shown.
    pub fn load(&mut self, result: ResultSet) {
        let width = result.columns.len();
        self.columns = result.columns;
        self.rows = result
            .rows
            .into_iter()
            .map(|mut row| {
                row.resize(width);
                row
            })
            .collect();
        self.filter = RowFilter::pass_through();
        self.visible = (0..self.rows.len()).collect();
        self.state = GridState::Populated;
    }

    /// Recomputes the shown rows from the master rows.
    pub fn set_filter(&mut self, text: &str) {
        if self.filter.text() == text {
            return;
        }
        self.filter = RowFilter::new(text);
        self.visible = self.filter.matching_indices(&self.rows);
    }

    #[must_use]
    pub fn filter_text(&self) -> &str {
        self.filter.text()
    }

    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.filter.is_pass_through()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    fn visible_rows(&self) -> impl Iterator<Item = &QueryRow> + '_ {
        self.visible.iter().map(|&index| &self.rows[index])
    }

    /// Shown row at `index`, padded to the column count.
    #[must_use]
    pub fn display_row(&self, index: usize) -> Option<Vec<&str>> {
        let row = self.rows.get(*self.visible.get(index)?)?;
        Some(row.padded(self.columns.len()))
    }

    #[must_use]
    pub fn window(&self, start: usize, limit: usize) -> Vec<Vec<&str>> {
        if limit == 0 || start >= self.visible.len() {
            return Vec::new();
        }

        let width = self.columns.len();
        self.visible_rows()
            .skip(start)
            .take(limit)
            .map(|row| row.padded(width))
            .collect()
    }
}
