#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryRow {
    pub values: Vec<String>,
}

impl QueryRow {
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Cell text at `index`, or `""` when the row is shorter than that.
    #[must_use]
    pub fn cell(&self, index: usize) -> &str {
        self.values.get(index).map_or("", String::as_str)
    }

    /// Cuts or pads the row in place to exactly `width` cells.
    pub fn resize(&mut self, width: usize) {
        self.values.resize(width, String::new());
    }

    /// Exactly `width` cells: missing trailing cells become empty strings.
    #[must_use]
    pub fn padded(&self, width: usize) -> Vec<&str> {
        (0..width).map(|index| self.cell(index)).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for QueryRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Column names and rows captured by one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<QueryRow>,
}

impl ResultSet {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
