use crate::column::MySqlColumn;
use crate::value::Value;

/// Rows produced by a backend, with the columns describing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<MySqlColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<MySqlColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: impl IntoIterator<Item = impl Into<Value>>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn with_row(mut self, row: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.push_row(row);
        self
    }
}

/// What a backend answers a query or statement execution with.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    ResultSet(ResultSet),

    Done {
        affected_rows: u64,
        last_insert_id: u64,
        warnings: u16,
        info: String,
    },
}

impl QueryOutcome {
    /// A statement that touched `affected_rows` rows and returned none.
    pub fn done(affected_rows: u64) -> Self {
        QueryOutcome::Done {
            affected_rows,
            last_insert_id: 0,
            warnings: 0,
            info: String::new(),
        }
    }
}

impl From<ResultSet> for QueryOutcome {
    fn from(result: ResultSet) -> Self {
        QueryOutcome::ResultSet(result)
    }
}
