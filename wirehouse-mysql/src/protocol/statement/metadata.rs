use std::collections::HashMap;

use crate::protocol::statement::UNSIGNED_FLAG;
use crate::protocol::{ColumnDefinition, ColumnType};

/// What the connection remembers about one prepared statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementMetadata {
    pub statement_id: u32,
    pub query: String,
    pub params: Vec<ColumnDefinition>,

    /// Type and flag byte of each parameter as last bound by the client.
    pub param_types: Vec<(ColumnType, u8)>,

    pub columns: Vec<ColumnDefinition>,

    /// Parameter data sent through `COM_STMT_SEND_LONG_DATA`, keyed by parameter index.
    pub long_data: HashMap<u16, Vec<u8>>,
}

impl StatementMetadata {
    pub fn new(
        statement_id: u32,
        query: String,
        params: Vec<ColumnDefinition>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        let param_types = params
            .iter()
            .map(|param| {
                let flag = if param.is_unsigned() { UNSIGNED_FLAG } else { 0 };
                (param.ty, flag)
            })
            .collect();

        Self {
            statement_id,
            query,
            params,
            param_types,
            columns,
            long_data: HashMap::new(),
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Append a chunk of long data. Chunks for a parameter index the statement does not
    /// have are dropped and `false` is returned.
    pub fn append_long_data(&mut self, param_id: u16, data: &[u8]) -> bool {
        if usize::from(param_id) >= self.params.len() {
            return false;
        }

        self.long_data
            .entry(param_id)
            .or_default()
            .extend_from_slice(data);

        true
    }
}

/// Prepared statements of one connection and the allocator for their ids.
#[derive(Debug)]
pub struct Statements {
    statements: HashMap<u32, StatementMetadata>,
    next_id: u32,
    capacity: usize,
}

impl Statements {
    pub fn new(capacity: usize) -> Self {
        Self {
            statements: HashMap::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Whether another statement would exceed the per-connection limit.
    pub fn is_full(&self) -> bool {
        self.statements.len() >= self.capacity
    }

    /// Hand out the next statement id. Ids increase monotonically and skip `0` (and any
    /// id still in use) when they wrap.
    pub fn next_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);

            if id != 0 && !self.statements.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn insert(&mut self, metadata: StatementMetadata) {
        self.statements.insert(metadata.statement_id, metadata);
    }

    pub fn get(&self, statement_id: u32) -> Option<&StatementMetadata> {
        self.statements.get(&statement_id)
    }

    pub fn get_mut(&mut self, statement_id: u32) -> Option<&mut StatementMetadata> {
        self.statements.get_mut(&statement_id)
    }

    pub fn remove(&mut self, statement_id: u32) -> Option<StatementMetadata> {
        self.statements.remove(&statement_id)
    }

    /// Remove every statement, returning their ids.
    pub fn clear(&mut self) -> Vec<u32> {
        self.statements.drain().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
