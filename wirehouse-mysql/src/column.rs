use crate::collation::Collation;
use crate::protocol::{ColumnDefinition, ColumnFlags, ColumnType};

/// A result column or statement parameter as described by a backend.
///
/// ```rust,ignore
/// let id = MySqlColumn::new("id", ColumnType::LongLong)
///     .table("users")
///     .unsigned()
///     .not_null();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlColumn {
    def: ColumnDefinition,
}

impl MySqlColumn {
    /// A column with a character set and display width typical for `ty`.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        let collation = if is_text(ty) {
            Collation::UTF8MB4_GENERAL_CI
        } else {
            Collation::BINARY
        };

        let mut flags = ColumnFlags::empty();
        if collation == Collation::BINARY {
            flags |= ColumnFlags::BINARY_COLLATION;
        }

        if is_numeric(ty) {
            flags |= ColumnFlags::NUM;
        }

        Self {
            def: ColumnDefinition {
                schema: String::new(),
                table_alias: String::new(),
                table: String::new(),
                alias: name.clone(),
                name,
                charset: collation.id(),
                max_size: ty.default_max_size(),
                ty,
                flags,
                decimals: 0,
            },
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.def.schema = schema.into();
        self
    }

    /// Set both the table and its alias.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.def.table = table.into();
        self.def.table_alias = self.def.table.clone();
        self
    }

    pub fn table_alias(mut self, alias: impl Into<String>) -> Self {
        self.def.table_alias = alias.into();
        self
    }

    /// Name the column is selected as; defaults to its name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.def.alias = alias.into();
        self
    }

    pub fn collation(mut self, collation: Collation) -> Self {
        self.def.charset = collation.id();
        self.def
            .flags
            .set(ColumnFlags::BINARY_COLLATION, collation == Collation::BINARY);
        self
    }

    pub fn max_size(mut self, max_size: u32) -> Self {
        self.def.max_size = max_size;
        self
    }

    pub fn decimals(mut self, decimals: u8) -> Self {
        self.def.decimals = decimals;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.def.flags |= ColumnFlags::UNSIGNED;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.def.flags |= ColumnFlags::NOT_NULL;
        self
    }

    pub fn flags(mut self, flags: ColumnFlags) -> Self {
        self.def.flags |= flags;
        self
    }

    pub fn name(&self) -> &str {
        &self.def.alias
    }

    pub fn column_type(&self) -> ColumnType {
        self.def.ty
    }

    pub fn is_unsigned(&self) -> bool {
        self.def.is_unsigned()
    }

    pub fn definition(&self) -> &ColumnDefinition {
        &self.def
    }

    pub fn into_definition(self) -> ColumnDefinition {
        self.def
    }
}

impl From<ColumnDefinition> for MySqlColumn {
    fn from(def: ColumnDefinition) -> Self {
        Self { def }
    }
}

impl From<MySqlColumn> for ColumnDefinition {
    fn from(column: MySqlColumn) -> Self {
        column.def
    }
}

fn is_text(ty: ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::VarChar
            | ColumnType::VarString
            | ColumnType::String
            | ColumnType::Enum
            | ColumnType::Set
            | ColumnType::Json
            | ColumnType::Decimal
            | ColumnType::NewDecimal
    )
}

fn is_numeric(ty: ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::Tiny
            | ColumnType::Short
            | ColumnType::Long
            | ColumnType::Int24
            | ColumnType::LongLong
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Decimal
            | ColumnType::NewDecimal
            | ColumnType::Year
    )
}
