use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataType {
    Serial,
    Decimal(u8, u8),
    Varchar(u16),
    Text,
    Date,
}

impl DataType {
    pub fn to_sql_type(&self) -> String {
        match self {
            DataType::Serial => "INTEGER".to_string(),
            DataType::Decimal(p, s) => format!("DECIMAL({}, {})", p, s),
            DataType::Varchar(n) => format!("VARCHAR({})", n),
            DataType::Text => "TEXT".to_string(),
            DataType::Date => "DATE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub constraint: Option<String>,
}

impl ColumnSchema {
    fn new(name: &str, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable,
            constraint: None,
        }
    }

    fn with_constraint(mut self, constraint: &str) -> Self {
        self.constraint = Some(constraint.to_string());
        self
    }

    pub fn to_sql_definition(&self) -> String {
        let nullable_str = if self.nullable { "" } else { " NOT NULL" };
        let constraint = self
            .constraint
            .as_deref()
            .map(|c| format!(" {}", c))
            .unwrap_or_default();
        format!("{} {}{}{}", self.name, self.data_type.to_sql_type(), nullable_str, constraint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// The CB Insights unicorn company table.
    pub fn unicorns(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: vec![
                ColumnSchema::new("id", DataType::Serial, false).with_constraint("PRIMARY KEY"),
                ColumnSchema::new("company", DataType::Varchar(255), false)
                    .with_constraint("UNIQUE"),
                ColumnSchema::new("valuation", DataType::Decimal(10, 2), false),
                ColumnSchema::new("date_joined", DataType::Date, true),
                ColumnSchema::new("country", DataType::Varchar(255), false),
                ColumnSchema::new("city", DataType::Varchar(255), false),
                ColumnSchema::new("industry", DataType::Varchar(255), false),
                ColumnSchema::new("select_investors", DataType::Text, false),
            ],
        }
    }

    pub fn to_create_table_sql(&self) -> String {
        let columns_sql: Vec<String> = self.columns
            .iter()
            .map(|col| col.to_sql_definition())
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            self.name,
            columns_sql.join(",\n    ")
        )
    }

    // DDL handed to the model as schema context
    pub fn to_ddl(&self) -> String {
        self.to_create_table_sql()
    }
}
