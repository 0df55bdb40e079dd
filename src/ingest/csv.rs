use chrono::NaiveDate;
use duckdb::{params, Connection};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::ingest::IngestError;
use crate::ingest::schema::TableSchema;

/// One line of the CB Insights unicorn export.
#[derive(Debug, Deserialize)]
struct UnicornRecord {
    #[serde(rename = "Company")]
    company: String,
    #[serde(rename = "Valuation ($B)")]
    valuation: String,
    #[serde(rename = "Date Joined")]
    date_joined: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "Industry")]
    industry: String,
    #[serde(rename = "Select Investors")]
    select_investors: String,
}

/// `d/m/yyyy` to a date; blank means unknown.
fn parse_date(raw: &str) -> Result<Option<NaiveDate>, IngestError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .map(Some)
        .map_err(|e| IngestError::ParsingError(format!("Could not parse date '{}': {}", raw, e)))
}

/// `$1,234.5` to billions.
fn parse_valuation(raw: &str) -> Result<f64, IngestError> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .map_err(|e| {
            IngestError::ParsingError(format!("Could not parse valuation '{}': {}", raw, e))
        })
}

pub struct UnicornCsvIngestor {
    table: TableSchema,
}

impl UnicornCsvIngestor {
    pub fn new(table_name: &str) -> Self {
        Self {
            table: TableSchema::unicorns(table_name),
        }
    }

    pub fn ingest(&self, conn: &mut Connection, path: &Path) -> Result<usize, IngestError> {
        info!("Seeding {} from {}", self.table.name, path.display());
        self.ingest_reader(conn, File::open(path)?)
    }

    /// Creates the table if needed and inserts every record, skipping
    /// companies that are already present. Returns the number of records read.
    pub fn ingest_reader<R: Read>(
        &self,
        conn: &mut Connection,
        reader: R,
    ) -> Result<usize, IngestError> {
        let sequence = format!("{}_id_seq", self.table.name);
        conn.execute_batch(&format!(
            "CREATE SEQUENCE IF NOT EXISTS {};\n{}",
            sequence,
            self.table.to_create_table_sql()
        ))?;
        info!("Created \"{}\" table", self.table.name);

        let mut csv_reader = csv::Reader::from_reader(reader);
        let tx = conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (id, company, valuation, date_joined, country, city, industry, select_investors)
                 VALUES (nextval('{}'), ?, ?, CAST(? AS DATE), ?, ?, ?, ?)
                 ON CONFLICT DO NOTHING",
                self.table.name, sequence
            ))?;

            for record in csv_reader.deserialize::<UnicornRecord>() {
                let record = record?;
                let valuation = parse_valuation(&record.valuation)?;
                let date_joined = parse_date(&record.date_joined)?
                    .map(|d| d.format("%Y-%m-%d").to_string());

                stmt.execute(params![
                    record.company,
                    valuation,
                    date_joined,
                    record.country,
                    record.city,
                    record.industry,
                    record.select_investors,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;

        debug!("Read {} records", count);
        info!("Seeded {} unicorns", count);
        Ok(count)
    }
}
