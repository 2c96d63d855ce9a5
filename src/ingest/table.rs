use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;

use crate::types::{AppResult, PlannerError};

/// A header row plus string cells. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Row count before any preview truncation
    pub total_rows: usize,
}

impl Table {
    /// Build a table whose first record is the header row.
    pub fn from_records(records: Vec<Vec<String>>) -> Self {
        let mut records = records.into_iter();
        let headers = records.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = records.collect();
        let total_rows = rows.len();
        Self { headers, rows, total_rows }
    }

    pub fn parse_csv(bytes: &[u8]) -> Result<Self, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        let total_rows = rows.len();
        Ok(Self { headers, rows, total_rows })
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    pub fn head(&self, n: usize) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
            total_rows: self.total_rows,
        }
    }

    /// Serialize the full table (header first) as CSV.
    pub fn to_csv(&self) -> AppResult<String> {
        let mut wtr = WriterBuilder::new().flexible(true).from_writer(Vec::new());

        if !self.headers.is_empty() {
            wtr.write_record(&self.headers).map_err(csv_error)?;
        }
        for row in self.rows.iter().filter(|r| !r.is_empty()) {
            wtr.write_record(row).map_err(csv_error)?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| PlannerError::Internal(format!("CSV writer flush failed: {}", e.error())))?;
        String::from_utf8(data).map_err(|e| PlannerError::Internal(format!("CSV output was not UTF-8: {}", e)))
    }
}

fn csv_error(e: csv::Error) -> PlannerError {
    PlannerError::Internal(format!("CSV serialization failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_reserialize() {
        let table = Table::parse_csv(b"app,tier\ncrm,\"web, db\"\nerp,batch\n").unwrap();
        assert_eq!(table.headers, vec!["app", "tier"]);
        assert_eq!(table.total_rows, 2);
        assert_eq!(table.rows[0][1], "web, db");

        let csv = table.to_csv().unwrap();
        assert_eq!(csv, "app,tier\ncrm,\"web, db\"\nerp,batch\n");
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let table = Table::parse_csv(b"a,b,c\n1,2\n3,4,5,6\n").unwrap();
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.rows[1].len(), 4);
        assert!(table.to_csv().unwrap().contains("3,4,5,6"));
    }

    #[test]
    fn test_head_keeps_total() {
        let table = Table::from_records(vec![
            vec!["h".to_string()],
            vec!["1".to_string()],
            vec!["2".to_string()],
            vec!["3".to_string()],
        ]);
        let head = table.head(2);
        assert_eq!(head.rows.len(), 2);
        assert_eq!(head.total_rows, 3);
    }

    #[test]
    fn test_empty_records() {
        let table = Table::from_records(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.to_csv().unwrap(), "");
    }
}
