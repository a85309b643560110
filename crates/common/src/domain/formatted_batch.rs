use crate::domain::CellValue;
use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// Static metadata columns that lead every row, in order
pub const STATIC_COLUMNS: [&str; 4] = ["site", "ip_address", "latitude", "longitude"];

/// One typed row, positionally aligned with its batch's column names
pub type Row = Vec<CellValue>;

/// Normalized rows for one client, ready to insert into its table
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedBatch {
    /// Per-run sequence id
    pub sequence: usize,
    /// Address of the client the rows came from
    pub address: String,
    pub db_table: String,
    pub col_names: Vec<String>,
    pub data: Vec<Row>,
}

impl FormattedBatch {
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Every row has exactly one value per column
    pub fn is_consistent(&self) -> bool {
        self.data.iter().all(|row| row.len() == self.col_names.len())
    }
}

/// Most recent committed row timestamp per client address
pub type CheckpointMap = IndexMap<String, NaiveDateTime>;

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(data: Vec<Row>) -> FormattedBatch {
        FormattedBatch {
            sequence: 0,
            address: "10.0.0.5".to_string(),
            db_table: "lake_profiler".to_string(),
            col_names: vec!["site".to_string(), "record".to_string()],
            data,
        }
    }

    #[test]
    fn test_consistent_batch() {
        let batch = batch(vec![
            vec![CellValue::from("Lake"), CellValue::Integer(1)],
            vec![CellValue::from("Lake"), CellValue::Integer(2)],
        ]);
        assert!(batch.is_consistent());
        assert_eq!(batch.row_count(), 2);
    }

    #[test]
    fn test_inconsistent_batch() {
        let batch = batch(vec![vec![CellValue::from("Lake")]]);
        assert!(!batch.is_consistent());
    }
}
