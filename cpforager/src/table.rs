use chrono::NaiveDateTime;
use ndarray::Array1;

use crate::ForagerError;

/// Timestamp axis plus an ordered list of named `f64` columns.
///
/// NaN marks a missing value. Builders consume `self` and return the extended
/// table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<(String, Array1<f64>)>,
}

impl Table {
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Self {
        Self {
            timestamps,
            columns: Vec::new(),
        }
    }

    /// Append a column, replacing any column already using that name.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: impl Into<Array1<f64>>,
    ) -> Result<Self, ForagerError> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: impl Into<Array1<f64>>,
    ) -> Result<(), ForagerError> {
        let name = name.into();
        let values = values.into();
        if values.len() != self.timestamps.len() {
            return Err(ForagerError::LengthMismatch {
                column: name,
                expected: self.timestamps.len(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        Ok(())
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values)
    }

    pub fn require(&self, name: &str) -> Result<&Array1<f64>, ForagerError> {
        self.column(name)
            .ok_or_else(|| ForagerError::UnknownColumn(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Array1<f64>)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Rows where `mask` holds, in order.
    pub fn select_rows(&self, mask: &[bool]) -> Result<Table, ForagerError> {
        if mask.len() != self.len() {
            return Err(ForagerError::LengthMismatch {
                column: "mask".into(),
                expected: self.len(),
                actual: mask.len(),
            });
        }
        let keep: Vec<usize> = (0..self.len()).filter(|&i| mask[i]).collect();
        Ok(Table {
            timestamps: keep.iter().map(|&i| self.timestamps[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), keep.iter().map(|&i| values[i]).collect()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn times(n: i64) -> Vec<NaiveDateTime> {
        let t0 = NaiveDate::from_ymd_opt(2016, 9, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| t0 + chrono::Duration::seconds(i)).collect()
    }

    #[test]
    fn test_columns_keep_insertion_order() {
        let table = Table::new(times(2))
            .with_column("b", vec![1.0, 2.0])
            .unwrap()
            .with_column("a", vec![3.0, 4.0])
            .unwrap()
            .with_column("b", vec![5.0, 6.0])
            .unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table.column("b").unwrap()[1], 6.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = Table::new(times(3)).with_column("x", vec![1.0]).unwrap_err();
        assert!(matches!(err, ForagerError::LengthMismatch { expected: 3, actual: 1, .. }));
        assert!(matches!(
            Table::new(times(1)).require("x"),
            Err(ForagerError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_select_rows() {
        let table = Table::new(times(4))
            .with_column("x", vec![0.0, 1.0, 2.0, 3.0])
            .unwrap();
        let sub = table.select_rows(&[false, true, false, true]).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.timestamps()[0], table.timestamps()[1]);
        assert_eq!(sub.column("x").unwrap().to_vec(), vec![1.0, 3.0]);
        assert!(table.select_rows(&[true]).is_err());
    }
}
