// src/transform/keys.rs

use crate::error::{EtlError, Result};
use arrow::{
    array::{Array, BooleanArray, StringArray, UInt32Array},
    compute::filter_record_batch,
    record_batch::RecordBatch,
    row::{RowConverter, SortField},
};
use std::collections::{HashMap, HashSet};

/// Stable factorization: each distinct value gets the next code in order of
/// first appearance. Missing values count as one more distinct value, so
/// every row gets a code.
pub fn factorize(values: &StringArray) -> Result<UInt32Array> {
    let mut codes: HashMap<Option<&str>, u32> = HashMap::new();
    let mut out = Vec::with_capacity(values.len());
    for v in values.iter() {
        let code = match codes.get(&v) {
            Some(c) => *c,
            None => {
                let c = u32::try_from(codes.len()).map_err(|_| EtlError::KeySpaceExhausted)?;
                codes.insert(v, c);
                c
            }
        };
        out.push(code);
    }
    Ok(UInt32Array::from(out))
}

/// Drop rows that exactly repeat an earlier row across every column.
pub fn drop_duplicate_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    if batch.num_columns() == 0 || batch.num_rows() < 2 {
        return Ok(batch.clone());
    }

    let sort_fields = batch
        .schema()
        .fields()
        .iter()
        .map(|f| SortField::new(f.data_type().clone()))
        .collect();
    let converter = RowConverter::new(sort_fields)?;
    let rows = converter.convert_columns(batch.columns())?;

    let mut seen = HashSet::with_capacity(rows.num_rows());
    let keep: BooleanArray = rows.iter().map(|row| Some(seen.insert(row))).collect();
    if keep.true_count() == batch.num_rows() {
        return Ok(batch.clone());
    }
    filter_record_batch(batch, &keep).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::ArrayRef;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_factorize_first_occurrence_order() {
        let ids = StringArray::from(vec![Some("z"), Some("a"), Some("z"), None, Some("m"), Some("a")]);
        let codes = factorize(&ids).unwrap();
        assert_eq!(codes.values().to_vec(), vec![0, 1, 0, 2, 3, 1]);
        assert_eq!(codes.null_count(), 0);
    }

    #[test]
    fn test_factorize_missing_values_share_one_code() {
        let ids = StringArray::from(vec![None, Some("a"), None, Some("b")]);
        let codes = factorize(&ids).unwrap();
        assert_eq!(codes.values().to_vec(), vec![0, 1, 0, 2]);
        assert_eq!(codes.null_count(), 0);
    }

    #[test]
    fn test_factorize_is_deterministic() {
        let ids = StringArray::from(vec!["b7", "a1", "c3", "a1", "b7"]);
        let first = factorize(&ids).unwrap();
        for _ in 0..5 {
            assert_eq!(factorize(&ids).unwrap(), first);
        }
    }

    #[test]
    fn test_drop_duplicate_rows_keeps_first() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("k", DataType::UInt32, true),
            Field::new("v", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt32Array::from(vec![0, 0, 1, 0])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("x"), Some("x"), Some("x"), None])),
            ],
        )
        .unwrap();

        let out = drop_duplicate_rows(&batch).unwrap();
        assert_eq!(out.num_rows(), 3);
        let v = out.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(v.value(0), "x");
        assert!(v.is_null(2));
    }
}
