//! JSON to Arrow conversion
//!
//! Builds Arrow record batches from JSON payloads (the holiday API returns
//! a JSON array of objects) and renders batches back to JSON rows for
//! inspection.

use crate::error::{Error, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, ListArray, NullArray,
    StringArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{
    DataType, Date32Type, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, Schema,
};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::Arc;

/// Infer an Arrow schema from a set of JSON records
///
/// Fields appear in first-seen order. Every field is nullable; a key that
/// only ever holds `null` stays [`DataType::Null`].
pub fn infer_schema(records: &[Value]) -> Result<Schema> {
    let mut fields: Vec<(String, DataType)> = Vec::new();

    for record in records {
        let Value::Object(obj) = record else {
            return Err(Error::output(format!(
                "Expected JSON objects, found: {}",
                truncate(&record.to_string())
            )));
        };
        for (key, value) in obj {
            let inferred = infer_type(value);
            match fields.iter_mut().find(|(name, _)| name == key) {
                Some((_, existing)) => *existing = merge_types(existing, &inferred),
                None => fields.push((key.clone(), inferred)),
            }
        }
    }

    Ok(Schema::new(
        fields
            .into_iter()
            .map(|(name, dtype)| Field::new(name, dtype, true))
            .collect::<Vec<_>>(),
    ))
}

/// Convert JSON records to an Arrow RecordBatch
///
/// Uses the provided schema or infers one from the data.
pub fn json_to_arrow(records: &[Value], schema: Option<&Schema>) -> Result<RecordBatch> {
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => infer_schema(records)?,
    };
    let schema = Arc::new(schema);

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let values: Vec<Option<&Value>> = records
                .iter()
                .map(|record| record.get(field.name()))
                .collect();
            build_array(&values, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() => DataType::Int64,
        Value::Number(_) => DataType::Float64,
        Value::String(_) => DataType::Utf8,
        Value::Array(items) => {
            let element = items
                .iter()
                .map(infer_type)
                .reduce(|a, b| merge_types(&a, &b))
                .unwrap_or(DataType::Null);
            DataType::List(Arc::new(Field::new("item", element, true)))
        }
        // Nested objects are kept as their JSON text
        Value::Object(_) => DataType::Utf8,
    }
}

fn merge_types(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        (DataType::List(x), DataType::List(y)) => DataType::List(Arc::new(Field::new(
            "item",
            merge_types(x.data_type(), y.data_type()),
            true,
        ))),
        _ => DataType::Utf8,
    }
}

fn build_array(values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    let array: ArrayRef = match data_type {
        DataType::Null => Arc::new(NullArray::new(values.len())),
        DataType::Boolean => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(Value::as_bool))
                .collect::<BooleanArray>(),
        ),
        DataType::Int64 => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(Value::as_i64))
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect::<Float64Array>(),
        ),
        DataType::List(field) => build_list_array(values, field)?,
        // Everything else is rendered as text
        _ => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect::<StringArray>(),
        ),
    };
    Ok(array)
}

fn build_list_array(values: &[Option<&Value>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];
    let mut validity: Vec<bool> = Vec::with_capacity(values.len());

    for value in values {
        match value {
            Some(Value::Array(arr)) => {
                items.extend(arr.iter().map(Some));
                validity.push(true);
            }
            _ => validity.push(false),
        }
        let offset = i32::try_from(items.len())
            .map_err(|_| Error::output("Array too large for i32 offset"))?;
        offsets.push(offset);
    }

    let child = build_array(&items, field.data_type())?;
    let list = ListArray::try_new(
        Arc::clone(field),
        OffsetBuffer::new(offsets.into()),
        child,
        Some(validity.into()),
    )?;
    Ok(Arc::new(list))
}

/// Convert an Arrow RecordBatch to JSON records
///
/// Returns one JSON object per row. Dates render as `YYYY-MM-DD`.
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<Value>> {
    let schema = batch.schema();
    (0..batch.num_rows())
        .map(|row| {
            let mut record = serde_json::Map::new();
            for (field, column) in schema.fields().iter().zip(batch.columns()) {
                record.insert(field.name().clone(), array_value_to_json(column, row)?);
            }
            Ok(Value::Object(record))
        })
        .collect()
}

fn array_value_to_json(array: &ArrayRef, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => array.as_primitive::<Int8Type>().value(row).into(),
        DataType::Int16 => array.as_primitive::<Int16Type>().value(row).into(),
        DataType::Int32 => array.as_primitive::<Int32Type>().value(row).into(),
        DataType::Int64 => array.as_primitive::<Int64Type>().value(row).into(),
        DataType::Float32 => float_to_json(f64::from(array.as_primitive::<Float32Type>().value(row))),
        DataType::Float64 => float_to_json(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Date32 => array
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string())),
        DataType::List(_) => {
            let values = array.as_list::<i32>().value(row);
            let items = (0..values.len())
                .map(|i| array_value_to_json(&values, i))
                .collect::<Result<Vec<_>>>()?;
            Value::Array(items)
        }
        other => {
            return Err(Error::output(format!(
                "Unsupported type for JSON rendering: {other}"
            )))
        }
    };
    Ok(value)
}

fn float_to_json(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn truncate(text: &str) -> String {
    text.chars().take(80).collect()
}
