//! TDS value decoding.
//!
//! Rows cross the accessor boundary as dynamically-typed scalars: null,
//! boolean, number, or string. Temporal values are rendered as ISO-8601
//! strings, GUIDs and binary as strings, so the presentation layer never
//! needs engine-specific types.

use sqlward_core::GatewayError;
use sqlward_engine::accessor::RawResultSet;
use tiberius::{ColumnData, FromSql, Row};

pub(crate) fn convert_results(sets: Vec<Vec<Row>>) -> Result<Vec<RawResultSet>, GatewayError> {
    sets.into_iter().map(convert_rows).collect()
}

fn convert_rows(rows: Vec<Row>) -> Result<RawResultSet, GatewayError> {
    let mut set = RawResultSet::default();
    for row in rows {
        if set.columns.is_empty() {
            set.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        let mut values = Vec::with_capacity(set.columns.len());
        for (_, data) in row.cells() {
            values.push(cell_to_json(data)?);
        }
        set.rows.push(values);
    }
    Ok(set)
}

fn cell_to_json(data: &ColumnData<'static>) -> Result<serde_json::Value, GatewayError> {
    use serde_json::Value;

    let value = match data {
        ColumnData::Bit(v) => v.as_ref().map(|b| Value::from(*b)).unwrap_or(Value::Null),
        ColumnData::U8(v) => v.as_ref().map(|n| Value::from(*n)).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.as_ref().map(|n| Value::from(*n)).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.as_ref().map(|n| Value::from(*n)).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.as_ref().map(|n| Value::from(*n)).unwrap_or(Value::Null),
        ColumnData::F32(v) => v
            .as_ref()
            .map(|n| Value::from(f64::from(*n)))
            .unwrap_or(Value::Null),
        ColumnData::F64(v) => v.as_ref().map(|n| Value::from(*n)).unwrap_or(Value::Null),
        ColumnData::Numeric(v) => v
            .as_ref()
            .map(|n| Value::from(n.value() as f64 / 10f64.powi(i32::from(n.scale()))))
            .unwrap_or(Value::Null),
        ColumnData::String(v) => v.as_deref().map(Value::from).unwrap_or(Value::Null),
        ColumnData::Guid(v) => v
            .as_ref()
            .map(|g| Value::from(g.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .as_deref()
            .map(|bytes| Value::from(to_hex(bytes)))
            .unwrap_or(Value::Null),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| Value::from(x.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Date(_) => chrono::NaiveDate::from_sql(data)
            .map_err(decode_err)?
            .map(|d| Value::from(d.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Time(_) => chrono::NaiveTime::from_sql(data)
            .map_err(decode_err)?
            .map(|t| Value::from(t.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            chrono::NaiveDateTime::from_sql(data)
                .map_err(decode_err)?
                .map(|d| Value::from(d.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()))
                .unwrap_or(Value::Null)
        }
        ColumnData::DateTimeOffset(_) => chrono::DateTime::<chrono::Utc>::from_sql(data)
            .map_err(decode_err)?
            .map(|d| Value::from(d.to_rfc3339()))
            .unwrap_or(Value::Null),
    };
    Ok(value)
}

fn decode_err(err: tiberius::error::Error) -> GatewayError {
    GatewayError::database(format!("failed to decode value: {}", err))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
