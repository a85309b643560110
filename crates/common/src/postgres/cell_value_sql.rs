use crate::domain::CellValue;
use bytes::BytesMut;
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, Format, IsNull, ToSql, Type};

// Logger columns are only known at runtime, so a cell has to bind to whatever
// type the target column has. Numeric cells going into numeric columns use the
// binary encoding; everything else is sent in PostgreSQL text input format and
// parsed server side (timestamps, numeric, text into integer columns, ...).

fn is_text_type(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn is_binary_numeric(cell: &CellValue, ty: &Type) -> bool {
    match cell {
        CellValue::Integer(_) => matches!(
            *ty,
            Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8
        ),
        CellValue::Float(_) => matches!(*ty, Type::FLOAT4 | Type::FLOAT8),
        CellValue::Text(_) => false,
    }
}

impl ToSql for CellValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        // An empty logger field has no meaning outside a text column
        if self.is_empty_text() && !is_text_type(ty) {
            return Ok(IsNull::Yes);
        }

        match (self, ty) {
            (CellValue::Integer(value), &Type::INT2) => i16::try_from(*value)?.to_sql(ty, out),
            (CellValue::Integer(value), &Type::INT4) => i32::try_from(*value)?.to_sql(ty, out),
            (CellValue::Integer(value), &Type::INT8) => value.to_sql(ty, out),
            (CellValue::Integer(value), &Type::FLOAT4) => (*value as f32).to_sql(ty, out),
            (CellValue::Integer(value), &Type::FLOAT8) => (*value as f64).to_sql(ty, out),
            (CellValue::Float(value), &Type::FLOAT4) => (*value as f32).to_sql(ty, out),
            (CellValue::Float(value), &Type::FLOAT8) => value.to_sql(ty, out),
            _ => {
                out.extend_from_slice(self.to_string().as_bytes());
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if is_binary_numeric(self, ty) {
            Format::Binary
        } else {
            Format::Text
        }
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(cell: &CellValue, ty: &Type) -> (IsNull, Vec<u8>) {
        let mut out = BytesMut::new();
        let is_null = cell.to_sql(ty, &mut out).unwrap();
        (is_null, out.to_vec())
    }

    #[test]
    fn test_integer_into_int4_is_binary() {
        let cell = CellValue::Integer(102);
        assert!(matches!(cell.encode_format(&Type::INT4), Format::Binary));

        let (is_null, bytes) = encode(&cell, &Type::INT4);
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(bytes, 102i32.to_be_bytes().to_vec());
    }

    #[test]
    fn test_integer_out_of_range_for_int2_fails() {
        let mut out = BytesMut::new();
        assert!(CellValue::Integer(100_000).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn test_float_into_float8_is_binary() {
        let cell = CellValue::Float(4.5);
        assert!(matches!(cell.encode_format(&Type::FLOAT8), Format::Binary));

        let (_, bytes) = encode(&cell, &Type::FLOAT8);
        assert_eq!(bytes, 4.5f64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_timestamp_text_uses_text_format() {
        let cell = CellValue::from("2024-01-02 00:00:00");
        assert!(matches!(cell.encode_format(&Type::TIMESTAMP), Format::Text));

        let (is_null, bytes) = encode(&cell, &Type::TIMESTAMP);
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(bytes, b"2024-01-02 00:00:00".to_vec());
    }

    #[test]
    fn test_float_into_numeric_uses_text_format() {
        let cell = CellValue::Float(43.0999);
        assert!(matches!(cell.encode_format(&Type::NUMERIC), Format::Text));
        assert_eq!(encode(&cell, &Type::NUMERIC).1, b"43.0999".to_vec());
    }

    #[test]
    fn test_empty_text_is_null_outside_text_columns() {
        let cell = CellValue::from("");
        assert!(matches!(encode(&cell, &Type::FLOAT8).0, IsNull::Yes));
        assert!(matches!(encode(&cell, &Type::TEXT).0, IsNull::No));
    }
}
