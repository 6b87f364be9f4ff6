//! Arrow schemas for the raw inputs and for reading tables back.
//!
//! Inputs are read with explicit schemas rather than inferred ones: unknown
//! JSON keys are ignored, missing keys read as null, and every file of a
//! dataset yields the same column types.

use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

fn utf8(name: &str) -> Field {
    Field::new(name, DataType::Utf8, true)
}

fn int64(name: &str) -> Field {
    Field::new(name, DataType::Int64, true)
}

fn float64(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

/// One song record per file below `song_data/`.
pub fn song_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        utf8("song_id"),
        utf8("title"),
        utf8("artist_id"),
        utf8("artist_name"),
        utf8("artist_location"),
        float64("artist_latitude"),
        float64("artist_longitude"),
        int64("year"),
        float64("duration"),
        int64("num_songs"),
    ]))
}

/// One activity event per line below `log_data/`.
pub fn log_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        utf8("artist"),
        utf8("auth"),
        utf8("firstName"),
        utf8("gender"),
        int64("itemInSession"),
        utf8("lastName"),
        float64("length"),
        utf8("level"),
        utf8("location"),
        utf8("method"),
        utf8("page"),
        float64("registration"),
        int64("sessionId"),
        utf8("song"),
        int64("status"),
        int64("ts"),
        utf8("userAgent"),
        utf8("userId"),
    ]))
}

/// Columns of the persisted `songs` table, used when reading it back for the join.
pub fn songs_table_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        utf8("song_id"),
        utf8("title"),
        utf8("artist_id"),
        int64("year"),
        float64("duration"),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_songs_table_columns_come_from_song_schema() {
        let song = song_schema();
        for field in songs_table_schema().fields() {
            let source = song.field_with_name(field.name()).unwrap();
            assert_eq!(source.data_type(), field.data_type(), "{}", field.name());
        }
    }

    #[test]
    fn test_log_identifiers_are_strings() {
        let log = log_schema();
        assert_eq!(log.field_with_name("userId").unwrap().data_type(), &DataType::Utf8);
        assert_eq!(log.field_with_name("ts").unwrap().data_type(), &DataType::Int64);
        assert_eq!(
            log.field_with_name("length").unwrap().data_type(),
            &DataType::Float64
        );
    }
}
