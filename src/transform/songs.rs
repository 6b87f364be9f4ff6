//! Song catalog shaping: `songs` and `artists`.

use datafusion::prelude::{DataFrame, col};
use snafu::prelude::*;

use crate::error::{ShapeSnafu, TransformError};
use crate::table::Table;

/// Drop exact duplicate song records. Both song tables derive from this result.
pub fn distinct_song_records(raw: DataFrame) -> Result<DataFrame, TransformError> {
    raw.distinct().context(ShapeSnafu { table: "song_data" })
}

/// `songs(song_id, title, artist_id, year, duration)`.
pub fn songs_table(records: DataFrame) -> Result<DataFrame, TransformError> {
    records
        .select_columns(&["song_id", "title", "artist_id", "year", "duration"])
        .context(ShapeSnafu {
            table: Table::Songs.name(),
        })
}

/// `artists(artist_id, name, location, latitude, longitude)`, deduplicated
/// again since one artist appears under each of their songs.
pub fn artists_table(records: DataFrame) -> Result<DataFrame, TransformError> {
    records
        .select(vec![
            col("artist_id"),
            col("artist_name").alias("name"),
            col("artist_location").alias("location"),
            col("artist_latitude").alias("latitude"),
            col("artist_longitude").alias("longitude"),
        ])
        .and_then(DataFrame::distinct)
        .context(ShapeSnafu {
            table: Table::Artists.name(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::{column_names, floats, frame, ints, rows, strings};

    fn song_records() -> DataFrame {
        frame(vec![
            ("song_id", strings(&["S1", "S1", "S2"])),
            ("title", strings(&["T1", "T1", "T2"])),
            ("artist_id", strings(&["A1", "A1", "A1"])),
            ("artist_name", strings(&["N1", "N1", "N1"])),
            ("artist_location", strings(&["L1", "L1", "L1"])),
            ("artist_latitude", floats(&[Some(1.5), Some(1.5), Some(1.5)])),
            ("artist_longitude", floats(&[Some(-2.5), Some(-2.5), Some(-2.5)])),
            ("year", ints(&[2000, 2000, 0])),
            ("duration", floats(&[Some(180.5), Some(180.5), Some(201.25)])),
        ])
    }

    #[tokio::test]
    async fn test_duplicate_records_collapse_before_projection() {
        let records = distinct_song_records(song_records()).unwrap();
        let songs = songs_table(records).unwrap();

        assert_eq!(
            column_names(&songs),
            ["song_id", "title", "artist_id", "year", "duration"]
        );
        assert_eq!(
            rows(songs).await,
            vec![
                vec!["S1", "T1", "A1", "2000", "180.5"],
                vec!["S2", "T2", "A1", "0", "201.25"],
            ]
        );
    }

    #[tokio::test]
    async fn test_artist_listed_once_across_songs() {
        let records = distinct_song_records(song_records()).unwrap();
        let artists = artists_table(records).unwrap();

        assert_eq!(
            column_names(&artists),
            ["artist_id", "name", "location", "latitude", "longitude"]
        );
        assert_eq!(
            rows(artists).await,
            vec![vec!["A1", "N1", "L1", "1.5", "-2.5"]]
        );
    }

    #[tokio::test]
    async fn test_missing_column_is_a_shape_error() {
        let records = frame(vec![("song_id", strings(&["S1"]))]);
        let err = songs_table(records).unwrap_err();
        assert!(matches!(err, TransformError::Shape { table: "songs", .. }));
    }
}
