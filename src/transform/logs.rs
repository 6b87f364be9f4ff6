//! Activity log shaping: `users`, `time` and `songplays`.

use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::functions::expr_fn::{concat_ws, date_part};
use datafusion::logical_expr::JoinType;
use datafusion::prelude::{DataFrame, Expr, cast, col, lit};
use snafu::prelude::*;

use crate::error::{ShapeSnafu, TransformError};
use crate::table::Table;

/// `page` value marking a song play.
pub const NEXT_SONG: &str = "NextSong";

/// Log `ts` (epoch milliseconds) as a UTC timestamp.
///
/// Seconds are computed in double precision and truncated to microseconds,
/// the same result as casting `ts / 1000` epoch seconds to a timestamp.
pub fn start_time_expr(ts: Expr) -> Expr {
    let seconds = cast(ts, DataType::Float64) / lit(1000.0_f64);
    let micros = cast(seconds * lit(1_000_000.0_f64), DataType::Int64);
    cast(micros, DataType::Timestamp(TimeUnit::Microsecond, None))
}

/// Weekday numbered 1 (Sunday) to 7 (Saturday).
///
/// Kept as `((dayofweek - 1) % 7) + 1` over a Sunday-based `dayofweek`.
pub fn weekday_expr(start_time: Expr) -> Expr {
    let day_of_week = calendar_field("dow", start_time) + lit(1_i32);
    ((day_of_week - lit(1_i32)) % lit(7_i32)) + lit(1_i32)
}

fn calendar_field(part: &str, start_time: Expr) -> Expr {
    cast(date_part(lit(part), start_time), DataType::Int32)
}

/// Keep only song plays, with snake_case user columns and `start_time` added.
/// Every log-derived table is built from this result.
pub fn play_events(raw: DataFrame) -> Result<DataFrame, TransformError> {
    raw.filter(col("page").eq(lit(NEXT_SONG)))
        .and_then(|df| df.with_column_renamed("userId", "user_id"))
        .and_then(|df| df.with_column_renamed("firstName", "first_name"))
        .and_then(|df| df.with_column_renamed("lastName", "last_name"))
        .and_then(|df| df.with_column("start_time", start_time_expr(col("ts"))))
        .context(ShapeSnafu { table: "log_data" })
}

/// `users(user_id, first_name, last_name, gender, level)`.
///
/// Deduplication is row-wise, so a user seen at two levels keeps both rows.
pub fn users_table(events: DataFrame) -> Result<DataFrame, TransformError> {
    events
        .select_columns(&["user_id", "first_name", "last_name", "gender", "level"])
        .and_then(DataFrame::distinct)
        .context(ShapeSnafu {
            table: Table::Users.name(),
        })
}

/// `time(start_time, hour, day, week, year, weekday)`, one row per distinct start time.
pub fn time_table(events: DataFrame) -> Result<DataFrame, TransformError> {
    events
        .select_columns(&["start_time"])
        .and_then(DataFrame::distinct)
        .and_then(|df| df.with_column("hour", calendar_field("hour", col("start_time"))))
        .and_then(|df| df.with_column("day", calendar_field("day", col("start_time"))))
        .and_then(|df| df.with_column("week", calendar_field("week", col("start_time"))))
        .and_then(|df| df.with_column("year", calendar_field("year", col("start_time"))))
        .and_then(|df| df.with_column("weekday", weekday_expr(col("start_time"))))
        .context(ShapeSnafu {
            table: Table::Time.name(),
        })
}

/// `songplays` fact rows: every play event left-joined to the song catalog on
/// title and duration. Plays without a catalog match keep null ids.
pub fn songplays_table(events: DataFrame, songs: DataFrame) -> Result<DataFrame, TransformError> {
    let context = ShapeSnafu {
        table: Table::Songplays.name(),
    };

    let events = events.alias("events").context(context)?;
    let songs = songs.alias("songs").context(context)?;

    events
        .join_on(
            songs,
            JoinType::Left,
            [
                col("events.song").eq(col("songs.title")),
                col("events.length").eq(col("songs.duration")),
            ],
        )
        .and_then(|df| df.with_column_renamed("sessionId", "session_id"))
        .and_then(|df| df.with_column_renamed("userAgent", "user_agent"))
        .and_then(|df| {
            df.with_column(
                "songplay_id",
                concat_ws(
                    lit("-"),
                    vec![
                        cast(col("session_id"), DataType::Utf8),
                        cast(col("ts"), DataType::Utf8),
                    ],
                ),
            )
        })
        .and_then(|df| {
            df.select_columns(&[
                "songplay_id",
                "start_time",
                "user_id",
                "level",
                "song_id",
                "artist_id",
                "session_id",
                "location",
                "user_agent",
            ])
        })
        .context(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::{column_names, floats, frame, ints, rows, strings};
    use chrono::{DateTime, Datelike, Timelike};
    use datafusion::arrow::array::{Array, AsArray};
    use datafusion::arrow::datatypes::{Int32Type, TimestampMicrosecondType};

    const TS: i64 = 1541106106796;

    fn expected_micros(ts: i64) -> i64 {
        ((ts as f64 / 1000.0) * 1_000_000.0) as i64
    }

    /// Three log lines: two plays by the same user at different levels, one page view.
    fn raw_logs() -> DataFrame {
        frame(vec![
            ("userId", strings(&["1", "1", "2"])),
            ("firstName", strings(&["F", "F", "G"])),
            ("lastName", strings(&["L", "L", "H"])),
            ("gender", strings(&["M", "M", "F"])),
            ("level", strings(&["free", "paid", "free"])),
            ("page", strings(&["NextSong", "NextSong", "Home"])),
            ("ts", ints(&[TS, TS + 86_400_000, TS + 5])),
            ("song", strings(&["T1", "Unknown", "T1"])),
            ("length", floats(&[Some(180.5), Some(99.5), None])),
            ("sessionId", ints(&[100, 101, 102])),
            ("userAgent", strings(&["UA", "UA", "UA2"])),
            ("location", strings(&["Loc", "Loc", "Loc2"])),
        ])
    }

    fn songs() -> DataFrame {
        frame(vec![
            ("song_id", strings(&["S1"])),
            ("title", strings(&["T1"])),
            ("artist_id", strings(&["A1"])),
            ("year", ints(&[2000])),
            ("duration", floats(&[Some(180.5)])),
        ])
    }

    #[tokio::test]
    async fn test_non_play_events_dropped() {
        let events = play_events(raw_logs()).unwrap();
        assert_eq!(events.clone().count().await.unwrap(), 2);

        let users = users_table(events).unwrap();
        assert!(rows(users).await.iter().all(|row| row[0] == "1"));
    }

    #[tokio::test]
    async fn test_users_deduplicated_row_wise() {
        let events = play_events(raw_logs()).unwrap();
        let users = users_table(events).unwrap();

        assert_eq!(
            column_names(&users),
            ["user_id", "first_name", "last_name", "gender", "level"]
        );
        assert_eq!(
            rows(users).await,
            vec![
                vec!["1", "F", "L", "M", "free"],
                vec!["1", "F", "L", "M", "paid"],
            ]
        );
    }

    #[tokio::test]
    async fn test_start_time_truncates_to_micros() {
        let df = frame(vec![("ts", ints(&[TS, 0, 999]))]);
        let df = df
            .select(vec![start_time_expr(col("ts")).alias("start_time")])
            .unwrap();

        let batches = df.collect().await.unwrap();
        let values = batches[0].column(0).as_primitive::<TimestampMicrosecondType>();
        assert_eq!(values.value(0), expected_micros(TS));
        assert_eq!(values.value(1), 0);
        assert_eq!(values.value(2), expected_micros(999));
    }

    #[tokio::test]
    async fn test_time_fields_match_calendar() {
        let events = play_events(raw_logs()).unwrap();
        let time = time_table(events).unwrap();
        assert_eq!(
            column_names(&time),
            ["start_time", "hour", "day", "week", "year", "weekday"]
        );

        let batches = time.collect().await.unwrap();
        let mut seen = 0;
        for batch in &batches {
            let start = batch.column(0).as_primitive::<TimestampMicrosecondType>();
            for row in 0..batch.num_rows() {
                let field = |i: usize| {
                    let column = batch.column(i);
                    assert!(!column.is_null(row));
                    column
                        .as_primitive::<Int32Type>()
                        .value(row)
                };
                let expected = DateTime::from_timestamp_micros(start.value(row)).unwrap();

                assert_eq!(field(1), expected.hour() as i32);
                assert_eq!(field(2), expected.day() as i32);
                assert_eq!(field(3), expected.iso_week().week() as i32);
                assert_eq!(field(4), expected.year());
                assert_eq!(
                    field(5),
                    expected.weekday().num_days_from_sunday() as i32 + 1
                );
                assert!((1..=7).contains(&field(5)));
                seen += 1;
            }
        }
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn test_first_play_is_a_thursday_evening() {
        let events = play_events(raw_logs()).unwrap();
        let time = time_table(events)
            .unwrap()
            .select_columns(&["hour", "day", "week", "year", "weekday"])
            .unwrap();

        assert_eq!(
            rows(time).await,
            vec![
                vec!["21", "1", "44", "2018", "5"],
                vec!["21", "2", "44", "2018", "6"],
            ]
        );
    }

    #[tokio::test]
    async fn test_songplays_keep_unmatched_plays() {
        let events = play_events(raw_logs()).unwrap();
        let songplays = songplays_table(events, songs()).unwrap();

        assert_eq!(
            column_names(&songplays),
            [
                "songplay_id",
                "start_time",
                "user_id",
                "level",
                "song_id",
                "artist_id",
                "session_id",
                "location",
                "user_agent"
            ]
        );

        let without_time = songplays
            .select_columns(&[
                "songplay_id",
                "user_id",
                "level",
                "song_id",
                "artist_id",
                "session_id",
            ])
            .unwrap();
        assert_eq!(
            rows(without_time).await,
            vec![
                vec!["100-1541106106796", "1", "free", "S1", "A1", "100"],
                vec!["101-1541192506796", "1", "paid", "NULL", "NULL", "101"],
            ]
        );
    }
}
