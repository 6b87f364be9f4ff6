//! Dataframe shaping for the two stages.
//!
//! Every function here takes and returns lazy [`DataFrame`]s; nothing is
//! executed until the sink writes a table. Repartitioning is left to the
//! sink as well, since it depends only on the target table.
//!
//! [`DataFrame`]: datafusion::prelude::DataFrame

mod logs;
mod songs;

pub use logs::{
    NEXT_SONG, play_events, songplays_table, start_time_expr, time_table, users_table,
    weekday_expr,
};
pub use songs::{artists_table, distinct_song_records, songs_table};
