//! The five tables of the star schema and their physical layout.

use datafusion::functions::expr_fn::date_part;
use datafusion::prelude::{Expr, col, lit};
use std::fmt;

/// Output tables, in the order a run writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Songs,
    Artists,
    Users,
    Time,
    Songplays,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Songs,
        Table::Artists,
        Table::Users,
        Table::Time,
        Table::Songplays,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::Artists => "artists",
            Table::Users => "users",
            Table::Time => "time",
            Table::Songplays => "songplays",
        }
    }

    /// Directory below the output root holding the table's part files.
    pub fn dir(&self) -> String {
        format!("{}.parquet", self.name())
    }

    /// Hash keys rows are redistributed by before writing.
    ///
    /// Rows sharing these keys land in the same part file, but a key may
    /// still span several files.
    pub fn partition_exprs(&self) -> Vec<Expr> {
        match self {
            Table::Songs => vec![col("year"), col("artist_id")],
            Table::Artists => vec![col("artist_id")],
            Table::Users => vec![col("user_id")],
            Table::Time => vec![col("year"), month_of(col("start_time"))],
            Table::Songplays => vec![year_of(col("start_time")), month_of(col("start_time"))],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn year_of(expr: Expr) -> Expr {
    date_part(lit("year"), expr)
}

fn month_of(expr: Expr) -> Expr {
    date_part(lit("month"), expr)
}
