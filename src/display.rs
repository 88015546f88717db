//! Plain-text departure boards.

use crate::transit::mode::line_label;
use crate::transit::model::Departure;
use time::macros::format_description;
use time::PrimitiveDateTime;

const DIRECTION_WIDTH: usize = 30;
const TIMES_PER_ROW: usize = 4;

/// Parse Navitia's `YYYYMMDDTHHMMSS` local timestamps.
pub fn parse_navitia_time(s: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        s,
        format_description!("[year][month][day]T[hour][minute][second]"),
    )
    .ok()
}

/// Time until departure as shown on platform displays.
pub fn format_wait(departure: PrimitiveDateTime, now: PrimitiveDateTime) -> String {
    let mins = ((departure - now).whole_seconds() as f64 / 60.0).round() as i64;
    match mins {
        m if m <= 0 => "now".into(),
        1 => "1 min".into(),
        m if m >= 90 => format!("~{}h{:02}", m / 60, m % 60),
        m => format!("{m} min"),
    }
}

fn shorten(direction: &str) -> String {
    if direction.chars().count() > DIRECTION_WIDTH {
        let head: String = direction.chars().take(DIRECTION_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        direction.to_string()
    }
}

struct Row {
    line: String,
    direction: String,
    waits: Vec<String>,
}

/// Render departures grouped by line and direction, in first-seen order.
///
/// Returns no lines when there is nothing to show.
pub fn departure_board(departures: &[Departure], now: PrimitiveDateTime) -> Vec<String> {
    let mut rows: Vec<Row> = Vec::new();
    for dep in departures {
        let info = &dep.display_informations;
        let Some(at) = parse_navitia_time(&dep.stop_date_time.departure_date_time) else {
            tracing::debug!(
                value = %dep.stop_date_time.departure_date_time,
                "skipping departure with unreadable time"
            );
            continue;
        };
        let line = line_label(&info.commercial_mode, &info.code);
        let direction = shorten(&info.direction);
        let wait = format_wait(at, now);

        match rows
            .iter_mut()
            .find(|r| r.line == line && r.direction == direction)
        {
            Some(row) if row.waits.len() < TIMES_PER_ROW => row.waits.push(wait),
            Some(_) => {}
            None => rows.push(Row {
                line,
                direction,
                waits: vec![wait],
            }),
        }
    }
    if rows.is_empty() {
        return Vec::new();
    }

    let line_w = rows
        .iter()
        .map(|r| r.line.chars().count())
        .max()
        .unwrap_or(0)
        .max("Line".len());
    let dir_w = rows
        .iter()
        .map(|r| r.direction.chars().count())
        .max()
        .unwrap_or(0)
        .max("Direction".len());

    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(format!(
        "{:<line_w$}  {:<dir_w$}  Next departures",
        "Line", "Direction"
    ));
    for row in rows {
        out.push(format!(
            "{:<line_w$}  {:<dir_w$}  {}",
            row.line,
            row.direction,
            row.waits.join(", ")
        ));
    }
    out
}
