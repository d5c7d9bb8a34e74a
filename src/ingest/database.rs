/// PostgreSQL row source.
///
/// Runs the density join against a borrowed `postgres::Client`. The window
/// filter is applied server-side so only the relevant weekdays cross the
/// wire. Connection setup and teardown stay with the caller.

use postgres::types::ToSql;
use postgres::Client;
use chrono::NaiveDateTime;

use crate::ingest::RowSource;
use crate::logging::{self, Component};
use crate::model::{ForecastError, RawRow};
use crate::window::HistoryWindow;

/// Base select over the density tables. Casts pin the column types the
/// reader below expects regardless of how the schema declares them.
pub const SELECT_DENSITY: &str = "
    SELECT d.client_count::bigint AS client_count,
           d.dump_time::timestamp AS dump_time,
           r.id::int AS group_id, r.name AS group_name,
           b.id::int AS parent_id, b.name AS building_name
    FROM density_data d
    JOIN routers r ON r.id = d.group_id
    JOIN buildings b ON b.id = r.building_id";

/// Format used to hand timestamps to the loader.
const DUMP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct PostgresSource<'a> {
    client: &'a mut Client,
}

impl<'a> PostgresSource<'a> {
    pub fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    /// Full query text for a window, exposed for diagnostics.
    pub fn query_for(window: &HistoryWindow) -> (String, Vec<i32>) {
        let (filter, params) = window.sql_filter();
        (format!("{}{}", SELECT_DENSITY, filter), params)
    }
}

impl RowSource for PostgresSource<'_> {
    fn fetch(&mut self, window: &HistoryWindow) -> Result<Vec<RawRow>, ForecastError> {
        let (query, params) = Self::query_for(window);
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        logging::debug(
            Component::Database,
            None,
            &format!("Querying density history for window {}", window.label()),
        );

        let rows = self.client.query(query.as_str(), &param_refs)?;

        let mut raw = Vec::with_capacity(rows.len());
        for row in rows {
            let dump_time: Option<NaiveDateTime> = row.try_get("dump_time")?;
            raw.push(RawRow {
                client_count: row.try_get("client_count")?,
                // NULL timestamps become an empty string, which the loader rejects
                dump_time: dump_time
                    .map(|t| t.format(DUMP_TIME_FORMAT).to_string())
                    .unwrap_or_default(),
                group_id: row.try_get("group_id")?,
                group_name: row.try_get("group_name")?,
                parent_id: row.try_get("parent_id")?,
                building_name: row.try_get("building_name")?,
            });
        }

        Ok(raw)
    }
}
