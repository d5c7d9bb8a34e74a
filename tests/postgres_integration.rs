/// Integration tests against a live PostgreSQL instance.
///
/// Each test creates session-local TEMP copies of the density tables, so
/// nothing is written to the real schema and the rows vanish on disconnect.
///
/// Prerequisites:
/// - PostgreSQL reachable at DATABASE_URL (set in the environment or .env)
///
/// Run with: cargo test --test postgres_integration -- --ignored --test-threads=1

use chrono::NaiveDate;
use postgres::{Client, NoTls};

use density_forecast::ingest::PostgresSource;
use density_forecast::loader;
use density_forecast::{CapacityTable, ForecastError, Forecaster, HistoryWindow, TimePoint, WindowStrategy};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn get_test_client() -> Client {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let mut client = Client::connect(&url, NoTls).expect("Failed to connect to PostgreSQL");

    client
        .batch_execute(
            "
            CREATE TEMP TABLE buildings (id int PRIMARY KEY, name text);
            CREATE TEMP TABLE routers (id int PRIMARY KEY, name text, building_id int);
            CREATE TEMP TABLE density_data (client_count int, dump_time timestamp, group_id int);
            INSERT INTO buildings VALUES (75, 'Lerner Hall');
            INSERT INTO routers VALUES (84, 'Lerner 1', 75);
            ",
        )
        .expect("Failed to create temp tables");

    client
}

fn insert(client: &mut Client, count: i32, dump_time: &str) {
    client
        .execute(
            "INSERT INTO density_data VALUES ($1, $2::text::timestamp, 84)",
            &[&count, &dump_time],
        )
        .expect("Failed to insert density row");
}

fn wednesday_window(strategy: WindowStrategy) -> HistoryWindow {
    HistoryWindow::new(strategy, NaiveDate::from_ymd_opt(2024, 10, 16).unwrap())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn test_window_filter_selects_matching_weekdays_only() {
    let mut client = get_test_client();
    insert(&mut client, 10, "2023-10-18 09:00:00"); // week 42, Wednesday
    insert(&mut client, 30, "2022-10-19 09:00:00"); // week 42, Wednesday
    insert(&mut client, 99, "2023-10-19 09:00:00"); // week 42, Thursday
    insert(&mut client, 70, "2023-10-25 09:00:00"); // week 43, Wednesday

    let mut source = PostgresSource::new(&mut client);

    let same = loader::load(&mut source, &wednesday_window(WindowStrategy::SameWeekday)).unwrap();
    assert_eq!(same.len(), 2);

    let ahead = loader::load(&mut source, &wednesday_window(WindowStrategy::WithWeekAhead)).unwrap();
    assert_eq!(ahead.len(), 3);
    assert_eq!(ahead.building_names(), vec![Some("Lerner Hall"); 3]);
}

#[test]
#[ignore]
fn test_database_history_forecasts_like_any_other_source() {
    let mut client = get_test_client();
    insert(&mut client, 10, "2021-10-20 09:00:00");
    insert(&mut client, 20, "2022-10-19 09:00:00");
    insert(&mut client, 30, "2023-10-18 09:00:00");

    let mut source = PostgresSource::new(&mut client);
    let history = loader::load(&mut source, &wednesday_window(WindowStrategy::SameWeekday)).unwrap();
    let matrix = Forecaster::new(CapacityTable::builtin()).predict(&history).unwrap();

    let value = matrix.get(TimePoint::new(9, 0).unwrap(), "Lerner 1").unwrap();
    assert!((value - 20.0 / 168.0).abs() < 1e-12);
}

#[test]
#[ignore]
fn test_null_count_surfaces_as_data_integrity_error() {
    let mut client = get_test_client();
    client
        .execute(
            "INSERT INTO density_data VALUES (NULL, '2023-10-18 09:00:00', 84)",
            &[],
        )
        .unwrap();

    let mut source = PostgresSource::new(&mut client);
    let result = loader::load(&mut source, &wednesday_window(WindowStrategy::SameWeekday));
    assert!(matches!(result, Err(ForecastError::DataIntegrity { row: 0, .. })));
}
