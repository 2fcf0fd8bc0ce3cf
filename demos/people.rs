//! Open a named SQLite connection, fill a table and read it back by column name.
//!
//! Run with `RUST_LOG=namedsql=debug cargo run --example people` to see the
//! registry's log output.

use std::error::Error;

use namedsql::{params, Registry};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DROP: &str = "DROP TABLE IF EXISTS people";
const SCHEMA: &str = "CREATE TABLE people (
    id integer NOT NULL,
    name text NOT NULL,
    married boolean NOT NULL,
    last_modified timestamp NOT NULL,
    PRIMARY KEY (id)
)";
const DATA: &[&str] = &[
    "INSERT INTO people VALUES (1, 'John Doe', 'f', '1980-12-01 01:02:03')",
    "INSERT INTO people VALUES (2, 'Jane Doe', 't', '1999-12-01 01:02:03')",
];

fn populate() -> Result<(), Box<dyn Error>> {
    let db = Registry::global()
        .get("master")
        .ok_or("database \"master\" doesn't exist")?;
    db.execute(DROP, &[])?;
    db.execute(SCHEMA, &[])?;
    for insert in DATA {
        db.execute(insert, &[])?;
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let db = Registry::global().open("master", "sqlite3", ":memory:")?;
    populate()?;

    let mut rows = db.query("SELECT * FROM people", &[])?;
    while rows.advance() {
        let id = rows.get_integer("id")?;
        let name = rows.get_string("name")?;
        let married = rows.get_boolean("married")?;
        let last = rows.get_timestamp("last_modified")?;
        info!(id, %name, married, %last, "person");
    }
    if let Some(err) = rows.last_error() {
        return Err(err.into());
    }
    rows.close()?;

    let mut row = db.query_row("SELECT * FROM people WHERE id = ?", params![1_i64]);
    let id = row.get_integer("id")?;
    let name = row.get_string("name")?;
    info!(id, %name, "first person");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let result = run();
    for (name, err) in Registry::global().close_all() {
        tracing::error!(connection = %name, error = %err, "failed to close");
    }
    result
}
