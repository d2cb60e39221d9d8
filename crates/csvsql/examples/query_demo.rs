/// Query Engine Demo
///
/// Loads two small CSV files and runs a filter, a join and an aggregate.
use std::fs;
use std::io::Write;

use csvsql::logging::LogConfig;
use csvsql::{format, Engine, OutputFormat};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::info().init()?;

    println!("=== csvsql Query Demo ===\n");

    let dir = tempfile::tempdir()?;
    let users = dir.path().join("users.csv");
    let orders = dir.path().join("orders.csv");
    fs::write(&users, "id,name,age\n1,Alice,30\n2,Bob,25\n3,Carol,41\n")?;
    fs::write(
        &orders,
        "id,user_id,total\n10,1,19.5\n11,1,5.25\n12,3,120\n13,4,8\n",
    )?;

    let mut engine = Engine::new();
    engine.load_csv("users", &users)?;
    engine.load_csv("orders", &orders)?;

    let statements = [
        "SELECT name, age FROM users WHERE age > 26",
        "SELECT users.name, orders.total FROM users JOIN orders ON users.id = orders.user_id",
        "SELECT name, total FROM users LEFT JOIN orders ON users.id = orders.user_id",
        "SELECT MAX(total), AVERAGE(total), MEDIAN(total) FROM orders",
    ];

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for sql in statements {
        writeln!(out, "{}", sql)?;
        for result in engine.execute(sql)? {
            format::write_result(&mut out, result, OutputFormat::Table, false)?;
        }
        writeln!(out)?;
    }

    Ok(())
}
