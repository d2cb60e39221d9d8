// End-to-end shell sessions over CSV files on disk

mod common;

use common::{CsvFixture, LEFT, NUMBERS, RIGHT};
use csvsql::shell::ShellExit;
use csvsql::{Engine, EngineConfig, OutputFormat, Shell};

fn session(engine: Engine, input: &str) -> (ShellExit, String) {
    let mut shell = Shell::new(engine).without_prompt();
    let mut out = Vec::new();
    let exit = shell.run(input.as_bytes(), &mut out).unwrap();
    (exit, String::from_utf8(out).unwrap())
}

#[test]
fn test_load_then_select() {
    let fixture = CsvFixture::new();
    let path = fixture.write("t", "id,x\n1,10\n2,20\n");

    let input = format!(
        "LOAD '{}' AS t;\nSELECT x FROM t WHERE id = 1;\n",
        path.display()
    );
    let (exit, out) = session(Engine::new(), &input);
    assert_eq!(exit, ShellExit::EndOfInput);
    assert_eq!(
        out,
        format!(
            "Loaded FILE {} as TABLE t (2 rows, 2 columns)\nx\n10\n",
            path.display()
        )
    );
}

#[test]
fn test_join_session() {
    let fixture = CsvFixture::new();
    let engine = fixture.engine(&[("a", LEFT), ("b", RIGHT)]);

    let (_, out) = session(
        engine,
        "SELECT a.id, b.w\n  FROM a INNER JOIN b\n  ON a.id = b.id;\nEXIT;\nSELECT * FROM a;\n",
    );
    assert_eq!(out, "a.id,b.w\n1,X\n");
}

#[test]
fn test_aggregate_session() {
    let fixture = CsvFixture::new();
    let engine = fixture.engine(&[("t", NUMBERS)]);

    let (_, out) = session(
        engine,
        "SELECT AVERAGE(x) AS avg FROM t;\nSELECT AVERAGE(x) FROM t WHERE id > 9;\n",
    );
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("avg"));
    assert_eq!(lines.next(), Some("20"));
    assert!(lines.next().unwrap().starts_with("Error: "));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_limit_offset_session() {
    let fixture = CsvFixture::new();
    let engine = fixture.engine(&[("t", NUMBERS)]);

    let (_, out) = session(engine, "SELECT x FROM t LIMIT 1 OFFSET 1; SELECT id FROM t LIMIT 0;");
    assert_eq!(out, "x\n20\nid\n");
}

#[test]
fn test_show_and_describe() {
    let fixture = CsvFixture::new();
    let engine = fixture.engine(&[("b", RIGHT), ("a", LEFT)]);

    let (_, out) = session(engine, "SHOW TABLES;\nDESCRIBE a;\n");
    assert!(out.starts_with("TABLE NAMES\n-----------\na\nb\n"));
    assert!(out.contains("id"));
    assert!(out.contains("int"));
    assert!(out.contains("string"));
}

#[test]
fn test_table_format() {
    let fixture = CsvFixture::new();
    let mut engine = Engine::with_config(EngineConfig::default().with_format(OutputFormat::Table));
    let path = fixture.write("t", NUMBERS);
    engine.load_csv("t", &path).unwrap();

    let (_, out) = session(engine, "SELECT id, x FROM t LIMIT 1;");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], format!("{:>10} | {:>10}", "id", "x"));
    assert_eq!(lines[2], format!("{:>10} | {:>10}", 1, 10));
}

#[test]
fn test_errors_keep_the_session_alive() {
    let fixture = CsvFixture::new();
    let engine = fixture.engine(&[("t", NUMBERS)]);

    let (exit, out) = session(
        engine,
        "SELECT nope FROM t;\nLOAD 'missing.csv' AS m;\nSELECT x FROM t WHERE id = 3;\n",
    );
    assert_eq!(exit, ShellExit::EndOfInput);
    assert_eq!(out.matches("Error: ").count(), 2);
    assert!(out.ends_with("x\n30\n"));
}
