// Integration tests for SELECT, LOAD, SHOW and DESCRIBE

mod common;

use common::{CsvFixture, NUMBERS};
use csvsql::{Cell, CellType, Error, QueryResult};

#[test]
fn test_select_with_where() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", "id,x\n1,10\n2,20\n")]);

    let result = engine.query("SELECT x FROM t WHERE id = 1;").unwrap();
    assert_eq!(result.column_names, vec!["x"]);
    assert_eq!(result.rows, vec![vec![Cell::Int(10)]]);
}

#[test]
fn test_limit_offset() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", NUMBERS)]);

    let result = engine.query("SELECT x FROM t LIMIT 1 OFFSET 1").unwrap();
    assert_eq!(result.rows, vec![vec![Cell::Int(20)]]);

    let result = engine.query("SELECT x FROM t LIMIT 0").unwrap();
    assert!(result.is_empty());

    let result = engine.query("SELECT x FROM t LIMIT 10 OFFSET 5").unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_select_all() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", NUMBERS)]);

    let result = engine.query("SELECT * FROM t").unwrap();
    assert_eq!(result.column_names, vec!["id", "x"]);
    assert_eq!(result.len(), 3);
}

#[test]
fn test_arithmetic_projection() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", NUMBERS)]);

    let result = engine
        .query("SELECT x * 2 + 1 AS y, x / 4, x % 7, -id FROM t WHERE id = 3")
        .unwrap();
    assert_eq!(result.column_names, vec!["y", "col_1", "col_2", "col_3"]);
    assert_eq!(
        result.rows,
        vec![vec![
            Cell::Int(61),
            Cell::Float(7.5),
            Cell::Int(2),
            Cell::Int(-3)
        ]]
    );
}

#[test]
fn test_compound_predicates() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", NUMBERS)]);

    let result = engine
        .query("SELECT id FROM t WHERE x > 10 AND NOT (id = 3) OR x = 10")
        .unwrap();
    assert_eq!(result.column("id"), Some(vec![Cell::Int(1), Cell::Int(2)]));
}

#[test]
fn test_type_inference() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("m", "i,f,s\n1,1.5,a\n2,2,b\n3,,3\n")]);

    let results = engine.execute("DESCRIBE m").unwrap();
    match &results[0] {
        QueryResult::Described(schemas) => assert_eq!(
            schemas[0].columns,
            vec![
                ("i".to_string(), CellType::Int),
                ("f".to_string(), CellType::Float),
                ("s".to_string(), CellType::Str)
            ]
        ),
        other => panic!("unexpected {:?}", other),
    }

    let result = engine.query("SELECT f FROM m WHERE i = 3").unwrap();
    assert_eq!(result.rows, vec![vec![Cell::Float(0.0)]]);
}

#[test]
fn test_float_equality_tolerance() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("f", "v\n0.1\n0.2\n0.3\n")]);

    let result = engine.query("SELECT v FROM f WHERE v = 0.1 + 0.2").unwrap();
    assert_eq!(result.len(), 1);
}

#[test]
fn test_string_comparison() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("p", "name,qty\napple,3\npear,5\nplum,7\n")]);

    let result = engine
        .query("SELECT qty FROM p WHERE name >= 'pear'")
        .unwrap();
    assert_eq!(result.column("qty"), Some(vec![Cell::Int(5), Cell::Int(7)]));

    assert!(matches!(
        engine.query("SELECT qty FROM p WHERE name = 1"),
        Err(Error::Type(_))
    ));
}

#[test]
fn test_nested_select() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", NUMBERS)]);

    let result = engine
        .query("SELECT s.doubled FROM (SELECT x * 2 AS doubled FROM t WHERE id > 1) AS s LIMIT 1")
        .unwrap();
    assert_eq!(result.rows, vec![vec![Cell::Int(40)]]);
}

#[test]
fn test_load_statement() {
    let fixture = CsvFixture::new();
    let first = fixture.write("first", NUMBERS);
    let second = fixture.write("second", "k\n7\n");
    let mut engine = csvsql::Engine::new();

    let sql = format!(
        "LOAD '{}' AS one, '{}' AS two; SHOW TABLES;",
        first.display(),
        second.display()
    );
    let results = engine.execute(&sql).unwrap();
    match &results[1] {
        QueryResult::Tables(names) => assert_eq!(names, &["one", "two"]),
        other => panic!("unexpected {:?}", other),
    }

    let again = format!("LOAD '{}' AS one", first.display());
    assert!(matches!(
        engine.execute(&again),
        Err(Error::DuplicateTable(name)) if name == "one"
    ));
}

#[test]
fn test_compile_errors() {
    let fixture = CsvFixture::new();
    let mut engine = fixture.engine(&[("t", NUMBERS)]);

    assert!(matches!(
        engine.query("SELECT missing FROM t"),
        Err(Error::ColumnResolution(_))
    ));
    assert!(matches!(
        engine.query("SELECT x FROM nowhere"),
        Err(Error::UnknownTable(_))
    ));
    assert!(matches!(
        engine.query("SELECT x FROM t OFFSET 1"),
        Err(Error::ClauseOrder(_))
    ));
    assert!(matches!(
        engine.query("SELECT x ^ 2 FROM t"),
        Err(Error::NotImplemented(_))
    ));
    assert!(matches!(
        engine.query("SELECT x FROM t WHERE (id = 1"),
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        engine.query("SELECT x FROM t WHERE id = @"),
        Err(Error::Lex(_))
    ));
}
