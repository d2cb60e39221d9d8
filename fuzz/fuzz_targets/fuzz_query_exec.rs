#![no_main]

use std::collections::HashMap;
use std::sync::Arc;

use csvsql_core::query::{compile_query, parse, split_statements, Lexer, QueryObject, QueryResult};
use csvsql_core::{Cell, CellType, Table, TableMap};
use libfuzzer_sys::fuzz_target;

fn tables() -> TableMap {
    let a = Table::new(
        vec!["id".to_string(), "v".to_string()],
        vec![CellType::Int, CellType::Str],
        vec![
            vec![Cell::Int(1), Cell::Int(2), Cell::Int(2)],
            vec![Cell::from("A"), Cell::from("B"), Cell::from("")],
        ],
    )
    .unwrap();
    let b = Table::new(
        vec!["id".to_string(), "w".to_string()],
        vec![CellType::Int, CellType::Float],
        vec![
            vec![Cell::Int(1), Cell::Int(3)],
            vec![Cell::Float(0.5), Cell::Float(-2.0)],
        ],
    )
    .unwrap();
    let mut map = HashMap::new();
    map.insert("a".to_string(), Arc::new(a));
    map.insert("b".to_string(), Arc::new(b));
    map
}

fuzz_target!(|data: &[u8]| {
    let Ok(sql) = std::str::from_utf8(data) else {
        return;
    };
    if sql.len() > 2_000 {
        return;
    }
    let Ok(tokens) = Lexer::new(sql).tokenize() else {
        return;
    };

    let mut tables = tables();
    for statement in split_statements(tokens) {
        let Ok(root) = parse(&statement) else {
            continue;
        };
        // Compiling and draining any statement should never panic
        match compile_query(&root, &tables) {
            // Keep the fuzzer off the filesystem
            Ok(QueryObject::Load(_)) | Err(_) => {}
            Ok(query) => {
                if let Ok(QueryResult::Rows(mut view)) = query.run(&mut tables) {
                    while !view.empty() {
                        for i in 0..view.width() {
                            let _ = view.access_column(i);
                        }
                        view.advance_row();
                    }
                }
            }
        }
    }
});
