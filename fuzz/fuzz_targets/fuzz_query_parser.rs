#![no_main]

use csvsql_core::query::{parse, split_statements, Lexer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string (ignore invalid UTF-8)
    if let Ok(sql) = std::str::from_utf8(data) {
        // Limit query length to prevent timeout
        if sql.len() > 10_000 {
            return;
        }

        // Lexing and parsing should never panic
        if let Ok(tokens) = Lexer::new(sql).tokenize() {
            for statement in split_statements(tokens) {
                let _ = parse(&statement);
            }
        }
    }
});
