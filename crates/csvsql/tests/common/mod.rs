// Common test utilities for csvsql integration tests

use std::fs;
use std::path::PathBuf;

use csvsql::Engine;
use tempfile::TempDir;

/// Test fixture that writes CSV files into a temporary directory
pub struct CsvFixture {
    pub temp_dir: TempDir,
}

impl CsvFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    /// Write `contents` to `<name>.csv` and return its path
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(format!("{}.csv", name));
        fs::write(&path, contents).expect("Failed to write CSV file");
        path
    }

    /// Engine with every `(name, contents)` pair loaded as a table
    pub fn engine(&self, tables: &[(&str, &str)]) -> Engine {
        let mut engine = Engine::new();
        for (name, contents) in tables {
            let path = self.write(name, contents);
            engine.load_csv(name, &path).expect("Failed to load table");
        }
        engine
    }
}

impl Default for CsvFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `t(id, x)` with x = 10, 20, 30
#[allow(dead_code)]
pub const NUMBERS: &str = "id,x\n1,10\n2,20\n3,30\n";

/// `a(id, v)` from the join scenarios
#[allow(dead_code)]
pub const LEFT: &str = "id,v\n1,A\n2,B\n";

/// `b(id, w)` from the join scenarios
#[allow(dead_code)]
pub const RIGHT: &str = "id,w\n1,X\n3,Y\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_csv() {
        let fixture = CsvFixture::new();
        let path = fixture.write("t", NUMBERS);
        assert!(path.exists());
        assert_eq!(fs::read_to_string(path).unwrap(), NUMBERS);
    }
}
