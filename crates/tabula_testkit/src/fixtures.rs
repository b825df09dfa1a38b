//! Schema fixtures shared across the test suites.

use tabula_schema::{generate, load_schema, CanonicalSchema, GeneratedSchema};

/// A small school-management schema exercising every mapping rule that
/// matters: uuid keys, defaults, nullable columns, references, declared
/// indexes and a JSON column.
pub const FIXTURE_SCHEMA: &str = r#"
table schools {
  id   uuid @id @default(uuid())
  name text @unique
}

table students {
  id         uuid      @id @default(uuid())
  first_name text
  last_name  text
  gpa        decimal(5,2)?
  active     boolean   @default(true)
  tags       json      @default("[]")
  created_at timestamp @default(now())
  school_id  uuid      @references(schools.id)

  @index(school_id)
  @index(last_name, first_name)
}
"#;

/// Loads the fixture schema.
pub fn fixture_schema() -> CanonicalSchema {
    load_schema(FIXTURE_SCHEMA).expect("fixture schema should load")
}

/// Generates the fixture mirror DDL and hash.
pub fn fixture_generated() -> GeneratedSchema {
    generate(&fixture_schema()).expect("fixture schema should generate")
}

/// Builds a school row document.
pub fn school(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
    })
}

/// Builds a student row document.
pub fn student(id: &str, first_name: &str, gpa: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "first_name": first_name,
        "last_name": "Lovelace",
        "gpa": gpa,
        "active": true,
        "tags": [],
        "created_at": "2026-01-15T09:00:00.000Z",
        "school_id": "school-1",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_loads_and_generates() {
        let schema = fixture_schema();
        assert_eq!(schema.tables.len(), 2);

        let generated = fixture_generated();
        assert_eq!(generated.hash.len(), 64);
        assert!(generated.ddl.contains("CREATE TABLE students ("));
    }
}
