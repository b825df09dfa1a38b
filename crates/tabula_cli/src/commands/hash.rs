//! Hash command implementation.

use std::path::Path;
use tabula_schema::{generate, load_schema};

/// Runs the hash command.
pub fn run(schema_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let input = std::fs::read_to_string(schema_path)?;
    let generated = generate(&load_schema(&input)?)?;
    println!("{}", generated.hash);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_fails_on_a_broken_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "table a {{").unwrap();
        assert!(run(file.path()).is_err());
    }

    #[test]
    fn hash_succeeds_on_a_valid_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "table a {{ id uuid @id }}").unwrap();
        run(file.path()).unwrap();
    }
}
