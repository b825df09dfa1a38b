//! Generate command implementation.

use std::path::Path;
use tabula_schema::{generate, load_schema};

/// Runs the generate command.
///
/// The artifact is fully generated in memory before anything is written,
/// and written through a temporary file in the target directory, so a
/// failure never leaves a partial artifact behind. A `<out>.hash` sidecar
/// carries the schema hash for provisioning and drift checks.
pub fn run(
    schema_path: &Path,
    output: Option<&Path>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = std::fs::read_to_string(schema_path)?;
    let generated = generate(&load_schema(&input)?)?;

    match output {
        None => print!("{}", generated.ddl),
        Some(path) => {
            if path.exists() && !force {
                return Err(format!("{path:?} already exists (use --force to overwrite)").into());
            }
            write_atomically(path, &generated.ddl)?;
            let hash_path = sidecar_path(path);
            write_atomically(&hash_path, &format!("{}\n", generated.hash))?;
            tracing::info!(path = %path.display(), hash = %generated.hash, "artifact written");
            println!("wrote {:?}", path);
            println!("wrote {:?}", hash_path);
            println!("hash: {}", generated.hash);
        }
    }
    Ok(())
}

fn sidecar_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".hash");
    std::path::PathBuf::from(name)
}

fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string())
    ));
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}
