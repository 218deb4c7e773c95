use common::testutil::gen_random_dir;
use std::fs;
use std::path::PathBuf;

/// Creates a fresh data directory with the given schema lines and relation
/// files, returning its path.
///
/// # Arguments
///
/// * `schema_lines` - Lines of the `Schema` file, e.g. `Alpha(a1:INT)`.
/// * `relations` - (relation name, record lines) pairs to write.
pub fn setup_data_dir(schema_lines: &[&str], relations: &[(&str, &[&str])]) -> PathBuf {
    let dir = gen_random_dir();
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(crate::catalog::SCHEMA_FILE),
        format!("{}\n", schema_lines.join("\n")),
    )
    .unwrap();
    for (name, rows) in relations {
        let mut body = rows.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        fs::write(dir.join(name), body).unwrap();
    }
    dir
}
