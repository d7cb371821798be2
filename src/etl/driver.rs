use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{error, info};

use crate::database::repo::TransactionManager;
use crate::database::schema::Statements;
use crate::ingest::scanner;

/// Applies `extract` to every file under `root` with the given extension,
/// committing once per file.
///
/// The first failing file is rolled back and aborts the run; files before it
/// stay committed. Returns each file's extractor output in processing order.
pub fn process_data<T, F>(
    tm: &mut TransactionManager,
    root: &Path,
    extension: &str,
    mut extract: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Connection, &Statements, &Path) -> Result<T>,
{
    let files = scanner::find_files(root, extension)
        .with_context(|| format!("Failed to scan {:?}", root))?;
    let total = files.len();
    info!("{} files found in {:?}", total, root);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("  {bar:40.cyan/blue} {pos}/{len} files [{elapsed_precise}]")?
            .progress_chars("##-"),
    );

    let mut outputs = Vec::with_capacity(total);
    for (i, path) in files.iter().enumerate() {
        let result = tm.in_transaction(|tx, stmts| {
            let conn: &Connection = tx;
            extract(conn, stmts, path)
        });

        match result {
            Ok(out) => outputs.push(out),
            Err(e) => {
                pb.abandon();
                error!("Aborting run, {:?} failed: {:#}", path, e);
                return Err(e.context(format!("Failed to process {:?}", path)));
            }
        }

        pb.inc(1);
        pb.suspend(|| info!("{}/{} files processed.", i + 1, total));
    }

    pb.finish_and_clear();
    Ok(outputs)
}
