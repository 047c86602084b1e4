//! File I/O for native CLI

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

use margin_core::{PageStore, Session};

use crate::config::Config;

/// Create a directory if needed
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}

/// Load the saved pages, or the sample pages on first run
pub fn load_store(config: &Config) -> Result<PageStore> {
    let path = config.store_path();
    if path.exists() {
        PageStore::load(&path)
    } else {
        Ok(PageStore::with_samples())
    }
}

pub fn save_store(config: &Config, store: &PageStore) -> Result<()> {
    store.save(&config.store_path())
}

/// Export the current page to `<data dir>/exports/<page id>.json`
pub fn export_page(config: &Config, session: &Session) -> Result<PathBuf> {
    let page = session.page().context("No page loaded")?;
    let json = session
        .export_json()
        .context("No page loaded")?
        .context("Failed to serialize page")?;
    write_export(config, &format!("{}.json", page.id), &json)
}

/// Write the highlight digest of the current page to `<data dir>/exports/<page id>.md`
pub fn export_digest(config: &Config, session: &Session) -> Result<PathBuf> {
    let page = session.page().context("No page loaded")?;
    let digest = session.digest().context("No page loaded")?;
    write_export(config, &format!("{}.md", page.id), &digest)
}

fn write_export(config: &Config, name: &str, contents: &str) -> Result<PathBuf> {
    let dir = config.export_dir();
    ensure_dir(&dir)?;
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Open `html` in `$VISUAL`/`$EDITOR` and return the saved markup
pub fn edit_externally(config: &Config, html: &str) -> Result<String> {
    ensure_dir(&config.data_dir)?;
    let path = config.data_dir.join("edit.html");
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;

    let editor = env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());
    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to start {}", editor))?;
    if !status.success() {
        bail!("{} exited with {}", editor, status);
    }

    let edited = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let _ = fs::remove_file(&path);
    Ok(edited)
}
