//! Funnelkit CLI - page catalog maintenance
//!
//! # Commands
//! - `funnelkit list` - List pages, most recently modified first
//! - `funnelkit show <id>` - Print a page outline (or its JSON with `--json`)
//! - `funnelkit new <name>` - Create a page from the funnel template
//! - `funnelkit export <id>` / `funnelkit import <file>` - Move pages between catalogs
//! - `funnelkit duplicate|reset|publish|delete <id>`
//! - `funnelkit stats <id>` - Record view and conversion counters
//! - `funnelkit rebuild-index` - Regenerate the summary index from page files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use funnelkit_core::storage::FileStorage;
use funnelkit_core::{Command, Editor, EditorEvent, PageDocument, PageStore};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Funnelkit page catalog CLI
#[derive(Parser)]
#[command(name = "funnelkit")]
#[command(author, version, about = "Manage Funnelkit funnel pages")]
struct Cli {
    /// Catalog directory (default: <data dir>/funnelkit/pages)
    #[arg(long, global = true, env = "FUNNELKIT_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pages
    List {
        /// Print the index as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one page
    Show {
        id: String,

        /// Print the full page document
        #[arg(long)]
        json: bool,
    },

    /// Create a page from the funnel template
    New {
        /// Page name
        name: String,
    },

    /// Export a page as JSON
    Export {
        id: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a page exported by `export`
    Import {
        /// JSON file to import
        file: PathBuf,
    },

    /// Copy a page under a new id
    Duplicate { id: String },

    /// Replace a page with the funnel template
    Reset { id: String },

    /// Publish or unpublish a page
    Publish {
        id: String,

        /// Take the page offline instead
        #[arg(long)]
        unpublish: bool,
    },

    /// Delete a page
    Delete { id: String },

    /// Record traffic counters for a page
    Stats {
        id: String,

        #[arg(long)]
        views: u64,

        #[arg(long)]
        conversions: u64,
    },

    /// Regenerate the page index from stored pages
    RebuildIndex,
}

fn open_store(dir: Option<PathBuf>) -> Result<PageStore> {
    let storage = match dir {
        Some(dir) => FileStorage::new(&dir)
            .with_context(|| format!("Failed to open catalog at {}", dir.display()))?,
        None => FileStorage::default_location().context("Failed to open default catalog")?,
    };
    log::debug!("Using catalog at {}", storage.base_path().display());
    Ok(PageStore::new(Arc::new(storage)))
}

fn print_outline(out: &mut impl Write, doc: &PageDocument) -> Result<()> {
    let status = if doc.is_published { "published" } else { "draft" };
    writeln!(out, "{} ({}) [{}]", doc.name, doc.id, status)?;
    if !doc.description.is_empty() {
        writeln!(out, "  {}", doc.description)?;
    }
    writeln!(out, "  last modified {}", doc.last_modified.to_rfc3339())?;
    for (i, step) in doc.steps.iter().enumerate() {
        writeln!(out, "  {}. {} ({} elements)", i + 1, step.name, step.len())?;
        for element in &step.elements {
            let mut flags = String::new();
            if !element.visible {
                flags.push_str(" hidden");
            }
            if element.locked {
                flags.push_str(" locked");
            }
            writeln!(out, "     - {} {}{}", element.content.type_name(), element.id(), flags)?;
        }
    }
    Ok(())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let store = open_store(cli.dir)?;

    match cli.command {
        Commands::List { json } => {
            let pages = store.list()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&pages)?)?;
            } else if pages.is_empty() {
                writeln!(out, "No pages")?;
            } else {
                for page in pages {
                    let status = if page.is_published { "published" } else { "draft" };
                    write!(out, "{}  {}  [{}]", page.id, page.name, status)?;
                    if let (Some(views), Some(conversions)) = (page.views, page.conversions) {
                        write!(out, "  {} views, {} conversions", views, conversions)?;
                    }
                    writeln!(out)?;
                }
            }
        }

        Commands::Show { id, json } => {
            let doc = store.load(&id)?;
            if json {
                writeln!(out, "{}", store.export(&doc)?)?;
            } else {
                print_outline(out, &doc)?;
            }
        }

        Commands::New { name } => {
            let doc = store.create(&name)?;
            writeln!(out, "{}", doc.id)?;
        }

        Commands::Export { id, output } => {
            let json = store.export(&store.load(&id)?)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => writeln!(out, "{}", json)?,
            }
        }

        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let doc = store.import_json(&json)?;
            writeln!(out, "{}  {}", doc.id, doc.name)?;
        }

        Commands::Duplicate { id } => {
            let doc = store.duplicate(&id)?;
            writeln!(out, "{}  {}", doc.id, doc.name)?;
        }

        Commands::Reset { id } => {
            store.reset(&id)?;
            writeln!(out, "Reset {}", id)?;
        }

        Commands::Publish { id, unpublish } => {
            let mut editor = Editor::with_document(store.load(&id)?);
            editor.subscribe(|event: &EditorEvent| {
                if let EditorEvent::Published { page_id } = event {
                    log::info!("Page {} published", page_id);
                }
            });
            let applied = editor.apply(Command::SetPublished {
                published: !unpublish,
            })?;
            if applied.is_change() {
                store.save(editor.document())?;
            }
            let state = if unpublish { "unpublished" } else { "published" };
            writeln!(out, "{} {}", id, state)?;
        }

        Commands::Delete { id } => {
            store.delete(&id)?;
            writeln!(out, "Deleted {}", id)?;
        }

        Commands::Stats {
            id,
            views,
            conversions,
        } => {
            store.record_stats(&id, views, conversions)?;
            writeln!(out, "{}: {} views, {} conversions", id, views, conversions)?;
        }

        Commands::RebuildIndex => {
            let count = store.rebuild_index()?;
            writeln!(out, "Indexed {} pages", count)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exec(dir: &std::path::Path, args: &[&str]) -> Result<String> {
        let mut argv = vec!["funnelkit", "--dir", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_new_list_show() {
        let dir = tempdir().unwrap();
        let id = exec(dir.path(), &["new", "Oferta"]).unwrap().trim().to_string();

        let listing = exec(dir.path(), &["list"]).unwrap();
        assert!(listing.contains(&id));
        assert!(listing.contains("Oferta"));

        let outline = exec(dir.path(), &["show", &id]).unwrap();
        assert!(outline.starts_with("Oferta"));
        assert!(outline.contains("1. Quiz"));
    }

    #[test]
    fn test_duplicate_and_publish() {
        let dir = tempdir().unwrap();
        let id = exec(dir.path(), &["new", "Oferta"]).unwrap().trim().to_string();

        let copy = exec(dir.path(), &["duplicate", &id]).unwrap();
        assert!(copy.contains("Oferta (Cópia)"));

        exec(dir.path(), &["publish", &id]).unwrap();
        let store = open_store(Some(dir.path().to_path_buf())).unwrap();
        assert!(store.load(&id).unwrap().is_published);
    }

    #[test]
    fn test_export_import() {
        let dir = tempdir().unwrap();
        let id = exec(dir.path(), &["new", "Oferta"]).unwrap().trim().to_string();
        let file = dir.path().join("export.txt");
        exec(dir.path(), &["export", &id, "-o", file.to_str().unwrap()]).unwrap();

        let imported = exec(dir.path(), &["import", file.to_str().unwrap()]).unwrap();
        assert!(imported.contains("Oferta (Importado)"));
        assert_eq!(exec(dir.path(), &["rebuild-index"]).unwrap().trim(), "Indexed 2 pages");
    }

    #[test]
    fn test_stats_are_acknowledged_and_listed() {
        let dir = tempdir().unwrap();
        let id = exec(dir.path(), &["new", "Oferta"]).unwrap().trim().to_string();

        let ack = exec(
            dir.path(),
            &["stats", &id, "--views", "120", "--conversions", "7"],
        )
        .unwrap();
        assert_eq!(ack.trim(), format!("{}: 120 views, 7 conversions", id));

        let listing = exec(dir.path(), &["list"]).unwrap();
        assert!(listing.contains("120 views, 7 conversions"));
    }

    #[test]
    fn test_missing_page_is_error() {
        let dir = tempdir().unwrap();
        assert!(exec(dir.path(), &["show", "ghost"]).is_err());
    }
}
