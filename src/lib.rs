pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod html;
pub mod json;
pub mod models;
pub mod search;
pub mod source;
pub mod storage;
pub mod tree;
pub mod viewer;

use std::path::Path;

pub use error::{BookmarkError, Result};
pub use models::{ApiResult, Bookmark, BookmarkCollection, Config, ExportFormat, Stats, TreeNode};
pub use viewer::BookmarkViewer;

use config::ConfigManager;
use source::ChromiumProfileSource;
use storage::{BookmarkStore, DataDir, FileStore};

const USAGE: &str = "Usage: bookmark-viewer <command>

Commands:
  status               Show bookmark and folder counts
  load-browser [FILE]  Load the browser's bookmarks (Chromium Bookmarks file)
  import FILE          Import an HTML or JSON bookmark file
  search QUERY         List bookmarks matching QUERY
  export json|html [OUT]
                       Export bookmarks to OUT, or print them
  clear                Remove all bookmarks";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    LoadBrowser(Option<String>),
    Import(String),
    Search(String),
    Export { format: String, output: Option<String> },
    Clear,
}

impl Command {
    /// Parses the arguments following the program name.
    pub fn parse(args: &[String]) -> std::result::Result<Self, String> {
        let mut args = args.iter().map(String::as_str);
        let command = match args.next() {
            Some("status") => Command::Status,
            Some("load-browser") => Command::LoadBrowser(args.next().map(str::to_string)),
            Some("import") => match args.next() {
                Some(file) => Command::Import(file.to_string()),
                None => return Err("import requires a FILE".to_string()),
            },
            Some("search") => Command::Search(args.collect::<Vec<_>>().join(" ")),
            Some("export") => match args.next() {
                Some(format) => Command::Export {
                    format: format.to_string(),
                    output: args.next().map(str::to_string),
                },
                None => return Err("export requires a format".to_string()),
            },
            Some("clear") => Command::Clear,
            Some(other) => return Err(format!("Unknown command '{}'", other)),
            None => return Err("No command given".to_string()),
        };
        Ok(command)
    }
}

/// Runs one command against a viewer and returns its result.
pub async fn execute<S: BookmarkStore>(viewer: &mut BookmarkViewer<S>, command: Command) -> ApiResult {
    match command {
        Command::Status => commands::get_stats(viewer),
        Command::LoadBrowser(file) => {
            let file = file
                .map(std::path::PathBuf::from)
                .or_else(|| viewer.config().browser_bookmarks_file.clone());
            let source = match file {
                Some(path) => ChromiumProfileSource::new(path),
                None => match ChromiumProfileSource::default_profile() {
                    Ok(source) => source,
                    Err(e) => return ApiResult::error(format!("Failed to load browser bookmarks: {}", e)),
                },
            };
            commands::load_browser_bookmarks(viewer, &source).await
        }
        Command::Import(file) => commands::import_file(viewer, Path::new(&file)).await,
        Command::Search(query) => commands::search_bookmarks(viewer, &query),
        Command::Export { format, output } => {
            commands::export_bookmarks(viewer, &format, output.as_deref().map(Path::new)).await
        }
        Command::Clear => commands::clear_bookmarks(viewer),
    }
}

/// Entry point of the command-line tool. Returns the process exit code.
pub async fn run(args: Vec<String>) -> i32 {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return 2;
        }
    };

    let data_dir = match DataDir::new() {
        Ok(data_dir) => data_dir,
        Err(e) => {
            log::error!("{}", e);
            return 1;
        }
    };
    if let Err(e) = data_dir.ensure_directories() {
        log::warn!("{}", e);
    }

    let config = match ConfigManager::new(data_dir.config_file.clone()) {
        Ok(manager) => manager.get(),
        Err(e) => {
            log::warn!("Using default configuration: {}", e);
            Config::default()
        }
    };

    let mut viewer = BookmarkViewer::new(FileStore::from_data_dir(&data_dir), config);
    viewer.restore();

    let result = execute(&mut viewer, command).await;
    match serde_json::to_string_pretty(&result) {
        Ok(text) => println!("{}", text),
        Err(e) => log::error!("Failed to serialize result: {}", e),
    }

    if result.success {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::fs;
    use tempfile::tempdir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&["status"])), Ok(Command::Status));
        assert_eq!(Command::parse(&args(&["load-browser"])), Ok(Command::LoadBrowser(None)));
        assert_eq!(
            Command::parse(&args(&["search", "rust", "docs"])),
            Ok(Command::Search("rust docs".to_string()))
        );
        assert_eq!(
            Command::parse(&args(&["export", "html", "out.html"])),
            Ok(Command::Export {
                format: "html".to_string(),
                output: Some("out.html".to_string())
            })
        );
        assert!(Command::parse(&args(&["import"])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
        assert!(Command::parse(&[]).is_err());
    }

    #[tokio::test]
    async fn test_execute_load_browser_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("Bookmarks");
        fs::write(
            &path,
            r#"{"roots":{"bookmark_bar":{"name":"Bar","type":"folder","children":[
                {"name":"Rust","type":"url","url":"https://rust-lang.org"}
            ]}}}"#,
        )
        .unwrap();

        let mut viewer = BookmarkViewer::new(MemoryStore::new(), Config::default());
        let result = execute(&mut viewer, Command::LoadBrowser(Some(path.display().to_string()))).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.stats.unwrap().source.as_deref(), Some("Browser Bookmarks"));

        let found = execute(&mut viewer, Command::Search("rust".to_string())).await;
        assert_eq!(found.bookmarks.unwrap()[0].folder, "Bar");
    }

    #[tokio::test]
    async fn test_session_round_trip_through_file_store() {
        let temp_dir = tempdir().unwrap();
        let data_dir = DataDir::new_with_base(temp_dir.path());
        data_dir.ensure_directories().unwrap();

        let import = temp_dir.path().join("favorites.html");
        fs::write(
            &import,
            r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<DL><p>
    <DT><H3>Work</H3>
    <DL><p>
        <DT><A HREF="https://docs.rs" ADD_DATE="1700000000">Docs</A>
        <DT><A HREF="javascript:void(0)">Bookmarklet</A>
    </DL><p>
    <DT><A HREF="https://example.com">Example</A>
</DL><p>"#,
        )
        .unwrap();

        let mut first = BookmarkViewer::new(FileStore::from_data_dir(&data_dir), Config::default());
        let imported = execute(&mut first, Command::Import(import.display().to_string())).await;
        assert!(imported.success, "{:?}", imported.error);
        assert_eq!(imported.stats.unwrap().total, 2);

        let exported_path = temp_dir.path().join("out.json");
        let exported = execute(
            &mut first,
            Command::Export {
                format: "json".to_string(),
                output: Some(exported_path.display().to_string()),
            },
        )
        .await;
        assert!(exported.success, "{:?}", exported.error);

        let mut second = BookmarkViewer::new(FileStore::from_data_dir(&data_dir), Config::default());
        assert!(second.restore());
        assert_eq!(second.source(), Some("favorites.html"));
        assert_eq!(second.search("docs")[0].added, Some(1_700_000_000));

        let reimported = execute(&mut second, Command::Import(exported_path.display().to_string())).await;
        assert!(reimported.success, "{:?}", reimported.error);
        assert_eq!(second.bookmarks(), first.bookmarks());

        let cleared = execute(&mut second, Command::Clear).await;
        assert!(cleared.success);
        let mut third = BookmarkViewer::new(FileStore::from_data_dir(&data_dir), Config::default());
        assert!(!third.restore());
    }
}
