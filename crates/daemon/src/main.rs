//! RestFiles Daemon
//!
//! Serves a sandboxed file repository over HTTP, and runs one-shot file
//! operations against the same root from the command line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use daemon::config::{Config, DaemonConfig};
use daemon::files::{RootContext, UploadedFile};
use daemon::router::{FileReply, FileRequest, FileRouter, Verb};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RestFiles Daemon - sandboxed file repository over HTTP.
#[derive(Parser, Debug)]
#[command(name = "restfiles")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Serve this directory instead of the configured root
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address (overrides server.bind_address)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// List a directory
    List {
        /// Directory relative to the root (defaults to the root itself)
        #[arg(default_value = "")]
        path: String,
    },

    /// Show a file, or list it if it is a directory
    Show {
        /// Path relative to the root
        path: String,

        /// Fetch the raw bytes instead of a description
        #[arg(long, short)]
        download: bool,

        /// Write downloaded bytes to this file instead of stdout
        #[arg(long, short, requires = "download", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace the contents of a text file
    Edit {
        /// Path relative to the root
        path: String,

        /// New contents
        #[arg(long, conflicts_with = "from_file", required_unless_present = "from_file")]
        text: Option<String>,

        /// Read new contents from a local file
        #[arg(long, value_name = "FILE")]
        from_file: Option<PathBuf>,
    },

    /// Upload local files into a directory
    Upload {
        /// Target directory relative to the root
        path: String,

        /// Local files to upload
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Delete a file
    Delete {
        /// Path relative to the root
        path: String,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    if let Some(root) = &cli.root {
        config.files.root_dir = std::path::absolute(root)
            .with_context(|| format!("Failed to resolve root directory: {}", root.display()))?;
    }
    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        config.server.bind_address = bind.clone();
    }

    // Validate configuration
    config.validate()?;

    let _guard = init_tracing(&config.daemon, cli.verbose)?;

    if let Some(config_path) = &cli.config {
        tracing::debug!("Using config file: {:?}", config_path);
    }

    let succeeded = match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("RestFiles daemon starting...");
            daemon::http::serve(open_router(&config)?, &config.server).await?;
            true
        }
        Commands::List { path } => {
            run(&open_router(&config)?, Verb::Get, FileRequest::new(path), None).await?
        }
        Commands::Show {
            path,
            download,
            output,
        } => {
            let mut request = FileRequest::new(path);
            request.for_download = download;
            run(&open_router(&config)?, Verb::Get, request, output.as_deref()).await?
        }
        Commands::Edit {
            path,
            text,
            from_file,
        } => {
            let contents = match (text, from_file) {
                (Some(text), _) => text,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("Either --text or --from-file is required"),
            };
            run(
                &open_router(&config)?,
                Verb::Put,
                FileRequest::new(path).with_text(contents),
                None,
            )
            .await?
        }
        Commands::Upload { path, files } => {
            let uploads = read_uploads(&files).await?;
            run(
                &open_router(&config)?,
                Verb::Post,
                FileRequest::new(path).with_files(uploads),
                None,
            )
            .await?
        }
        Commands::Delete { path } => {
            run(&open_router(&config)?, Verb::Delete, FileRequest::new(path), None).await?
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
            true
        }
    };

    // Returning instead of exiting lets the log guard flush.
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Open the configured root, creating it if needed.
fn open_router(config: &Config) -> anyhow::Result<FileRouter> {
    let root = RootContext::from_config(&config.files)?;
    Ok(FileRouter::new(root))
}

/// Initialize logging to stderr, plus a daily log file when configured.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(config: &DaemonConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).with_context(|| {
                format!("Failed to create log directory: {}", log_dir.display())
            })?;
            let appender = tracing_appender::rolling::daily(log_dir, "restfiles.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Read local files for an upload, named after their file names.
async fn read_uploads(files: &[PathBuf]) -> anyhow::Result<Vec<UploadedFile>> {
    let mut uploads = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Not a file: {}", file.display()))?;
        let content = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        uploads.push(UploadedFile::new(name, content));
    }
    Ok(uploads)
}

/// Percent-encode each segment of a literal command-line path.
///
/// The router decodes request paths once, so a local name such as
/// `100%.txt` must reach it encoded to be addressed verbatim.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Route one request and print its reply.
///
/// `request.path` is taken literally and encoded before routing. Returns
/// `false` when the router rejected the request, after printing its JSON
/// error message on stderr.
async fn run(
    router: &FileRouter,
    verb: Verb,
    mut request: FileRequest,
    output: Option<&Path>,
) -> anyhow::Result<bool> {
    let path = std::mem::take(&mut request.path);
    request.path = encode_path(&path);

    let reply = match router.route(verb, request).await {
        Ok(reply) => reply,
        Err(e) => {
            let message = e.to_error_message(Some(format!("{verb} /{path}")));
            eprintln!("{}", serde_json::to_string_pretty(&message)?);
            return Ok(false);
        }
    };

    match reply {
        FileReply::Read(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        FileReply::Created(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        FileReply::Download(download) => match output {
            Some(output) => {
                tokio::fs::write(output, &download.data)
                    .await
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                eprintln!(
                    "Saved {} ({} bytes) to {}",
                    download.file_name,
                    download.data.len(),
                    output.display()
                );
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&download.data)?;
                stdout.flush()?;
            }
        },
        FileReply::Updated => eprintln!("Updated /{path}"),
        FileReply::Deleted => eprintln!("Deleted /{path}"),
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from(["restfiles", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert!(bind.is_none()),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_serve_with_bind() {
        let cli = Cli::try_parse_from(["restfiles", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.as_deref(), Some("0.0.0.0:9000")),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_list_defaults_to_root() {
        let cli = Cli::try_parse_from(["restfiles", "list"]).unwrap();
        match cli.command {
            Commands::List { path } => assert_eq!(path, ""),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_show_with_download_and_output() {
        let cli = Cli::try_parse_from([
            "restfiles", "show", "logo.png", "--download", "-o", "/tmp/logo.png",
        ])
        .unwrap();
        match cli.command {
            Commands::Show {
                path,
                download,
                output,
            } => {
                assert_eq!(path, "logo.png");
                assert!(download);
                assert_eq!(output, Some(PathBuf::from("/tmp/logo.png")));
            }
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn test_show_output_requires_download() {
        let result = Cli::try_parse_from(["restfiles", "show", "a.txt", "--output", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_with_text() {
        let cli = Cli::try_parse_from(["restfiles", "edit", "notes.txt", "--text", "world"]).unwrap();
        match cli.command {
            Commands::Edit {
                path,
                text,
                from_file,
            } => {
                assert_eq!(path, "notes.txt");
                assert_eq!(text.as_deref(), Some("world"));
                assert!(from_file.is_none());
            }
            _ => panic!("Expected Edit command"),
        }
    }

    #[test]
    fn test_edit_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["restfiles", "edit", "notes.txt"]).is_err());
        assert!(Cli::try_parse_from([
            "restfiles", "edit", "notes.txt", "--text", "a", "--from-file", "b.txt",
        ])
        .is_err());
        assert!(
            Cli::try_parse_from(["restfiles", "edit", "notes.txt", "--from-file", "b.txt"]).is_ok()
        );
    }

    #[test]
    fn test_upload_command() {
        let cli = Cli::try_parse_from(["restfiles", "upload", "docs", "a.txt", "b.png"]).unwrap();
        match cli.command {
            Commands::Upload { path, files } => {
                assert_eq!(path, "docs");
                assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.png")]);
            }
            _ => panic!("Expected Upload command"),
        }
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Cli::try_parse_from(["restfiles", "upload", "docs"]).is_err());
    }

    #[test]
    fn test_delete_command() {
        let cli = Cli::try_parse_from(["restfiles", "delete", "notes.txt"]).unwrap();
        match cli.command {
            Commands::Delete { path } => assert_eq!(path, "notes.txt"),
            _ => panic!("Expected Delete command"),
        }
    }

    #[test]
    fn test_config_show() {
        let cli = Cli::try_parse_from(["restfiles", "config", "show"]).unwrap();
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Show)));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "restfiles", "list", "-v", "-c", "/path/to/config.toml", "--root", "/srv/files",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/files")));
    }

    #[test]
    fn test_invalid_command_fails() {
        assert!(Cli::try_parse_from(["restfiles", "invalid"]).is_err());
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["restfiles"]).is_err());
    }

    fn test_router(dir: &Path) -> FileRouter {
        FileRouter::new(RootContext::new(dir, [".git"], [".txt"]))
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path(""), "");
        assert_eq!(encode_path("docs/notes.txt"), "docs/notes.txt");
        assert_eq!(encode_path("docs/a%20b.txt"), "docs/a%2520b.txt");
        assert_eq!(encode_path("my docs/100%.txt"), "my%20docs/100%25.txt");
    }

    #[tokio::test]
    async fn test_run_addresses_names_literally() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let docs = temp_dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(docs.join("a%20b.txt"), "literal").unwrap();
        std::fs::write(docs.join("a b.txt"), "spaced").unwrap();
        std::fs::write(docs.join("100%.txt"), "percent").unwrap();
        let router = test_router(temp_dir.path());

        let shown = run(&router, Verb::Get, FileRequest::new("docs/100%.txt"), None)
            .await
            .unwrap();
        assert!(shown);

        let deleted = run(&router, Verb::Delete, FileRequest::new("docs/a%20b.txt"), None)
            .await
            .unwrap();
        assert!(deleted);
        assert!(!docs.join("a%20b.txt").exists());
        assert!(docs.join("a b.txt").is_file());
    }

    #[tokio::test]
    async fn test_run_upload_keeps_literal_target() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let router = test_router(temp_dir.path());

        let request =
            FileRequest::new("50%off").with_files(vec![UploadedFile::new("a.txt", "alpha")]);
        assert!(run(&router, Verb::Post, request, None).await.unwrap());

        assert!(temp_dir.path().join("50%off/a.txt").is_file());
    }

    #[tokio::test]
    async fn test_run_reports_failure_without_exiting() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let router = test_router(temp_dir.path());

        let deleted = run(&router, Verb::Delete, FileRequest::new("missing.txt"), None)
            .await
            .unwrap();

        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_read_uploads() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let local = temp_dir.path().join("a.txt");
        std::fs::write(&local, "alpha").unwrap();

        let uploads = read_uploads(&[local]).await.unwrap();

        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "a.txt");
        assert_eq!(uploads[0].content.as_ref(), b"alpha");

        assert!(read_uploads(&[temp_dir.path().join("missing.bin")])
            .await
            .is_err());
    }
}
