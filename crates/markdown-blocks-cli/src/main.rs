use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use markdown_blocks_config::Config;
use markdown_blocks_engine::{CalloutStyle, MarkdownEngine, SafeOutcome};
use markdown_blocks_engine::{editor_to_markdown, markdown_to_editor};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "markdown-blocks", version, about = "Markdown <-> block tree converter")]
struct Cli {
    /// Settings file (defaults to ~/.config/markdown-blocks/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured callout style
    #[arg(long, global = true, value_parser = parse_callout_style)]
    callout_style: Option<CalloutStyle>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse Markdown into block JSON
    Parse {
        /// Markdown file, or `-` for stdin
        input: PathBuf,
        /// Report errors as `{"error": ...}` JSON instead of failing
        #[arg(long)]
        safe: bool,
    },
    /// Render block JSON back to Markdown
    Serialize {
        /// Block JSON file, or `-` for stdin
        input: PathBuf,
    },
    /// Parse and serialize again, printing the normalized Markdown
    Roundtrip {
        /// Markdown file, or `-` for stdin
        input: PathBuf,
        /// Go through the editor document tree instead of blocks
        #[arg(long)]
        editor: bool,
    },
    /// Print complexity score and the strategy the engine would pick
    Analyze { input: PathBuf },
    /// Print the editor document tree as JSON
    Editor { input: PathBuf },
    /// Write the current settings (defaults plus overrides) to the config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_callout_style(value: &str) -> Result<CalloutStyle, String> {
    match value {
        "admonition" => Ok(CalloutStyle::Admonition),
        "emoji" => Ok(CalloutStyle::Emoji),
        other => Err(format!("unknown callout style {other:?} (admonition|emoji)")),
    }
}

/// `allow_missing` lets an explicitly named file be absent.
fn load_config(path: Option<&Path>, allow_missing: bool) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let path = Config::expand_path(path).unwrap_or_else(|| path.to_path_buf());
            match Config::load_from_path(&path)? {
                Some(config) => config,
                None if allow_missing => Config::default(),
                None => bail!("config file not found: {}", path.display()),
            }
        }
        None => Config::load_or_default()?,
    };
    Ok(config)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_text(path: &Path) -> Result<String> {
    String::from_utf8(read_input(path)?).with_context(|| format!("{} is not UTF-8", path.display()))
}

fn main() -> Result<()> {
    // RUST_LOG still wins; warnings only by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let init = matches!(cli.command, Command::InitConfig { .. });
    let mut config = load_config(cli.config.as_deref(), init)?;
    if let Some(style) = cli.callout_style {
        config.callout_style = style;
    }
    let engine = MarkdownEngine::new(config.engine_options());
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Parse { input, safe } => {
            let bytes = read_input(&input)?;
            if safe {
                let outcome: SafeOutcome<_> = engine.parse_bytes(&bytes).into();
                serde_json::to_writer_pretty(&mut stdout, &outcome)?;
            } else {
                let tree = engine.parse_bytes(&bytes)?;
                stdout.write_all(engine.blocks_to_json(&tree)?.as_bytes())?;
            }
            writeln!(stdout)?;
        }
        Command::Serialize { input } => {
            let blocks = engine.blocks_from_json(&read_text(&input)?)?;
            stdout.write_all(engine.serialize(&blocks)?.as_bytes())?;
        }
        Command::Roundtrip { input, editor } => {
            let text = read_text(&input)?;
            let markdown = if editor {
                let doc = markdown_to_editor(&text, &config.editor_options())?;
                editor_to_markdown(&doc, &config)?
            } else {
                engine.serialize(&engine.parse(&text)?)?
            };
            stdout.write_all(markdown.as_bytes())?;
        }
        Command::Analyze { input } => {
            let text = read_text(&input)?;
            let analysis = engine.analyze(&text);
            serde_json::to_writer_pretty(&mut stdout, &analysis)?;
            writeln!(stdout)?;
            log::info!(
                "{}: {} bytes, {} lines, {} structural markers",
                input.display(),
                analysis.complexity.bytes,
                analysis.complexity.lines,
                analysis.complexity.markers
            );
        }
        Command::InitConfig { force } => {
            let path = match cli.config.as_deref() {
                Some(path) => Config::expand_path(path).unwrap_or_else(|| path.to_path_buf()),
                None => Config::config_path(),
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if cli.config.is_some() {
                config.save_to_path(&path)?;
            } else {
                config.save()?;
            }
            log::info!("wrote settings to {}", path.display());
        }
        Command::Editor { input } => {
            let text = read_text(&input)?;
            let doc = markdown_to_editor(&text, &config.editor_options())?;
            serde_json::to_writer_pretty(&mut stdout, &doc)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
