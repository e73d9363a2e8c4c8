use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use imagegen_proxy::history::{FileStore, HistoryManager, Preferences, PreferencesUpdate, Theme};
use imagegen_proxy::prompt::catalog;
use imagegen_proxy::types::Quality;
use imagegen_proxy::{
    enhance_prompt, validate_prompt, Config, GenerationClient, GenerationRequest, GenerationResult,
    HistoryEntry, PromptRules,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imagectl", about = "CLI for the AI image generation proxy", version)]
struct Cli {
    /// Override UPSTREAM_URL
    #[arg(global = true, long)]
    upstream_url: Option<String>,

    /// Override HISTORY_DIR
    #[arg(global = true, long, value_name = "DIR")]
    history_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one image from a prompt
    Generate {
        /// Prompt text
        prompt: String,
        /// Style tag (see `imagectl styles`)
        #[arg(long)]
        style: Option<String>,
        /// Dimension preset such as 16:9 or 1344x768
        #[arg(long, conflicts_with_all = ["width", "height"])]
        dimensions: Option<String>,
        /// Width
        #[arg(long)]
        width: Option<u32>,
        /// Height
        #[arg(long)]
        height: Option<u32>,
        /// draft, standard or high
        #[arg(long)]
        quality: Option<Quality>,
        /// Seed
        #[arg(long)]
        seed: Option<i64>,
        /// Replace the system message for this request
        #[arg(long, value_name = "TEXT")]
        system_prompt: Option<String>,
        /// Do not record the result in history
        #[arg(long)]
        no_save: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a prompt without calling the upstream
    Validate {
        prompt: String,
        /// Only require a non-empty prompt
        #[arg(long)]
        lenient: bool,
    },
    /// Print the enhanced prompt for a style
    Enhance {
        prompt: String,
        #[arg(long, default_value = "photorealistic")]
        style: String,
    },
    /// List style options
    Styles {
        #[arg(long)]
        json: bool,
    },
    /// List preset prompts
    Presets {
        #[arg(long)]
        json: bool,
    },
    /// List dimension presets
    Dimensions {
        #[arg(long)]
        json: bool,
    },
    /// Local generation history
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },
    /// User preferences
    Prefs {
        #[command(subcommand)]
        cmd: PrefsCmd,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// Show entries, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Remove one entry by id
    Remove { id: String },
    /// Remove all entries
    Clear,
    /// Drop entries older than N days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Write history and preferences as JSON
    Export {
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Load history and preferences from an export file
    Import { path: PathBuf },
    /// Show storage usage
    Usage,
}

#[derive(Subcommand, Debug)]
enum PrefsCmd {
    Show,
    Set {
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
        #[arg(long)]
        default_style: Option<String>,
        #[arg(long)]
        default_dimensions: Option<String>,
        #[arg(long)]
        system_prompt: Option<String>,
    },
    Reset,
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown theme '{}', expected light|dark|system", s))
}

async fn open_history(conf: &Config) -> Result<HistoryManager, Box<dyn std::error::Error>> {
    let store = FileStore::new(&conf.history_dir).await?;
    let defaults = Preferences { system_prompt: conf.system_prompt.clone(), ..Preferences::default() };
    Ok(HistoryManager::new(Arc::new(store), conf.history_cap).with_default_preferences(defaults))
}

fn print_history_line(e: &HistoryEntry) {
    println!(
        "{}  {}  {:<14} {:<9} {}  {}",
        e.id,
        e.timestamp.format("%Y-%m-%d %H:%M"),
        e.style,
        e.dimensions,
        e.image_url,
        e.prompt
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    Config::dotenv_load();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut conf = Config::new()?;
    if let Some(url) = cli.upstream_url {
        conf.upstream_url = url;
    }
    if let Some(dir) = cli.history_dir {
        conf.history_dir = dir.to_string_lossy().into_owned();
    }

    match cli.command {
        Commands::Generate {
            prompt, style, dimensions, width, height, quality, seed, system_prompt, no_save, json,
        } => {
            let history = open_history(&conf).await?;
            let prefs = history.preferences().await;

            let (w, h) = match dimensions.as_deref() {
                Some(name) => match catalog::find_dimension_preset(name) {
                    Some(p) => (p.width, p.height),
                    None => {
                        eprintln!("Unknown dimension preset '{}'", name);
                        std::process::exit(2);
                    }
                },
                None => catalog::find_dimension_preset(&prefs.default_dimensions)
                    .map(|p| (p.width, p.height))
                    .unwrap_or((1024, 1024)),
            };

            let mut request = GenerationRequest::new(prompt)
                .with_style(style.unwrap_or_else(|| prefs.default_style.clone()))
                .with_size(width.unwrap_or(w), height.unwrap_or(h))
                .with_quality(quality.unwrap_or_default())
                .with_system_prompt(system_prompt.unwrap_or_else(|| prefs.system_prompt.clone()));
            request.seed = seed;

            let client = GenerationClient::new(&conf)?;
            let result = client.generate(&request).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            match result {
                GenerationResult::Success(image) => {
                    if !no_save {
                        history.save(HistoryEntry::from_generated(&request, &image)).await;
                    }
                    if !json {
                        println!("{}", image.image_url);
                    }
                    Ok(())
                }
                GenerationResult::Failure { kind, message } => {
                    eprintln!("Error ({:?}): {}", kind, message);
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate { prompt, lenient } => {
            let rules = if lenient {
                PromptRules::lenient()
            } else {
                PromptRules::default().with_min_len(conf.prompt_min_length)
            };
            let v = validate_prompt(&prompt, &rules);
            if v.valid {
                println!("ok");
                Ok(())
            } else {
                eprintln!("invalid: {}", v.reason.unwrap_or_default());
                std::process::exit(1);
            }
        }
        Commands::Enhance { prompt, style } => {
            println!("{}", enhance_prompt(prompt.trim(), &style));
            Ok(())
        }
        Commands::Styles { json } => {
            let opts = catalog::style_options();
            if json {
                println!("{}", serde_json::to_string_pretty(&opts)?);
            } else {
                for o in opts {
                    println!("{:<16} {}", o.value, o.description);
                }
            }
            Ok(())
        }
        Commands::Presets { json } => {
            let presets = catalog::preset_prompts();
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                for p in presets {
                    println!("{:<14} [{}] {}", p.name, p.style, p.prompt);
                }
            }
            Ok(())
        }
        Commands::Dimensions { json } => {
            let dims = catalog::dimension_presets();
            if json {
                println!("{}", serde_json::to_string_pretty(&dims)?);
            } else {
                for d in dims {
                    println!("{:<5} {}x{}  {}", d.value, d.width, d.height, d.label);
                }
            }
            Ok(())
        }
        Commands::History { cmd } => {
            let history = open_history(&conf).await?;
            match cmd {
                HistoryCmd::List { json } => {
                    let entries = history.list().await;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    } else if entries.is_empty() {
                        eprintln!("No history yet");
                    } else {
                        entries.iter().for_each(print_history_line);
                    }
                }
                HistoryCmd::Remove { id } => {
                    if !history.remove(&id).await {
                        eprintln!("No history entry '{}'", id);
                        std::process::exit(1);
                    }
                }
                HistoryCmd::Clear => history.clear().await,
                HistoryCmd::Cleanup { days } => {
                    let removed = history.cleanup_older_than_days(days.max(0)).await;
                    println!("Removed {} entries", removed);
                }
                HistoryCmd::Export { out } => {
                    let doc = history.export().await;
                    match out {
                        Some(path) => {
                            tokio::fs::write(&path, &doc).await?;
                            println!("Saved {} ({} bytes)", path.display(), doc.len());
                        }
                        None => println!("{}", doc),
                    }
                }
                HistoryCmd::Import { path } => {
                    let doc = tokio::fs::read_to_string(&path).await?;
                    if !history.import(&doc).await {
                        eprintln!("Failed to import {}", path.display());
                        std::process::exit(1);
                    }
                }
                HistoryCmd::Usage => {
                    let usage = history.usage().await;
                    println!("used: {} bytes, available: {} bytes", usage.used, usage.available);
                }
            }
            Ok(())
        }
        Commands::Prefs { cmd } => {
            let history = open_history(&conf).await?;
            let prefs = match cmd {
                PrefsCmd::Show => history.preferences().await,
                PrefsCmd::Set { theme, default_style, default_dimensions, system_prompt } => {
                    history.update_preferences(PreferencesUpdate {
                        theme,
                        default_style,
                        default_dimensions,
                        system_prompt,
                    })
                    .await
                }
                PrefsCmd::Reset => {
                    history.reset_preferences().await;
                    history.preferences().await
                }
            };
            println!("{}", serde_json::to_string_pretty(&prefs)?);
            Ok(())
        }
    }
}
