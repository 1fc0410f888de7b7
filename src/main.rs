use anyhow::{bail, Context, Result};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use catalog_embed::catalog::{embedding_text, normalize_listing, read_json_lines};
use catalog_embed::config::Config;
use catalog_embed::display::{load_hits, print_result_list, show, ImageGrid};
use catalog_embed::embedding::{create_client, generate_embedding_with, EmbeddingOptions};
use catalog_embed::logging;
use catalog_embed::store::{create_store, fetch_image_base64, image_object_path};

enum Command {
    Normalize { input: PathBuf },
    Embed { input: PathBuf, output: Option<PathBuf> },
    Fetch { key: String, size: Option<String>, output: Option<PathBuf> },
    Results { input: PathBuf, limit: Option<usize> },
    Grid { input: PathBuf, limit: Option<usize>, save: Option<PathBuf> },
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut size = None;
    let mut output = None;
    let mut limit = None;
    let mut save = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("catalog-embed {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            flag @ ("--config" | "-c" | "--size" | "--out" | "-o" | "--limit" | "-n" | "--save") => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires an argument", flag);
                    std::process::exit(1);
                };
                match flag {
                    "--config" | "-c" => config_path = Some(PathBuf::from(value)),
                    "--size" => size = Some(value.clone()),
                    "--out" | "-o" => output = Some(PathBuf::from(value)),
                    "--save" => save = Some(PathBuf::from(value)),
                    _ => match value.parse() {
                        Ok(n) => limit = Some(n),
                        Err(_) => {
                            eprintln!("Error: --limit expects a number, got {}", value);
                            std::process::exit(1);
                        }
                    },
                }
                i += 1;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let (Some(name), Some(operand), None) = (positional.next(), positional.next(), positional.next()) else {
        print_help();
        std::process::exit(1);
    };

    let command = match name.as_str() {
        "normalize" => Command::Normalize { input: operand.into() },
        "embed" => Command::Embed { input: operand.into(), output },
        "fetch" => Command::Fetch { key: operand, size, output },
        "results" => Command::Results { input: operand.into(), limit },
        "grid" => Command::Grid { input: operand.into(), limit, save },
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    Args { config_path, command }
}

fn print_help() {
    println!(
        r#"catalog-embed - prepare multimodal product embeddings and inspect search results

USAGE:
    catalog-embed [OPTIONS] <COMMAND> <ARG>

COMMANDS:
    normalize <listings.jsonl>      Print listings with attribute records flattened
    embed <listings.jsonl>          Embed each listing's text and image
        --out, -o FILE              Write embeddings here instead of stdout
    fetch <image-key>               Print an image as base64
        --size SIZE                 Size variant (default from config, "small")
        --out, -o FILE              Save the raw image bytes instead
    results <hits.json>             Print the top hits as text
        --limit, -n N               Number of hits (default 3)
    grid <hits.json>                Show the top hits' images in the terminal
        --limit, -n N               Number of hits (default 3)
        --save FILE                 Write the grid as an image file instead

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    CATALOG_EMBED_CONFIG       Path to config file (overrides default location)
    CATALOG_EMBED_LOG          Log level (trace, debug, info, warn, error)
    AWS_BEARER_TOKEN_BEDROCK   Model API key when none is configured

Config file location: $XDG_CONFIG_HOME/catalog-embed/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Logs never go to stdout, which carries command output
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match args.command {
        Command::Normalize { input } => normalize(&input),
        Command::Embed { input, output } => embed(&config, &input, output.as_deref()),
        Command::Fetch { key, size, output } => {
            let size = size.unwrap_or_else(|| config.store.image_size.clone());
            fetch(&config, &key, &size, output.as_deref())
        }
        Command::Results { input, limit } => {
            let hits = read_hits(&input)?;
            print_result_list(&hits, limit.unwrap_or(config.display.limit))?;
            Ok(())
        }
        Command::Grid { input, limit, save } => {
            grid(&config, &input, limit.unwrap_or(config.display.limit), save.as_deref())
        }
    }
}

fn open_listings(input: &Path) -> Result<Vec<serde_json::Value>> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    read_json_lines(BufReader::new(file))
}

fn read_hits(input: &Path) -> Result<Vec<catalog_embed::display::SearchHit>> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    load_hits(&content).with_context(|| format!("Failed to parse hits in {}", input.display()))
}

fn normalize(input: &Path) -> Result<()> {
    let listings = open_listings(input)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for listing in &listings {
        serde_json::to_writer(&mut out, &normalize_listing(listing))?;
        writeln!(out)?;
    }

    info!("Normalized {} listings from {}", listings.len(), input.display());
    Ok(())
}

fn embed(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let listings = open_listings(input)?;
    let store = create_store(&config.store);
    let client = create_client(&config.model)?;
    let options = EmbeddingOptions {
        image_size: config.store.image_size.clone(),
        output_embedding_length: config.model.output_embedding_length,
    };

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(io::BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let mut embedded = 0;
    for (index, listing) in listings.iter().enumerate() {
        let normalized = normalize_listing(listing);
        let item_id = normalized.get("item_id").and_then(|v| v.as_str()).unwrap_or_default();

        let Some(image_key) = normalized.get("path").and_then(|v| v.as_str()) else {
            warn!("Skipping listing {} ({}): no image path", index + 1, item_id);
            continue;
        };

        let text = embedding_text(&normalized);
        let embedding = generate_embedding_with(
            store.as_ref(),
            &text,
            image_key,
            client.as_ref(),
            &config.model.model_id,
            &options,
        )
        .with_context(|| format!("Failed to embed listing {} ({})", index + 1, item_id))?;

        serde_json::to_writer(&mut out, &json!({ "item_id": item_id, "embedding": embedding }))?;
        writeln!(out)?;
        embedded += 1;
    }
    out.flush()?;

    info!(
        "Embedded {} of {} listings with {}",
        embedded,
        listings.len(),
        config.model.model_id
    );
    Ok(())
}

fn fetch(config: &Config, key: &str, size: &str, output: Option<&Path>) -> Result<()> {
    let store = create_store(&config.store);

    match output {
        Some(path) => {
            let bytes = store.get_object(&image_object_path(size, key))?;
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Saved {} ({} bytes) to {}", key, bytes.len(), path.display());
        }
        None => println!("{}", fetch_image_base64(store.as_ref(), key, size)?),
    }

    Ok(())
}

fn grid(config: &Config, input: &Path, limit: usize, save: Option<&Path>) -> Result<()> {
    let hits = read_hits(input)?;
    let store = create_store(&config.store);
    let grid = ImageGrid::fetch(store.as_ref(), &hits, limit, &config.store.image_size)?;

    match save {
        Some(path) => {
            if grid.is_empty() {
                bail!("No hits to draw in {}", input.display());
            }
            grid.save(path, config.display.panel_width, config.display.panel_height)?;
            // The image file carries no text, so list the captions in panel order
            for panel in grid.panels() {
                println!("{}", panel.title);
            }
            info!("Saved grid of {} images to {}", grid.len(), path.display());
        }
        None => show(&grid, config.display.protocol)?,
    }

    Ok(())
}
