use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{debug, info};
use repo_core::container::DEFAULT_PASSPHRASE;
use repo_core::core_api::{Engine, FieldEdit, Session};
use repo_core::document::SaveDocument;
use repo_render::{
    FieldSelection, JsonStyle, render_json_full, render_json_selected, render_selected_pairs,
    render_text,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE.es3", required_unless_present = "import_json")]
    path: Option<PathBuf>,
    #[arg(
        long,
        env = "REPO_SE_PASSPHRASE",
        default_value = DEFAULT_PASSPHRASE,
        hide_default_value = true,
        hide_env_values = true
    )]
    passphrase: String,
    #[arg(long)]
    json: bool,
    #[arg(long = "game-info")]
    game_info: bool,
    #[arg(long)]
    players: bool,
    #[arg(long)]
    items: bool,
    /// Edit a field, e.g. `game.currency=50` or `item.Item Mine Explosive/2.item=9`.
    #[arg(long = "set", value_name = "TARGET=VALUE", allow_hyphen_values = true)]
    set: Vec<String>,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Write the decrypted save as pretty-printed JSON.
    #[arg(long = "export-json", value_name = "PATH")]
    export_json: Option<PathBuf>,
    /// Read a plain JSON save instead of an encrypted one.
    #[arg(long = "import-json", value_name = "PATH", conflicts_with = "path")]
    import_json: Option<PathBuf>,
}

impl Cli {
    fn field_selection(&self) -> FieldSelection {
        FieldSelection {
            game_info: self.game_info,
            players: self.players,
            items: self.items,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let fields = cli.field_selection();
    let has_edits = !cli.set.is_empty();

    if has_edits && cli.output.is_none() {
        eprintln!("--set requires --output <PATH>");
        process::exit(2);
    }
    if cli.output.is_some() && !has_edits && cli.import_json.is_none() {
        eprintln!("--output requires at least one --set or --import-json");
        process::exit(2);
    }

    let edits: Vec<FieldEdit> = cli
        .set
        .iter()
        .map(|raw| {
            raw.parse().unwrap_or_else(|e| {
                eprintln!("Invalid --set {raw:?}: {e}");
                process::exit(2);
            })
        })
        .collect();

    let engine = Engine::with_passphrase(cli.passphrase.as_str());
    let mut session = open_session(&engine, &cli);

    session.apply_edits(&edits).unwrap_or_else(|e| {
        eprintln!("Error applying edit: {e}");
        process::exit(1);
    });
    debug!("applied {} edit(s)", edits.len());

    if let Some(out_path) = cli.output.as_ref() {
        let backup = session.save(out_path).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        });
        if let Some(backup) = backup {
            info!("previous save kept at {}", backup.display());
        }
    }

    if let Some(json_path) = cli.export_json.as_ref() {
        let rendered = session
            .to_document()
            .and_then(|doc| doc.to_string_pretty())
            .unwrap_or_else(|e| {
                eprintln!("Error rendering save as JSON: {e}");
                process::exit(1);
            });
        fs::write(json_path, rendered).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", json_path.display());
            process::exit(1);
        });
    }

    if cli.json {
        let json = if fields.is_any_selected() {
            render_json_selected(&session, &fields, JsonStyle::CanonicalV1)
        } else {
            render_json_full(&session, JsonStyle::CanonicalV1)
        };
        let rendered = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
        return;
    }

    if fields.is_any_selected() {
        for (key, value) in render_selected_pairs(&session, &fields) {
            println!("{key}={value}");
        }
        return;
    }

    let mut wrote_files = false;
    if let Some(out_path) = cli.output.as_ref() {
        println!("Wrote edited save to {}", out_path.display());
        wrote_files = true;
    }
    if let Some(json_path) = cli.export_json.as_ref() {
        println!("Exported JSON to {}", json_path.display());
        wrote_files = true;
    }
    if wrote_files {
        return;
    }

    print!("{}", render_text(&session));
}

fn open_session(engine: &Engine, cli: &Cli) -> Session {
    if let Some(json_path) = cli.import_json.as_ref() {
        let bytes = fs::read(json_path).unwrap_or_else(|e| {
            eprintln!("Error reading {}: {e}", json_path.display());
            process::exit(1);
        });
        let document = SaveDocument::from_slice(&bytes).unwrap_or_else(|e| {
            eprintln!("Error parsing JSON save: {}", json_path.display());
            eprintln!("  {}", e);
            process::exit(1);
        });
        return engine.open_document(document);
    }

    let Some(path) = cli.path.as_ref() else {
        eprintln!("a save path or --import-json is required");
        process::exit(2);
    };
    engine.open_path(path).unwrap_or_else(|e| {
        eprintln!("Error opening save file: {}", path.display());
        eprintln!("  {}", e);
        if e.is_unreadable() {
            eprintln!("  (wrong passphrase or not an .es3 save?)");
        }
        process::exit(1);
    })
}
