//! Sheetload CLI - Import spreadsheets against a schema
//!
//! # Main Commands
//!
//! ```bash
//! sheetload serve                                # Start HTTP server (port 3000)
//! sheetload import data.csv --schema schema.json # Full import pipeline
//! sheetload validate data.csv --schema schema.json
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! sheetload parse data.csv         # Just parse to a raw JSON grid
//! sheetload example-schema         # Show an example schema document
//! sheetload rules                  # Show available validation rules
//! ```

use clap::{Parser, Subcommand};
use sheetload::{
    parse_file, ColumnMapping, ConfirmOutcome, ImportSession, Schema,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetload")]
#[command(about = "Import spreadsheets against a schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV/XLSX file and output the raw grid as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full import pipeline: parse → map → validate → rows
    Import {
        /// Input file
        input: PathBuf,

        /// Schema document (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Mapping file (JSON, {"0": "name", ...}); auto-mapped from
        /// headers when omitted
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Treat the first row as headers (overrides detection)
        #[arg(long, conflicts_with = "no_headers")]
        has_headers: bool,

        /// Treat the first row as data (overrides detection)
        #[arg(long)]
        no_headers: bool,

        /// Comma-separated data row indices to exclude
        #[arg(short, long)]
        exclude: Option<String>,

        /// Output file for the imported rows (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a file against a schema and report the errors
    Validate {
        /// Input file
        input: PathBuf,

        /// Schema document (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Mapping file (JSON); auto-mapped from headers when omitted
        #[arg(short, long)]
        mapping: Option<PathBuf>,
    },

    /// Show an example schema document
    ExampleSchema,

    /// Show available validation rules
    Rules,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Import {
            input,
            schema,
            mapping,
            has_headers,
            no_headers,
            exclude,
            output,
        } => {
            let headers_override = match (has_headers, no_headers) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd_import(
                &input,
                &schema,
                mapping.as_deref(),
                headers_override,
                exclude.as_deref(),
                output.as_deref(),
                true,
            )
            .await
        }

        Commands::Validate { input, schema, mapping } => {
            cmd_import(&input, &schema, mapping.as_deref(), None, None, None, false).await
        }

        Commands::ExampleSchema => cmd_example_schema(),

        Commands::Rules => cmd_rules(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let sheet = parse_file(input)?;
    eprintln!("   Format: {:?}", sheet.info.format);
    eprintln!("   Encoding: {}", sheet.info.encoding);
    if let Some(d) = sheet.info.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(d));
    }
    eprintln!("✅ Parsed {} rows", sheet.table.row_count());

    let json = serde_json::to_string_pretty(sheet.table.rows())?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_import(
    input: &Path,
    schema_path: &Path,
    mapping_path: Option<&Path>,
    headers_override: Option<bool>,
    exclude: Option<&str>,
    output: Option<&Path>,
    emit_rows: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let schema_json = fs::read_to_string(schema_path)?;
    let schema = Schema::from_json(&schema_json)?;
    eprintln!("   Schema: {} fields", schema.len());

    let mut session = ImportSession::new(schema);
    session.load_file(input)?;

    if let Some(info) = session.sheet_info() {
        eprintln!("   Encoding: {}", info.encoding);
        if let Some(d) = info.delimiter {
            eprintln!("   Delimiter: '{}'", format_delimiter(d));
        }
    }

    if let Some(has_headers) = headers_override {
        session.set_has_headers(has_headers)?;
        eprintln!("   Headers: {} (overridden)", has_headers);
    } else {
        eprintln!("   Headers: {} (detected)", session.has_headers());
    }
    eprintln!("   Rows: {}", session.data_row_count());

    // Mapping: explicit file, or matched from the headers
    match mapping_path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let mapping: ColumnMapping = serde_json::from_str(&content)?;
            let applied = session.replace_mapping(&mapping)?;
            eprintln!("   Mapping: {} columns (from {})", applied, path.display());
        }
        None => {
            session.auto_map()?;
            eprintln!("   Mapping: {} columns (auto-matched)", session.mapping().len());
        }
    }

    print_mapping(&session);

    match session.confirm_mapping().await? {
        ConfirmOutcome::MissingFields(missing) => {
            eprintln!("\n❌ Unmapped required fields: {}", missing.join(", "));
            std::process::exit(1);
        }
        ConfirmOutcome::Confirmed { valid, invalid } => {
            eprintln!("\n✔️  Validation:");
            if invalid > 0 {
                eprintln!("   ✅ Valid: {}", valid);
                eprintln!("   ❌ Invalid: {}", invalid);
                for result in session.results().iter().filter(|r| !r.is_valid).take(10) {
                    eprintln!("\n   Row {}:", result.row_index);
                    for error in result.errors.iter().take(3) {
                        eprintln!("     - {}: {}", error.key, error.message);
                    }
                }
            } else {
                eprintln!("   ✅ All {} rows valid!", valid);
            }
        }
    }

    // Exclusions
    if let Some(list) = exclude {
        for part in list.split(',').filter(|p| !p.trim().is_empty()) {
            let row: usize = part.trim().parse()?;
            session.set_row_excluded(row, true)?;
        }
        eprintln!("   Excluded rows: {:?}", session.excluded());
    }

    if !emit_rows {
        if session.invalid_retained() > 0 {
            std::process::exit(1);
        }
        eprintln!("\n✨ Done!");
        return Ok(());
    }

    if !session.can_submit() {
        eprintln!(
            "\n❌ {} retained rows still fail validation; fix or exclude them",
            session.invalid_retained()
        );
        std::process::exit(1);
    }

    let rows = session.submit()?;
    eprintln!("\n📦 Imported {} rows", rows.len());

    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_mapping(session: &ImportSession) {
    let columns = session.columns();
    eprintln!("🗺️  Column mapping:");
    for (column, key) in session.mapping().iter() {
        let name = columns
            .get(column)
            .cloned()
            .unwrap_or_else(|| format!("Column {}", column + 1));
        eprintln!("   [{}] {} → {}", column, name, key);
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_example_schema() -> Result<(), Box<dyn std::error::Error>> {
    let config = sheetload::example_config();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_rules() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", sheetload::schema::rules_description());
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    sheetload::server::start_server(port).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
