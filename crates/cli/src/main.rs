use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use edf_core::{
    canonicalize_document, document_to_xml_string, read_data, read_document, read_schema, tokenize,
    EdfError,
};

/// EDF document toolchain.
#[derive(Parser)]
#[command(name = "edf", version, about = "EDF document toolchain")]
struct Cli {
    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    json_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an EDF document to JSON
    ToJson {
        /// Path to the EDF source file, or - for stdin
        input: PathBuf,
        /// Output path, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
        /// Datafy against this schema instead of emitting canonical JSON
        #[arg(short, long)]
        schema: Option<PathBuf>,
        /// Pretty-print with this many spaces of indentation
        #[arg(short, long, default_value = "2")]
        indent: usize,
        /// Produce compact single-line JSON
        #[arg(short, long)]
        compact: bool,
        /// Unwrap a single-element array to the lone object
        #[arg(long)]
        object: bool,
    },

    /// Convert an EDF document to XML
    ToXml {
        /// Path to the EDF source file, or - for stdin
        input: PathBuf,
        /// Output path, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Analyze a schema document and print the schema as JSON
    ParseSchema {
        /// Path to the schema source file, or - for stdin
        input: PathBuf,
        /// Output path, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Dump the token stream of an EDF document, one token per line
    Tokens {
        /// Path to the EDF source file, or - for stdin
        input: PathBuf,
        /// Output path, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match cli.command {
        Commands::ToJson {
            input,
            output,
            schema,
            indent,
            compact,
            object,
        } => {
            cmd_to_json(
                &input,
                &output,
                schema.as_deref(),
                indent,
                compact,
                object,
                json_errors,
            );
        }
        Commands::ToXml { input, output } => {
            cmd_to_xml(&input, &output, json_errors);
        }
        Commands::ParseSchema { input, output } => {
            cmd_parse_schema(&input, &output, json_errors);
        }
        Commands::Tokens { input, output } => {
            cmd_tokens(&input, &output, json_errors);
        }
    }
}

fn cmd_to_json(
    input: &Path,
    output: &Path,
    schema: Option<&Path>,
    indent: usize,
    compact: bool,
    object: bool,
    json_errors: bool,
) {
    let src = read_input(input, json_errors);

    let mut data = match schema {
        Some(schema_path) => {
            let schema_src = read_input(schema_path, json_errors);
            let schema = match read_schema(&schema_src) {
                Ok(s) => s,
                Err(e) => fail(&e, json_errors),
            };
            match read_data(&src, &schema) {
                Ok(d) => d,
                Err(e) => fail(&e, json_errors),
            }
        }
        None => {
            let doc = match read_document(&src) {
                Ok(d) => d,
                Err(e) => fail(&e, json_errors),
            };
            canonicalize_document(&doc)
        }
    };

    if object {
        data = match data {
            serde_json::Value::Array(mut items) if items.len() == 1 => items.remove(0),
            serde_json::Value::Array(items) => fail_with(
                "usage",
                &format!("expected a single object, found {}", items.len()),
                json_errors,
            ),
            other => other,
        };
    }

    let mut rendered = render_json(&data, indent, compact);
    rendered.push('\n');
    write_output(output, &rendered, json_errors);
}

fn cmd_to_xml(input: &Path, output: &Path, json_errors: bool) {
    let src = read_input(input, json_errors);
    let doc = match read_document(&src) {
        Ok(d) => d,
        Err(e) => fail(&e, json_errors),
    };
    write_output(output, &document_to_xml_string(&doc), json_errors);
}

fn cmd_parse_schema(input: &Path, output: &Path, json_errors: bool) {
    let src = read_input(input, json_errors);
    let schema = match read_schema(&src) {
        Ok(s) => s,
        Err(e) => fail(&e, json_errors),
    };
    let rendered = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    write_output(output, &format!("{}\n", rendered), json_errors);
}

fn cmd_tokens(input: &Path, output: &Path, json_errors: bool) {
    let src = read_input(input, json_errors);
    let tokens = match tokenize(&src) {
        Ok(t) => t,
        Err(e) => fail(&e, json_errors),
    };

    let mut out = String::new();
    for token in &tokens {
        let mut flags = String::new();
        if token.fabricated {
            flags.push_str(" fabricated");
        }
        if token.error {
            flags.push_str(" error");
        }
        out.push_str(&format!(
            "{}:{} {:?} {:?}{}\n",
            token.line, token.col, token.kind, token.text, flags
        ));
    }
    write_output(output, &out, json_errors);
}

/// Render a JSON value compactly or pretty-printed with the given indent
/// width. Falls back to compact output if pretty serialization fails.
fn render_json(value: &serde_json::Value, indent: usize, compact: bool) -> String {
    if compact {
        return value.to_string();
    }
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if value.serialize(&mut ser).is_ok() {
        String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Read the whole input, treating `-` as stdin. Exits on failure.
fn read_input(path: &Path, json_errors: bool) -> String {
    let result = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(path)
    };
    match result {
        Ok(s) => s,
        Err(e) => fail_with(
            "io",
            &format!("error reading '{}': {}", path.display(), e),
            json_errors,
        ),
    }
}

/// Write the rendered output, treating `-` as stdout. Exits on failure.
fn write_output(path: &Path, data: &str, json_errors: bool) {
    let result = if path.as_os_str() == "-" {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(data.as_bytes())
            .and_then(|_| stdout.flush())
    } else {
        std::fs::write(path, data)
    };
    if let Err(e) = result {
        fail_with(
            "io",
            &format!("error writing '{}': {}", path.display(), e),
            json_errors,
        );
    }
}

/// Report a pipeline error on stderr and exit non-zero.
fn fail(e: &EdfError, json_errors: bool) -> ! {
    if json_errors {
        let rendered = serde_json::to_string_pretty(&e.to_json_value())
            .unwrap_or_else(|_| format!("{:?}", e));
        eprintln!("{}", rendered);
    } else {
        eprintln!("{}", e);
    }
    process::exit(1);
}

/// Report a non-pipeline error (io, usage) on stderr and exit non-zero.
fn fail_with(kind: &str, msg: &str, json_errors: bool) -> ! {
    if json_errors {
        eprintln!("{}", serde_json::json!({ "error": kind, "message": msg }));
    } else {
        eprintln!("{}", msg);
    }
    process::exit(1);
}
