use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rangebucket::aggregations::values::InMemoryColumns;
use rangebucket::aggregations::{
    execute, AggregationContext, AggregationRequest, AggregationResult, AggregationType,
    AggregationValue,
};
use rangebucket::config::LoggingConfig;
use rangebucket::Config;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rangebucket")]
#[command(about = "Range bucket aggregations over JSON documents")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.rangebucket/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate a JSONL document file
    Run {
        /// Request file (.json, .yaml or .yml)
        #[arg(short, long)]
        request: PathBuf,

        /// Documents, one JSON object per line
        #[arg(short, long)]
        docs: PathBuf,

        /// Fields whose string values are dates (date_range fields are added automatically)
        #[arg(long = "date-field")]
        date_fields: Vec<String>,

        /// Reference time for `now` in date math (RFC 3339)
        #[arg(long, env = "RANGEBUCKET_NOW")]
        now: Option<String>,

        /// Emit buckets as a key -> bucket map
        #[arg(long)]
        keyed: bool,

        #[arg(long, value_enum, default_value_t = Output::Json)]
        output: Output,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a request and print its buckets in result order
    Check {
        /// Request file (.json, .yaml or .yml)
        #[arg(short, long)]
        request: PathBuf,

        /// Reference time for `now` in date math (RFC 3339)
        #[arg(long, env = "RANGEBUCKET_NOW")]
        now: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_or_create(path)?,
        None => Config::load()?,
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Run {
            request,
            docs,
            mut date_fields,
            now,
            keyed,
            output,
            pretty,
        } => {
            let mut req = AggregationRequest::load(&request)
                .with_context(|| format!("Failed to load request {}", request.display()))?;
            if keyed {
                force_keyed(&mut req);
            }
            if let AggregationType::DateRange { field, .. } = &req.agg_type {
                if !date_fields.contains(field) {
                    date_fields.push(field.clone());
                }
            }

            let ctx = context(now.as_deref())?;
            let documents = read_documents(&docs)?;
            tracing::info!("Loaded {} documents from {}", documents.len(), docs.display());

            let mut columns = InMemoryColumns::from_documents(&documents, &date_fields, &ctx);
            for field in &config.aggregation.unmapped_fields {
                if columns.remove_field(field) {
                    tracing::debug!(field = %field, "treating field as unmapped");
                }
            }

            let result = execute(&req, &columns, ctx, &config.aggregation)?;
            print_result(&result, output, pretty)?;
        }
        Commands::Check { request, now } => {
            let req = AggregationRequest::load(&request)
                .with_context(|| format!("Failed to load request {}", request.display()))?;
            let field = match &req.agg_type {
                AggregationType::Range { field, .. } | AggregationType::DateRange { field, .. } => {
                    field.clone()
                }
                _ => anyhow::bail!("Root aggregation '{}' must be range or date_range", req.name),
            };

            // An empty column takes the mapped path so sub-aggregations get built too.
            let columns = InMemoryColumns::new(0).with_column(field, Vec::new());
            let result = execute(&req, &columns, context(now.as_deref())?, &config.aggregation)?;
            if let AggregationValue::Range(range) = &result.value {
                for bucket in &range.buckets {
                    println!(
                        "{}\t{}\t{}",
                        bucket.key,
                        bound_label(bucket.from_as_string.as_deref(), bucket.from),
                        bound_label(bucket.to_as_string.as_deref(), bucket.to),
                    );
                }
                tracing::info!("Request '{}' is valid: {} ranges", req.name, range.buckets.len());
            }
        }
    }

    Ok(())
}

/// RUST_LOG wins over `logging.level`; output goes to `logging.file` when set.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let log_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let writer = match &logging.file {
        Some(log_file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(writer);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn context(now: Option<&str>) -> Result<AggregationContext> {
    match now {
        Some(s) => {
            let now = DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("Invalid --now timestamp {:?}", s))?;
            Ok(AggregationContext::at(now.with_timezone(&Utc)))
        }
        None => Ok(AggregationContext::new()),
    }
}

fn force_keyed(req: &mut AggregationRequest) {
    match &mut req.agg_type {
        AggregationType::Range { keyed, .. } | AggregationType::DateRange { keyed, .. } => {
            *keyed = Some(true);
        }
        _ => {}
    }
}

fn read_documents(path: &Path) -> Result<Vec<serde_json::Value>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open documents {}", path.display()))?;
    let mut documents = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), i + 1))?;
        documents.push(doc);
    }
    Ok(documents)
}

fn print_result(result: &AggregationResult, output: Output, pretty: bool) -> Result<()> {
    let mut body = serde_json::Map::new();
    body.insert(result.name.clone(), serde_json::to_value(&result.value)?);
    let body = serde_json::Value::Object(body);

    let text = match output {
        Output::Yaml => serde_yaml::to_string(&body)?,
        Output::Json if pretty => serde_json::to_string_pretty(&body)?,
        Output::Json => serde_json::to_string(&body)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn bound_label(formatted: Option<&str>, value: Option<f64>) -> String {
    match (formatted, value) {
        (Some(s), _) => s.to_string(),
        (None, Some(v)) => v.to_string(),
        (None, None) => "*".to_string(),
    }
}
