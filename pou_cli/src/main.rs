//! Batch command line tool around the core analysis operations:
//! render models to diagrams, publish reports into description files,
//! and upload models plus metrics to the storage server. Each file is
//! an independent unit of work; a failure prints `[fail]` and the batch
//! moves on. There is deliberately no retry/backoff around HTTP calls.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;

use pou_core::{
    change_pou_description, get_pou_description, self_contained_style_header, AnalysisService,
    FbdTextFrontend, REPORT_MARKER,
};

const RENDER_SCALE: f64 = 7.0;
const EMPTY_METRICS_JSON: &str = "{}";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "pou-analysis", about = "POU analysis command line tool")]
struct CliArgs {
    /// Server address as host:port.
    #[arg(long, default_value = "localhost:8000")]
    server: String,

    /// Project to associate uploaded models with.
    #[arg(long = "project-name", default_value = "UNKNOWN")]
    project_name: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload analyses listed in a JSON target file.
    Upload(UploadArgs),
    /// Upload every model under a directory, pairing metrics files by stem.
    UploadDir(UploadDirArgs),
    /// Attach an additional metrics file to an existing model.
    AddMetric(AddMetricArgs),
    /// Render one model to an HTML-wrapped SVG diagram.
    Render(RenderArgs),
    /// Render every .pou model in a directory.
    RenderAll(RenderAllArgs),
    /// Regenerate the analysis report inside a description file.
    PublishReport(PublishReportArgs),
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Path to a JSON file listing {model, additional_metrics} entries.
    #[arg(long)]
    target: PathBuf,
}

#[derive(Args, Debug)]
struct UploadDirArgs {
    /// Directory containing model and metrics files.
    #[arg(long = "target-dir")]
    target_dir: PathBuf,
}

#[derive(Args, Debug)]
struct AddMetricArgs {
    /// Model ID on the server.
    #[arg(long)]
    model: String,

    /// Metrics file to upload (JSON).
    #[arg(long = "metrics-file")]
    metrics_file: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long = "model-path")]
    model_path: PathBuf,

    /// Output path; ".html" is appended, existing files are overwritten.
    #[arg(long = "output-path")]
    output_path: PathBuf,
}

#[derive(Args, Debug)]
struct RenderAllArgs {
    #[arg(long = "models-directory")]
    models_directory: PathBuf,
}

#[derive(Args, Debug)]
struct PublishReportArgs {
    #[arg(long = "model-path")]
    model_path: PathBuf,

    /// Description file to update; text above the report marker survives.
    #[arg(long = "description-file")]
    description_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct UploadEntry {
    model: Option<PathBuf>,
    additional_metrics: Option<PathBuf>,
}

enum MetricsSource {
    File(PathBuf),
    Empty,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    match args.command {
        Command::Upload(cmd) => {
            let text = fs::read_to_string(&cmd.target)
                .with_context(|| format!("failed to read {}", cmd.target.display()))?;
            let entries: Vec<UploadEntry> =
                serde_json::from_str(&text).context("invalid upload target JSON")?;
            println!("Uploading to server: {}", args.server);
            for entry in entries {
                let (Some(model), Some(metrics)) = (entry.model, entry.additional_metrics) else {
                    println!("[skip] entry missing model or metrics information");
                    continue;
                };
                report_outcome(&model, || {
                    upload_single_model(
                        &client,
                        &args.server,
                        &model,
                        MetricsSource::File(metrics.clone()),
                        &args.project_name,
                    )
                });
            }
        }
        Command::UploadDir(cmd) => {
            if !cmd.target_dir.is_dir() {
                bail!("target dir not found: {}", cmd.target_dir.display());
            }
            let mut dirs = Vec::new();
            collect_dirs(&cmd.target_dir, &mut dirs)?;
            for dir in dirs {
                upload_directory(&client, &args.server, &args.project_name, &dir)?;
            }
        }
        Command::AddMetric(cmd) => {
            add_metrics(&client, &args.server, &cmd.model, &cmd.metrics_file)?;
            println!("[ok] metrics attached to model {}", cmd.model);
        }
        Command::Render(cmd) => {
            let out = render_model(&cmd.model_path, &cmd.output_path)?;
            println!("Render created at {}", out.display());
        }
        Command::RenderAll(cmd) => {
            let mut models = files_with_extension(&cmd.models_directory, "pou")?;
            models.sort();
            if models.is_empty() {
                println!("No .pou files found in {}", cmd.models_directory.display());
                return Ok(());
            }
            for model in models {
                let output = model.with_extension("pou.svg");
                report_outcome(&model, || render_model(&model, &output).map(|_| ()));
            }
        }
        Command::PublishReport(cmd) => {
            publish_report(&cmd.model_path, &cmd.description_file)?;
            println!(
                "[ok] report published into {}",
                cmd.description_file.display()
            );
        }
    }

    Ok(())
}

fn report_outcome(path: &Path, work: impl FnOnce() -> Result<()>) {
    match work() {
        Ok(()) => println!("[ok] {}", path.display()),
        Err(err) => println!("[fail] {}: {err:#}", path.display()),
    }
}

/// Parse, render at the fixed batch scale, and wrap the SVG body in a
/// minimal self-contained HTML page. Returns the written path.
fn render_model(model: &Path, output: &Path) -> Result<PathBuf> {
    let service = AnalysisService::new(FbdTextFrontend);
    let program = service.parse_file(model)?;
    let (width, height, svg_body) = service.render(&program, RENDER_SCALE)?;
    let style = self_contained_style_header();
    let out_path = PathBuf::from(format!("{}.html", output.display()));
    let doc = format!(
        "<html><head>{style}</head><body>\n\
<svg width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\">{svg_body}</svg></body></html>"
    );
    fs::write(&out_path, doc).with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(out_path)
}

/// Regenerate the autogenerated part of a description file: text above
/// the marker is kept, everything from the marker on is replaced with a
/// fresh report.
fn publish_report(model: &Path, description_file: &Path) -> Result<()> {
    let service = AnalysisService::new(FbdTextFrontend);
    let program = service.parse_file(model)?;
    let report = service.report(&program);
    let current = get_pou_description(description_file)?;
    let head = match current.find(REPORT_MARKER) {
        Some(at) => current[..at].to_string(),
        None => format!("{current}\n"),
    };
    let combined = format!("{head}{REPORT_MARKER}\n{report}");
    change_pou_description(&combined, description_file)?;
    Ok(())
}

fn upload_single_model(
    client: &Client,
    server: &str,
    model: &Path,
    metrics: MetricsSource,
    project_name: &str,
) -> Result<()> {
    let mut form = multipart::Form::new()
        .file("program_file_path", model)
        .with_context(|| format!("failed to open {}", model.display()))?;
    form = match metrics {
        MetricsSource::File(path) => form
            .file("metrics_file_path", &path)
            .with_context(|| format!("failed to open {}", path.display()))?,
        MetricsSource::Empty => form.part(
            "metrics_file_path",
            multipart::Part::text(EMPTY_METRICS_JSON).file_name("empty_metrics.json"),
        ),
    };
    form = form.text("project_name", project_name.to_string());

    let response = client
        .post(format!("http://{server}/batch"))
        .multipart(form)
        .send()?;
    let status = response.status();
    if !status.is_success() {
        bail!("upload rejected: {} - {}", status, response.text().unwrap_or_default());
    }
    Ok(())
}

fn add_metrics(client: &Client, server: &str, model_id: &str, metrics_file: &Path) -> Result<()> {
    let form = multipart::Form::new()
        .file("additional_metrics", metrics_file)
        .with_context(|| format!("failed to open {}", metrics_file.display()))?;
    let response = client
        .post(format!("http://{server}/{model_id}/append_metrics"))
        .multipart(form)
        .send()?;
    let status = response.status();
    if !status.is_success() {
        bail!("upload rejected: {} - {}", status, response.text().unwrap_or_default());
    }
    Ok(())
}

fn collect_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    out.push(dir.to_path_buf());
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dirs(&path, out)?;
        }
    }
    Ok(())
}

/// Upload every model in one directory. Metrics pairing is by file stem
/// within the same directory: no match uses an empty-metrics payload,
/// more than one match fails that model and the batch continues.
fn upload_directory(client: &Client, server: &str, project_name: &str, dir: &Path) -> Result<()> {
    let mut models = files_with_extension(dir, "pou")?;
    models.sort();
    let metrics = files_with_extension(dir, "json")?;

    for model in models {
        let source = match match_metrics(&model, &metrics) {
            MetricsMatch::NoCandidate => MetricsSource::Empty,
            MetricsMatch::Single(path) => MetricsSource::File(path),
            MetricsMatch::Ambiguous(count) => {
                println!(
                    "[fail] {}: ambiguous metrics, {count} files share the stem",
                    model.display()
                );
                continue;
            }
        };
        report_outcome(&model, || {
            upload_single_model(client, server, &model, source, project_name)
        });
    }
    Ok(())
}

/// Outcome of pairing one model with the metrics files of its directory.
#[derive(Debug, PartialEq)]
enum MetricsMatch {
    NoCandidate,
    Single(PathBuf),
    Ambiguous(usize),
}

/// Stem pairing rule: zero candidates means an empty-metrics upload,
/// exactly one is used, more than one is an error the caller reports.
fn match_metrics(model: &Path, metrics: &[PathBuf]) -> MetricsMatch {
    let Some(stem) = model.file_stem() else {
        return MetricsMatch::NoCandidate;
    };
    let candidates: Vec<&PathBuf> = metrics
        .iter()
        .filter(|m| m.file_stem() == Some(stem))
        .collect();
    match candidates.as_slice() {
        [] => MetricsMatch::NoCandidate,
        [only] => MetricsMatch::Single((*only).clone()),
        many => MetricsMatch::Ambiguous(many.len()),
    }
}

fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        let matches = path.is_file()
            && path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
                .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    Ok(files)
}
