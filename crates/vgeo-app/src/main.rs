//! VibeGeometry 命令行入口
//!
//! 读取/保存构造文件、回放宏、重新求交并打印摘要。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use vgeo_core::prelude::*;
use vgeo_file::{construction, macro_file, JsonStore};

#[derive(Parser)]
#[command(name = "vgeo")]
#[command(version, about = "Compass-and-straightedge construction engine")]
struct Cli {
    /// Engine configuration file (JSON); missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a summary of a construction file
    Info { file: PathBuf },

    /// Replay a macro file, optionally starting from a construction file
    Replay {
        #[arg(value_name = "MACRO")]
        macro_path: PathBuf,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override the delay between commands
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Recompute every pairwise intersection and save the result
    Intersect {
        file: PathBuf,
        /// Defaults to overwriting the input file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(level).finish(),
    )?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Info { file } => info_command(&file, &config),
        Command::Replay {
            macro_path,
            input,
            output,
            delay_ms,
        } => {
            replay_command(
                &macro_path,
                input.as_deref(),
                output.as_deref(),
                delay_ms,
                config,
            )
            .await
        }
        Command::Intersect { file, output } => {
            intersect_command(&file, output.as_deref(), &config)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

fn info_command(file: &Path, config: &EngineConfig) -> Result<()> {
    let model = construction::load(file, config)
        .with_context(|| format!("failed to open {}", file.display()))?;
    print!("{}", summarize(&model));
    Ok(())
}

async fn replay_command(
    macro_path: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    delay_ms: Option<u64>,
    mut config: EngineConfig,
) -> Result<()> {
    if let Some(delay) = delay_ms {
        config.replay_delay_ms = delay;
    }

    let commands = macro_file::load_macro(macro_path)
        .with_context(|| format!("failed to read macro {}", macro_path.display()))?;

    let mut session = Session::new(config).with_store(JsonStore);
    if let Some(input) = input {
        session
            .open(input)
            .with_context(|| format!("failed to open {}", input.display()))?;
    }

    // Ctrl-C 在命令之间中止回放
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = session.run_macro(commands, &cancel).await;
    for (index, err) in &report.failed {
        warn!("Command {} failed: {}", index + 1, err);
    }
    println!(
        "Replayed {}/{} commands ({} failed{})",
        report.executed,
        report.total,
        report.failed.len(),
        if report.cancelled { ", cancelled" } else { "" }
    );

    if let Some(output) = output {
        session
            .save(output)
            .with_context(|| format!("failed to save {}", output.display()))?;
    }
    print!("{}", summarize(session.model()));
    Ok(())
}

fn intersect_command(file: &Path, output: Option<&Path>, config: &EngineConfig) -> Result<()> {
    let mut model = construction::load(file, config)
        .with_context(|| format!("failed to open {}", file.display()))?;
    let created = model.recompute_all_intersections();
    println!("Added {} intersection points", created.len());

    let target = output.unwrap_or(file);
    construction::save(&model, target)
        .with_context(|| format!("failed to save {}", target.display()))?;
    Ok(())
}

/// 按类别列出所有对象
fn summarize(model: &Construction) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} points, {} lines, {} extended lines, {} circles",
        model.points().len(),
        model.lines().len(),
        model.extended_lines().len(),
        model.circles().len()
    );

    for p in model.points() {
        let _ = writeln!(out, "  point  {:<8} ({:.6}, {:.6})", p.label, p.position.x, p.position.y);
    }
    for (i, line) in model.lines().iter().enumerate() {
        if let Some((a, b)) = model.line_endpoints(i) {
            let _ = writeln!(
                out,
                "  line   {:<8} ({:.6}, {:.6}) -> ({:.6}, {:.6})",
                line.label, a.x, a.y, b.x, b.y
            );
        }
    }
    for ext in model.extended_lines() {
        let _ = writeln!(
            out,
            "  ext    {:<8} ({:.6}, {:.6}) -> ({:.6}, {:.6})",
            ext.label, ext.start.x, ext.start.y, ext.end.x, ext.end.y
        );
    }
    for c in model.circles() {
        let _ = writeln!(
            out,
            "  circle {:<8} ({:.6}, {:.6}) r={:.6}",
            c.label, c.circle.center.x, c.circle.center.y, c.circle.radius
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_replay_arguments() {
        let cli = Cli::parse_from([
            "vgeo", "replay", "run.macro", "--input", "in.json", "--delay-ms", "0", "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Replay {
                macro_path,
                input,
                output,
                delay_ms,
            } => {
                assert_eq!(macro_path, PathBuf::from("run.macro"));
                assert_eq!(input, Some(PathBuf::from("in.json")));
                assert_eq!(output, None);
                assert_eq!(delay_ms, Some(0));
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "view_half_span": 8.0 }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.view_half_span, 8.0);
        assert_eq!(config.replay_delay_ms, 1000);
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_summary_lists_objects() {
        let mut model = Construction::new();
        model.add_point(Point2::new(0.0, 0.0), Some("O"), false).unwrap();
        model.add_circle(Point2::new(0.0, 0.0), 1.5, None).unwrap();

        let summary = summarize(&model);
        assert!(summary.starts_with("1 points, 0 lines, 0 extended lines, 1 circles"));
        assert!(summary.contains("O"));
        assert!(summary.contains("r=1.500000"));
    }

    #[test]
    fn test_intersect_command_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");

        let mut model = Construction::new();
        model.add_circle(Point2::new(0.0, 0.0), 5.0, None).unwrap();
        model.add_circle(Point2::new(6.0, 0.0), 5.0, None).unwrap();
        construction::save(&model, &input).unwrap();

        let config = EngineConfig::default();
        intersect_command(&input, Some(&output), &config).unwrap();

        let result = construction::load(&output, &config).unwrap();
        assert_eq!(result.points().len(), 2);
        assert_eq!(construction::load(&input, &config).unwrap().points().len(), 0);
    }
}
