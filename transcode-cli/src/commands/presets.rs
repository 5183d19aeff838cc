//! Show encoder speed presets command.

use clap::Args;
use console::style;
use serde::Serialize;
use transcode_autotune::{BenchmarkConfig, Preset};

/// Preset information for display.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    /// x264 preset name.
    pub name: &'static str,
    /// User-facing quality label.
    pub quality: &'static str,
    /// Encode cost relative to `faster`.
    pub relative_cost: f64,
    /// Motion search radius of the software trial encoder.
    pub search_radius: u32,
    /// Whether the default benchmark tries this preset.
    pub benchmarked: bool,
}

impl PresetInfo {
    fn new(preset: Preset, config: &BenchmarkConfig) -> Self {
        Self {
            name: preset.x264_name(),
            quality: preset.quality_label(),
            relative_cost: preset.relative_cost(),
            search_radius: preset.search_radius(),
            benchmarked: config.presets.contains(&preset),
        }
    }
}

/// List encoder speed presets.
#[derive(Args, Debug)]
pub struct CmdPresets {
    /// Show detailed info for a specific preset.
    #[arg(long)]
    pub show: Option<Preset>,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

impl CmdPresets {
    /// Execute the presets command.
    pub fn run(&self) -> anyhow::Result<()> {
        let config = BenchmarkConfig::default();

        if let Some(preset) = self.show {
            let info = PresetInfo::new(preset, &config);
            if self.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_preset_details(&info);
            }
            return Ok(());
        }

        let presets = available_presets(&config);
        if self.json {
            let output = serde_json::json!({ "presets": presets });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!();
        println!("{}", style("Encoder Presets").cyan().bold());
        println!();
        println!(
            "{:<12} {:<20} {:<8} {}",
            style("NAME").white().bold(),
            style("QUALITY").white().bold(),
            style("COST").white().bold(),
            style("BENCHMARKED").white().bold()
        );
        println!("{}", style("-".repeat(56)).dim());

        for info in &presets {
            println!(
                "{:<12} {:<20} {:<8} {}",
                style(info.name).yellow(),
                info.quality,
                format!("{:.2}x", info.relative_cost),
                if info.benchmarked { "yes" } else { "" }
            );
        }

        println!();
        println!(
            "Use {} to see details for a specific preset.",
            style("--show <preset>").cyan()
        );
        Ok(())
    }
}

fn print_preset_details(info: &PresetInfo) {
    println!();
    println!(
        "{}: {}",
        style("Preset").cyan().bold(),
        style(info.name).yellow()
    );
    println!();
    println!("  {:<16} {}", style("Quality:").white(), info.quality);
    println!("  {:<16} {:.2}x", style("Relative cost:").white(), info.relative_cost);
    println!("  {:<16} {} px", style("Search radius:").white(), info.search_radius);
    println!(
        "  {:<16} {}",
        style("Benchmarked:").white(),
        if info.benchmarked { "yes" } else { "no" }
    );
    println!();
}

/// All presets, fastest first.
fn available_presets(config: &BenchmarkConfig) -> Vec<PresetInfo> {
    Preset::ALL
        .iter()
        .map(|&preset| PresetInfo::new(preset, config))
        .collect()
}
