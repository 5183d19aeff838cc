//! Benchmark the encoder on this machine.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use serde::Serialize;
use transcode_autotune::advisor::UploadUnit;
use transcode_autotune::{
    BenchmarkConfig, BenchmarkOutcome, Budget, RecommendedSettings, TrialResult, UploadSettings,
};

use super::CpuArg;

/// Benchmark the encoder and recommend output settings.
#[derive(Args, Debug)]
pub struct CmdAutotune {
    /// Upload speed available for broadcasting
    #[arg(long, required_unless_present = "local_file", conflicts_with = "local_file")]
    pub upload: Option<f64>,

    /// Unit of --upload (kbps, mbps, KBps, MBps)
    #[arg(long, default_value = "kbps")]
    pub unit: UploadUnit,

    /// Record to a local file instead of broadcasting
    #[arg(long)]
    pub local_file: bool,

    /// How much of the CPU the encoder may use
    #[arg(long, value_enum, default_value_t = CpuArg::Low)]
    pub cpu: CpuArg,

    /// Another interactive application (e.g. a game) shares the connection
    #[arg(long)]
    pub interactive: bool,

    /// Content is fast moving and needs more bits
    #[arg(long)]
    pub high_action: bool,

    /// The streaming service transcodes for viewers
    #[arg(long)]
    pub transcoder: bool,

    /// Benchmark configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use this result instead of the recommended one
    #[arg(long)]
    pub select: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// JSON completion output structure.
#[derive(Debug, Serialize)]
struct JsonAutotuneOutput<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(flatten)]
    outcome: &'a BenchmarkOutcome,
    settings: Option<RecommendedSettings>,
}

impl CmdAutotune {
    /// Execute the autotune command.
    pub fn run(&self, quiet: bool) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => BenchmarkConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => BenchmarkConfig::default(),
        };
        let budget = self.budget(&config);

        if !self.json && !quiet {
            print_plan(&config, &budget);
        }

        let outcome = self.benchmark(config.clone(), budget, !self.json && !quiet)?;

        let settings = match self.select {
            Some(index) => Some(outcome.select(index)?),
            None => outcome.recommended_settings(),
        };

        if self.json {
            let output = JsonAutotuneOutput {
                msg_type: "autotune_complete",
                outcome: &outcome,
                settings,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_results(&outcome.results, config.reserved_cpu);
            match settings {
                Some(settings) => print_settings(&settings),
                None => {
                    println!();
                    println!(
                        "{}",
                        style("No settings fit this budget. Try a higher CPU limit or a faster connection.")
                            .red()
                    );
                }
            }
        }
        Ok(())
    }

    fn budget(&self, config: &BenchmarkConfig) -> Budget {
        if self.local_file {
            return Budget::for_local_file(self.cpu.into(), config);
        }
        let upload = UploadSettings {
            upload_kbps: self.unit.to_kbps(self.upload.unwrap_or_default()),
            interactive: self.interactive,
            high_action: self.high_action,
            has_transcoder: self.transcoder,
        };
        Budget::from_upload(&upload, self.cpu.into(), config)
    }

    #[cfg(unix)]
    fn benchmark(
        &self,
        config: BenchmarkConfig,
        budget: Budget,
        show_progress: bool,
    ) -> anyhow::Result<BenchmarkOutcome> {
        use indicatif::{ProgressBar, ProgressStyle};
        use transcode_autotune::{
            drive, platform_sampler, BenchmarkEngine, FixedProfile, PacedClock,
            SoftwareEncoderFactory,
        };

        let total = config.total_tests() as u64 * 100;
        let mut engine = BenchmarkEngine::new(
            config,
            SoftwareEncoderFactory,
            platform_sampler()?,
            FixedProfile::default(),
        )?;

        let progress_bar = if show_progress {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent}% | {msg}",
                )?
                .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        engine.start(budget)?;
        drive(&mut engine, &mut PacedClock::new(), |progress| {
            if let Some(pb) = &progress_bar {
                pb.set_position(progress.tests_done as u64 * 100 + progress.partial_percent as u64);
                pb.set_message(format!("test {}/{}", progress.tests_done, progress.tests_total));
            }
        })?;
        if let Some(pb) = &progress_bar {
            pb.finish_and_clear();
        }

        engine
            .outcome()
            .context("Benchmark ended without producing an outcome")
    }

    #[cfg(not(unix))]
    fn benchmark(
        &self,
        _config: BenchmarkConfig,
        _budget: Budget,
        _show_progress: bool,
    ) -> anyhow::Result<BenchmarkOutcome> {
        anyhow::bail!("CPU usage sampling is not supported on this platform")
    }
}

fn print_plan(config: &BenchmarkConfig, budget: &Budget) {
    println!();
    println!("{}", style("System Benchmark").cyan().bold());
    println!(
        "  {:<16} {}%",
        style("CPU budget:").white(),
        (budget.max_own_cpu * 100.0).round()
    );
    if budget.target_is_local_file() {
        println!("  {:<16} local file", style("Target:").white());
    } else {
        println!(
            "  {:<16} {} Kb/s video, {} Kb/s audio",
            style("Bandwidth:").white(),
            budget.max_video_kbps,
            budget.max_audio_kbps
        );
    }
    println!(
        "  {:<16} up to {} trials of {:.1}s",
        style("Plan:").white(),
        config.total_tests(),
        config.trial_duration_secs
    );
    println!();
}

fn print_results(results: &[TrialResult], reserved_cpu: f64) {
    println!();
    println!("{}", style("Results").cyan().bold());
    if results.is_empty() {
        println!("  {}", style("(none)").dim());
        return;
    }
    for (i, result) in results.iter().enumerate() {
        let line = result.describe(reserved_cpu);
        if result.recommended {
            println!("  {:>2}  {}", i, style(line).green().bold());
        } else {
            println!("  {:>2}  {}", i, line);
        }
    }
}

fn print_settings(settings: &RecommendedSettings) {
    println!();
    println!("{}", style("Recommended Settings").cyan().bold());
    println!("  {:<16} {}", style("Canvas:").white(), settings.canvas);
    println!("  {:<16} {}", style("Output size:").white(), settings.output_size);
    println!("  {:<16} {} fps", style("Frame rate:").white(), settings.frame_rate);
    println!("  {:<16} {}", style("Preset:").white(), settings.video.preset);
    println!(
        "  {:<16} {} Kb/s",
        style("Video bitrate:").white(),
        settings.video.bitrate_kbps
    );
    println!(
        "  {:<16} {} Kb/s",
        style("Audio bitrate:").white(),
        settings.audio_bitrate_kbps
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use transcode_autotune::{CpuLimit, TargetKind};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        cmd: CmdAutotune,
    }

    fn parse(args: &[&str]) -> CmdAutotune {
        let mut full = vec!["test"];
        full.extend_from_slice(args);
        TestCli::parse_from(full).cmd
    }

    #[test]
    fn test_upload_budget() {
        let cmd = parse(&["--upload", "5", "--unit", "mbps", "--cpu", "medium"]);
        let config = BenchmarkConfig::default();
        let budget = cmd.budget(&config);
        let expected = Budget::from_upload(
            &UploadSettings {
                upload_kbps: 5000.0,
                interactive: false,
                high_action: false,
                has_transcoder: false,
            },
            CpuLimit::Medium,
            &config,
        );
        assert_eq!(budget, expected);
        assert_eq!(budget.target, TargetKind::Stream);
        // Without a transcoder the video ceiling stays at 2500 Kb/s.
        assert_eq!(budget.max_video_kbps, 2500);
    }

    #[test]
    fn test_local_file_budget() {
        let cmd = parse(&["--local-file", "--cpu", "high"]);
        let budget = cmd.budget(&BenchmarkConfig::default());
        assert!(budget.target_is_local_file());
        assert!(budget.content.high_action);
    }

    #[test]
    fn test_json_output_shape() {
        let outcome = BenchmarkOutcome {
            budget: Budget::for_local_file(CpuLimit::Low, &BenchmarkConfig::default()),
            results: Vec::new(),
            recommended: None,
        };
        let output = JsonAutotuneOutput {
            msg_type: "autotune_complete",
            outcome: &outcome,
            settings: None,
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["type"], "autotune_complete");
        assert!(json["results"].as_array().unwrap().is_empty());
        assert!(json["recommended"].is_null());
        assert!(json["budget"].is_object());
    }
}
