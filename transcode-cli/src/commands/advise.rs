//! Bitrate and output size advice without running a benchmark.

use clap::Args;
use console::style;
use serde::Serialize;
use transcode_autotune::advisor::{
    best_size_for_bitrate, cap_to_sane_value, ideal_bitrate_kbps, max_bitrates_from_upload,
    UploadUnit,
};
use transcode_autotune::{FrameRate, Resolution, STANDARD_SIZES};

use super::FpsArg;

/// Recommend bitrates and output size for an upload speed.
#[derive(Args, Debug)]
pub struct CmdAdvise {
    /// Upload speed available for broadcasting
    #[arg(long)]
    pub upload: f64,

    /// Unit of --upload (kbps, mbps, KBps, MBps)
    #[arg(long, default_value = "kbps")]
    pub unit: UploadUnit,

    /// Output frame rate
    #[arg(long, value_enum, default_value_t = FpsArg::Thirty)]
    pub fps: FpsArg,

    /// Another interactive application (e.g. a game) shares the connection
    #[arg(long)]
    pub interactive: bool,

    /// Content is fast moving and needs more bits
    #[arg(long)]
    pub high_action: bool,

    /// The streaming service transcodes for viewers
    #[arg(long)]
    pub transcoder: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Recommended bitrate for one output size.
#[derive(Debug, Clone, Serialize)]
pub struct SizeAdvice {
    pub size: Resolution,
    pub ideal_kbps: u32,
    /// Whether the video bitrate budget covers the ideal bitrate.
    pub fits: bool,
}

/// Full advice for an upload speed.
#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub upload_kbps: f64,
    pub frame_rate: FrameRate,
    pub video_kbps: u32,
    pub audio_kbps: u32,
    pub best_size: Resolution,
    pub sizes: Vec<SizeAdvice>,
}

impl CmdAdvise {
    /// Execute the advise command.
    pub fn run(&self) -> anyhow::Result<()> {
        if !self.upload.is_finite() || self.upload <= 0.0 {
            anyhow::bail!("Upload speed must be a positive number, got {}", self.upload);
        }
        let advice = self.advice();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&advice)?);
        } else {
            print_advice(&advice);
        }
        Ok(())
    }

    fn advice(&self) -> Advice {
        let upload_kbps = self.unit.to_kbps(self.upload);
        let frame_rate = self.fps.frame_rate();
        let split = max_bitrates_from_upload(upload_kbps, self.interactive);
        let video_kbps =
            cap_to_sane_value(split.video_kbps, frame_rate, self.high_action, self.transcoder);

        let sizes = STANDARD_SIZES
            .iter()
            .map(|&size| {
                let ideal_kbps = ideal_bitrate_kbps(size, frame_rate, self.high_action);
                SizeAdvice {
                    size,
                    ideal_kbps,
                    fits: ideal_kbps <= video_kbps,
                }
            })
            .collect();

        Advice {
            upload_kbps,
            frame_rate,
            video_kbps,
            audio_kbps: split.audio_kbps,
            best_size: best_size_for_bitrate(video_kbps, frame_rate, self.high_action),
            sizes,
        }
    }
}

fn print_advice(advice: &Advice) {
    println!();
    println!("{}", style("Bitrate Advice").cyan().bold());
    println!();
    println!("  {:<16} {:.0} Kb/s", style("Upload:").white(), advice.upload_kbps);
    println!("  {:<16} {} Kb/s", style("Video bitrate:").white(), advice.video_kbps);
    println!("  {:<16} {} Kb/s", style("Audio bitrate:").white(), advice.audio_kbps);
    println!(
        "  {:<16} {}p at {} fps",
        style("Best size:").white(),
        advice.best_size.height,
        advice.frame_rate
    );
    println!();
    println!(
        "  {:<10} {:<12} {}",
        style("SIZE").white().bold(),
        style("IDEAL").white().bold(),
        style("FITS").white().bold()
    );
    println!("  {}", style("-".repeat(30)).dim());
    for entry in &advice.sizes {
        let fits = if entry.fits {
            style("yes").green()
        } else {
            style("no").red()
        };
        println!(
            "  {:<10} {:<12} {}",
            format!("{}p", entry.size.height),
            format!("{} Kb/s", entry.ideal_kbps),
            fits
        );
    }
    println!();
}
