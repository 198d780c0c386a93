use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use coverflow::{
    Alignment, CancelToken, Color, Config, CoverflowSession, Ease, FfmpegSink, FfmpegSinkOpts,
    LayoutMode, PipelineOpts, PreviewAt, RenderStatus, SideCurve,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coverflow", version, about = "Render a folder of images as a cover flow video")]
struct Cli {
    /// Directory with the source images (sorted by file name).
    #[arg(long, short = 's')]
    source: PathBuf,

    /// JSON configuration file; command-line flags override its values.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Video or preview output path.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print image count, frame count and duration, then exit.
    #[arg(long)]
    statistics: bool,

    /// Write one frame instead of the video: a whole number is a frame, a fraction is seconds.
    #[arg(long, value_name = "FRAME_OR_SECONDS")]
    preview: Option<f64>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,
    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,
    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Seconds each image rests at the center.
    #[arg(long)]
    hold: Option<f64>,
    /// Hold of the first image in seconds.
    #[arg(long)]
    first_hold: Option<f64>,
    /// Seconds per transition.
    #[arg(long)]
    transition: Option<f64>,
    /// Transition easing name.
    #[arg(long)]
    easing: Option<String>,
    /// Transition from the last image back to the first.
    #[arg(long = "loop")]
    loop_back: bool,
    /// Wrap side images around the ends of the list.
    #[arg(long)]
    repeat: bool,

    /// Layout mode.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Vertical alignment on the anchor line.
    #[arg(long, value_enum)]
    alignment: Option<AlignArg>,
    /// Images drawn on each side of the center.
    #[arg(long)]
    visible_range: Option<u32>,
    /// Horizontal slot spacing as a fraction of the width.
    #[arg(long)]
    spacing: Option<f64>,
    /// Perspective strength in arc mode.
    #[arg(long)]
    perspective: Option<f64>,
    /// Scale factor one slot from the center.
    #[arg(long)]
    side_scale: Option<f64>,
    /// Largest image size as a fraction of the canvas.
    #[arg(long)]
    image_scale: Option<f64>,
    /// Anchor line as a fraction of the height.
    #[arg(long)]
    image_y: Option<f64>,

    /// Curve for visual scale.
    #[arg(long)]
    scale_curve: Option<String>,
    /// Blur radius in pixels one slot from the center.
    #[arg(long)]
    side_blur: Option<f64>,
    /// Curve for blur growth.
    #[arg(long)]
    blur_curve: Option<String>,
    /// Opacity one slot from the center.
    #[arg(long)]
    side_alpha: Option<f64>,
    /// Curve for opacity fade.
    #[arg(long)]
    alpha_curve: Option<String>,

    /// Reflection opacity (0 disables).
    #[arg(long)]
    reflection: Option<f64>,
    /// Reflection height as a fraction of the image height.
    #[arg(long)]
    reflection_length: Option<f64>,

    /// Background image path.
    #[arg(long)]
    background_image: Option<PathBuf>,
    /// Background color (`#RRGGBB`), or the gradient top color.
    #[arg(long)]
    background_color: Option<Color>,
    /// Gradient bottom color.
    #[arg(long)]
    background_color_bottom: Option<Color>,

    /// Motion-blur sub-samples per frame (2 or more enables it).
    #[arg(long)]
    motion_blur: Option<u32>,

    /// ffmpeg video codec.
    #[arg(long)]
    codec: Option<String>,
    /// Constant rate factor.
    #[arg(long)]
    crf: Option<u8>,
    /// Encoder preset.
    #[arg(long)]
    preset: Option<String>,
    /// Target bitrate such as `8M`; replaces CRF.
    #[arg(long)]
    bitrate: Option<String>,
    /// Fail instead of replacing an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// First frame to render.
    #[arg(long)]
    start_frame: Option<u64>,
    /// Frame after the last one to render.
    #[arg(long)]
    end_frame: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Arc,
    Flat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlignArg {
    Center,
    Top,
    Bottom,
}

impl Cli {
    fn apply(&self, cfg: &mut Config) {
        fn set<T: Clone>(dst: &mut T, v: &Option<T>) {
            if let Some(v) = v {
                *dst = v.clone();
            }
        }

        set(&mut cfg.width, &self.width);
        set(&mut cfg.height, &self.height);
        set(&mut cfg.fps, &self.fps);
        set(&mut cfg.hold, &self.hold);
        if self.first_hold.is_some() {
            cfg.first_hold = self.first_hold;
        }
        set(&mut cfg.transition, &self.transition);
        if let Some(name) = &self.easing {
            cfg.easing = Ease::from_name(name);
        }
        cfg.loop_back |= self.loop_back;
        cfg.repeat |= self.repeat;

        if let Some(mode) = self.mode {
            cfg.mode = match mode {
                ModeArg::Arc => LayoutMode::Arc,
                ModeArg::Flat => LayoutMode::Flat,
            };
        }
        if let Some(align) = self.alignment {
            cfg.alignment = match align {
                AlignArg::Center => Alignment::Center,
                AlignArg::Top => Alignment::Top,
                AlignArg::Bottom => Alignment::Bottom,
            };
        }
        set(&mut cfg.visible_range, &self.visible_range);
        set(&mut cfg.spacing, &self.spacing);
        set(&mut cfg.perspective, &self.perspective);
        set(&mut cfg.side_scale, &self.side_scale);
        set(&mut cfg.image_scale, &self.image_scale);
        set(&mut cfg.image_y, &self.image_y);

        if let Some(name) = &self.scale_curve {
            cfg.scale_curve = SideCurve::decay_from_name(name);
        }
        set(&mut cfg.side_blur, &self.side_blur);
        if let Some(name) = &self.blur_curve {
            cfg.blur_curve = SideCurve::increase_from_name(name);
        }
        set(&mut cfg.side_alpha, &self.side_alpha);
        if let Some(name) = &self.alpha_curve {
            cfg.alpha_curve = SideCurve::decay_from_name(name);
        }
        set(&mut cfg.reflection, &self.reflection);
        set(&mut cfg.reflection_length, &self.reflection_length);

        if self.background_image.is_some() {
            cfg.background.image = self.background_image.clone();
        }
        if self.background_color.is_some() {
            cfg.background.color = self.background_color;
        }
        if self.background_color_bottom.is_some() {
            cfg.background.color_bottom = self.background_color_bottom;
        }
        set(&mut cfg.motion_blur, &self.motion_blur);

        set(&mut cfg.encode.codec, &self.codec);
        set(&mut cfg.encode.crf, &self.crf);
        set(&mut cfg.encode.preset, &self.preset);
        if self.bitrate.is_some() {
            cfg.encode.bitrate = self.bitrate.clone();
        }
        if self.no_overwrite {
            cfg.encode.overwrite = false;
        }
        if self.start_frame.is_some() {
            cfg.start_frame = self.start_frame;
        }
        if self.end_frame.is_some() {
            cfg.end_frame = self.end_frame;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    if cli.preview.is_none()
        && let Some(out) = &cli.output
    {
        config.encode.output = out.clone();
    }

    let session = CoverflowSession::from_dir(config, &cli.source)
        .with_context(|| format!("prepare images from '{}'", cli.source.display()))?;

    if cli.statistics {
        println!("{}", session.statistics());
        return Ok(());
    }

    if let Some(at) = cli.preview {
        let out = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("preview.jpg"));
        let frame = session.write_preview(PreviewAt::from_number(at), &out)?;
        eprintln!("wrote frame {} to {}", frame.0, out.display());
        return Ok(());
    }

    let encode = &session.config().encode;
    let sink = Arc::new(Mutex::new(FfmpegSink::new(FfmpegSinkOpts::from(encode))));
    let mut last_pct = 0;
    let stats = session.render_video(
        sink,
        &PipelineOpts::default(),
        &CancelToken::new(),
        |done, total| {
            let pct = done * 100 / total.max(1);
            if pct >= last_pct + 10 || done == total {
                last_pct = pct;
                tracing::info!(done, total, "{pct}%");
            }
        },
    )?;

    if stats.status == RenderStatus::Cancelled {
        anyhow::bail!("render cancelled after {} frames", stats.frames_encoded);
    }
    eprintln!("wrote {}", encode.output.display());
    Ok(())
}
