use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use burn::backend::Autodiff;
use clap::Parser;
use transfer::config::TransferConfig;
use transfer::run_style_transfer;
use vgg::{MainBackend, Vgg, VggConfig};

/// One-shot style transfer: repaint a content image with the texture of a
/// style image.
#[derive(Parser)]
struct Args {
    /// Content image path
    #[arg(long)]
    content: PathBuf,

    /// Style image path
    #[arg(long)]
    style: PathBuf,

    /// Output JPEG path
    #[arg(short, long, default_value = "stylized.jpg")]
    output: PathBuf,

    /// Pretrained VGG19 weight record; random weights when omitted
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Number of optimization steps
    #[arg(long, default_value_t = 300)]
    steps: u32,

    /// Adam learning rate
    #[arg(long, default_value_t = 3e-3)]
    learning_rate: f64,

    /// Weight of the content-fidelity term
    #[arg(long, default_value_t = 1.0)]
    content_weight: f32,

    /// Weight of the combined style term
    #[arg(long, default_value_t = 1e6)]
    style_weight: f32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let device = Default::default();

    type B = Autodiff<MainBackend>;
    let vgg: Vgg<B> = match &args.weights {
        Some(path) => Vgg::load(path, &device)
            .with_context(|| format!("Failed to load VGG weights from {}", path.display()))?,
        None => VggConfig::new().init(&device),
    };

    let content = fs::read(&args.content)
        .with_context(|| format!("Failed to read content image {}", args.content.display()))?;
    let style = fs::read(&args.style)
        .with_context(|| format!("Failed to read style image {}", args.style.display()))?;

    let config = TransferConfig::new()
        .with_steps(args.steps)
        .with_learning_rate(args.learning_rate)
        .with_content_weight(args.content_weight)
        .with_style_weight(args.style_weight);

    let (result, progress) = run_style_transfer(&vgg, &content, &style, &config, &device)?;

    for sample in &progress {
        println!(
            "step {:>5}  total {:.5e}  content {:.5e}  style {:.5e}",
            sample.step, sample.total_loss, sample.content_loss, sample.style_loss
        );
    }

    fs::write(&args.output, &result)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Wrote {}", args.output.display());
    Ok(())
}
