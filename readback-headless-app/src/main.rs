use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use readback_core::interface::handles::ResourceHandle;
use readback_core::interface::host::GraphicsHost;
use readback_core::{
    BufferReadbackStarter, ReadbackContext, ReadbackQueue, ReadbackSettings, ReadbackStarter, TextureReadbackStarter,
};
use readback_crate_tools::init_log::init_log;
use readback_headless::HeadlessGpu;

const CAPTURE_WIDTH: u32 = 1000;
const CAPTURE_HEIGHT: u32 = 500;
const COMPUTE_ELEMENTS: u32 = 100;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    /// 每帧截图，通过队列按顺序取回
    Capture,
    /// 回读一个 100 个 float 的 compute buffer
    ComputeBuffer,
    All,
}

#[derive(Parser, Debug)]
#[command(name = "readback-demo", about = "Asynchronous GPU readback on a headless device")]
struct Args {
    /// 运行的帧数
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// TOML 配置文件，缺省时使用默认配置
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// 模拟原生支持异步回读的图形后端
    #[arg(long, action = clap::ArgAction::SetTrue)]
    capable: bool,

    /// 第一张截图保存的位置
    #[arg(long, value_name = "PATH", default_value = "capture.png")]
    output: PathBuf,

    /// render thread 上 fence 需要经过的 tick 数
    #[arg(long, default_value_t = 2)]
    fence_latency: u32,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_log(log::LevelFilter::Info);
    tracy_client::Client::start();
    tracy_client::set_thread_name!("ReadbackMainThread");

    let settings = match &args.config {
        Some(path) => ReadbackSettings::from_file(path)?,
        None => ReadbackSettings::default(),
    };
    log::info!("settings: {:?}", settings);

    let gpu = Arc::new(
        HeadlessGpu::new()
            .with_async_readback(args.capable)
            .with_fence_latency(args.fence_latency),
    );
    let host: Arc<dyn GraphicsHost> = gpu.clone();
    let mut ctx = ReadbackContext::new(host, gpu.clone(), settings)?;

    if matches!(args.scenario, Scenario::Capture | Scenario::All) {
        run_capture(&gpu, &mut ctx, &args)?;
    }
    if matches!(args.scenario, Scenario::ComputeBuffer | Scenario::All) {
        run_compute_buffer(&gpu, &mut ctx, args.frames)?;
    }

    ctx.shutdown();
    log::info!("end run, {} native tasks left", gpu.live_task_count());
    Ok(())
}

/// 渲染一帧：每个像素都是帧号决定的颜色
fn render_frame(gpu: &HeadlessGpu, texture: ResourceHandle, frame: u32) {
    let _span = tracy_client::span!("render_frame");

    let mut pixels = Vec::with_capacity((CAPTURE_WIDTH * CAPTURE_HEIGHT * 4) as usize);
    for y in 0..CAPTURE_HEIGHT {
        for x in 0..CAPTURE_WIDTH {
            pixels.extend_from_slice(&[
                (x * 255 / CAPTURE_WIDTH) as u8,
                (y * 255 / CAPTURE_HEIGHT) as u8,
                (frame * 4 % 256) as u8,
                255,
            ]);
        }
    }
    gpu.write_texture(texture, 0, &pixels);
}

fn save_capture(path: &Path, pixels: Vec<u8>) -> anyhow::Result<()> {
    let image = image::RgbaImage::from_raw(CAPTURE_WIDTH, CAPTURE_HEIGHT, pixels)
        .context("captured pixels do not match the texture size")?;
    image.save(path).with_context(|| format!("Failed to save capture to {:?}", path))?;
    log::info!("capture saved to {:?}", path);
    Ok(())
}

fn run_capture(gpu: &HeadlessGpu, ctx: &mut ReadbackContext, args: &Args) -> anyhow::Result<()> {
    let texture = gpu.create_texture(CAPTURE_WIDTH, CAPTURE_HEIGHT, 4, 1);
    let starter = TextureReadbackStarter::new(ctx, texture, 0)?;
    let mut queue = ReadbackQueue::from_settings(ctx.settings());

    let mut first_capture = None;
    let mut captured = 0;
    let mut frame = 0;
    while frame < args.frames || !queue.is_empty() {
        if frame < args.frames {
            render_frame(gpu, texture, frame);
            queue.submit_from(ctx, &starter)?;
        }

        let report = queue.update(|request| match request.get_data::<u8>() {
            Ok(pixels) => {
                captured += 1;
                if first_capture.is_none() {
                    first_capture = Some(pixels);
                }
            }
            Err(e) => log::error!("failed to read the capture: {}", e),
        });
        log::debug!("[F{}] {:?}", frame, report);

        ctx.pump_render_events();
        ctx.on_frame();
        tracy_client::frame_mark();
        frame += 1;
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    log::info!("captured {} of {} frames", captured, args.frames);

    gpu.destroy_resource(texture);
    match first_capture {
        Some(pixels) => save_capture(&args.output, pixels),
        None => {
            log::warn!("no frame was captured");
            Ok(())
        }
    }
}

fn run_compute_buffer(gpu: &HeadlessGpu, ctx: &mut ReadbackContext, max_frames: u32) -> anyhow::Result<()> {
    let buffer = gpu.create_buffer(4, COMPUTE_ELEMENTS);
    let values: Vec<u8> = [0.0f32, 1.0, 2.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
    gpu.write_buffer(buffer, 0, &values);

    let starter = BufferReadbackStarter::new(ctx, buffer)?;
    let mut request = starter.start_readback(ctx)?;

    for frame in 0..max_frames.max(1) {
        if !request.valid() {
            anyhow::bail!("the compute buffer readback was reclaimed at frame {}", frame);
        }
        request.update();
        ctx.pump_render_events();

        if request.has_error() {
            anyhow::bail!("GPU readback error detected");
        }
        if request.done() {
            let floats = request.get_data::<f32>()?;
            log::info!("compute buffer ready after {} frames: {:?}", frame, &floats[..3]);
            request.dispose();
            gpu.destroy_resource(buffer);
            return Ok(());
        }

        ctx.on_frame();
        tracy_client::frame_mark();
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    anyhow::bail!("the compute buffer readback did not finish within {} frames", max_frames)
}
