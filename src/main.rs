use chat_overlay::texture::{self, TextureData};
use chat_overlay::{ChatConfig, ChatMessage, ChatRenderer, ChatUser, GlyphRef};
use clap::Parser;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Demo driver: feeds the renderer synthetic chat traffic and image
/// completions while ticking it at a fixed rate.
#[derive(Parser, Debug)]
#[command(name = "chat-overlay")]
struct Args {
    /// Ticks per second for the render loop.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Number of synthetic messages to produce.
    #[arg(long, default_value_t = 40)]
    messages: u32,
    /// How long to run the render loop, in seconds.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ChatConfig::load();
    let mut renderer = ChatRenderer::new(config);
    let ingress = renderer.ingress();

    // Producer: parsed messages, most carrying an emote glyph.
    let producer = {
        let ingress = ingress.clone();
        let count = args.messages;
        std::thread::spawn(move || {
            let user = ChatUser::new("1001", "demo", "#9146ff");
            for i in 0..count {
                let key = format!("emote/demo{}", i % 4);
                let text = format!("message {i} Kappa");
                let glyphs = vec![GlyphRef::emote(&key, 11, 16)];
                ingress.enqueue_message(ChatMessage::new(user.clone(), &text, glyphs));
                std::thread::sleep(Duration::from_millis(40));
            }
        })
    };

    // Downloader: delivers decoded textures a little after the messages that
    // reference them, exercising the deferred fan-out attach path.
    let downloader = {
        let ingress = ingress.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            for i in 0..4 {
                let key = format!("emote/demo{i}");
                let data = TextureData {
                    width: 16,
                    height: 16,
                    pixels: vec![0xffu8; 16 * 16 * 4],
                };
                // Every other emote is an animated 4-frame sheet.
                let frames = if i % 2 == 0 {
                    texture::sheet_frames(4)
                } else {
                    Vec::new()
                };
                ingress.on_image_ready(&key, data, frames, Duration::from_millis(100));
                std::thread::sleep(Duration::from_millis(150));
            }
        })
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let period = Duration::from_secs_f64(1.0 / args.fps as f64);
        let mut interval = tokio::time::interval(period);
        let deadline = Instant::now() + Duration::from_secs(args.seconds);
        let mut last = Instant::now();
        while Instant::now() < deadline {
            interval.tick().await;
            let now = Instant::now();
            renderer.tick(now, now - last);
            last = now;
        }
    });

    producer.join().ok();
    downloader.join().ok();

    let stats = renderer.stats();
    let bounds = renderer.bounds();
    info!(
        admitted = stats.admitted,
        cache_hits = stats.cache_hits,
        cache_misses = stats.cache_misses,
        skipped = stats.skipped_ticks,
        height = bounds.height,
        "render loop finished"
    );
    Ok(())
}
