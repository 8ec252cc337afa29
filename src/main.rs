use clap::Parser;
use sdl2::keyboard::Keycode;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};
use weatherfield::config::FeedConfig;
use weatherfield::display::{Display, InputEvent, RenderTarget, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use weatherfield::feed::Feed;
use weatherfield::status::StatusCell;
use weatherfield::util::FpsCounter;
use weatherfield::{App, Channel, Config, RegionGeometry, RegionMask};

/// Zoom step per wheel notch
const WHEEL_ZOOM: f64 = 1.2;
/// Frames between title refreshes while the FPS readout is on
const TITLE_EVERY: u32 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "weatherfield",
    version,
    about = "Interpolated weather fields and wind particles over a region map"
)]
struct Args {
    /// Window width
    #[arg(short = 'w', long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Window height
    #[arg(short = 'H', long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Resolution as WxH (e.g. 1280x720); overrides --width/--height
    #[arg(short = 'r', long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Disable VSync for uncapped framerate
    #[arg(long)]
    no_vsync: bool,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GeoJSON region boundary
    #[arg(short, long)]
    boundary: Option<PathBuf>,

    /// Snapshot JSON file, re-read every --interval seconds
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    #[arg(long, default_value_t = 60.0)]
    interval: f32,

    /// MQTT broker carrying snapshots
    #[arg(long)]
    mqtt_host: Option<String>,

    #[arg(long, default_value_t = 1883)]
    mqtt_port: u16,

    #[arg(long, default_value = "weatherfield/snapshot")]
    mqtt_topic: String,

    /// Layer shown at startup: temp, precip or wind
    #[arg(short, long)]
    layer: Option<Channel>,
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    Ok((w, h))
}

fn load_config(path: Option<&PathBuf>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    match Config::load(path) {
        Ok(config) => {
            info!(path = %path.display(), "config loaded");
            config
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unusable, using defaults");
            Config::default()
        },
    }
}

/// Boundary failures leave the mask empty, which admits everything
fn load_mask(path: Option<&PathBuf>, margin: f64) -> RegionMask {
    let Some(path) = path else {
        warn!("no boundary given, region mask is open");
        return RegionMask::empty();
    };
    match RegionGeometry::load(path) {
        Ok(geometry) => {
            info!(
                path = %path.display(),
                parts = geometry.polygons().len(),
                "boundary loaded"
            );
            RegionMask::with_margin(geometry, margin)
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "boundary unavailable, region mask is open");
            RegionMask::empty()
        },
    }
}

fn feed_config(args: &Args, config: &Config) -> FeedConfig {
    if let Some(path) = &args.snapshot {
        FeedConfig::File {
            path: path.clone(),
            interval_secs: args.interval,
        }
    } else if let Some(host) = &args.mqtt_host {
        FeedConfig::Mqtt {
            host: host.clone(),
            port: args.mqtt_port,
            topic: args.mqtt_topic.clone(),
        }
    } else {
        config.feed.clone()
    }
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (width, height) = args.resolution.unwrap_or((args.width, args.height));
    let vsync = !args.no_vsync;

    let config = load_config(args.config.as_ref());
    let boundary = args.boundary.as_ref().or(config.boundary.as_ref()).cloned();
    let mask = load_mask(boundary.as_ref(), config.bbox_margin);
    let feed = match Feed::from_config(&feed_config(&args, &config)) {
        Ok(feed) => feed,
        Err(e) => {
            warn!(error = %e, "snapshot feed unavailable");
            None
        },
    };

    let (mut display, texture_creator) =
        Display::with_options("weatherfield", width, height, vsync)?;
    let mut target = RenderTarget::with_size(&texture_creator, width, height)?;

    let status = Rc::new(StatusCell::new());
    let mut app = App::new(config, mask, width, height, status.clone());
    if let Some(feed) = feed {
        app = app.with_feed(feed);
    }
    app.select(Some(args.layer.unwrap_or(Channel::Temperature)));

    info!(width, height, vsync, "viewer started");
    info!("keys: T temperature, P precipitation, W wind, F fps, Esc quit");
    info!("drag to pan, wheel to zoom");

    let mut fps_counter = FpsCounter::new(60);
    let mut show_fps = false;
    let mut frames: u32 = 0;

    'main: loop {
        let (_dt, avg_fps) = fps_counter.tick();

        for event in display.poll_events() {
            match event {
                InputEvent::Quit | InputEvent::KeyDown(Keycode::Escape) => break 'main,
                InputEvent::KeyDown(Keycode::T) => app.toggle(Channel::Temperature),
                InputEvent::KeyDown(Keycode::P) => app.toggle(Channel::Precipitation),
                InputEvent::KeyDown(Keycode::W) => app.toggle(Channel::WindSpeed),
                InputEvent::KeyDown(Keycode::F) => {
                    show_fps = !show_fps;
                    if !show_fps {
                        display.set_title("weatherfield");
                    }
                },
                InputEvent::MouseDown { x, y } => app.begin_pan(x as f32, y as f32),
                InputEvent::MouseMove { x, y } if app.viewport().is_panning() => {
                    app.pan_to(x as f32, y as f32);
                },
                InputEvent::MouseUp => app.end_pan(),
                InputEvent::Wheel { y } => {
                    let (mx, my) = display.mouse_position();
                    app.zoom_at(mx as f32, my as f32, WHEEL_ZOOM.powi(y));
                },
                _ => {},
            }
        }

        frames = frames.wrapping_add(1);
        if show_fps && frames % TITLE_EVERY == 0 {
            let title = format!(
                "weatherfield  {:.0} fps  {:.1} ms  [{}]",
                avg_fps,
                fps_counter.avg_frame_time_ms(),
                status.last().map_or("no data", |s| s.as_str())
            );
            display.set_title(&title);
        }

        let frame = app.tick();
        display.present(&mut target, frame)?;
    }

    Ok(())
}
