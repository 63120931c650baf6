mod render;

use clap::Parser;
use log::{error, info};
use macroquad::prelude::*;
use std::net::IpAddr;
use std::path::PathBuf;
use sumosim::config::{DEFAULT_BASE_PORT, DEFAULT_BIND_ADDRESS, WINDOW_HEIGHT, WINDOW_WIDTH};
use sumosim::{SimError, Simulation, assets, logging, server};

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Arena floor image (BMP or PNG). Defaults to the built-in sumo ring.
    #[arg(long)]
    floor: Option<PathBuf>,

    /// Robot starting positions file. Defaults to the built-in layout.
    #[arg(long)]
    positions: Option<PathBuf>,

    /// Address the register servers listen on
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    bind: IpAddr,

    /// TCP port for robot 0; robot 1 uses the next port up
    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    port: u16,

    /// Debug filter to specify log topics (e.g., "net,sim,sensor")
    #[arg(long)]
    debug_filter: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Sumo Arena".to_owned(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init_logger(logging::parse_level(&args.log_level), args.debug_filter.clone()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    info!("Initializing Sumo Arena...");
    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Exiting Sumo Arena.");
}

async fn run(args: Args) -> Result<(), SimError> {
    let arena = assets::load_arena_config(args.positions.as_deref())?;
    let floor = assets::load_floor(args.floor.as_deref())?;

    let mut rng = ::rand::thread_rng();
    let mut simulation = Simulation::new(floor, arena, &mut rng);

    let handles = server::start_all(&simulation, args.bind, args.port)?;
    let listen_text = handles
        .iter()
        .map(|h| format!("Robot {}: {}", h.slot(), h.local_addr()))
        .collect::<Vec<_>>()
        .join("    ");

    let renderer = render::Renderer::new(simulation.floor(), listen_text);
    // Closing the window goes through the same shutdown path as Q
    prevent_quit();
    info!("Starting main loop...");

    while simulation.is_running() {
        if is_key_pressed(KeyCode::Q) || is_quit_requested() {
            simulation.request_quit();
            break;
        }
        if is_key_pressed(KeyCode::Space) {
            info!("Manual reset requested");
            simulation.reset(&mut rng);
        }

        simulation.tick();
        renderer.draw_frame(&simulation.snapshots());
        next_frame().await;
    }

    server::stop_all(handles);
    Ok(())
}
