use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Normal};
use tracing_subscriber::EnvFilter;
use traffic_zipper::{
    LinkAttributes, LinkId, MergeController, SchedulerParams, SimClock, Simulation,
    VehicleAttributes,
};

/// Runs merge control on two approaches joining into one.
#[derive(Parser, Debug)]
#[command(name = "zipper-demo")]
struct Options {
    /// Simulation duration in steps.
    #[arg(long, default_value_t = 30000)]
    duration: u64,
    /// Stop line distance in m, overriding the parameter file.
    #[arg(long, allow_negative_numbers = true)]
    stop_line: Option<f64>,
    /// Communication distance in m, overriding the parameter file.
    #[arg(long)]
    v2i_range: Option<f64>,
    /// Simulation step size in s.
    #[arg(long, default_value_t = 0.1)]
    time_step: f64,
    /// JSON file with the scheduler parameters.
    #[arg(long, env = "ZIPPER_PARAMS")]
    params: Option<PathBuf>,
    /// Vehicles per hour arriving on each approach.
    #[arg(long, default_value_t = 600.0)]
    arrival_rate: f64,
    /// Standard deviation of the drivers' desired speed, as a fraction of the speed limit.
    #[arg(long, default_value_t = 0.0)]
    speed_spread: f64,
    /// Seed for the arrival process and the drivers' desired speeds.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Spawns vehicles at the start of a link at exponentially distributed intervals.
struct Source {
    link: LinkId,
    next: f64,
}

fn load_params(options: &Options) -> Result<SchedulerParams> {
    let mut params = match &options.params {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SchedulerParams::default(),
    };
    if let Some(stop_line) = options.stop_line {
        params.stopline_offset = stop_line;
    }
    if let Some(range) = options.v2i_range {
        params.approach_range = range;
    }
    params.validate()?;
    Ok(params)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = Options::parse();
    let params = load_params(&options)?;
    anyhow::ensure!(options.time_step > 0.0, "time step must be positive");
    anyhow::ensure!(options.arrival_rate > 0.0, "arrival rate must be positive");
    anyhow::ensure!(options.speed_spread >= 0.0, "speed spread must not be negative");

    let mut sim = Simulation::new();
    let attribs = LinkAttributes {
        length: 300.0,
        speed_limit: params.vmax,
    };
    let west = sim.add_link(&attribs);
    let south = sim.add_link(&attribs);
    let east = sim.add_link(&attribs);
    sim.add_junction(&[(west, east), (south, east)]);

    let mut controller = MergeController::new(&sim, params)?;

    let vehicle = VehicleAttributes {
        length: params.vehicle_length,
        max_acc: params.max_accel,
        comf_dec: 2.5,
    };
    let mut rng = StdRng::seed_from_u64(options.seed);
    let interval = Exp::new(options.arrival_rate / 3600.0)?;
    let desired_speed = Normal::new(1.0, options.speed_spread)?;
    let mut sources = [west, south].map(|link| Source {
        link,
        next: interval.sample(&mut rng),
    });

    info!("simulating {} steps of {} s", options.duration, options.time_step);
    let start = Instant::now();
    let mut spawned = 0;

    for step in 0..options.duration {
        sim.step(options.time_step);
        controller.tick(&mut sim, SimClock::from_step(step, options.time_step));

        for source in &mut sources {
            if sim.time() < source.next {
                continue;
            }
            // Wait until there's room at the start of the link
            let clear = sim
                .get_link(source.link)
                .vehicle_ids()
                .first()
                .and_then(|id| sim.get_vehicle(*id))
                .map_or(true, |veh| veh.pos_rear() > 2.0 * vehicle.length);
            if clear {
                let pos = 0.5 * vehicle.length;
                let id = sim.add_vehicle_at(&vehicle, source.link, pos, params.vmax);
                sim.set_vehicle_destination(id, east);
                sim.set_velocity_adjust(id, desired_speed.sample(&mut rng));
                source.next += interval.sample(&mut rng);
                spawned += 1;
            }
        }
    }

    let stats = controller.stats();
    println!(
        "{} steps in {:?}: {} spawned, {} exited, {} admitted ({} slowed, {} infeasible), {} released, {} expired",
        stats.ticks,
        start.elapsed(),
        spawned,
        sim.exited(),
        stats.admitted,
        stats.slowed,
        stats.infeasible,
        stats.released,
        stats.expired,
    );
    Ok(())
}
