use clap::{Parser, ValueEnum};
use lesflow_core::{
    decompose_z, slab_chain, ChannelHalo, Field3, ForcingResult, FringeTreatment, GridDims,
    InflowConfig, InflowMode, LesConfig, PressureGradient, SlabExtent, StepperBuilder,
    UniformBodyForce, VelocityField,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process::ExitCode;
use std::thread;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit-plane source for the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Inflow {
    /// Periodic channel, no fringe
    None,
    /// Exit plane held at the face-average speed
    Uniform,
    /// Exit plane recycled from a plane upstream
    Sampled,
}

/// Channel-flow forcing/projection demo across stacked slabs
#[derive(Parser, Debug)]
#[command(name = "lesflow-demo")]
#[command(about = "Run the LES forcing and projection stages on threaded slabs", long_about = None)]
struct Args {
    /// Streamwise cells
    #[arg(long, default_value_t = 64)]
    nx: usize,

    /// Spanwise cells
    #[arg(long, default_value_t = 16)]
    ny: usize,

    /// Global vertical planes; `nz_tot - 1` must divide by `nproc`
    #[arg(long, default_value_t = 33)]
    nz_tot: usize,

    /// Number of slabs, one thread each
    #[arg(short, long, default_value_t = 4)]
    nproc: usize,

    /// Number of time steps
    #[arg(short, long, default_value_t = 200)]
    steps: usize,

    /// Time step
    #[arg(long, default_value_t = 2.0e-3)]
    dt: f64,

    /// Streamwise domain length
    #[arg(long, default_value_t = std::f64::consts::TAU)]
    l_x: f64,

    /// Face-average inflow speed
    #[arg(long, default_value_t = 1.0)]
    face_avg: f64,

    /// Constant streamwise body force
    #[arg(long, default_value_t = 0.0)]
    body_force: f64,

    /// Inflow treatment
    #[arg(long, value_enum, default_value_t = Inflow::Uniform)]
    inflow: Inflow,

    /// Blend velocity directly instead of forcing the fringe
    #[arg(long)]
    direct_blend: bool,

    /// Fringe exit position, fraction of the domain length
    #[arg(long, default_value_t = 1.0)]
    fringe_end: f64,

    /// Fringe length, fraction of the domain length
    #[arg(long, default_value_t = 0.125)]
    fringe_len: f64,

    /// Amplitude of the random initial perturbation
    #[arg(long, default_value_t = 0.1)]
    perturbation: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Report every N steps
    #[arg(short, long, default_value_t = 50)]
    report_interval: usize,
}

impl Args {
    fn inflow_config(&self) -> Option<InflowConfig> {
        let mode = match self.inflow {
            Inflow::None => return None,
            Inflow::Uniform => InflowMode::Uniform,
            Inflow::Sampled => InflowMode::SampledPlane {
                sample_fraction: 0.5,
            },
        };
        let treatment = if self.direct_blend {
            FringeTreatment::DirectBlend
        } else {
            FringeTreatment::Forcing
        };
        Some(InflowConfig {
            mode,
            treatment,
            fringe_region_end: self.fringe_end,
            fringe_region_len: self.fringe_len,
        })
    }

    fn slab_config(&self, extent: &SlabExtent) -> LesConfig {
        LesConfig {
            grid: GridDims::new(self.nx, self.ny, extent.nz),
            l_x: self.l_x,
            dt: self.dt,
            face_avg: self.face_avg,
            position: extent.position,
            inflow: self.inflow_config(),
            ..Default::default()
        }
    }
}

/// Per-slab summary after the last step
#[derive(Debug, Clone, Copy)]
struct SlabStats {
    rank: usize,
    mean_u: f64,
    max_abs_w: f64,
    exit_u: Option<f64>,
    finite: bool,
}

fn initial_velocity(args: &Args, dims: GridDims, seed: u64) -> VelocityField {
    let mut rng = StdRng::seed_from_u64(seed);
    let amp = args.perturbation;
    let mut noise = |base: f64| {
        if amp > 0.0 {
            base + rng.random_range(-amp..amp)
        } else {
            base
        }
    };
    VelocityField {
        u: Field3::from_fn(dims, |_, _, _| noise(args.face_avg)),
        v: Field3::from_fn(dims, |_, _, _| noise(0.0)),
        w: Field3::from_fn(dims, |_, _, _| noise(0.0)),
    }
}

fn owned_mean(field: &Field3) -> f64 {
    let dims = field.dims();
    let owned: Vec<f64> = (1..dims.nz).flat_map(|k| field.plane(k).to_vec()).collect();
    owned.iter().sum::<f64>() / owned.len().max(1) as f64
}

fn run_slab(args: &Args, extent: &SlabExtent, halo: ChannelHalo) -> ForcingResult<SlabStats> {
    let config = args.slab_config(extent);
    let rank = extent.position.rank;
    let mut stepper = StepperBuilder::new(config.clone())
        .applied(UniformBodyForce::streamwise(args.body_force))
        .build(halo)?;

    let mut vel = initial_velocity(args, config.grid, args.seed.wrapping_add(rank as u64));
    let dp = PressureGradient::new(config.grid);

    for step in 1..=args.steps {
        stepper.forcing_applied(&vel)?;
        stepper.forcing_induced(&mut vel)?;
        stepper.project(&mut vel, &dp)?;

        if args.report_interval > 0 && step % args.report_interval == 0 {
            info!(
                "rank {rank} step {step}: <u> = {:.5}, max|w| = {:.3e}",
                owned_mean(&vel.u),
                vel.w.max_abs()
            );
        }
    }

    let exit_u = stepper.fringe_window().map(|window| {
        let ie = window.exit() - 1;
        let dims = config.grid;
        let column: Vec<f64> = (1..dims.nz)
            .flat_map(|k| (0..dims.ny).map(move |j| (j, k)))
            .map(|(j, k)| vel.u.get(ie, j, k))
            .collect();
        column.iter().sum::<f64>() / column.len().max(1) as f64
    });

    Ok(SlabStats {
        rank,
        mean_u: owned_mean(&vel.u),
        max_abs_w: vel.w.max_abs(),
        exit_u,
        finite: vel.u.is_finite() && vel.v.is_finite() && vel.w.is_finite(),
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== LES Forcing / Projection Demo ===\n");

    let extents = match decompose_z(args.nz_tot, args.nproc) {
        Ok(extents) => extents,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "Grid {}x{}x{} split into {} slabs of {} planes",
        args.nx,
        args.ny,
        args.nz_tot,
        args.nproc,
        extents.first().map_or(0, |e| e.nz)
    );
    println!(
        "Inflow: {:?}, direct blend: {}\n",
        args.inflow, args.direct_blend
    );

    let halos = slab_chain(args.nproc);
    let results: Vec<ForcingResult<SlabStats>> = thread::scope(|s| {
        let handles: Vec<_> = extents
            .iter()
            .zip(halos)
            .map(|(extent, halo)| {
                let args = &args;
                s.spawn(move || run_slab(args, extent, halo))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(lesflow_core::ForcingError::Decomposition(
                        "slab thread panicked".to_string(),
                    ))
                })
            })
            .collect()
    });

    let mut ok = true;
    for result in results {
        match result {
            Ok(stats) => {
                let exit = stats
                    .exit_u
                    .map_or_else(|| "-".to_string(), |u| format!("{u:.5}"));
                println!(
                    "rank {:>2}: <u> = {:.5}  max|w| = {:.3e}  exit <u> = {}  finite = {}",
                    stats.rank, stats.mean_u, stats.max_abs_w, exit, stats.finite
                );
                ok &= stats.finite;
            }
            Err(e) => {
                error!("{e}");
                ok = false;
            }
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
