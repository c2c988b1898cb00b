use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use nalgebra::Vector3;

use spacecal::driver::DriverHandles;
use spacecal::profile::{JsonProfileStore, ProfileStore};

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let mut store = JsonProfileStore::from_xdg()?;

    match args.command {
        Subcommands::Show => show(&store),
        Subcommands::Adjust {
            yaw,
            pitch,
            roll,
            x,
            y,
            z,
            scale,
            relative,
        } => adjust(&mut store, [yaw, pitch, roll], [x, y, z], scale, relative),
        Subcommands::Reset => {
            store.clear()?;
            println!("Stored profile deleted.");
            Ok(ExitCode::SUCCESS)
        }
        Subcommands::Check => check(),
    }
}

fn show(store: &JsonProfileStore) -> anyhow::Result<ExitCode> {
    let Some(profile) = store.load()? else {
        println!("No stored profile at {}", store.path().display());
        return Ok(ExitCode::FAILURE);
    };

    println!(
        "{}",
        format!("Profile: {}", store.path().display()).bright_blue()
    );
    println!(
        "  Universes:   {} -> {}",
        profile.target_tracking_system.bright_yellow(),
        profile.reference_tracking_system.bright_yellow()
    );
    let e = profile.rotation_deg;
    println!(
        "  Rotation:    Yaw: {:.2}, Pitch: {:.2}, Roll: {:.2} (deg)",
        e[1], e[2], e[0]
    );
    let t = profile.translation_cm;
    println!(
        "  Translation: X: {:.2}, Y: {:.2}, Z: {:.2} (cm)",
        t.x, t.y, t.z
    );
    println!("  Scale:       {:.4}", profile.scale);
    match &profile.chaperone {
        Some(c) => println!(
            "  Chaperone:   {} bounds quads, play area {:.2} x {:.2} m, auto-apply {}",
            c.bounds.len(),
            c.play_area.0,
            c.play_area.1,
            if c.auto_apply { "on" } else { "off" }
        ),
        None => println!("  Chaperone:   none"),
    }

    Ok(ExitCode::SUCCESS)
}

fn adjust(
    store: &mut JsonProfileStore,
    [yaw, pitch, roll]: [Option<f64>; 3],
    [x, y, z]: [Option<f64>; 3],
    scale: Option<f64>,
    relative: bool,
) -> anyhow::Result<ExitCode> {
    let Some(mut profile) = store.load()? else {
        anyhow::bail!("no stored profile to adjust; run a calibration first");
    };

    if relative {
        profile.rotation_deg += Vector3::new(
            roll.unwrap_or(0.0),
            yaw.unwrap_or(0.0),
            pitch.unwrap_or(0.0),
        );
        profile.translation_cm +=
            Vector3::new(x.unwrap_or(0.0), y.unwrap_or(0.0), z.unwrap_or(0.0));
        if let Some(s) = scale {
            profile.scale *= s;
        }
    } else {
        if let Some(v) = roll {
            profile.rotation_deg[0] = v;
        }
        if let Some(v) = yaw {
            profile.rotation_deg[1] = v;
        }
        if let Some(v) = pitch {
            profile.rotation_deg[2] = v;
        }
        if let Some(v) = x {
            profile.translation_cm.x = v;
        }
        if let Some(v) = y {
            profile.translation_cm.y = v;
        }
        if let Some(v) = z {
            profile.translation_cm.z = v;
        }
        if let Some(s) = scale {
            profile.scale = s;
        }
    }

    store.save(&profile)?;
    println!("Profile adjusted. It is picked up on the next device scan.");
    Ok(ExitCode::SUCCESS)
}

fn check() -> anyhow::Result<ExitCode> {
    match DriverHandles::acquire() {
        Ok(handles) => {
            println!("{} offset driver is reachable", "ok:".bright_green());
            if handles.raw_poses.is_some() {
                println!("{} raw pose channel present", "ok:".bright_green());
            } else {
                println!("{} raw pose channel missing", "warn:".yellow());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{} {:#}", "fail:".bright_red(), e);
            Ok(ExitCode::from(2))
        }
    }
}

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The command to run
    #[command(subcommand)]
    command: Subcommands,
}

#[derive(clap::Subcommand, Debug)]
enum Subcommands {
    /// Print the stored calibration profile
    Show,
    /// Edit the stored calibration profile
    Adjust {
        /// rotation about Y in DEGREES
        #[arg(long)]
        yaw: Option<f64>,

        /// rotation about X in DEGREES
        #[arg(long)]
        pitch: Option<f64>,

        /// rotation about Z in DEGREES
        #[arg(long)]
        roll: Option<f64>,

        /// translation in CENTIMETRES
        #[arg(long)]
        x: Option<f64>,

        /// translation in CENTIMETRES
        #[arg(long)]
        y: Option<f64>,

        /// translation in CENTIMETRES
        #[arg(long)]
        z: Option<f64>,

        /// uniform scale factor for target-universe devices
        #[arg(long)]
        scale: Option<f64>,

        /// apply the values as deltas instead of overwriting
        #[arg(short, long)]
        relative: bool,
    },
    /// Delete the stored calibration profile
    Reset,
    /// Check that the offset driver endpoints are reachable, then exit
    Check,
}
