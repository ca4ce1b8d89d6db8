use clap::{Parser, Subcommand};
use glam::Vec3;
use nalgebra as na;
use pointcloud_capture::camera_model::{CameraModel, Intrinsics};
use pointcloud_capture::data_loader::{RecordedFrame, Recording, RecordingMetadata, save_recording};
use pointcloud_capture::types::{PoseRecord, ToPose};
use rand::Rng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic recording of a box seen from a circling device
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Number of depth frames
        #[arg(short, long, default_value = "60")]
        num_frames: usize,

        /// Points sampled on the box surface
        #[arg(long, default_value = "20000")]
        num_points: usize,

        /// Box half size in meters
        #[arg(long, default_value = "0.25", value_parser = positive_f32)]
        half_size: f32,

        /// Distance from the device to the box center in meters
        #[arg(long, default_value = "1.5", value_parser = positive_f64)]
        radius: f64,

        /// Uniform depth noise in meters
        #[arg(long, default_value = "0.002", value_parser = non_negative_f32)]
        noise: f32,

        /// Mark every n-th frame as lost tracking, 0 disables
        #[arg(long, default_value = "0")]
        invalid_every: usize,

        /// Image width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "720")]
        height: u32,
    },
}

fn positive_f32(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v > 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{v} is not a positive number"))
    }
}

fn positive_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if v > 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{v} is not a positive number"))
    }
}

fn non_negative_f32(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v >= 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{v} is not a non-negative number"))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            num_frames,
            num_points,
            half_size,
            radius,
            noise,
            invalid_every,
            width,
            height,
        } => {
            let intrinsics = Intrinsics::new(
                width,
                height,
                width as f64 * 0.8,
                width as f64 * 0.8,
                width as f64 / 2.0,
                height as f64 / 2.0,
            );
            let recording = generate_recording(
                &intrinsics,
                num_frames,
                num_points,
                half_size,
                radius,
                noise,
                invalid_every,
            );
            save_recording(&output, &recording)?;
            println!("Generated {} frames in {}", num_frames, output);
        }
    }

    Ok(())
}

fn sample_box_surface<R: Rng>(rng: &mut R, half_size: f32, num_points: usize) -> Vec<Vec3> {
    (0..num_points)
        .map(|_| {
            let axis = rng.random_range(0..3usize);
            let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let mut p = Vec3::new(
                rng.random_range(-half_size..half_size),
                rng.random_range(-half_size..half_size),
                rng.random_range(-half_size..half_size),
            );
            p[axis] = sign * half_size;
            p
        })
        .collect()
}

fn generate_recording(
    intrinsics: &Intrinsics,
    num_frames: usize,
    num_points: usize,
    half_size: f32,
    radius: f64,
    noise: f32,
    invalid_every: usize,
) -> Recording {
    let mut rng = rand::rng();
    let box_points = sample_box_surface(&mut rng, half_size, num_points);
    let frame_period = 1.0 / 5.0;

    let frames = (0..num_frames)
        .map(|frame_idx| {
            // quarter circle around the box, looking at its center
            let theta = frame_idx as f64 / num_frames.max(1) as f64 * std::f64::consts::FRAC_PI_2;
            let eye = na::Point3::new(radius * theta.sin(), 0.0, -radius * theta.cos());
            let world_t_device = na::Isometry3::face_towards(
                &eye,
                &na::Point3::origin(),
                &na::Vector3::new(0.0, -1.0, 0.0),
            );
            let device_t_world = world_t_device.inverse();

            let device_points: Vec<Vec3> = box_points
                .iter()
                .map(|p| {
                    let q = device_t_world * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
                    Vec3::new(q.x as f32, q.y as f32, q.z as f32 + rng.random_range(-noise..=noise))
                })
                .collect();
            let visible: Vec<Vec3> = device_points
                .iter()
                .zip(intrinsics.project_in_image(&device_points))
                .filter_map(|(q, px)| px.map(|_| *q))
                .collect();

            RecordedFrame {
                timestamp: 1.0 + frame_idx as f64 * frame_period,
                device_pose: PoseRecord::from(&world_t_device.to_pose()),
                pose_valid: invalid_every == 0 || (frame_idx + 1) % invalid_every != 0,
                xyz: visible.iter().flat_map(|p| p.to_array()).collect(),
            }
        })
        .collect();

    Recording {
        metadata: RecordingMetadata {
            intrinsics: *intrinsics,
            imu_t_device: PoseRecord::default(),
            imu_t_color: PoseRecord::default(),
            imu_t_depth: PoseRecord::default(),
        },
        frames,
    }
}
