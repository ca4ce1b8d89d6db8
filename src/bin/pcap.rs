use clap::Parser;
use pointcloud_capture::config::SessionConfig;
use pointcloud_capture::data_loader::{ReplaySensor, load_recording};
use pointcloud_capture::io::{object_from_json, write_merge_report};
use pointcloud_capture::visualization::RerunScene;
use pointcloud_capture::ArSession;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(version, about, author)]
struct PcapCli {
    /// path to recording folder
    path: String,

    /// session config json
    #[arg(long)]
    config: Option<String>,

    /// selection rectangle in ui pixels
    #[arg(long, num_args = 4, value_names = ["X0", "Y0", "X1", "Y1"], allow_negative_numbers = true)]
    select: Option<Vec<i32>>,

    /// request a capture every n depth frames
    #[arg(long, default_value = "10")]
    capture_every: usize,

    /// merge report path
    #[arg(short, long, default_value = "merge_report.json")]
    output: String,

    /// rerun recording path
    #[arg(long, default_value = "output.rrd")]
    rrd: String,

    /// delay between depth frames in milliseconds
    #[arg(long, default_value = "33")]
    period_ms: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = PcapCli::parse();
    let config: SessionConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => SessionConfig::default(),
    };

    let now = Instant::now();
    let recording = load_recording(&cli.path)?;
    println!(
        "loading {} frames took {:.6} sec",
        recording.frames.len(),
        now.elapsed().as_secs_f64()
    );

    let session = Arc::new(ArSession::new(config, ReplaySensor::new(recording)?));
    session.connect()?;
    let period = Duration::from_millis(cli.period_ms);

    // sensor callbacks: store the latest sample and flag the color frame
    let sensor_session = Arc::clone(&session);
    let sensor_handle = thread::spawn(move || {
        let mut count = 0usize;
        while let Some(cloud) = sensor_session.sensor().advance() {
            sensor_session.on_point_cloud_available(cloud);
            sensor_session.on_frame_available();
            count += 1;
            thread::sleep(period);
        }
        count
    });

    // ui: one drag, periodic capture buttons while frames arrive
    let ui_session = Arc::clone(&session);
    let select = cli.select.clone();
    let capture_every = cli.capture_every;
    let ui_handle = thread::spawn(move || {
        if let Some(s) = select {
            ui_session.begin_drag_selection();
            ui_session.record_drag_point(s[0], s[1]);
            ui_session.record_drag_point(s[2], s[3]);
            let region = ui_session.commit_selection();
            log::info!("selection {:?}..{:?}", region.min, region.max);
        }
        let sensor = ui_session.sensor();
        let mut requested = 0usize;
        while sensor.remaining() > 0 {
            let delivered = sensor.frame_count() - sensor.remaining();
            if capture_every > 0 && delivered / capture_every > requested {
                requested = delivered / capture_every;
                ui_session.request_capture();
            }
            thread::sleep(period / 2);
        }
        requested
    });

    // once every frame is stored: press capture for the last boundary, then merge
    let merge_session = Arc::clone(&session);
    let merge_handle = thread::spawn(move || {
        let delivered = sensor_handle.join().map_err(|_| "sensor thread panicked")?;
        let mut requested = ui_handle.join().map_err(|_| "ui thread panicked")?;
        if capture_every > 0 && delivered / capture_every > requested {
            requested = delivered / capture_every;
            merge_session.request_capture();
        }
        // a tick serves capture before merge
        merge_session.request_merge();
        Ok::<_, &'static str>((delivered, requested))
    });

    let recording = rerun::RecordingStreamBuilder::new("pointcloud_capture").save(&cli.rrd)?;
    let mut scene = RerunScene::new(recording);
    let mut tick = 0i64;
    let merged = loop {
        scene.set_tick(tick);
        let outcome = session.render_tick(&mut scene);
        if let Some(Err(e)) = &outcome.capture {
            log::warn!("tick {}: {}", tick, e);
        }
        if let Some(merge) = outcome.merge {
            break merge;
        }
        tick += 1;
        thread::sleep(period / 2);
    };

    let (delivered, requested) = merge_handle.join().map_err(|_| "merge thread panicked")??;
    println!(
        "{} frames, {} capture requests, {} keyframes in {} ticks",
        delivered,
        requested,
        session.keyframe_count(),
        tick
    );

    match merged {
        Ok(result) => {
            write_merge_report(&cli.output, session.keyframe_count(), &result)?;
            println!(
                "centroid {:?} extent {:?}",
                result.centroid.to_array(),
                result.extent.to_array()
            );
        }
        Err(e) => log::error!("merge failed: {}", e),
    }
    session.teardown();
    Ok(())
}
