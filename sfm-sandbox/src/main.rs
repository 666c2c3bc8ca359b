use log::*;
use sfm_colmap::{ColmapEngine, ColmapOptions};
use sfm_session::{export_ply, ReconstructionSession, SessionSettings};
use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

#[derive(StructOpt, Clone)]
#[structopt(
    name = "sfm-sandbox",
    about = "Reconstructs a dataset with COLMAP and exports the result"
)]
struct Opt {
    /// The file where settings are specified.
    ///
    /// This is in the format of `sfm_session::SessionSettings`.
    #[structopt(short, long, default_value = "sfm-settings.json")]
    settings: PathBuf,
    /// Rerun the pipeline even when cached artifacts exist.
    #[structopt(long)]
    recompute: bool,
    /// Override the matcher from the settings file.
    #[structopt(long)]
    matcher: Option<String>,
    /// Override the camera model from the settings file.
    #[structopt(long)]
    camera_model: Option<String>,
    /// Path to the colmap executable.
    #[structopt(long, default_value = "colmap")]
    colmap: PathBuf,
    /// Camera to activate after reconstruction.
    #[structopt(long)]
    camera: Option<String>,
    /// Milliseconds between polls of the estimation job.
    #[structopt(long, default_value = "250")]
    poll_interval: u64,
    /// Output PLY file to deposit the point cloud and camera frustums.
    #[structopt(short, long)]
    output: Option<PathBuf>,
    /// Dataset root containing an `images/` folder.
    #[structopt(parse(from_os_str))]
    dataset: PathBuf,
}

fn main() {
    pretty_env_logger::init_timed();
    if let Err(e) = run(Opt::from_args()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
    let settings = std::fs::File::open(&opt.settings)
        .ok()
        .and_then(|file| serde_json::from_reader(file).ok());
    if settings.is_some() {
        info!("loaded existing settings");
    } else {
        info!("used default settings");
    }
    let settings: SessionSettings = settings.unwrap_or_default();

    let options = ColmapOptions::new(
        settings.gpu_index,
        opt.camera_model.as_deref().unwrap_or(&settings.camera_model),
        opt.matcher.as_deref().unwrap_or(&settings.matcher),
    )?;
    let engine = ColmapEngine::new(options).with_executable(&opt.colmap);
    let mut session = ReconstructionSession::new(engine);

    session.set_dataset_path(&opt.dataset)?;
    if session.validate_existing_artifacts()? && !opt.recompute {
        info!("dataset has cached reconstruction artifacts");
    }
    info!("dataset has {} images", session.list_image_files()?.len());

    session.start_estimation(opt.recompute)?;
    while !session.is_estimation_complete()? {
        thread::sleep(Duration::from_millis(opt.poll_interval));
    }

    for name in session.camera_names()? {
        info!("registered camera {}", name);
    }
    if let Some(camera) = &opt.camera {
        session.set_active_camera(camera)?;
    }
    if let Some(active) = session.active_camera()? {
        info!("active camera {}", active);
    }

    if let Some(path) = &opt.output {
        info!("exporting the reconstruction to {}", path.display());
        let camera_color = settings
            .camera_color
            .map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
        let file = std::fs::File::create(path)?;
        export_ply(
            file,
            session.result()?,
            settings.camera_size,
            camera_color,
            true,
        )?;
    }

    Ok(())
}
