use anyhow::Context;
use log::*;
use pcb_inspect::{synth, Inspector};
use pcb_inspect_cli::{
    dataset_images, load_config, load_font, render_result, write_report, ImageReport, Size,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "pcb-inspect",
    about = "Finds defects on circuit boards by comparing them with a golden image"
)]
enum Opt {
    /// Inspect every `test_*.png` of a dataset directory.
    Inspect {
        /// The known-good board.
        #[structopt(short, long, parse(from_os_str), default_value = "dataset/golden_master.png")]
        reference: PathBuf,
        /// Directory holding the test images.
        #[structopt(short, long, parse(from_os_str), default_value = "dataset")]
        dataset: PathBuf,
        /// Directory the annotated images and `report.json` are written to.
        #[structopt(short, long, parse(from_os_str), default_value = "output")]
        output: PathBuf,
        /// The file where settings are specified.
        ///
        /// This is in the format of `pcb_inspect::InspectConfig`.
        #[structopt(short, long, parse(from_os_str), default_value = "pcb-inspect.json")]
        config: PathBuf,
        /// Seed of the consensus RNG, overrides the settings file.
        #[structopt(long)]
        seed: Option<u64>,
        /// A TrueType font used to label the defects.
        #[structopt(long, parse(from_os_str))]
        font: Option<PathBuf>,
    },
    /// Write corrupted copies of a golden image.
    Generate {
        /// The known-good board.
        #[structopt(short, long, parse(from_os_str), default_value = "dataset/golden_master.png")]
        reference: PathBuf,
        /// Directory the test images are written to.
        #[structopt(short, long, parse(from_os_str), default_value = "dataset")]
        output: PathBuf,
        #[structopt(long)]
        seed: Option<u64>,
        /// Draw a synthetic board of this size (`WIDTHxHEIGHT`) to the
        /// reference path first.
        #[structopt(long)]
        synthetic: Option<Size>,
    },
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_timed();
    match Opt::from_args() {
        Opt::Inspect {
            reference,
            dataset,
            output,
            config,
            seed,
            font,
        } => {
            let mut config = load_config(&config);
            if seed.is_some() {
                config.seed = seed;
            }
            inspect(reference, dataset, output, config, font)
        }
        Opt::Generate {
            reference,
            output,
            seed,
            synthetic,
        } => generate(reference, output, seed, synthetic),
    }
}

fn inspect(
    reference: PathBuf,
    dataset: PathBuf,
    output: PathBuf,
    config: pcb_inspect::InspectConfig,
    font: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("initializing inspector");
    let inspector = Inspector::new(&reference, config)
        .with_context(|| format!("loading reference {}", reference.display()))?;

    let font = match font {
        Some(path) => match load_font(&path) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("drawing without labels: {:#}", e);
                None
            }
        },
        None => None,
    };

    let paths = dataset_images(&dataset)?;
    if paths.is_empty() {
        warn!("no test_*.png images in {}", dataset.display());
    }
    std::fs::create_dir_all(&output).with_context(|| format!("creating {}", output.display()))?;

    let mut reports = vec![];
    for (path, result) in inspector.inspect_batch(&paths) {
        reports.push(ImageReport::new(&path, &result));
        let result = match result {
            Ok(result) => result,
            Err(_) => continue,
        };
        let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        if result.passed() {
            info!("{}: no defects detected", name);
        } else {
            info!("{}: found {} defects", name, result.defects.len());
            for defect in &result.defects {
                info!(
                    " - {} at ({}, {}) conf: {:.2}",
                    defect.kind, defect.bbox.x, defect.bbox.y, defect.confidence
                );
            }
        }
        let out_path = output.join(format!("result_{}", name));
        match render_result(&result, font.as_ref()).save(&out_path) {
            Ok(()) => info!("saved result to {}", out_path.display()),
            Err(e) => error!("unable to save {}: {}", out_path.display(), e),
        }
    }

    let report_path = output.join("report.json");
    write_report(&report_path, &reports)?;
    let failed = reports.iter().filter(|r| !r.passed && r.error.is_none()).count();
    let errors = reports.iter().filter(|r| r.error.is_some()).count();
    info!(
        "{} images: {} passed, {} failed, {} not inspected; report in {}",
        reports.len(),
        reports.len() - failed - errors,
        failed,
        errors,
        report_path.display()
    );
    Ok(())
}

fn generate(
    reference: PathBuf,
    output: PathBuf,
    seed: Option<u64>,
    synthetic: Option<Size>,
) -> anyhow::Result<()> {
    let golden = match synthetic {
        Some(Size { width, height }) => {
            let board = synth::synthetic_board(width, height, seed.unwrap_or(0));
            if let Some(parent) = reference.parent() {
                std::fs::create_dir_all(parent)?;
            }
            board
                .save(&reference)
                .with_context(|| format!("writing {}", reference.display()))?;
            info!("generated {}", reference.display());
            board
        }
        None => image::open(&reference)
            .with_context(|| format!("loading reference {}", reference.display()))?
            .to_rgb8(),
    };

    let mut rng = match seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_entropy(),
    };
    std::fs::create_dir_all(&output).with_context(|| format!("creating {}", output.display()))?;
    for (name, image) in synth::generate_dataset(&golden, &mut rng) {
        let path = output.join(name);
        image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("generated {}", path.display());
    }
    Ok(())
}
