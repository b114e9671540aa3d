use anyhow::{Context as _, Result, anyhow, bail};
use cgmath::InnerSpace;
use clap::{Args, Parser, Subcommand};
use cryxtal_base::{ElementId, LengthUnit, ModelId};
use cryxtal_inspect::{
    Context, DimensionEngine, DragTarget, InspectConfig, SelectionConfig, SelectionEngine,
};
use cryxtal_scene::{
    CameraRig, Geometry, MemoryScene, MeshRayCaster, OrbitCamera, PostProcessState, Point3,
    Projection, Ray, RayHitProvider, SubsetManager, Vector3, point,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MODEL: ModelId = ModelId(1);
const FRAME_SECONDS: f64 = 1.0 / 60.0;
const MAX_FRAMES: usize = 600;

#[derive(Parser)]
#[command(name = "cryxtal")]
#[command(about = "CryXtal picking and measurement sessions over a model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Highlight the element under a point, optionally focusing the camera.
    Pick(PickArgs),
    /// Measure between two points on the model.
    Measure(MeasureArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args)]
struct ModelArgs {
    /// Box model as width,height,depth
    #[arg(long, conflicts_with = "model")]
    size: Option<String>,
    /// JSON model with positions, triangles and per-triangle element ids
    #[arg(long)]
    model: Option<PathBuf>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    orthographic: bool,
}

#[derive(Args)]
struct PickArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Point to pick as x,y,z; the ray runs from the camera through it
    #[arg(long)]
    at: String,
    #[arg(long)]
    focus: bool,
}

#[derive(Args)]
struct MeasureArgs {
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    /// Display unit: mm, cm or m
    #[arg(long)]
    unit: Option<LengthUnit>,
}

#[derive(Deserialize)]
struct ModelFile {
    positions: Vec<[f64; 3]>,
    triangles: Vec<[usize; 3]>,
    elements: Vec<u32>,
}

struct Session {
    scene: MemoryScene,
    camera: OrbitCamera,
    rays: MeshRayCaster,
    subsets: SubsetManager,
    post: PostProcessState,
    config: InspectConfig,
}

impl Session {
    fn open(args: &ModelArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => InspectConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => InspectConfig::default(),
        };
        let (geometry, elements) = match (&args.size, &args.model) {
            (_, Some(path)) => load_model(path)?,
            (Some(size), None) => box_model(size)?,
            (None, None) => bail!("either --size or --model is required"),
        };
        let bounds = geometry.bounds().ok_or_else(|| anyhow!("model has no vertices"))?;
        let triangles = geometry.triangles().len();

        let mut scene = MemoryScene::new();
        let mut subsets = SubsetManager::new();
        let node = subsets
            .register_model(&mut scene, MODEL, geometry, elements)
            .context("failed to load model")?;
        let mut rays = MeshRayCaster::new();
        rays.add_pickable(node);

        let reach = bounds.max_extent().max(1.0) * 3.0;
        let eye = bounds.center() + Vector3::new(1.0, -1.0, 1.0).normalize() * reach;
        let mut camera = OrbitCamera::new(eye, bounds.center());
        if args.orthographic {
            camera.set_projection(Projection::Orthographic);
        }
        info!(node = %node, triangles, "model loaded");

        Ok(Self {
            scene,
            camera,
            rays,
            subsets,
            post: PostProcessState::default(),
            config,
        })
    }

    fn ctx(&mut self) -> Context<'_> {
        Context::new(
            &mut self.scene,
            &mut self.camera,
            &self.rays,
            &mut self.subsets,
            &mut self.post,
        )
    }

    fn aim(&mut self, target: Point3) -> Result<()> {
        let ray = Ray::through(self.camera.position(), target)
            .ok_or_else(|| anyhow!("point coincides with the camera"))?;
        self.rays.set_pointer_ray(Some(ray));
        Ok(())
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Pick(args) => pick(args),
        Command::Measure(args) => measure(args),
        Command::Config => print_config(),
    }
}

fn pick(args: PickArgs) -> Result<()> {
    let mut session = Session::open(&args.model)?;
    let target = parse_point(&args.at, "--at")?;
    session.aim(target)?;
    let hit = session
        .rays
        .cast_models(&session.scene)
        .ok_or_else(|| anyhow!("nothing to pick at {}", args.at))?;

    let selection: SelectionConfig = session.config.selection.clone();
    let mut engine =
        SelectionEngine::new(&mut session.scene, selection).context("invalid selection config")?;
    let outcome = engine
        .pick(&mut session.ctx(), &hit, args.focus, false)
        .ok_or_else(|| anyhow!("no element owns the picked face"))?;
    info!(
        model = %outcome.model,
        elements = ?outcome.elements,
        face_index = ?hit.face_index,
        "picked"
    );

    if let Some(task) = outcome.focus {
        let mut frames = 0;
        while engine.is_focusing() && frames < MAX_FRAMES {
            session.camera.update(FRAME_SECONDS);
            engine.update(&mut session.ctx(), FRAME_SECONDS);
            frames += 1;
        }
        if !task.is_finished() {
            warn!(frames, "camera did not settle");
        } else {
            pollster::block_on(task);
            let eye = session.camera.position();
            info!(frames, x = eye.x, y = eye.y, z = eye.z, "focused");
        }
    }

    engine.dispose(&mut session.ctx());
    Ok(())
}

fn measure(args: MeasureArgs) -> Result<()> {
    let mut session = Session::open(&args.model)?;
    let from = parse_point(&args.from, "--from")?;
    let to = parse_point(&args.to, "--to")?;

    let mut display = session.config.dimensions.clone();
    if let Some(unit) = args.unit {
        display = display.with_unit(unit);
    }
    let mut engine = DimensionEngine::new(display).context("invalid dimension config")?;
    engine.enable(&mut session.ctx(), true);

    start_or_drag(&mut session, &mut engine, from, true)?;
    start_or_drag(&mut session, &mut engine, to, false)?;
    let id = engine
        .commit(&mut session.ctx())
        .ok_or_else(|| anyhow!("no dimension in progress"))?;
    engine.on_camera_changed(&mut session.ctx());

    let segment = engine
        .segment(id)
        .ok_or_else(|| anyhow!("{id} was not persisted"))?;
    let label = segment.label_text(&session.scene).unwrap_or_default().to_string();
    let (start, end) = (segment.start(), segment.end());
    info!(
        segment = %id,
        length = segment.length(),
        start = ?[start.x, start.y, start.z],
        end = ?[end.x, end.y, end.z],
        label = %label,
        "measured"
    );
    println!("{label}");

    engine.dispose(&mut session.ctx());
    Ok(())
}

fn start_or_drag(
    session: &mut Session,
    engine: &mut DimensionEngine,
    target: Point3,
    start: bool,
) -> Result<()> {
    session.aim(target)?;
    let hit = session.rays.cast_models(&session.scene);
    let drag = match &hit {
        Some(hit) => DragTarget::Hit(hit),
        None => {
            warn!(x = target.x, y = target.y, z = target.z, "point is off the model");
            DragTarget::Point(target)
        }
    };
    let mut ctx = session.ctx();
    let placed = if start {
        engine.start_at(&mut ctx, drag)
    } else {
        engine.update_drag(&mut ctx, drag)
    };
    if placed.is_none() {
        bail!("dimension tool rejected the point");
    }
    Ok(())
}

fn print_config() -> Result<()> {
    let text = serde_json::to_string_pretty(&InspectConfig::default())
        .context("failed to serialize config")?;
    println!("{text}");
    Ok(())
}

fn box_model(size: &str) -> Result<(Geometry, Vec<ElementId>)> {
    let (width, height, depth) = parse_size(size)?;
    for (name, value) in [("width", width), ("height", height), ("depth", depth)] {
        if !(value.is_finite() && value > 0.0) {
            bail!("{name} must be positive, got {value}");
        }
    }
    let geometry = Geometry::cuboid(width, height, depth);
    // One element per box side.
    let elements = (0..geometry.triangles().len())
        .map(|face| ElementId(face as u32 / 2 + 1))
        .collect();
    Ok((geometry, elements))
}

fn load_model(path: &Path) -> Result<(Geometry, Vec<ElementId>)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: ModelFile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let positions = file
        .positions
        .into_iter()
        .map(|[x, y, z]| point(x, y, z))
        .collect::<Vec<_>>();
    if let Some(bad) = file
        .triangles
        .iter()
        .flatten()
        .find(|index| **index >= positions.len())
    {
        bail!("triangle index {bad} out of range for {} vertices", positions.len());
    }
    let elements = file.elements.into_iter().map(ElementId).collect();
    Ok((Geometry::new(positions, file.triangles), elements))
}

fn parse_size(text: &str) -> Result<(f64, f64, f64)> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        bail!("--size expects three comma-separated numbers, e.g. 4,2,3");
    }

    let width: f64 = parts[0].trim().parse().context("invalid width")?;
    let height: f64 = parts[1].trim().parse().context("invalid height")?;
    let depth: f64 = parts[2].trim().parse().context("invalid depth")?;
    Ok((width, height, depth))
}

fn parse_point(text: &str, flag: &str) -> Result<Point3> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        bail!("{flag} expects x,y,z");
    }
    let mut coords = [0.0; 3];
    for (coord, part) in coords.iter_mut().zip(&parts) {
        *coord = part
            .trim()
            .parse()
            .with_context(|| format!("invalid coordinate {part:?} in {flag}"))?;
    }
    Ok(point(coords[0], coords[1], coords[2]))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points_and_sizes() {
        assert_eq!(parse_point("1, 2.5,-3", "--at").unwrap(), point(1.0, 2.5, -3.0));
        assert!(parse_point("1,2", "--at").is_err());
        assert_eq!(parse_size("4,2,3").unwrap(), (4.0, 2.0, 3.0));
        assert!(parse_size("4,x,3").is_err());
    }

    #[test]
    fn box_model_assigns_one_element_per_side() {
        let (geometry, elements) = box_model("2,2,2").unwrap();
        assert_eq!(elements.len(), geometry.triangles().len());
        assert_eq!(elements[0], elements[1]);
        assert_ne!(elements[1], elements[2]);
        assert!(box_model("2,0,2").is_err());
    }
}
