// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `sbrep` - build, inspect, cut and triangulate planar B-Rep files.
//!
//! # Commands
//!
//! - `sbrep build <mesh.json>` - convert a triangle mesh into a `.sbrep` file
//! - `sbrep inspect <file.sbrep>` - validate and print entity counts and faces
//! - `sbrep mesh <file.sbrep>` - reconstruct a triangle mesh as JSON
//! - `sbrep json <file.sbrep>` - print the JSON snapshot
//! - `sbrep cut <file.sbrep> <face> <x,y,z>...` - cut a face with a contour
//!
//! Tolerances and threading come from `SBREP_*` environment variables, see
//! [`config::Config`]. Logging follows `RUST_LOG`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sbrep_geometry::Point3;
use sbrep_topology::{FaceId, SbrepBuilder, SbrepObject, SbrepToMeshBuilder};

mod config;
mod mesh_file;

use config::Config;
use mesh_file::MeshFile;

#[derive(Parser)]
#[command(name = "sbrep")]
#[command(about = "Planar B-Rep reconstruction from triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON triangle mesh into a B-Rep file
    Build {
        /// Input mesh (JSON: positions, indices, optional groups)
        input: PathBuf,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a B-Rep file and print a summary
    Inspect {
        input: PathBuf,
    },

    /// Triangulate every face back into a JSON mesh
    Mesh {
        input: PathBuf,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Triangulate faces on the worker pool
        #[arg(long)]
        parallel: bool,
    },

    /// Print the JSON snapshot of a B-Rep file
    Json {
        input: PathBuf,
    },

    /// Cut a face with a closed contour
    Cut {
        input: PathBuf,

        /// Face to cut
        face: u32,

        /// Contour points as `x,y,z`
        #[arg(required = true, num_args = 3.., value_parser = parse_point)]
        points: Vec<Point3<f64>>,

        /// Group for the faces inside the contour; one past the highest
        /// group when omitted
        #[arg(short, long)]
        group: Option<i32>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_point(s: &str) -> std::result::Result<Point3<f64>, String> {
    let coords = s
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|e| format!("invalid point `{s}`: {e}"))?;
    match coords.as_slice() {
        &[x, y, z] => Ok(Point3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got `{s}`")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,sbrep=info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Build { input, output } => {
            let file: MeshFile = serde_json::from_reader(BufReader::new(
                File::open(&input).with_context(|| format!("opening {}", input.display()))?,
            ))
            .with_context(|| format!("parsing {}", input.display()))?;
            let mesh = file.to_mesh()?;
            let obj = SbrepBuilder::new(config.tolerances())
                .convert(&mesh)
                .with_context(|| format!("building B-Rep from {}", input.display()))?;
            tracing::info!(
                triangles = mesh.triangle_count(),
                faces = obj.face_count(),
                "built B-Rep"
            );
            write_output(output.as_deref(), |w| Ok(obj.write_text(w)?))
        }
        Commands::Inspect { input } => {
            let obj = read_object(&input, &config)?;
            print!("{}", inspect(&obj)?);
            Ok(())
        }
        Commands::Mesh {
            input,
            output,
            parallel,
        } => {
            let obj = read_object(&input, &config)?;
            let builder = SbrepToMeshBuilder::new(config.mesh_options());
            let mesh = if parallel || config.parallel {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.worker_threads)
                    .build_global()
                    .context("configuring worker pool")?;
                builder.convert_parallel(&obj)?
            } else {
                builder.convert(&obj)?
            };
            let file = MeshFile::from_mesh(&mesh);
            write_output(output.as_deref(), |w| {
                serde_json::to_writer(&mut *w, &file)?;
                writeln!(w)?;
                Ok(())
            })
        }
        Commands::Json { input } => {
            let obj = read_object(&input, &config)?;
            println!("{}", obj.to_json()?);
            Ok(())
        }
        Commands::Cut {
            input,
            face,
            points,
            group,
            output,
        } => {
            let mut obj = read_object(&input, &config)?;
            let result = obj
                .apply_intersect_contour_to_face(FaceId(face), &points, group, &config.tolerances())
                .with_context(|| format!("cutting face {face}"))?;
            tracing::info!(inside = ?result.inside, outside = ?result.outside, "cut face {face}");
            write_output(output.as_deref(), |w| Ok(obj.write_text(w)?))
        }
    }
}

fn read_object(path: &Path, config: &Config) -> Result<SbrepObject> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    SbrepObject::read_text(BufReader::new(file), config.epsilon)
        .with_context(|| format!("reading {}", path.display()))
}

fn write_output(path: Option<&Path>, write: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut w = BufWriter::new(file);
            write(&mut w)?;
            w.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut w = stdout.lock();
            write(&mut w)?;
            w.flush()?;
        }
    }
    Ok(())
}

/// Summary text: counts, per-face group and area, consistency checks.
fn inspect(obj: &SbrepObject) -> Result<String> {
    use std::fmt::Write as _;

    if !obj.feedbacks_consistent() {
        bail!("parent references do not match child lists");
    }
    for l in obj.loops().ids() {
        let vertices = obj.closed_contour_vertices(l)?;
        let edges = obj.loop_edges(l)?;
        if vertices.len() != edges.len() {
            bail!("loop {l} visits {} vertices for {} edges", vertices.len(), edges.len());
        }
    }

    let mut out = String::new();
    writeln!(
        out,
        "vertices {}\nedges {}\nverges {}\nloops {}\nfaces {}",
        obj.vertex_count(),
        obj.edge_count(),
        obj.verge_count(),
        obj.loop_count(),
        obj.face_count()
    )?;
    for (id, face) in obj.faces().iter() {
        let n = face.plane.normal;
        writeln!(
            out,
            "face {id}: group {} holes {} area {:.6} normal ({:.4}, {:.4}, {:.4})",
            face.group_id,
            face.inner_loops.len(),
            obj.face_area(id)?,
            n.x,
            n.y,
            n.z
        )?;
    }
    writeln!(out, "total area {:.6}", obj.total_area()?)?;
    Ok(out)
}
