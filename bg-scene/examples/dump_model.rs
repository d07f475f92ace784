//! Load a `.geo.json` file, compile it, and print the resulting scene graph.
//!
//! Usage: `cargo run --example dump_model -- path/to/model.geo.json`

use std::fs;
use std::process::ExitCode;

use bg_format::{RawModelDocument, normalize};
use bg_scene::{BoneId, CompiledModel, MODEL_SCALE, TextureHandle, compile_model};

fn main() -> ExitCode {
    tracing_subscriber::fmt().without_time().compact().init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: dump_model <model.geo.json>");
        return ExitCode::FAILURE;
    };
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("failed to read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let doc: RawModelDocument = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("{path} is not a model document: {err}");
            return ExitCode::FAILURE;
        }
    };
    let normalized = match normalize(&doc) {
        Ok(normalized) => normalized,
        Err(err) => {
            eprintln!("failed to normalize {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    for notice in &normalized.notices {
        println!("notice: {notice:?}");
    }

    let geometry = normalized.geometry;
    let model = match compile_model(&geometry, Some(TextureHandle(0))) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("failed to compile {}: {err}", geometry.identifier);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} ({}x{} atlas, {} bones, {} meshes, world scale {MODEL_SCALE})",
        geometry.identifier,
        geometry.texture_width,
        geometry.texture_height,
        model.skeleton.len(),
        model.meshes.len(),
    );
    for notice in &model.skeleton.notices {
        println!("notice: {notice:?}");
    }
    for err in &model.cube_errors {
        println!("cube error: {err}");
    }
    let roots: Vec<BoneId> = model.skeleton.roots().collect();
    for root in roots {
        print_bone(&model, root, 0);
    }
    ExitCode::SUCCESS
}

fn print_bone(model: &CompiledModel, id: BoneId, depth: usize) {
    let Some(node) = model.skeleton.get(id) else {
        return;
    };
    let cubes = model.meshes.iter().filter(|m| m.bone == id).count();
    let origin = node.world.transform_point3(glam::Vec3::ZERO);
    println!(
        "{:indent$}{} ({} cubes, pivot {:.1} {:.1} {:.1})",
        "",
        node.name,
        cubes,
        origin.x,
        origin.y,
        origin.z,
        indent = depth * 2,
    );
    for &child in &node.children {
        print_bone(model, child, depth + 1);
    }
}
