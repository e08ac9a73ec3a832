#![warn(clippy::pedantic)]

pub mod script;
pub mod settings;

use anyhow::{Context, Result as AnyResult};
use handwritten_core::{Persist, StrokeSessionRouter};

/// Output path when none is given.
const DEFAULT_OUTPUT: &str = "snapshot.png";

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    // Args: a session script, then where to write the snapshot.
    // `--save-settings` writes the effective user settings back out, creating the file if absent.
    let mut save_settings = false;
    let mut paths = Vec::<std::path::PathBuf>::new();
    for arg in std::env::args_os().skip(1) {
        if arg == "--save-settings" {
            save_settings = true;
        } else {
            paths.push(arg.into());
        }
    }
    let mut paths = paths.into_iter();
    let script_path = paths
        .next()
        .context("usage: handwritten [--save-settings] <script.toml> [output.png]")?;
    let output = paths
        .next()
        .unwrap_or_else(|| DEFAULT_OUTPUT.into());

    let user = settings::Settings::load();
    if save_settings {
        if let Err(e) = user.save() {
            log::warn!("failed to save settings: {e:?}");
        }
    }
    let script = script::Script::from_path(&script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;

    let pen = script.pen.unwrap_or(user.pen);
    let canvas_settings = script.canvas.unwrap_or(user.canvas);
    let canvas = canvas_settings.to_canvas()?;
    let mut router = StrokeSessionRouter::new(canvas, pen.to_style()?);

    if let Some(text) = &script.text {
        let faces = handwritten_core::text::Faces::new_system();
        // Not fatal, the strokes still get drawn.
        if let Err(e) = router.stamp_text(text, &faces) {
            log::warn!("failed to stamp {text:?}: {e}");
        }
    }
    script.replay(&mut router)?;
    // Whatever is still down or awaiting estimates at the end of the script is kept as-is.
    router.end_all();
    router.flush_pending();
    log::debug!("final redraw: {:?}", router.take_redraw());

    let size = canvas_settings.snapshot;
    let snapshot = router.snapshot_always(size, size)?;
    std::fs::write(&output, snapshot.serialize()?)
        .with_context(|| format!("writing {}", output.display()))?;
    log::info!("wrote {size}x{size} snapshot to {}", output.display());
    Ok(())
}
