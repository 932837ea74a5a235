use std::env;

use stage_scoreboard::services::documentation::{ControlApiDoc, OverlayApiDoc};
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = match env::args().nth(1).as_deref() {
        Some("control") => ControlApiDoc::openapi(),
        _ => OverlayApiDoc::openapi(),
    };
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}
