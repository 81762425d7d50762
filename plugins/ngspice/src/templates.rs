use std::path::{Path, PathBuf};

use finchar::error::{ErrorSource, Result};
use lazy_static::lazy_static;
use serde::Serialize;
use tera::{Context, Tera};

pub(crate) const TEMPLATES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

lazy_static! {
    pub(crate) static ref TEMPLATES: Tera = {
        match Tera::new(&format!("{TEMPLATES_PATH}/*")) {
            Ok(t) => t,
            Err(e) => {
                panic!("Encountered errors while parsing Tera templates: {e}");
            }
        }
    };
}

#[derive(Serialize)]
pub(crate) struct NetlistCtx<'a> {
    pub(crate) title: &'a str,
    pub(crate) includes: &'a [String],
    pub(crate) elements: &'a [String],
    pub(crate) directives: &'a [String],
    pub(crate) analyses: &'a [String],
}

pub(crate) fn render_netlist_string(ctx: &NetlistCtx<'_>) -> Result<String> {
    let ctx = Context::from_serialize(ctx)
        .map_err(|e| ErrorSource::Internal(format!("template error: {e}")))?;
    Ok(TEMPLATES
        .render("netlist.spice", &ctx)
        .map_err(|e| ErrorSource::Internal(format!("template error: {e}")))?)
}

pub(crate) fn render_netlist(ctx: &NetlistCtx<'_>, work_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = work_dir.as_ref().join("netlist.spice");
    let netlist = render_netlist_string(ctx)?;
    finchar::io::write(&path, netlist)?;
    Ok(path)
}
