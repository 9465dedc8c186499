use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, instrument};

use crate::errors::TreeResult;
use crate::evolution::TraitEvolution;
use crate::model::PhyloTree;
use crate::trunk::TrunkPath;

/// Writes the per-step trunk report: one row per trunk edge with the trait
/// values on both ends and a flag marking counted switches.
///
/// The first row descends from the root, whose value is optional and never
/// enters the switch count; its VFROM column is empty when absent.
#[instrument(level = "debug", skip(tree, path))]
pub fn write_switches_csv(
    out: &Path,
    tree: &PhyloTree,
    path: &TrunkPath,
    feature: &str,
) -> TreeResult<()> {
    let file = File::create(out)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "FROM-ID,TO-ID,DURATION,VFROM,VTO,C")?;

    for pair in path.nodes().windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let vfrom = tree.annotation(from, feature).unwrap_or("");
        let vto = tree.annotation(to, feature).unwrap_or("");
        let counted = path.root() != Some(from);
        let switch = u8::from(counted && vfrom != vto);
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            csv_field(&tree.display_name(from)),
            csv_field(&tree.display_name(to)),
            tree.branch_length(to),
            csv_field(vfrom),
            csv_field(vto),
            switch
        )?;
    }
    writer.flush()?;
    debug!(path = %out.display(), "switch report written");
    Ok(())
}

/// Writes the permanence summary: one row per run of an unchanged value.
#[instrument(level = "debug", skip(evolution))]
pub fn write_summary_csv(out: &Path, evolution: &TraitEvolution) -> TreeResult<()> {
    let file = File::create(out)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "VALUE,DURATION")?;
    for run in &evolution.runs {
        writeln!(writer, "{},{}", csv_field(&run.value), run.duration)?;
    }
    writer.flush()?;
    debug!(path = %out.display(), "permanence summary written");
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
