//! `enbp pack`: zip a blueprint locally.

use bytesize::ByteSize;
use serde::Serialize;
use tabled::Tabled;

use enbp_core::{AppContext, CoreError, read_entries, tasks};

use crate::cli::PackArgs;
use crate::error::CliError;
use crate::output;

use super::Ui;

const DEFAULT_ARCHIVE: &str = "blueprint.zip";

#[derive(Serialize)]
struct EntryInfo {
    name: String,
    kind: &'static str,
    size: u64,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Entry")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Size")]
    size: String,
}

fn byte_len(data: &[u8]) -> u64 {
    u64::try_from(data.len()).unwrap_or(u64::MAX)
}

pub async fn handle(ctx: &AppContext, args: PackArgs, ui: &Ui) -> Result<(), CliError> {
    let packaged = tasks::package_blueprint(ctx, &args.manifest).await?;

    if args.list {
        let entries: Vec<EntryInfo> = read_entries(&packaged.archive)
            .map_err(CoreError::from)?
            .into_iter()
            .map(|e| EntryInfo {
                size: byte_len(&e.data),
                kind: if e.is_dir { "dir" } else { "file" },
                name: e.name,
            })
            .collect();
        let rendered = output::render_list(
            ui.format,
            &entries,
            |e| EntryRow {
                name: e.name.clone(),
                kind: e.kind,
                size: if e.kind == "dir" {
                    String::new()
                } else {
                    ByteSize::b(e.size).to_string()
                },
            },
            |e| e.name.clone(),
        )?;
        output::print_output(&rendered, ui.quiet);
    }

    if !args.list || args.out.is_some() {
        let out = args
            .out
            .unwrap_or_else(|| packaged.manifest.dir().join(DEFAULT_ARCHIVE));
        tokio::fs::write(&out, &packaged.archive).await?;
        let name = packaged
            .manifest
            .display_name()
            .ok()
            .flatten()
            .unwrap_or("blueprint")
            .to_owned();
        output::notice(
            &format!(
                "Packed {name} ({}) into {}",
                ByteSize::b(byte_len(&packaged.archive)),
                out.display()
            ),
            ui.quiet,
        );
    }
    Ok(())
}
