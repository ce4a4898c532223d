//! The batch run.
//!
//! The input save is copied to the output directory first and every later
//! step mutates the copy in place. Map definitions are registered before any
//! other file is touched; then terrain chunks, entity chunks, player files and
//! `level.dat` are rewritten one batch after another.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use compendium_nbt::{NbtCompound, NbtFile, NbtTag};
use compendium_region::Region;
use compendium_remap::{ContentAllocator, ContentHash, MappingTable, RemapSession, RemapStats};
use tracing::{debug, info, warn};

use crate::error::{FileError, RunError};
use crate::fsutil;

const DATA_DIR: &str = "data";
const ID_COUNTS: &str = "idcounts.dat";
const LEVEL_DAT: &str = "level.dat";
const PLAYER_DIRS: [&str; 2] = ["playerdata", "players"];

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub mapping: PathBuf,
    pub output: PathBuf,
    pub dump_ids: bool,
}

/// What a completed run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Source ids registered from this save's map definitions.
    pub maps_registered: usize,
    /// Content hashes added to the mapping table by this run.
    pub new_maps: usize,
    pub map_files: usize,
    pub region_files: usize,
    pub entity_files: usize,
    pub player_files: usize,
    pub level_files: usize,
    /// Distinct heuristic keys given a target id.
    pub inferred_keys: usize,
    pub stats: RemapStats,
    pub failures: Vec<(PathBuf, FileError)>,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The save has no usable map definitions; only the copy was made.
    NoMaps,
    Completed(RunSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MapDefinition {
    source: i32,
    path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionKind {
    Terrain,
    Entities,
}

pub fn run(options: &RunOptions) -> Result<RunOutcome, RunError> {
    if !options.input.is_dir() {
        return Err(RunError::MissingInput(options.input.clone()));
    }
    let data_dir = options.input.join(DATA_DIR);
    if !data_dir.is_dir() {
        return Err(RunError::MissingMapData(data_dir));
    }
    if fsutil::is_within(&options.input, &options.output) {
        return Err(RunError::OutputInsideInput {
            input: options.input.clone(),
            output: options.output.clone(),
        });
    }

    let mut summary = RunSummary::default();
    let definitions = list_map_definitions(&data_dir, &mut summary.failures)?;
    info!("Found {} maps in {}", definitions.len(), data_dir.display());

    info!(
        "Copying {} to {}",
        options.input.display(),
        options.output.display()
    );
    let copied = fsutil::copy_dir(&options.input, &options.output)
        .map_err(RunError::io(&options.output))?;
    debug!("Copied {copied} files");

    let table = MappingTable::load(&options.mapping)?;
    let known_before = table.len();
    let mut allocator = ContentAllocator::new(table);

    info!("Updating map hash database");
    let mut registered = Vec::with_capacity(definitions.len());
    for definition in &definitions {
        match register_definition(&mut allocator, definition) {
            Ok(target) => registered.push((definition, target)),
            Err(e) => {
                warn!("Skipping map definition {}: {e}", definition.path.display());
                summary.failures.push((definition.path.clone(), e));
            }
        }
    }

    if allocator.is_empty() {
        info!("No map data found in given directory. Exiting...");
        return Ok(RunOutcome::NoMaps);
    }

    summary.maps_registered = allocator.len();
    summary.new_maps = allocator.table().len() - known_before;
    allocator.table().save(&options.mapping)?;
    info!(
        "Generated {} map id mappings ({} new content hashes)",
        summary.maps_registered, summary.new_maps
    );

    relocate_map_files(&options.output, &registered, &mut summary)?;
    update_id_counter(&options.output, allocator.table(), &mut summary);

    let mut session = RemapSession::new(allocator);
    remap_regions(&mut session, &options.output, &mut summary)?;
    remap_players(&mut session, &options.output, &mut summary)?;
    remap_level(&mut session, &options.output, &mut summary);

    summary.inferred_keys = session.inference().allocations();
    let (_, stats) = session.into_parts();
    if options.dump_ids {
        stats
            .write_diagnostics(&options.output)
            .map_err(RunError::io(&options.output))?;
    }
    summary.stats = stats;

    Ok(RunOutcome::Completed(summary))
}

// ─── Map definitions ────────────────────────────────────────────────────────

/// Source id of a `map_<id>.dat` file name.
fn map_source_id(name: &str) -> Option<i32> {
    name.strip_prefix("map_")?.strip_suffix(".dat")?.parse().ok()
}

fn is_map_file(name: &str) -> bool {
    name.starts_with("map_") && name.ends_with(".dat")
}

fn list_map_definitions(
    data_dir: &Path,
    failures: &mut Vec<(PathBuf, FileError)>,
) -> Result<Vec<MapDefinition>, RunError> {
    let mut definitions = Vec::new();
    for entry in fs::read_dir(data_dir).map_err(RunError::io(data_dir))? {
        let entry = entry.map_err(RunError::io(data_dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_map_file(&name) {
            continue;
        }
        match map_source_id(&name) {
            Some(source) => definitions.push(MapDefinition {
                source,
                path: entry.path(),
            }),
            None => {
                warn!("Ignoring {name}: {}", FileError::BadMapName);
                failures.push((entry.path(), FileError::BadMapName));
            }
        }
    }
    definitions.sort_by_key(|d| d.source);
    Ok(definitions)
}

fn register_definition(
    allocator: &mut ContentAllocator,
    definition: &MapDefinition,
) -> Result<i32, FileError> {
    let file = NbtFile::load(&definition.path)?;
    let colors = file
        .root
        .compound
        .get("data")
        .and_then(NbtTag::as_compound)
        .and_then(|data| data.get("colors"))
        .and_then(NbtTag::as_byte_array)
        .ok_or(FileError::NoColors)?;
    let hash = ContentHash::of_colors(colors);
    Ok(allocator.register_allocation(hash, definition.source))
}

/// Replace the copied `map_<source>.dat` files with `map_<target>.dat`.
fn relocate_map_files(
    output: &Path,
    registered: &[(&MapDefinition, i32)],
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    let data_dir = output.join(DATA_DIR);
    for entry in fs::read_dir(&data_dir).map_err(RunError::io(&data_dir))? {
        let entry = entry.map_err(RunError::io(&data_dir))?;
        if is_map_file(&entry.file_name().to_string_lossy()) {
            fs::remove_file(entry.path()).map_err(RunError::io(entry.path()))?;
        }
    }

    let mut written = BTreeSet::new();
    for (definition, target) in registered {
        let dest = data_dir.join(format!("map_{target}.dat"));
        match fs::copy(&definition.path, &dest) {
            Ok(_) => {
                written.insert(*target);
            }
            Err(e) => summary.failures.push((dest, e.into())),
        }
    }
    summary.map_files = written.len();
    info!("Remapped {} map files", summary.map_files);
    Ok(())
}

/// Raise the game's next-map-id counter above every target id in use.
fn update_id_counter(output: &Path, table: &MappingTable, summary: &mut RunSummary) {
    let path = output.join(DATA_DIR).join(ID_COUNTS);
    let Some(max) = table.max_target_id() else {
        return;
    };
    if !path.is_file() {
        return;
    }
    if let Err(e) = raise_id_counter(&path, max) {
        warn!("Could not update {}: {e}", path.display());
        summary.failures.push((path, e));
    }
}

fn raise_id_counter(path: &Path, max: i32) -> Result<(), FileError> {
    let mut file = NbtFile::load(path)?;
    // 1.13+ nests the counters under `data`; older files keep them at the root.
    let nested = matches!(file.root.compound.get("data"), Some(NbtTag::Compound(_)));
    let counters = if nested {
        file.root.compound.get_mut("data").and_then(NbtTag::as_compound_mut)
    } else {
        Some(&mut file.root.compound)
    };
    let Some(counters) = counters else {
        return Ok(());
    };
    let raised = match counters.get("map") {
        Some(NbtTag::Int(v)) if *v >= max => return Ok(()),
        Some(NbtTag::Short(v)) if i32::from(*v) >= max => return Ok(()),
        Some(NbtTag::Short(_)) => match i16::try_from(max) {
            Ok(short) => NbtTag::Short(short),
            Err(_) => NbtTag::Int(max),
        },
        _ => NbtTag::Int(max),
    };
    debug!("Raising map id counter to {max}");
    counters.insert("map".into(), raised);
    file.save(path)?;
    Ok(())
}

// ─── Save files ─────────────────────────────────────────────────────────────

fn region_kind(path: &Path) -> Option<RegionKind> {
    match path.parent()?.file_name()?.to_str()? {
        "region" => Some(RegionKind::Terrain),
        "entities" => Some(RegionKind::Entities),
        _ => None,
    }
}

fn remap_regions(
    session: &mut RemapSession,
    output: &Path,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    let files = fsutil::find_files(output, &|p: &Path| {
        p.extension().is_some_and(|e| e == "mca") && region_kind(p).is_some()
    })
    .map_err(RunError::io(output))?;
    info!("Found {} region files", files.len());

    for path in files {
        let Some(kind) = region_kind(&path) else {
            continue;
        };
        if fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(false) {
            debug!("Skipping empty {}", path.display());
            continue;
        }
        match remap_region_file(session, &path, kind) {
            Ok(chunks) => {
                debug!("Remapped {chunks} chunks in {}", path.display());
                match kind {
                    RegionKind::Terrain => summary.region_files += 1,
                    RegionKind::Entities => summary.entity_files += 1,
                }
            }
            Err(e) => {
                warn!("Failed to remap {}: {e}", path.display());
                summary.failures.push((path, e));
            }
        }
    }
    info!(
        "Remapped map data of {} region files and {} entity files",
        summary.region_files, summary.entity_files
    );
    Ok(())
}

fn remap_region_file(
    session: &mut RemapSession,
    path: &Path,
    kind: RegionKind,
) -> Result<usize, FileError> {
    let mut region = Region::load(path)?;
    let mut chunks = 0;
    for chunk in region.chunks_mut() {
        let Some(root) = chunk.nbt_mut() else {
            continue;
        };
        match kind {
            RegionKind::Terrain => session.remap_chunk(&mut root.compound),
            RegionKind::Entities => session.remap_entity_chunk(&mut root.compound),
        };
        chunks += 1;
    }
    region.save(path)?;
    Ok(chunks)
}

fn remap_players(
    session: &mut RemapSession,
    output: &Path,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    for dir in PLAYER_DIRS.map(|d| output.join(d)) {
        if !dir.is_dir() {
            continue;
        }
        let files = fsutil::find_files(&dir, &|p: &Path| p.extension().is_some_and(|e| e == "dat"))
            .map_err(RunError::io(&dir))?;
        for path in files {
            match remap_nbt_file(&path, |root| session.remap_player(root)) {
                Ok(()) => summary.player_files += 1,
                Err(e) => {
                    warn!("Failed to remap {}: {e}", path.display());
                    summary.failures.push((path, e));
                }
            }
        }
    }
    info!("Remapped map data of {} player data files", summary.player_files);
    Ok(())
}

fn remap_level(session: &mut RemapSession, output: &Path, summary: &mut RunSummary) {
    let path = output.join(LEVEL_DAT);
    if !path.is_file() {
        return;
    }
    match remap_nbt_file(&path, |root| session.remap_level(root)) {
        Ok(()) => {
            summary.level_files += 1;
            info!("Remapped map data of level.dat");
        }
        Err(e) => {
            warn!("Failed to remap {}: {e}", path.display());
            summary.failures.push((path, e));
        }
    }
}

/// Load an NBT file, modify its root and write it back with its original compression.
fn remap_nbt_file(
    path: &Path,
    modify: impl FnOnce(&mut NbtCompound),
) -> Result<(), FileError> {
    let mut file = NbtFile::load(path)?;
    modify(&mut file.root.compound);
    file.save(path)?;
    Ok(())
}

impl RunSummary {
    pub fn log(&self, options: &RunOptions) {
        info!(
            "Successfully remapped {} map items from {} to {}",
            self.stats.remapped,
            options.input.display(),
            options.output.display()
        );
        info!(
            "Map definitions: {} registered, {} new, {} files written",
            self.maps_registered, self.new_maps, self.map_files
        );
        info!(
            "Files: {} region, {} entity, {} player, {} level",
            self.region_files, self.entity_files, self.player_files, self.level_files
        );
        info!(
            "Ids: {} passed through, {} not found, {} inferred ({} keys), {} unresolved, {} malformed",
            self.stats.passthrough,
            self.stats.not_found.len(),
            self.stats.inferred,
            self.inferred_keys,
            self.stats.unresolved,
            self.stats.anomalies
        );
        if options.dump_ids {
            info!(
                "Found ids logged to {}, missing ids to {}",
                options.output.join(compendium_remap::stats::FOUND_LOG).display(),
                options.output.join(compendium_remap::stats::NOT_FOUND_LOG).display()
            );
        }
        for (path, e) in &self.failures {
            warn!("Failed: {}: {e}", path.display());
        }
    }
}
