//! JSON output files.
//!
//! The string table is written as a compact JSON array. Every stream is written as a single JSON string literal
//! with one `\uXXXX` escape per unit, without any separator, so it decodes to exactly one UTF-16 code unit per value.
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::{NamedTempFile, TempPath};
use unidata_logging::{LogCategory, log_error, log_verbose};

use crate::{CompileError, EncodedStream, Field, PackedBits, Result, StringTable};

const LOG_CAT : LogCategory = LogCategory::new_with_sub("Compact", "Serialize");

/// Size in bytes of a serialized stream of `units` units
pub const fn stream_len(units: usize) -> usize {
    2 + 6 * units
}

/// Write the string table as a JSON array of strings, without whitespace
pub fn write_string_table<W: Write>(writer: W, table: &StringTable) -> io::Result<()> {
    let strings = table.iter().collect::<Vec<_>>();
    serde_json::to_writer(writer, &strings)?;
    Ok(())
}

/// Write units as a JSON string made of uppercase `\uXXXX` escapes
pub fn write_units<W: Write>(mut writer: W, units: &[u16]) -> io::Result<()> {
    writer.write_all(b"\"")?;
    for unit in units {
        write!(writer, "\\u{unit:04X}")?;
    }
    writer.write_all(b"\"")
}

/// Names and location of the output files
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OutputLayout {
    dir    : PathBuf,
    prefix : String,
}

impl OutputLayout {
    pub const DEFAULT_PREFIX : &'static str = "data";

    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, prefix: S) -> Self {
        Self { dir: dir.into(), prefix: prefix.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<prefix>.string.json`
    pub fn string_table_path(&self) -> PathBuf {
        self.dir.join(format!("{}.string.json", self.prefix))
    }

    /// `<prefix>.<key>.json`
    pub fn field_path(&self, field: Field) -> PathBuf {
        self.dir.join(format!("{}.{}.json", self.prefix, field.key()))
    }

    /// `<prefix>.bits.json`
    pub fn bits_path(&self) -> PathBuf {
        self.dir.join(format!("{}.bits.json", self.prefix))
    }

    /// Every output file, string table first and packed bits last
    pub fn all_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(Field::COUNT + 2);
        paths.push(self.string_table_path());
        paths.extend(Field::ALL.iter().map(|&field| self.field_path(field)));
        paths.push(self.bits_path());
        paths
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new(".", Self::DEFAULT_PREFIX)
    }
}

struct StagedFile {
    temp   : NamedTempFile,
    target : PathBuf,
}

/// Output files which are written to temporary files next to their target, and only moved into place on `commit`.
///
/// Dropping an uncommitted set removes every staged file.
pub struct OutputSet {
    layout : OutputLayout,
    staged : Vec<StagedFile>,
}

impl OutputSet {
    /// Create an empty set, the output directory is created if it does not exist yet
    pub fn new(layout: OutputLayout) -> Result<Self> {
        fs::create_dir_all(layout.dir()).map_err(|source| CompileError::Write { path: layout.dir().to_path_buf(), source })?;
        Ok(Self { layout, staged: Vec::new() })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn stage_string_table(&mut self, table: &StringTable) -> Result<()> {
        let target = self.layout.string_table_path();
        self.stage(target, |writer| write_string_table(writer, table))
    }

    pub fn stage_field(&mut self, stream: &EncodedStream) -> Result<()> {
        let target = self.layout.field_path(stream.field());
        self.stage(target, |writer| write_units(writer, stream.units()))
    }

    pub fn stage_bits(&mut self, bits: &PackedBits) -> Result<()> {
        let target = self.layout.bits_path();
        self.stage(target, |writer| write_units(writer, bits.units()))
    }

    /// Get the temporary path a target is currently staged at
    pub fn staged_path(&self, target: &Path) -> Option<&Path> {
        self.staged.iter()
            .find(|staged| staged.target == target)
            .map(|staged| staged.temp.path())
    }

    /// Number of staged files
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Move all staged files to their targets, replacing existing files.
    ///
    /// Existing targets are moved aside first. If any file cannot be published, every target already replaced gets its
    /// previous file back, and targets which did not exist before are removed again.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let dir = self.layout.dir;
        let mut published = Vec::with_capacity(self.staged.len());
        for StagedFile { temp, target } in self.staged {
            match publish(&dir, temp, &target) {
                Ok(backup) => published.push(Published { target, backup }),
                Err(err) => {
                    roll_back(published);
                    return Err(err);
                }
            }
        }

        // Dropping the backups removes the previous files
        Ok(published.into_iter()
            .map(|Published { target, .. }| {
                log_verbose!(LOG_CAT, "Published '{}'", target.display());
                target
            })
            .collect())
    }

    fn stage<F>(&mut self, target: PathBuf, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>
    {
        let map_err = |source| CompileError::Write { path: target.clone(), source };

        let mut temp = tempfile::Builder::new()
            .prefix(".unidata-")
            .suffix(".tmp")
            .tempfile_in(self.layout.dir())
            .map_err(map_err)?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer).map_err(map_err)?;
            writer.flush().map_err(map_err)?;
        }

        log_verbose!(LOG_CAT, "Staged '{}' at '{}'", target.display(), temp.path().display());
        self.staged.retain(|staged| staged.target != target);
        self.staged.push(StagedFile { temp, target });
        Ok(())
    }
}

/// Published target, with the file it replaced
struct Published {
    target : PathBuf,
    backup : Option<TempPath>,
}

/// Move `target` aside if it exists, then move `temp` in its place
fn publish(dir: &Path, temp: NamedTempFile, target: &Path) -> Result<Option<TempPath>> {
    let map_err = |source| CompileError::Write { path: target.to_path_buf(), source };

    let backup = if fs::symlink_metadata(target).is_ok() {
        let backup = tempfile::Builder::new()
            .prefix(".unidata-")
            .suffix(".bak")
            .tempfile_in(dir)
            .map_err(map_err)?
            .into_temp_path();
        fs::rename(target, &backup).map_err(map_err)?;
        Some(backup)
    } else {
        None
    };

    match temp.persist(target) {
        Ok(_) => Ok(backup),
        Err(err) => {
            roll_back(vec![Published { target: target.to_path_buf(), backup }]);
            Err(map_err(err.error))
        },
    }
}

/// Undo `published`, last file first
fn roll_back(published: Vec<Published>) {
    for Published { target, backup } in published.into_iter().rev() {
        let res = match &backup {
            Some(backup) => fs::rename(backup, &target),
            None => match fs::remove_file(&target) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                res => res,
            },
        };

        match (res, backup) {
            (Ok(()), _) => log_verbose!(LOG_CAT, "Restored '{}'", target.display()),
            (Err(err), Some(backup)) => match backup.keep() {
                Ok(kept) => log_error!(LOG_CAT, roll_back, "Failed to restore '{}' ({err}), previous file kept at '{}'", target.display(), kept.display()),
                Err(_) => log_error!(LOG_CAT, roll_back, "Failed to restore '{}' ({err})", target.display()),
            },
            (Err(err), None) => log_error!(LOG_CAT, roll_back, "Failed to remove '{}' ({err})", target.display()),
        }
    }
}
