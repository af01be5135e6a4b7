use std::path::{Path, PathBuf};

use unidata_logging::{LogCategory, log_info, log_verbose};

use crate::{
    encode, pack, CompileError, CompiledData, Field, FlagBits, OutputLayout, OutputSet, RecordSet, Result, StringTable,
};

const LOG_CAT : LogCategory = LogCategory::new("Compact");

/// Where and how the outputs are written
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OutputSettings {
    /// Output directory, created if missing
    pub out_dir     : PathBuf,
    /// Prefix of every output file name
    pub file_prefix : String,
    /// Read the outputs back and compare them with the records before publishing them
    pub verify      : bool,
}

impl OutputSettings {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.out_dir, &*self.file_prefix)
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            file_prefix: OutputLayout::DEFAULT_PREFIX.to_string(),
            verify: true,
        }
    }
}

/// Statistics of a finished compilation
#[derive(Clone, Debug)]
pub struct CompileSummary {
    /// Number of strings in the string table
    pub strings   : usize,
    /// Number of codepoints with a value, per field in [`Field::ALL`] order
    pub populated : [usize; Field::COUNT],
    /// Number of codepoints with any flag set
    pub flagged   : usize,
    /// Whether the outputs were read back before publishing
    pub verified  : bool,
    /// Published files
    pub files     : Vec<PathBuf>,
}

/// Compile `records` into the output files.
///
/// Every output is staged first, the files only replace existing outputs once all of them were written (and verified,
/// if enabled). On error the outputs of the previous run are left as they were.
pub fn compile(records: &RecordSet, settings: &OutputSettings) -> Result<CompileSummary> {
    log_info!(LOG_CAT, "Building string table ...");
    let table = StringTable::build(records, &Field::ALL)?;
    log_info!(LOG_CAT, "String table holds {} distinct strings", table.len());

    let mut outputs = OutputSet::new(settings.layout())?;
    outputs.stage_string_table(&table)?;

    let mut populated = [0; Field::COUNT];
    for field in Field::ALL {
        log_info!(LOG_CAT, "Encoding field '{field}' ...");
        let stream = encode(records, field, &table)?;
        populated[field.index()] = stream.present();
        log_verbose!(LOG_CAT, "{} codepoints have a value for '{field}'", stream.present());
        outputs.stage_field(&stream)?;
    }

    log_info!(LOG_CAT, "Packing flag bits ...");
    let bits = pack(records);
    let flagged = records.iter().filter(|(_, record)| record.flags.is_any()).count();
    for (name, flag) in FlagBits::FLAGS {
        log_verbose!(LOG_CAT, "{} codepoints are flagged '{name}'", records.flagged(flag));
    }
    outputs.stage_bits(&bits)?;

    if settings.verify {
        log_info!(LOG_CAT, "Verifying staged outputs ...");
        let layout = outputs.layout();
        let string_table = staged(&outputs, &layout.string_table_path())?;
        let mut fields: [PathBuf; Field::COUNT] = Default::default();
        for (path, field) in fields.iter_mut().zip(Field::ALL) {
            *path = staged(&outputs, &layout.field_path(field))?;
        }
        let bits = staged(&outputs, &layout.bits_path())?;

        CompiledData::load_files(&string_table, &fields, &bits)?.verify(records)?;
    }

    let files = outputs.commit()?;
    for file in &files {
        log_info!(LOG_CAT, "Wrote '{}'", file.display());
    }

    Ok(CompileSummary {
        strings: table.len(),
        populated,
        flagged,
        verified: settings.verify,
        files,
    })
}

fn staged(outputs: &OutputSet, target: &Path) -> Result<PathBuf> {
    outputs.staged_path(target)
        .map(Path::to_path_buf)
        .ok_or_else(|| CompileError::MalformedOutput { path: target.to_path_buf(), reason: "output was not staged".to_string() })
}
