use std::{collections::HashMap, path::{Path, PathBuf}};

use unidata_compact::RecordSet;
use unidata_logging::{LogCategory, log_info, log_verbose, log_warning};
use unidata_parser_utils::ucd::for_each_data_line;

use crate::{parsers, Interner, Result, UcdError};

const LOG_CAT : LogCategory = LogCategory::new("UCD");

pub const PROPERTY_VALUE_ALIASES : &str = "PropertyValueAliases.txt";
pub const UNICODE_DATA           : &str = "UnicodeData.txt";
pub const BLOCKS                 : &str = "Blocks.txt";
pub const DERIVED_AGE            : &str = "DerivedAge.txt";
pub const NAME_ALIASES           : &str = "NameAliases.txt";
pub const UNIHAN_READINGS        : &str = "Unihan_Readings.txt";
pub const EMOJI_DATA             : &str = "emoji-data.txt";

/// Why a line was skipped
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Malformed(pub &'static str);

pub(crate) type LineResult = core::result::Result<(), Malformed>;

/// Line counts of a processed file
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FileReport {
    pub file      : &'static str,
    /// Lines which were not empty or a comment
    pub lines     : usize,
    pub malformed : usize,
}

/// Builds a [`RecordSet`] by processing the UCD files one after the other
pub struct Collector {
    data_dir : PathBuf,
    pub(crate) records  : RecordSet,
    pub(crate) interner : Interner,
    /// General category short code to long name
    pub(crate) gc_names : HashMap<String, String>,
    pub(crate) state    : ParseState,
    reports  : Vec<FileReport>,
}

/// State carried between lines of a single file
#[derive(Default)]
pub(crate) struct ParseState {
    /// Start of an open `<..., First>` range in UnicodeData.txt
    pub range_start : Option<u32>,
    /// Short codes without a long name, already warned about
    pub unknown_gc  : Vec<String>,
}

impl Collector {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            records: RecordSet::new(),
            interner: Interner::new(),
            gc_names: HashMap::new(),
            state: ParseState::default(),
            reports: Vec::new(),
        }
    }

    /// Process every file, in order
    pub fn run(&mut self) -> Result<()> {
        self.process(PROPERTY_VALUE_ALIASES, parsers::property_value_alias)?;
        self.process(UNICODE_DATA, parsers::unicode_data)?;
        self.process(BLOCKS, parsers::block)?;
        self.process(DERIVED_AGE, parsers::derived_age)?;
        self.process(NAME_ALIASES, parsers::name_alias)?;
        self.process(UNIHAN_READINGS, parsers::unihan_reading)?;
        self.process(EMOJI_DATA, parsers::emoji_data)?;

        log_info!(LOG_CAT, "Collected {} codepoints, {} distinct values", self.records.assigned(), self.interner.len());
        Ok(())
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Reports of the files processed so far
    pub fn reports(&self) -> &[FileReport] {
        &self.reports
    }

    pub fn finish(self) -> RecordSet {
        self.records
    }

    /// Process a single file, calling `parse_line` for every data line
    pub(crate) fn process<F>(&mut self, file: &'static str, mut parse_line: F) -> Result<FileReport>
    where
        F: FnMut(&mut Self, &str) -> LineResult
    {
        log_info!(LOG_CAT, "Processing {file} ...");

        let path = self.data_dir.join(file);
        self.state = ParseState::default();

        let mut report = FileReport { file, lines: 0, malformed: 0 };
        for_each_data_line(&path, |line_nr, line| {
            report.lines += 1;
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    report.malformed += 1;
                    log_verbose!(LOG_CAT, "{file}:{line_nr}: invalid UTF-8 ({err}), skipping line");
                    return;
                }
            };
            if let Err(Malformed(reason)) = parse_line(self, line) {
                report.malformed += 1;
                log_verbose!(LOG_CAT, "{file}:{line_nr}: {reason}, skipping '{line}'");
            }
        }).map_err(|source| UcdError::Io { path, source })?;

        if let Some(start) = self.state.range_start {
            log_warning!(LOG_CAT, "{file}: range starting at U+{start:04X} was never closed");
        }
        if report.malformed != 0 {
            log_warning!(LOG_CAT, "{file}: skipped {} malformed lines", report.malformed);
        }

        self.reports.push(report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use unidata_compact::{Field, FlagBits};
    use crate::{collect, UCD_FILES};
    use super::*;

    const ALIASES : &str = "\
# PropertyValueAliases-15.0.0.txt
bc ; L                                ; Left_To_Right
gc ; Lu                               ; Uppercase_Letter
gc ; Lo                               ; Other_Letter
gc ; Mn                               ; Nonspacing_Mark
gc ; Zs                               ; Space_Separator
gc ; Cc                               ; Control
gc ; C                                ; Other                            # Cc | Cf | Cn | Co | Cs
";

    const UNICODE_DATA_TXT : &str = "\
0000;<control>;Cc;0;BN;;;;;N;NULL;;;;
0020;SPACE;Zs;0;WS;;;;;N;;;;;
0041;LATIN CAPITAL LETTER A;Lu;0;L;;;;;N;;;;0061;
0300;COMBINING GRAVE ACCENT;Mn;230;NSM;;;;;N;NON-SPACING GRAVE;;;;
01A2;LATIN CAPITAL LETTER OI;Lu;0;L;;;;;N;LATIN CAPITAL LETTER O I;;;01A3;
3400;<CJK Ideograph Extension A, First>;Lo;0;L;;;;;N;;;;;
4DBF;<CJK Ideograph Extension A, Last>;Lo;0;L;;;;;N;;;;;
E000;<Private Use, Last>;Co;0;L;;;;;N;;;;;
ZZZZ;BROKEN;Lu;0;L;;;;;N;;;;;
0042
";

    const BLOCKS_TXT : &str = "\
# Blocks-15.0.0.txt
0000..007F; Basic Latin
0300..036F; Combining Diacritical Marks
3400..4DBF; CJK Unified Ideographs Extension A
0080..007F; Reversed
";

    const DERIVED_AGE_TXT : &str = "\
0000..001F    ; 1.1 #  [32] <control-0000>..<control-001F>
0041          ; 1.1 #       LATIN CAPITAL LETTER A
3400..4DB5    ; 3.0 # [6582] CJK UNIFIED IDEOGRAPH-3400..CJK UNIFIED IDEOGRAPH-4DB5
1F600         ; 6.1 #       GRINNING FACE
110000        ; 9.9
";

    const NAME_ALIASES_TXT : &str = "\
0000;NULL;control
0000;NUL;abbreviation
01A2;LATIN CAPITAL LETTER GHA;correction
01A2;LATIN CAPITAL LETTER OI;figment
0020;SP;abbreviation
";

    const UNIHAN_TXT : &str = "\
# Unihan_Readings.txt
U+3400\tkDefinition\t(same as U+4E18 丘) hillock or mound
U+3400\tkMandarin\tqiū
U+3401\tkCantonese\ttim2
U+3402
X+3403\tkMandarin\txx
";

    const EMOJI_TXT : &str = "\
1F600         ; Emoji                # E1.0   [1] (😀)       grinning face
1F600..1F601  ; Emoji_Presentation   # E1.0   [2] (😀..😁)    grinning face..beaming face with smiling eyes
0023          ; Emoji_Component      # E0.0   [1] (#️)       hash sign
";

    fn write_fixtures(dir: &Path) {
        let contents = [ALIASES, UNICODE_DATA_TXT, BLOCKS_TXT, DERIVED_AGE_TXT, NAME_ALIASES_TXT, UNIHAN_TXT, EMOJI_TXT];
        for (file, content) in UCD_FILES.iter().zip(contents) {
            fs::write(dir.join(file), content).unwrap();
        }
    }

    #[test]
    fn collects_every_file() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let records = collect(dir.path()).unwrap();

        let a = records.get(0x41).unwrap();
        assert_eq!(a.get(Field::Name), Some("LATIN CAPITAL LETTER A"));
        assert_eq!(a.get(Field::GeneralCategory), Some("Uppercase Letter (Lu)"));
        assert_eq!(a.get(Field::Block), Some("Basic Latin"));
        assert_eq!(a.get(Field::Age), Some("Unicode 1.1"));
        assert_eq!(a.get(Field::MandarinReading), None);
        assert_eq!(a.flags, FlagBits::none());

        let space = records.get(0x20).unwrap();
        assert_eq!(space.get(Field::GeneralCategory), Some("Space Separator (Zs)"));
        assert_eq!(space.flags, FlagBits::SpaceSeparator);

        let grave = records.get(0x300).unwrap();
        assert_eq!(grave.get(Field::GeneralCategory), Some("Nonspacing Mark (Mn)"));
        assert_eq!(grave.get(Field::Block), Some("Combining Diacritical Marks"));
        assert_eq!(grave.flags, FlagBits::AnyMark);

        assert_eq!(records.get(0x1F600).unwrap().get(Field::Age), Some("Unicode 6.1"));
        assert_eq!(records.populated(Field::Block), 0x80 + 0x70 + 0x19C0);
    }

    #[test]
    fn control_and_correction_aliases_replace_names() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let records = collect(dir.path()).unwrap();

        // `<control>` itself is not a name
        assert_eq!(records.get(0x00).unwrap().get(Field::Name), Some("NULL"));
        assert_eq!(records.get(0x01A2).unwrap().get(Field::Name), Some("LATIN CAPITAL LETTER GHA"));
        assert_eq!(records.get(0x20).unwrap().get(Field::Name), Some("SPACE"));
        assert_eq!(records.get(0x00).unwrap().get(Field::GeneralCategory), Some("Control (Cc)"));
    }

    #[test]
    fn first_last_ranges_are_expanded() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let records = collect(dir.path()).unwrap();

        for cp in [0x3400, 0x3401, 0x4000, 0x4DBF] {
            assert_eq!(records.get(cp).unwrap().get(Field::GeneralCategory), Some("Other Letter (Lo)"));
        }
        assert_eq!(records.get(0x4DC0).unwrap().get(Field::GeneralCategory), None);
        assert_eq!(records.get(0x3401).unwrap().get(Field::Name), None);
        assert_eq!(records.get(0x4DB5).unwrap().get(Field::Age), Some("Unicode 3.0"));
        assert_eq!(records.get(0x4DB6).unwrap().get(Field::Age), None);

        // A `Last` without a `First` is skipped
        assert!(records.get(0xE000).unwrap().is_empty());
    }

    #[test]
    fn unihan_definition_replaces_name() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let records = collect(dir.path()).unwrap();

        let ideograph = records.get(0x3400).unwrap();
        assert_eq!(ideograph.get(Field::Name), Some("(same as U+4E18 丘) hillock or mound"));
        assert_eq!(ideograph.get(Field::MandarinReading), Some("qiū"));
        assert_eq!(ideograph.flags, FlagBits::KDefinitionExists);
        assert!(records.get(0x3401).unwrap().get(Field::MandarinReading).is_none());
    }

    #[test]
    fn emoji_presentation_sets_flag() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let records = collect(dir.path()).unwrap();

        assert_eq!(records.get(0x1F600).unwrap().flags, FlagBits::EmojiPresentation);
        assert_eq!(records.get(0x1F601).unwrap().flags, FlagBits::EmojiPresentation);
        assert_eq!(records.get(0x23).unwrap().flags, FlagBits::none());
        assert_eq!(records.flagged(FlagBits::EmojiPresentation), 2);
    }

    #[test]
    fn malformed_lines_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let mut collector = Collector::new(dir.path());
        collector.run().unwrap();

        let malformed = collector.reports()
            .iter()
            .map(|report| (report.file, report.malformed))
            .collect::<Vec<_>>();
        assert_eq!(malformed, [
            (PROPERTY_VALUE_ALIASES, 0),
            (UNICODE_DATA, 3),
            (BLOCKS, 1),
            (DERIVED_AGE, 1),
            (NAME_ALIASES, 0),
            (UNIHAN_READINGS, 2),
            (EMOJI_DATA, 0),
        ]);
        assert_eq!(collector.reports()[1].lines, 10);
    }

    #[test]
    fn nested_range_start_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        fs::write(dir.path().join(UNICODE_DATA), "\
3400;<CJK Ideograph Extension A, First>;Lo;0;L;;;;;N;;;;;
AC00;<Hangul Syllable, First>;Lo;0;L;;;;;N;;;;;
D7A3;<Hangul Syllable, Last>;Lo;0;L;;;;;N;;;;;
4E00;<CJK Ideograph, First>;Lo;0;L;;;;;N;;;;;
9FFF;<CJK Ideograph, Last>;Lo;0;L;;;;;N;;;;;
").unwrap();

        let mut collector = Collector::new(dir.path());
        collector.run().unwrap();
        assert_eq!(collector.reports()[1].malformed, 2);

        let records = collector.records();
        for cp in [0x3401, 0x4DBF, 0xAC00, 0xAC01, 0xD7A3] {
            assert_eq!(records.get(cp).unwrap().get(Field::GeneralCategory), None);
        }
        // `3400` itself is assigned before the range is interrupted
        assert_eq!(records.get(0x3400).unwrap().get(Field::GeneralCategory), Some("Other Letter (Lo)"));
        assert_eq!(records.get(0x4E01).unwrap().get(Field::GeneralCategory), Some("Other Letter (Lo)"));
        assert_eq!(records.get(0x9FFF).unwrap().get(Field::GeneralCategory), Some("Other Letter (Lo)"));
    }

    #[test]
    fn invalid_utf8_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        fs::write(dir.path().join(UNIHAN_READINGS), b"U+3400\tkMandarin\tqi\xC5\xAB\nU+3401\tkMandarin\t\xFF\xFE\nU+3402\tkMandarin\txi\n").unwrap();

        let mut collector = Collector::new(dir.path());
        collector.run().unwrap();

        let report = collector.reports()[5];
        assert_eq!(report.file, UNIHAN_READINGS);
        assert_eq!((report.lines, report.malformed), (3, 1));

        let records = collector.records();
        assert_eq!(records.get(0x3400).unwrap().get(Field::MandarinReading), Some("qi\u{16B}"));
        assert_eq!(records.get(0x3401).unwrap().get(Field::MandarinReading), None);
        assert_eq!(records.get(0x3402).unwrap().get(Field::MandarinReading), Some("xi"));
    }

    #[test]
    fn unknown_category_falls_back_to_short_code() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        fs::write(dir.path().join(PROPERTY_VALUE_ALIASES), "").unwrap();
        let records = collect(dir.path()).unwrap();

        assert_eq!(records.get(0x41).unwrap().get(Field::GeneralCategory), Some("Lu"));
        assert_eq!(records.get(0x20).unwrap().flags, FlagBits::SpaceSeparator);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        fs::remove_file(dir.path().join(BLOCKS)).unwrap();

        match collect(dir.path()) {
            Err(UcdError::Io { path, .. }) => assert_eq!(path, dir.path().join(BLOCKS)),
            Ok(_) => panic!("expected an error for the missing file"),
        }
    }
}
