use std::{error::Error as _, fs, io, path::{Path, PathBuf}, process::ExitCode};

use unidata_compact::{compile, CompileError, CompileSummary, Field};
use unidata_logging::{log_info, log_severe, log_warning, set_logger, LogCategory, Logger};
use unidata_ucd::{collect, UcdError};

mod settings;
use settings::{Settings, SETTINGS_FILE};

pub const LOG_CAT : LogCategory = LogCategory::new("Main");

static LOGGER : Logger = Logger::new();

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("failed to read '{}'", .path.display())]
    ReadSettings { path: PathBuf, #[source] source: io::Error },
    #[error("invalid settings in '{}'", .path.display())]
    InvalidSettings { path: PathBuf },
    #[error("failed to create log file '{}'", .path.display())]
    LogFile { path: PathBuf, #[source] source: io::Error },
    #[error(transparent)]
    Collect(#[from] UcdError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

fn main() -> ExitCode {
    set_logger(&LOGGER);

    let res = load_settings(Path::new(SETTINGS_FILE))
        .and_then(|settings| {
            setup_logging(&settings)?;
            run(&settings)
        });

    let code = match res {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            let mut msg = err.to_string();
            let mut source = err.source();
            while let Some(err) = source {
                msg.push_str(&format!(": {err}"));
                source = err.source();
            }
            log_severe!(LOG_CAT, main, "{msg}");
            ExitCode::FAILURE
        }
    };
    LOGGER.flush();
    code
}

/// Load the settings file, a missing file gives the default settings
fn load_settings(path: &Path) -> Result<Settings, RunError> {
    let toml = match fs::read_to_string(path) {
        Ok(toml) => toml,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log_info!(LOG_CAT, "No '{}' found, using default settings", path.display());
            return Ok(Settings::default());
        },
        Err(source) => return Err(RunError::ReadSettings { path: path.to_path_buf(), source }),
    };
    Settings::load(&toml).ok_or_else(|| RunError::InvalidSettings { path: path.to_path_buf() })
}

fn setup_logging(settings: &Settings) -> Result<(), RunError> {
    LOGGER.set_max_level(settings.log_level);
    LOGGER.set_always_flush(settings.always_flush);

    if let Some(path) = &settings.log_file {
        let file = fs::File::create(path).map_err(|source| RunError::LogFile { path: path.clone(), source })?;
        if LOGGER.add_writer(Box::new(io::BufWriter::new(file))).is_err() {
            log_warning!(LOG_CAT, "No writer slot left for '{}', logging to console only", path.display());
        }
    }
    Ok(())
}

fn run(settings: &Settings) -> Result<CompileSummary, RunError> {
    log_info!(LOG_CAT, "Reading UCD files from '{}'", settings.data_dir.display());
    let records = collect(&settings.data_dir)?;

    let summary = compile(&records, &settings.output)?;
    for (field, populated) in Field::ALL.iter().zip(summary.populated) {
        log_info!(LOG_CAT, "{field:>5}: {populated} codepoints");
    }
    log_info!(LOG_CAT, "{} strings, {} flagged codepoints, {} files written", summary.strings, summary.flagged, summary.files.len());
    Ok(summary)
}
