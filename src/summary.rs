use std::{
    fmt::{self, Display},
    fs,
};

use formats::detect::{FileFormat, detect_file};
use log::{debug, warn};

use crate::{GeneratorConfig, fixtures::EXPECTED_FILES};

/// What a run left in the output directory for one of the expected files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub file_name: &'static str,
    /// The file size in bytes, `None` if the file was not created.
    pub size: Option<u64>,
    pub format: Option<FileFormat>,
}

/// The manifest of the fixture files found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    entries: Vec<Entry>,
}

impl Summary {
    /// Looks up every expected fixture file, it never fails: unreadable files are reported as
    /// not created.
    pub fn collect(config: &GeneratorConfig) -> Self {
        let entries = EXPECTED_FILES
            .iter()
            .map(|&file_name| {
                let path = config.path(file_name);
                let size = fs::metadata(&path).ok().map(|m| m.len());

                let format = match size {
                    Some(_) => detect_file(&path).unwrap_or_else(|e| {
                        warn!("could not read {}: {e}", path.display());
                        None
                    }),
                    None => None,
                };

                match format {
                    Some(format) => debug!("{file_name}: detected {format}"),
                    None if size.is_some() => debug!("{file_name}: unknown format"),
                    None => {}
                }

                Entry {
                    file_name,
                    size,
                    format,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn all_created(&self) -> bool {
        self.entries.iter().all(|e| e.size.is_some())
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Creation Summary:")?;
        writeln!(f, "==========================")?;

        for entry in &self.entries {
            match entry.size {
                Some(size) => writeln!(f, "{} ({size} bytes)", entry.file_name)?,
                None => writeln!(f, "{} (not created)", entry.file_name)?,
            }
        }

        Ok(())
    }
}
