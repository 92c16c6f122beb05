use crate::errors::EbmError;
use anyhow::anyhow;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::{self, File};
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub trait Output: Debug {
    /// Fail before any calculation when results for these keys could not be written.
    fn check_writable(&self, _location_keys: &[&str]) -> Result<(), EbmError> {
        Ok(())
    }
    fn writer_for_location_key(&self, location_key: &str) -> Result<impl Write, EbmError>;
    /// Whether this output can be considered a no-op and therefore that any code that only writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Writes each location key to its own file in `directory_path`, named by `file_template`.
#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
    overwrite: bool,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String, overwrite: bool) -> Self {
        Self {
            directory_path,
            file_template,
            overwrite,
        }
    }

    fn path_for(&self, location_key: &str) -> Result<PathBuf, EbmError> {
        let file_name = formatx!(&self.file_template, location_key)
            .map_err(|err| anyhow!("invalid output file template: {err:?}"))?;
        Ok(self.directory_path.join(file_name))
    }
}

impl Output for FileOutput {
    fn check_writable(&self, location_keys: &[&str]) -> Result<(), EbmError> {
        fs::create_dir_all(&self.directory_path)
            .map_err(|err| EbmError::OutputNotWritable(self.directory_path.clone(), err))?;
        let metadata = fs::metadata(&self.directory_path)
            .map_err(|err| EbmError::OutputNotWritable(self.directory_path.clone(), err))?;
        if metadata.permissions().readonly() {
            return Err(EbmError::OutputNotWritable(
                self.directory_path.clone(),
                io::Error::new(io::ErrorKind::PermissionDenied, "directory is read-only"),
            ));
        }

        if !self.overwrite {
            for location_key in location_keys {
                let path = self.path_for(location_key)?;
                if path.exists() {
                    return Err(EbmError::OutputExists(path));
                }
            }
        }
        Ok(())
    }

    fn writer_for_location_key(&self, location_key: &str) -> Result<impl Write, EbmError> {
        let path = self.path_for(location_key)?;
        let file = File::create(&path).map_err(|err| EbmError::OutputNotWritable(path, err))?;
        Ok(BufWriter::new(file))
    }
}

impl Output for &FileOutput {
    fn check_writable(&self, location_keys: &[&str]) -> Result<(), EbmError> {
        <FileOutput as Output>::check_writable(self, location_keys)
    }

    fn writer_for_location_key(&self, location_key: &str) -> Result<impl Write, EbmError> {
        <FileOutput as Output>::writer_for_location_key(self, location_key)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> Result<impl Write, EbmError> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::tempdir;

    const TEMPLATE: &str = "{}.csv";

    #[rstest]
    fn should_write_file_named_by_template() {
        let dir = tempdir().unwrap();
        let output = FileOutput::new(dir.path().to_path_buf(), TEMPLATE.to_string(), false);
        {
            let mut writer = output.writer_for_location_key("area").unwrap();
            writer.write_all(b"year\n2020\n").unwrap();
        }
        assert_eq!(
            fs::read_to_string(dir.path().join("area.csv")).unwrap(),
            "year\n2020\n"
        );
    }

    #[rstest]
    fn should_create_missing_output_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("results").join("2050");
        let output = FileOutput::new(nested.clone(), TEMPLATE.to_string(), false);
        output.check_writable(&["area"]).unwrap();
        assert!(nested.is_dir());
    }

    #[rstest]
    #[case(false, true)]
    #[case(true, false)]
    fn should_protect_existing_files_unless_overwriting(
        #[case] overwrite: bool,
        #[case] expect_error: bool,
    ) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("energy_use.csv"), "").unwrap();
        let output = FileOutput::new(dir.path().to_path_buf(), TEMPLATE.to_string(), overwrite);

        let result = output.check_writable(&["area", "energy_use"]);
        assert_eq!(
            matches!(result, Err(EbmError::OutputExists(ref path)) if path.ends_with("energy_use.csv")),
            expect_error
        );
    }

    #[rstest]
    fn should_fail_when_output_location_is_a_file() {
        let dir = tempdir().unwrap();
        let blocking_file = dir.path().join("output");
        fs::write(&blocking_file, "").unwrap();
        let output = FileOutput::new(blocking_file, TEMPLATE.to_string(), false);

        let error = output.check_writable(&["area"]).unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn should_discard_everything_in_sink() {
        let mut writer = SinkOutput.writer_for_location_key("area").unwrap();
        writer.write_all(b"ignored").unwrap();
        assert!(SinkOutput.is_noop());
    }
}
