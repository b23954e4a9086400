use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use brainpool_agent::BrainConfig;

use crate::model::checkpoint::Checkpoint;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::create(path),
            None => Ok(Output::Stdout {
                writer: io::stdout().lock(),
            }),
        }
    }

    fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer(&mut *self, value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self)
            .and_then(|()| self.flush())
            .with_context(|| format!("Failed to finish writing {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Reads a checkpoint and checks that its weights fit its sizes.
pub fn read_checkpoint_file<P>(path: P) -> anyhow::Result<Checkpoint>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let checkpoint: Checkpoint = read_json_file("checkpoint", path)?;
    checkpoint
        .validate()
        .with_context(|| format!("Invalid checkpoint: {}", path.display()))?;
    Ok(checkpoint)
}

/// Reads a configuration file, or returns the default configuration.
pub fn read_config_file(path: Option<&Path>) -> anyhow::Result<BrainConfig> {
    let config = match path {
        Some(path) => read_json_file("config", path)?,
        None => BrainConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
