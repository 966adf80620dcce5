use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use zstd::stream::AutoFinishEncoder;

const ZSTD_EXT: &str = "zst";

pub fn find_files(
    path: &Path,
    prefix: Option<&str>,
    postfix: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut files = vec![];

    for entry in path.read_dir().context("read_dir call failed")? {
        let entry = entry.context("invalid dir entry")?;

        // filter files
        if !entry.path().is_file() {
            log::debug!("{:?} not a file", entry);
            continue;
        }

        // filter by filename prefix/postfix
        if prefix.is_some() || postfix.is_some() {
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();

            // filter by prefix
            if let Some(prefix) = prefix {
                if !filename.starts_with(prefix) {
                    continue;
                }
            }

            // filter by postfix
            if let Some(postfix) = postfix {
                if !filename.ends_with(postfix) {
                    continue;
                }
            }
        }

        // add to files list
        files.push(entry.path());
    }

    // read_dir order is platform dependent
    files.sort();

    Ok(files)
}

/// File name without any extension, e.g. `kamailio` for `kamailio.csv.zst`.
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_owned))
        .filter(|stem| !stem.is_empty())
}

pub fn is_zstd(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == ZSTD_EXT)
}

pub fn bufreader(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .with_context(|| format!("Failed to open file {path:?}"))
        .map(BufReader::new)
}

pub fn decoder(path: &Path) -> Result<zstd::Decoder<'static, BufReader<File>>> {
    zstd::Decoder::new(File::open(path).with_context(|| format!("Failed to open file {path:?}"))?)
        .context("Failed to create zstd decoder")
}

pub fn bufwriter(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .with_context(|| format!("Failed to create file {path:?}"))
        .map(BufWriter::new)
}

pub fn encoder(path: &Path) -> Result<AutoFinishEncoder<'static, BufWriter<File>>> {
    zstd::Encoder::new(bufwriter(path)?, 0)
        .context("Failed to create zstd encoder")
        .map(|encoder| encoder.auto_finish())
}

/// Open `path` for reading, zstd-decoding it when it ends in `.zst`.
pub fn reader(path: &Path) -> Result<Box<dyn Read>> {
    Ok(if is_zstd(path) {
        Box::new(decoder(path)?)
    } else {
        Box::new(bufreader(path)?)
    })
}

/// Create `path` for writing, zstd-encoding it when it ends in `.zst`.
pub fn writer(path: &Path) -> Result<Box<dyn Write>> {
    Ok(if is_zstd(path) {
        Box::new(encoder(path)?)
    } else {
        Box::new(bufwriter(path)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zstd_files_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results.csv.zst");

        {
            let mut output = writer(&path)?;
            output.write_all(b"time,subject\n1,dnsmasq\n")?;
            output.flush()?;
        }

        let mut content = String::new();
        reader(&path)?.read_to_string(&mut content)?;
        assert_eq!(content, "time,subject\n1,dnsmasq\n");

        Ok(())
    }

    #[test]
    fn find_csv_files_sorted() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["lightftp.csv", "bftpd.csv", "notes.txt"] {
            File::create(dir.path().join(name))?;
        }

        let files = find_files(dir.path(), None, Some(".csv"))?;
        let names: Vec<_> = files.iter().filter_map(|path| file_stem(path)).collect();
        assert_eq!(names, vec!["bftpd", "lightftp"]);

        Ok(())
    }

    #[test]
    fn stem_strips_all_extensions() {
        assert_eq!(
            file_stem(Path::new("/data/kamailio.csv.zst")).as_deref(),
            Some("kamailio")
        );
        assert!(!is_zstd(Path::new("kamailio.csv")));
    }
}
