use std::cmp::Ordering;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub fn extract_zip<R: Read + Seek>(data: R, dest: &Path) -> anyhow::Result<()> {
    let mut archive = ZipArchive::new(data)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        // ZIP Slip protection: only entries that stay inside `dest`
        let file_path = match file.enclosed_name() {
            Some(path) => path.to_owned(),
            None => continue,
        };

        let outpath = dest.join(&file_path);

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)?;
        }
    }

    Ok(())
}

/// Human ordering: runs of digits compare by value, so `t2` < `t10`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chunks = Chunks::new(a);
    let mut b_chunks = Chunks::new(b);

    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x, y) {
                    (Chunk::Number(x), Chunk::Number(y)) => {
                        let (x_trim, y_trim) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
                        x_trim
                            .len()
                            .cmp(&y_trim.len())
                            .then_with(|| x_trim.cmp(y_trim))
                    }
                    (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
                    (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Chunk<'a> {
    Number(&'a str),
    Text(&'a str),
}

/// Splits a string into alternating digit and non-digit runs
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Number(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}
