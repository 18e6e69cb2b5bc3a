//! Program image loader
//!
//! An image is plain text with one byte per line written as binary digits.
//! Anything after a `#` is a comment; blank and comment-only lines are skipped.
//!
//! ```text
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 00000001 # HLT
//! ```

use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::error::LoadError;
use crate::runtime::machine::RAM_SIZE;

pub fn parse_image(src: &str) -> Result<Vec<u8>, LoadError> {
    let mut image = Vec::new();

    for (i, line) in src.lines().enumerate() {
        let code = line.split('#').next().unwrap_or_default().trim();
        if code.is_empty() {
            continue;
        }

        let valid = code.len() <= 8 && code.chars().all(|c| c == '0' || c == '1');
        let byte = u8::from_str_radix(code, 2)
            .ok()
            .filter(|_| valid)
            .ok_or_else(|| LoadError::InvalidLine {
                line: i + 1,
                text: code.to_string(),
            })?;

        image.push(byte);
    }

    if image.len() > RAM_SIZE {
        return Err(LoadError::TooLarge { len: image.len() });
    }

    Ok(image)
}

pub fn load_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    let src = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let image = parse_image(&src)?;
    debug!("loader: {} bytes from {}", image.len(), path.display());

    Ok(image)
}
