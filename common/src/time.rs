use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::config::aggregate::SECONDS_PER_OFFSET;

pub type Epoch = u64;

pub fn epoch() -> Result<Epoch> {
    Ok(SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .context("invalid system time")?
        .as_secs())
}

/// Window length in seconds for an offset given in minutes.
pub const fn offset_seconds(offset: u32) -> Epoch {
    offset as Epoch * SECONDS_PER_OFFSET
}
