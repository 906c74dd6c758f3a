//! Historical price source port trait.

use std::path::Path;

use crate::domain::config::DataFormat;
use crate::domain::error::ReplayError;
use crate::domain::tick::Tick;

pub trait DataPort {
    /// Read every row of `path` in the given layout. Rows come back in file
    /// order; sorting and de-duplication are left to the price store.
    fn load_ticks(&self, path: &Path, format: DataFormat) -> Result<Vec<Tick>, ReplayError>;
}
