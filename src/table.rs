//! Dense Q-table stored as one flat row-major array over the concatenated
//! state and action shape.
//!
//! On disk a table is `QTBL`, a format version, the rank, every dimension and
//! then every value, all little-endian.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"QTBL";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    state_dims: Vec<usize>,
    action_dims: Vec<usize>,
    action_count: usize,
    values: Vec<f64>,
}

/// Row-major linear index of `coords` in a grid of shape `dims`.
fn ravel(dims: &[usize], coords: &[usize], what: &str) -> Result<usize> {
    if coords.len() != dims.len() {
        return Err(Error::domain(format!(
            "{what} must have {} components, got {} ({coords:?})",
            dims.len(),
            coords.len()
        )));
    }
    coords
        .iter()
        .zip(dims)
        .enumerate()
        .try_fold(0, |index, (i, (&c, &dim))| {
            if c >= dim {
                Err(Error::domain(format!(
                    "{what} component {i} must be below {dim}, got {c} ({coords:?})"
                )))
            } else {
                Ok(index * dim + c)
            }
        })
}

fn check_dims(dims: &[usize], what: &str) -> Result<()> {
    if dims.is_empty() || dims.contains(&0) {
        return Err(Error::configuration(format!(
            "{what} cardinalities must be non-empty and positive, got {dims:?}"
        )));
    }
    Ok(())
}

/// Number of cells in a grid of shape `dims`, or `None` if it overflows.
fn cell_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |count, &dim| count.checked_mul(dim))
}

impl ValueTable {
    pub fn new(state_dims: Vec<usize>, action_dims: Vec<usize>) -> Result<Self> {
        check_dims(&state_dims, "state")?;
        check_dims(&action_dims, "action")?;
        let action_count = cell_count(&action_dims);
        let len = cell_count(&state_dims)
            .zip(action_count)
            .and_then(|(states, actions)| states.checked_mul(actions));
        let (Some(action_count), Some(len)) = (action_count, len) else {
            return Err(Error::configuration(format!(
                "table of shape {state_dims:?} x {action_dims:?} is too large to address"
            )));
        };
        Ok(ValueTable {
            state_dims,
            action_dims,
            action_count,
            values: vec![0.0; len],
        })
    }

    pub fn state_dims(&self) -> &[usize] {
        &self.state_dims
    }

    pub fn action_dims(&self) -> &[usize] {
        &self.action_dims
    }

    /// Concatenated state and action shape.
    pub fn shape(&self) -> Vec<usize> {
        self.state_dims.iter().chain(&self.action_dims).copied().collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn state_index(&self, state: &[usize]) -> Result<usize> {
        ravel(&self.state_dims, state, "state")
    }

    pub fn action_index(&self, action: &[usize]) -> Result<usize> {
        ravel(&self.action_dims, action, "action")
    }

    /// Inverse of [`ValueTable::action_index`].
    pub fn action_at(&self, mut index: usize) -> Vec<usize> {
        let mut action = vec![0; self.action_dims.len()];
        for (slot, &dim) in action.iter_mut().zip(&self.action_dims).rev() {
            *slot = index % dim;
            index /= dim;
        }
        action
    }

    pub fn row(&self, state_index: usize) -> &[f64] {
        let start = state_index * self.action_count;
        &self.values[start..start + self.action_count]
    }

    pub fn get(&self, state_index: usize, action_index: usize) -> f64 {
        self.values[state_index * self.action_count + action_index]
    }

    pub fn set(&mut self, state_index: usize, action_index: usize, value: f64) {
        self.values[state_index * self.action_count + action_index] = value;
    }

    /// Index of the largest value in the row; the lowest index wins ties.
    pub fn best_action_index(&self, state_index: usize) -> usize {
        let row = self.row(state_index);
        let mut best = 0;
        for (i, &q) in row.iter().enumerate().skip(1) {
            if q > row[best] {
                best = i;
            }
        }
        best
    }

    pub fn max_value(&self, state_index: usize) -> f64 {
        self.row(state_index)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let shape = self.shape();
        let mut buf = Vec::with_capacity(12 + shape.len() * 8 + self.values.len() * 8);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(shape.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.state_dims.len() as u32).to_le_bytes());
        for dim in shape {
            buf.extend_from_slice(&(dim as u64).to_le_bytes());
        }
        for value in &self.values {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader { bytes, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(Error::MalformedTable("missing QTBL header".to_string()));
        }
        let version = reader.u32()?;
        if version != FORMAT_VERSION {
            return Err(Error::MalformedTable(format!(
                "unsupported format version {version}"
            )));
        }
        let rank = reader.u32()? as usize;
        let state_rank = reader.u32()? as usize;
        if state_rank == 0 || state_rank >= rank {
            return Err(Error::MalformedTable(format!(
                "state rank {state_rank} does not fit total rank {rank}"
            )));
        }
        if rank > reader.remaining() / 8 {
            return Err(Error::MalformedTable(format!(
                "rank {rank} exceeds the {} bytes left",
                reader.remaining()
            )));
        }
        let mut shape = Vec::with_capacity(rank);
        for _ in 0..rank {
            let dim = reader.u64()?;
            let dim = usize::try_from(dim)
                .map_err(|_| Error::MalformedTable(format!("dimension {dim} does not fit in memory")))?;
            shape.push(dim);
        }

        // size the payload against the file before allocating anything
        let payload = cell_count(&shape).and_then(|cells| cells.checked_mul(8));
        if payload != Some(reader.remaining()) {
            return Err(Error::MalformedTable(format!(
                "shape {shape:?} does not match the {} payload bytes",
                reader.remaining()
            )));
        }

        let action_dims = shape.split_off(state_rank);
        let mut table = ValueTable::new(shape, action_dims)
            .map_err(|e| Error::MalformedTable(e.to_string()))?;
        for value in table.values.iter_mut() {
            *value = f64::from_le_bytes(reader.array()?);
        }
        Ok(table)
    }

    /// Writes the table to a sibling temporary file and renames it over
    /// `path`, so a failed write never leaves a partial table behind.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let tmp = tmp_path(path);
        let written = (|| {
            let mut file = File::create(&tmp)?;
            file.write_all(&self.to_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        })();
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        debug!("persisted {:?} value table to {}", self.shape(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let table = Self::from_bytes(&bytes)?;
        debug!("loaded {:?} value table from {}", table.shape(), path.display());
        Ok(table)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| Error::MalformedTable(format!("truncated at byte {}", self.pos)))?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_table() -> ValueTable {
        ValueTable::new(vec![2; 5], vec![2; 5]).unwrap()
    }

    #[test]
    fn new_table_is_zeroed() {
        let table = binary_table();
        assert_eq!(table.values().len(), 1024);
        assert!(table.values().iter().all(|&q| q == 0.0));
        assert_eq!(table.shape(), vec![2; 10]);
    }

    #[test]
    fn indices_are_row_major() {
        let table = ValueTable::new(vec![2, 3], vec![3, 2]).unwrap();
        assert_eq!(table.state_index(&[0, 0]).unwrap(), 0);
        assert_eq!(table.state_index(&[1, 2]).unwrap(), 5);
        assert_eq!(table.action_index(&[2, 1]).unwrap(), 5);
        for index in 0..6 {
            let action = table.action_at(index);
            assert_eq!(table.action_index(&action).unwrap(), index);
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let table = binary_table();
        assert!(matches!(table.state_index(&[0, 0, 2, 0, 0]), Err(Error::DomainViolation(_))));
        assert!(matches!(table.action_index(&[0, 0]), Err(Error::DomainViolation(_))));
    }

    #[test]
    fn empty_or_zero_dims_are_configuration_errors() {
        assert!(matches!(ValueTable::new(vec![], vec![2]), Err(Error::Configuration(_))));
        assert!(matches!(ValueTable::new(vec![2, 0], vec![2]), Err(Error::Configuration(_))));
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let mut table = ValueTable::new(vec![2], vec![4]).unwrap();
        table.set(1, 1, -1.0);
        assert_eq!(table.best_action_index(1), 0);
        table.set(1, 0, -2.0);
        table.set(1, 2, -1.0);
        table.set(1, 3, -3.0);
        assert_eq!(table.best_action_index(1), 1);
        assert_eq!(table.max_value(1), -1.0);
    }

    #[test]
    fn bytes_round_trip_bit_exact() {
        let mut table = ValueTable::new(vec![2, 3], vec![2]).unwrap();
        for (i, value) in table.values.iter_mut().enumerate() {
            *value = -(i as f64) / 7.0 + f64::EPSILON;
        }
        let restored = ValueTable::from_bytes(&table.to_bytes()).unwrap();
        assert_eq!(restored.state_dims(), &[2, 3]);
        assert_eq!(restored.action_dims(), &[2]);
        let bits = |t: &ValueTable| t.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&restored), bits(&table));
    }

    #[test]
    fn rejects_garbage_and_truncation() {
        assert!(matches!(ValueTable::from_bytes(b"NOPE"), Err(Error::MalformedTable(_))));
        let bytes = binary_table().to_bytes();
        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(ValueTable::from_bytes(truncated), Err(Error::MalformedTable(_))));
        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(ValueTable::from_bytes(&padded), Err(Error::MalformedTable(_))));
    }

    fn header(dims: &[u64], state_rank: u32) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(dims.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&state_rank.to_le_bytes());
        for dim in dims {
            bytes.extend_from_slice(&dim.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn oversized_headers_are_malformed() {
        // 2^62 * 4 cells overflows the cell count
        let overflowing = header(&[1 << 62, 4], 1);
        assert!(matches!(ValueTable::from_bytes(&overflowing), Err(Error::MalformedTable(_))));

        // fits in a usize but claims far more values than the file holds
        let mut huge = header(&[1 << 40, 2], 1);
        huge.extend_from_slice(&0.0f64.to_le_bytes());
        assert!(matches!(ValueTable::from_bytes(&huge), Err(Error::MalformedTable(_))));

        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        assert!(matches!(ValueTable::from_bytes(&bytes), Err(Error::MalformedTable(_))));
    }

    #[test]
    fn hand_built_header_loads() {
        let mut bytes = header(&[2, 1], 1);
        bytes.extend_from_slice(&1.5f64.to_le_bytes());
        bytes.extend_from_slice(&(-0.25f64).to_le_bytes());
        let table = ValueTable::from_bytes(&bytes).unwrap();
        assert_eq!(table.values(), &[1.5, -0.25]);
    }

    #[test]
    fn unaddressable_shape_is_a_configuration_error() {
        let err = ValueTable::new(vec![usize::MAX, 2], vec![2]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = ValueTable::new(vec![2], vec![usize::MAX / 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn failed_persist_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("q.qtbl");
        let err = binary_table().persist(&path).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!path.exists());
        assert!(!tmp_path(&path).exists());
    }
}
