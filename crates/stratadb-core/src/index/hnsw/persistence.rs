//! HNSW persistence: fixed-order little-endian save/load.
//!
//! Stream layout:
//!
//! ```text
//! u64 dim | u64 M | u64 ef_construction | i32 metric_tag |
//! u64 entry_point (u64::MAX when empty) | u64 max_layer |
//! u64 num_vectors | f32[num_vectors * dim] payloads |
//! u64 num_nodes |
//!   { u64 id; u64 num_layers; { u64 degree; u64[degree] ids } * } *
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::distance::DistanceMetric;
use crate::index::codec::{read_f32, read_i32, read_len, read_u64, write_i32, write_u64};
use crate::{Error, Result, VectorId};

use super::{EntryState, HnswIndex, Node};

impl HnswIndex {
    /// Saves the index, payloads included, to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let vectors = self.vectors.read();
        let nodes = self.nodes.read();
        let entry = *self.entry.lock();

        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        write_u64(&mut w, self.dim as u64)?;
        write_u64(&mut w, self.m as u64)?;
        write_u64(&mut w, self.ef_construction as u64)?;
        write_i32(&mut w, self.metric.tag())?;
        write_u64(&mut w, entry.entry_point.unwrap_or(u64::MAX))?;
        write_u64(&mut w, entry.max_layer as u64)?;

        write_u64(&mut w, nodes.len() as u64)?;
        let mut payload = Vec::with_capacity(vectors.len() * std::mem::size_of::<f32>());
        for &v in vectors.iter() {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        w.write_all(&payload)?;

        write_u64(&mut w, nodes.len() as u64)?;
        for (id, node) in nodes.iter().enumerate() {
            let layers = node.layers.lock().clone();
            write_u64(&mut w, id as u64)?;
            write_u64(&mut w, layers.len() as u64)?;
            for list in &layers {
                write_u64(&mut w, list.len() as u64)?;
                for &nb in list {
                    write_u64(&mut w, nb)?;
                }
            }
        }

        w.flush()?;
        Ok(())
    }

    /// Loads an index previously written by [`HnswIndex::save`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexCorrupted`] when the stream is truncated or
    /// inconsistent, [`Error::Io`] for underlying I/O failures.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut r = BufReader::new(file);

        let dim = read_len(&mut r, "dimension")?;
        let m = read_len(&mut r, "M")?;
        let ef_construction = read_len(&mut r, "ef_construction")?;
        let metric_tag = read_i32(&mut r)?;
        let metric = DistanceMetric::from_tag(metric_tag)
            .ok_or_else(|| Error::IndexCorrupted(format!("unknown metric tag {metric_tag}")))?;
        let entry_raw = read_u64(&mut r)?;
        let max_layer = read_len(&mut r, "max_layer")?;

        let num_vectors = read_len(&mut r, "num_vectors")?;
        let mut vectors = Vec::with_capacity(num_vectors * dim);
        for _ in 0..num_vectors * dim {
            vectors.push(read_f32(&mut r)?);
        }

        let num_nodes = read_len(&mut r, "num_nodes")?;
        if num_nodes != num_vectors {
            return Err(Error::IndexCorrupted(format!(
                "node count {num_nodes} does not match vector count {num_vectors}"
            )));
        }

        let mut adjacency: Vec<Option<Vec<Vec<VectorId>>>> = (0..num_nodes).map(|_| None).collect();
        for _ in 0..num_nodes {
            let id = read_len(&mut r, "node id")?;
            if id >= num_nodes {
                return Err(Error::IndexCorrupted(format!(
                    "node id {id} out of range ({num_nodes} nodes)"
                )));
            }
            let num_layers = read_len(&mut r, "layer count")?;
            let mut layers = Vec::with_capacity(num_layers);
            for _ in 0..num_layers {
                let degree = read_len(&mut r, "degree")?;
                let mut list = Vec::with_capacity(degree);
                for _ in 0..degree {
                    let nb = read_u64(&mut r)?;
                    if nb as usize >= num_nodes {
                        return Err(Error::IndexCorrupted(format!(
                            "edge to {nb} out of range ({num_nodes} nodes)"
                        )));
                    }
                    list.push(nb);
                }
                layers.push(list);
            }
            if adjacency[id].replace(layers).is_some() {
                return Err(Error::IndexCorrupted(format!("duplicate node id {id}")));
            }
        }

        let entry_point = if entry_raw == u64::MAX {
            None
        } else {
            Some(entry_raw)
        };

        let index = Self::new(dim, m, ef_construction, metric);
        *index.vectors.write() = vectors;
        *index.nodes.write() = adjacency
            .into_iter()
            .map(|layers| Node {
                layers: Mutex::new(layers.unwrap_or_default()),
            })
            .collect();
        *index.entry.lock() = EntryState {
            entry_point,
            max_layer,
        };

        Ok(index)
    }
}
