//! Tiered-index persistence: graph only, payloads stay in the backend.
//!
//! Same header as the DRAM format, followed by `u64 num_vectors` and the
//! node records — no payload section.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::distance::DistanceMetric;
use crate::index::codec::{read_i32, read_len, read_u64, write_i32, write_u64};
use crate::storage::StorageBackend;
use crate::{Error, Result, VectorId};

use super::{TieredGraph, TieredHnswIndex};

impl TieredHnswIndex {
    /// Saves the graph structure to `path`. Payloads are owned by the
    /// storage backend and are not written here.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let graph = self.graph.read();

        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        write_u64(&mut w, self.dim as u64)?;
        write_u64(&mut w, self.m as u64)?;
        write_u64(&mut w, self.ef_construction as u64)?;
        write_i32(&mut w, self.metric.tag())?;
        write_u64(&mut w, graph.entry_point.unwrap_or(u64::MAX))?;
        write_u64(&mut w, graph.max_layer as u64)?;
        write_u64(&mut w, graph.num_vectors as u64)?;

        write_u64(&mut w, graph.nodes.len() as u64)?;
        for (id, layers) in graph.nodes.iter().enumerate() {
            write_u64(&mut w, id as u64)?;
            write_u64(&mut w, layers.len() as u64)?;
            for list in layers {
                write_u64(&mut w, list.len() as u64)?;
                for &nb in list {
                    write_u64(&mut w, nb)?;
                }
            }
        }

        w.flush()?;
        Ok(())
    }

    /// Loads a graph previously written by [`TieredHnswIndex::save`],
    /// attaching `storage` as the payload tier. The backend must already
    /// hold the payloads the graph refers to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexCorrupted`] when the stream is truncated or
    /// inconsistent, [`Error::Io`] for underlying I/O failures.
    pub fn load(path: &Path, storage: Arc<dyn StorageBackend>) -> Result<Self> {
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

        let num_nodes = read_len(&mut r, "num_nodes")?;
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

        let index = Self::new(dim, storage, m, ef_construction, metric);
        *index.graph.write() = TieredGraph {
            nodes: adjacency
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            entry_point: if entry_raw == u64::MAX {
                None
            } else {
                Some(entry_raw)
            },
            max_layer,
            num_vectors,
        };

        Ok(index)
    }
}
