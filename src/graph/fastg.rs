//! FastG and FASTA export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::contig::Side;
use super::node::{ContigId, ContigNode};
use super::ContigGraph;
use crate::error::{AssemblyError, Result};
use crate::kmer::revcomp_string;

impl ContigGraph {
    /// `NODE_<id>_length_<len>_cov_<avg>`, with a trailing `'` for the
    /// reverse-complement orientation
    pub fn fastg_name(&self, id: ContigId, rc: bool) -> Result<String> {
        let contig = self.contig(id).ok_or(AssemblyError::UnknownContig(id.0))?;
        Ok(format!(
            "NODE_{}_length_{}_cov_{}{}",
            id,
            contig.len(),
            contig.avg_coverage(),
            if rc { "'" } else { "" }
        ))
    }

    /// Contigs (and orientations) that follow `id` read in the given
    /// orientation
    fn fastg_neighbors(&self, id: ContigId, rc: bool) -> Result<Vec<(ContigId, bool)>> {
        let contig = self.contig(id).ok_or(AssemblyError::UnknownContig(id.0))?;
        let exit = if rc { contig.end(Side::One) } else { contig.end(Side::Two) };
        let Some(exit) = exit else {
            return Ok(Vec::new());
        };
        let Some(node) = self.node(exit.node) else {
            return Ok(Vec::new());
        };

        let mut neighbors = Vec::new();
        for &slot in ContigNode::continuation_slots(exit.slot) {
            let Some(next) = node.contig(slot) else { continue };
            let Some(next_contig) = self.contig(next) else { continue };
            // leaving through side one reads the contig forward
            let forward = next_contig.end(Side::One).is_some_and(|e| e.node == exit.node && e.slot == slot);
            neighbors.push((next, !forward));
        }
        Ok(neighbors)
    }

    /// `>name:neighbour,neighbour;` or `>name;` without neighbours
    pub fn fastg_header(&self, id: ContigId, rc: bool) -> Result<String> {
        let mut header = format!(">{}", self.fastg_name(id, rc)?);
        let names = self
            .fastg_neighbors(id, rc)?
            .into_iter()
            .map(|(next, next_rc)| self.fastg_name(next, next_rc))
            .collect::<Result<Vec<_>>>()?;
        if !names.is_empty() {
            header.push(':');
            header.push_str(&names.join(","));
        }
        header.push(';');
        Ok(header)
    }

    /// Every contig in both orientations
    pub fn write_fastg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for (id, contig) in self.contigs() {
            writeln!(writer, "{}", self.fastg_header(id, false)?)?;
            writer.write_all(contig.seq())?;
            writeln!(writer)?;
            writeln!(writer, "{}", self.fastg_header(id, true)?)?;
            writer.write_all(&revcomp_string(contig.seq()))?;
            writeln!(writer)?;
        }
        writer.flush()?;
        info!(path = %path.as_ref().display(), contigs = self.num_contigs(), "Wrote FastG");
        Ok(())
    }

    /// Contigs of at least `min_length` bases as FASTA; returns how many
    pub fn write_contigs<P: AsRef<Path>>(&self, path: P, min_length: usize) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let mut written = 0;
        for (id, contig) in self.contigs() {
            if contig.len() < min_length {
                continue;
            }
            writeln!(writer, ">{}", self.fastg_name(id, false)?)?;
            writer.write_all(contig.seq())?;
            writeln!(writer)?;
            written += 1;
        }
        writer.flush()?;
        info!(path = %path.as_ref().display(), written, min_length, "Wrote contigs");
        Ok(written)
    }
}
