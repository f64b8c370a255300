//! Configuration blob layout and parsing.
//!
//! A core's entire configuration lives in the shared store as a sequence
//! of regions indexed by a table at the base address:
//!
//! ```text
//! word 0        magic 0x534E4D31 ("SNM1")
//! word 1        layout version
//! word 2        region count R
//! words 3..3+2R (region_id, word_offset) pairs
//! ...
//! each region:  word 0 = payload length in words, then the payload
//! ```
//!
//! Unknown region ids are ignored so newer tools can ship extra regions
//! past older cores. Length words are validated against the blob bounds
//! before anything is read — an overrun is fatal, the simulation never
//! starts.

use crate::error::{Result, RuntimeError};
use bytes::Bytes;
use synmesh_core::{KeyLookup, KeyRange, RowLocator};
use tracing::{debug, info};

/// Magic word at the base of every configuration blob.
pub const CONFIG_MAGIC: u32 = 0x534E_4D31;

/// Current layout version.
pub const CONFIG_VERSION: u32 = 1;

/// Recognised region identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RegionId {
    /// Timer period, tick count and application words.
    System = 0,
    /// Sorted key → row-locator table.
    KeyLookup = 1,
    /// Packed synaptic rows.
    SynapticMatrix = 2,
    /// Timing- and weight-dependence parameters.
    PlasticityData = 3,
    /// Downstream neuron-input mailbox.
    OutputBuffer = 4,
    /// Spike telemetry sink.
    SpikeRecording = 5,
    /// Poisson stimulus parameters.
    PoissonSource = 6,
}

/// One entry of the parsed region table.
#[derive(Debug, Clone, Copy)]
pub struct RegionEntry {
    /// Raw region identifier (may be unrecognised).
    pub id: u32,
    /// Word offset of the region's length word.
    pub offset: usize,
    /// Payload length in words.
    pub length: usize,
}

/// A parsed configuration blob.
#[derive(Debug, Clone)]
pub struct ConfigBlob {
    words: Vec<u32>,
    regions: Vec<RegionEntry>,
}

impl ConfigBlob {
    /// Parse a blob from little-endian bytes.
    ///
    /// # Errors
    ///
    /// Fails on a bad magic or version, a truncated region table, or any
    /// region whose length word runs past the blob.
    pub fn parse(bytes: &Bytes) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(RuntimeError::invalid_header(format!(
                "blob of {} bytes is not word-aligned",
                bytes.len()
            )));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("chunk of 4")))
            .collect();
        Self::parse_words(words)
    }

    /// Parse a blob already converted to words.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ConfigBlob::parse`].
    pub fn parse_words(words: Vec<u32>) -> Result<Self> {
        debug!("parsing config blob ({} words)", words.len());
        if words.len() < 3 {
            return Err(RuntimeError::invalid_header("blob shorter than header"));
        }
        if words[0] != CONFIG_MAGIC {
            return Err(RuntimeError::invalid_header(format!(
                "bad magic {:#010x}",
                words[0]
            )));
        }
        if words[1] != CONFIG_VERSION {
            return Err(RuntimeError::invalid_header(format!(
                "unsupported layout version {}",
                words[1]
            )));
        }

        let count = words[2] as usize;
        let table_end = 3 + 2 * count;
        if words.len() < table_end {
            return Err(RuntimeError::invalid_header(format!(
                "region table of {count} entries overruns the blob"
            )));
        }

        let mut regions = Vec::with_capacity(count);
        for entry in 0..count {
            let id = words[3 + 2 * entry];
            let offset = words[4 + 2 * entry] as usize;
            if offset >= words.len() {
                return Err(RuntimeError::RegionOverrun {
                    region: id,
                    needed: offset + 1,
                    available: words.len(),
                });
            }
            let length = words[offset] as usize;
            if offset + 1 + length > words.len() {
                return Err(RuntimeError::RegionOverrun {
                    region: id,
                    needed: offset + 1 + length,
                    available: words.len(),
                });
            }
            debug!(id, offset, length, "region");
            regions.push(RegionEntry { id, offset, length });
        }

        Ok(Self { words, regions })
    }

    /// Payload of a region, if present.
    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&[u32]> {
        self.regions
            .iter()
            .find(|entry| entry.id == id as u32)
            .map(|entry| &self.words[entry.offset + 1..entry.offset + 1 + entry.length])
    }

    /// Payload of a region that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::MissingRegion`] if absent.
    pub fn require(&self, id: RegionId, name: &'static str) -> Result<&[u32]> {
        self.region(id)
            .ok_or(RuntimeError::MissingRegion { region: name })
    }

    /// Word offset of a region's payload within the blob (= within the
    /// store, when the blob is the store image).
    #[must_use]
    pub fn region_offset(&self, id: RegionId) -> Option<usize> {
        self.regions
            .iter()
            .find(|entry| entry.id == id as u32)
            .map(|entry| entry.offset + 1)
    }

    /// The parsed region table.
    #[must_use]
    pub fn regions(&self) -> &[RegionEntry] {
        &self.regions
    }

    /// The whole blob as words (the store image).
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

/// Which row kernel the core runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynapseKind {
    /// Fixed-weight rows.
    Static,
    /// STDP rows, nearest-pair timing with additive weights.
    StdpNearestAdditive,
    /// STDP rows, pair timing with additive weights.
    StdpPairAdditive,
}

impl SynapseKind {
    fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Static),
            1 => Ok(Self::StdpNearestAdditive),
            2 => Ok(Self::StdpPairAdditive),
            other => Err(RuntimeError::malformed_region(
                "System",
                format!("unknown synapse kind {other}"),
            )),
        }
    }
}

/// Parsed System region.
#[derive(Debug, Clone, Copy)]
pub struct SystemConfig {
    /// Timer period in microseconds.
    pub timer_period_us: u32,
    /// Ticks to simulate (`u32::MAX` = run until told to stop).
    pub simulation_ticks: u32,
    /// Row kernel selector.
    pub synapse_kind: SynapseKind,
    /// Post-neurons on this core.
    pub post_count: u32,
    /// Widest row, in synapses.
    pub max_row_synapses: u32,
    /// Routing-key base of this core's own population.
    pub key_base: u32,
}

impl SystemConfig {
    /// Words the System region occupies.
    pub const WORDS: usize = 6;

    /// Read from the System region payload.
    ///
    /// # Errors
    ///
    /// Fails on a short region or out-of-range values.
    pub fn read(words: &[u32]) -> Result<Self> {
        if words.len() < Self::WORDS {
            return Err(RuntimeError::malformed_region(
                "System",
                format!("{} words, need {}", words.len(), Self::WORDS),
            ));
        }
        let config = Self {
            timer_period_us: words[0],
            simulation_ticks: words[1],
            synapse_kind: SynapseKind::from_raw(words[2])?,
            post_count: words[3],
            max_row_synapses: words[4],
            key_base: words[5],
        };
        if config.post_count == 0 {
            return Err(RuntimeError::malformed_region("System", "no post-neurons"));
        }
        if config.max_row_synapses == 0 {
            return Err(RuntimeError::malformed_region(
                "System",
                "zero-width rows",
            ));
        }
        info!(
            period_us = config.timer_period_us,
            ticks = config.simulation_ticks,
            kind = ?config.synapse_kind,
            "system region read"
        );
        Ok(config)
    }

    /// Encode back into region words.
    #[must_use]
    pub fn to_words(&self) -> Vec<u32> {
        vec![
            self.timer_period_us,
            self.simulation_ticks,
            self.synapse_kind as u32,
            self.post_count,
            self.max_row_synapses,
            self.key_base,
        ]
    }
}

/// Build a [`KeyLookup`] from the KeyLookup region: a count word followed
/// by four words per entry (key base, key count, packed base locator,
/// row stride).
///
/// # Errors
///
/// Fails on truncation or a mis-sorted table (fatal per the exit-code
/// contract).
pub fn read_key_lookup(words: &[u32]) -> Result<KeyLookup> {
    let Some((&count, rest)) = words.split_first() else {
        return Err(RuntimeError::malformed_region("KeyLookup", "empty region"));
    };
    let count = count as usize;
    if rest.len() < count * 4 {
        return Err(RuntimeError::malformed_region(
            "KeyLookup",
            format!("{count} entries need {} words, have {}", count * 4, rest.len()),
        ));
    }
    let entries = rest
        .chunks_exact(4)
        .take(count)
        .map(|chunk| KeyRange {
            key_base: chunk[0],
            key_count: chunk[1],
            locator: RowLocator::unpack(chunk[2]),
            row_stride: chunk[3],
        })
        .collect();
    Ok(KeyLookup::from_entries(entries)?)
}

/// Encode key ranges into KeyLookup region words.
#[must_use]
pub fn write_key_lookup(entries: &[KeyRange]) -> Vec<u32> {
    let mut words = Vec::with_capacity(1 + entries.len() * 4);
    words.push(entries.len() as u32);
    for entry in entries {
        words.extend_from_slice(&[
            entry.key_base,
            entry.key_count,
            entry.locator.pack(),
            entry.row_stride,
        ]);
    }
    words
}

/// Builder assembling a configuration blob (host-side tooling and tests).
#[derive(Debug, Default)]
pub struct ConfigWriter {
    regions: Vec<(u32, Vec<u32>)>,
}

impl ConfigWriter {
    /// Start an empty blob.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region; returns `self` for chaining.
    #[must_use]
    pub fn region(mut self, id: RegionId, payload: Vec<u32>) -> Self {
        self.regions.push((id as u32, payload));
        self
    }

    /// Append a region with a raw (possibly unrecognised) id.
    #[must_use]
    pub fn raw_region(mut self, id: u32, payload: Vec<u32>) -> Self {
        self.regions.push((id, payload));
        self
    }

    /// Word offset each region's payload will land at, in append order.
    #[must_use]
    pub fn payload_offsets(&self) -> Vec<usize> {
        let mut offset = 3 + 2 * self.regions.len() + 1;
        self.regions
            .iter()
            .map(|(_, payload)| {
                let at = offset;
                offset += payload.len() + 1;
                at
            })
            .collect()
    }

    /// Assemble the blob words.
    #[must_use]
    pub fn build(self) -> Vec<u32> {
        let mut words = vec![CONFIG_MAGIC, CONFIG_VERSION, self.regions.len() as u32];
        let mut offset = 3 + 2 * self.regions.len();
        for (id, payload) in &self.regions {
            words.push(*id);
            words.push(offset as u32);
            offset += payload.len() + 1;
        }
        for (_, payload) in self.regions {
            words.push(payload.len() as u32);
            words.extend(payload);
        }
        words
    }

    /// Assemble as little-endian bytes.
    #[must_use]
    pub fn build_bytes(self) -> Bytes {
        let words = self.build();
        let mut bytes = Vec::with_capacity(words.len() * 4);
        for word in words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        Bytes::from(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_and_parser_round_trip() {
        let system = SystemConfig {
            timer_period_us: 1000,
            simulation_ticks: 100,
            synapse_kind: SynapseKind::Static,
            post_count: 64,
            max_row_synapses: 32,
            key_base: 0x8000,
        };
        let bytes = ConfigWriter::new()
            .region(RegionId::System, system.to_words())
            .region(RegionId::SynapticMatrix, vec![1, 2, 3])
            .build_bytes();

        let blob = ConfigBlob::parse(&bytes).unwrap();
        let parsed = SystemConfig::read(blob.require(RegionId::System, "System").unwrap()).unwrap();
        assert_eq!(parsed.post_count, 64);
        assert_eq!(blob.region(RegionId::SynapticMatrix).unwrap(), &[1, 2, 3]);
        assert_eq!(blob.region(RegionId::PoissonSource), None);
    }

    #[test]
    fn unknown_regions_are_ignored() {
        let bytes = ConfigWriter::new()
            .raw_region(99, vec![7, 7, 7])
            .region(RegionId::System, vec![1000, 10, 0, 4, 4, 0])
            .build_bytes();
        let blob = ConfigBlob::parse(&bytes).unwrap();
        assert!(blob.region(RegionId::System).is_some());
        assert_eq!(blob.regions().len(), 2);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut words = ConfigWriter::new().build();
        words[0] = 0xDEAD_BEEF;
        assert!(matches!(
            ConfigBlob::parse_words(words),
            Err(RuntimeError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn region_overrun_rejected() {
        // Region claims 100 words but the blob ends right after
        let mut words = ConfigWriter::new()
            .region(RegionId::System, vec![1, 2, 3])
            .build();
        let offset = 5;
        words[offset] = 100;
        assert!(matches!(
            ConfigBlob::parse_words(words),
            Err(RuntimeError::RegionOverrun { .. })
        ));
    }

    #[test]
    fn payload_offsets_match_build() {
        let writer = ConfigWriter::new()
            .region(RegionId::System, vec![0; 5])
            .region(RegionId::SynapticMatrix, vec![0; 7]);
        let offsets = writer.payload_offsets();

        let blob = ConfigBlob::parse_words(writer.build()).unwrap();
        assert_eq!(blob.region_offset(RegionId::System), Some(offsets[0]));
        assert_eq!(blob.region_offset(RegionId::SynapticMatrix), Some(offsets[1]));
    }

    #[test]
    fn key_lookup_region_round_trip() {
        let entries = vec![KeyRange {
            key_base: 0x100,
            key_count: 8,
            locator: RowLocator::new(0x40, 12),
            row_stride: 12,
        }];
        let words = write_key_lookup(&entries);
        let lookup = read_key_lookup(&words).unwrap();
        assert_eq!(lookup.resolve(0x103), Some(RowLocator::new(0x64, 12)));
    }
}
