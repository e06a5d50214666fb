//! Line scanner for FEKO `.out` text files
//!
//! The output file interleaves geometry tables, current tables and far-field
//! tables, each introduced by a fixed-format header line. The scanner walks
//! the file once per extraction and drives two small state machines:
//!
//! - a `TableCursor` for geometry tables, where the wanted value sits on
//!   every n-th line after a fixed number of header lines
//! - a `Block` for current / far-field tables, which are read row by row
//!   until a blank line closes them
//!
//! A line with at most one whitespace-separated token counts as blank.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dataset::{
    polar_deg, CurrentSample, Dataset, FarField, FrequencyData, Triangle, TriangleCurrents,
    WireCurrents,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected at least {expected} columns, found {found}")]
    MissingColumn {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: column {column} is not a number: {token:?}")]
    InvalidNumber {
        line: usize,
        column: usize,
        token: String,
    },
}

/// Extract wire-segment currents, one record per current table
pub fn parse_wire_currents(text: &str) -> Result<Dataset<WireCurrents>, ParseError> {
    scan(text, WireScan::default())
}

/// Extract currents on triangle basis functions, one record per current table
pub fn parse_triangle_currents(text: &str) -> Result<Dataset<TriangleCurrents>, ParseError> {
    scan(text, TriangleScan::default())
}

/// Extract far-field patterns, one record per far-field table
pub fn parse_farfield(text: &str) -> Result<Dataset<FarField>, ParseError> {
    scan(text, FarFieldScan::default())
}

/// Read and scan a file with [`parse_wire_currents`]
pub fn load_wire_currents(path: impl AsRef<Path>) -> Result<Dataset<WireCurrents>, ParseError> {
    parse_wire_currents(&read(path.as_ref())?)
}

/// Read and scan a file with [`parse_triangle_currents`]
pub fn load_triangle_currents(
    path: impl AsRef<Path>,
) -> Result<Dataset<TriangleCurrents>, ParseError> {
    parse_triangle_currents(&read(path.as_ref())?)
}

/// Read and scan a file with [`parse_farfield`]
pub fn load_farfield(path: impl AsRef<Path>) -> Result<Dataset<FarField>, ParseError> {
    parse_farfield(&read(path.as_ref())?)
}

fn read(path: &Path) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ===========================

/// A tokenized output line
struct Line<'a> {
    /// 1-based line number
    number: usize,
    tokens: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn new(number: usize, text: &'a str) -> Self {
        Self {
            number,
            tokens: text.split_whitespace().collect(),
        }
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn is_blank(&self) -> bool {
        self.tokens.len() <= 1
    }

    fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| *t == token)
    }

    fn ends_with(&self, token: &str) -> bool {
        self.tokens.last() == Some(&token)
    }

    fn token(&self, column: usize) -> Result<&'a str, ParseError> {
        self.tokens
            .get(column)
            .copied()
            .ok_or(ParseError::MissingColumn {
                line: self.number,
                expected: column + 1,
                found: self.tokens.len(),
            })
    }

    fn parse<T: std::str::FromStr>(&self, column: usize) -> Result<T, ParseError> {
        let token = self.token(column)?;
        token.parse().map_err(|_| ParseError::InvalidNumber {
            line: self.number,
            column,
            token: token.to_string(),
        })
    }

    fn float(&self, column: usize) -> Result<f64, ParseError> {
        self.parse(column)
    }

    fn vector(&self, first: usize) -> Result<Vector3<f64>, ParseError> {
        Ok(Vector3::new(
            self.float(first)?,
            self.float(first + 1)?,
            self.float(first + 2)?,
        ))
    }

    /// `magnitude phase_deg` pair starting at `first`
    fn phasor(&self, first: usize) -> Result<num_complex::Complex64, ParseError> {
        Ok(polar_deg(self.float(first)?, self.float(first + 1)?))
    }

    /// `number x y z |Ix| argIx |Iy| argIy |Iz| argIz`
    fn current_sample(&self) -> Result<CurrentSample, ParseError> {
        Ok(CurrentSample {
            number: self.parse(0)?,
            position: self.vector(1)?,
            current: Vector3::new(self.phasor(4)?, self.phasor(6)?, self.phasor(8)?),
        })
    }
}

/// Per-extraction state fed one line at a time
trait Extractor {
    type Record;

    /// Consume a line; returns a record when the line closes a block
    fn feed(&mut self, line: &Line<'_>) -> Result<Option<Self::Record>, ParseError>;
}

fn scan<E: Extractor>(text: &str, mut extractor: E) -> Result<Dataset<E::Record>, ParseError> {
    let mut frequency = 0.0;
    let mut dataset = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = Line::new(index + 1, raw);

        // "Frequency in Hz:   FREQ =  1.00000E+08"
        if line.contains("Frequency") {
            if let Some(f) = line.tokens.get(5).and_then(|t| t.parse::<f64>().ok()) {
                if f != frequency {
                    frequency = f;
                    debug!("Reading freq: {} MHz", frequency / 1e6);
                }
            }
        }

        if let Some(data) = extractor.feed(&line)? {
            debug!(line = line.number, frequency, "block complete");
            dataset.push(FrequencyData { frequency, data });
        }
    }

    Ok(dataset)
}

/// Position inside a geometry table whose wanted values repeat every
/// `period` lines after a fixed lead-in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum TableCursor {
    #[default]
    Idle,
    /// Lines left before the next value line (phase 0)
    Counting { remaining: u32, period: u32 },
}

impl TableCursor {
    fn start(lead_in: u32, period: u32) -> Self {
        TableCursor::Counting {
            remaining: lead_in,
            period,
        }
    }

    /// Step over one line, returning its phase within the table cycle
    /// (0 on value lines, counting down towards 0 on the lines before).
    fn advance(&mut self) -> Option<u32> {
        match *self {
            TableCursor::Idle => None,
            TableCursor::Counting { remaining, period } => {
                let next = if remaining == 0 { period } else { remaining };
                *self = TableCursor::Counting {
                    remaining: next - 1,
                    period,
                };
                Some(remaining)
            }
        }
    }
}

/// Row-by-row table reading state
#[derive(Debug, Default)]
enum Block<T> {
    #[default]
    Idle,
    Reading(T),
}

impl<T> Block<T> {
    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Block::Idle) {
            Block::Reading(rows) => Some(rows),
            Block::Idle => None,
        }
    }
}

// ===========================

#[derive(Default)]
struct WireScan {
    lengths: Vec<f64>,
    geometry: TableCursor,
    block: Block<Vec<CurrentSample>>,
}

impl Extractor for WireScan {
    type Record = WireCurrents;

    fn feed(&mut self, line: &Line<'_>) -> Result<Option<WireCurrents>, ParseError> {
        if let Block::Reading(rows) = &mut self.block {
            if !line.is_blank() {
                rows.push(line.current_sample()?);
            }
        }

        // Segment geometry: lead-in of 5 lines, then one segment every 3
        if line.is_blank() && !self.lengths.is_empty() {
            self.geometry = TableCursor::Idle;
        } else if self.geometry.advance() == Some(0) {
            self.lengths.push(line.float(5)?);
        }
        if line.ends_with("SEGMENTS") && line.len() == 4 {
            self.geometry = TableCursor::start(5, 3);
            self.lengths.clear();
        }

        if line.contains("x/m") && line.len() == 10 {
            self.block = Block::Reading(Vec::new());
        } else if line.is_blank() {
            if let Some(samples) = self.block.take() {
                if samples.len() != self.lengths.len() {
                    warn!(
                        segments = samples.len(),
                        lengths = self.lengths.len(),
                        "segment count differs from geometry table"
                    );
                }
                return Ok(Some(WireCurrents {
                    samples,
                    segment_lengths: self.lengths.clone(),
                }));
            }
        }

        Ok(None)
    }
}

#[derive(Default)]
struct TriangleScan {
    triangles: Vec<Triangle>,
    corners: [Option<Vector3<f64>>; 3],
    /// Set by any area line, including those of skipped triangles
    areas_seen: bool,
    geometry: TableCursor,
    block: Block<Vec<CurrentSample>>,
}

impl Extractor for TriangleScan {
    type Record = TriangleCurrents;

    fn feed(&mut self, line: &Line<'_>) -> Result<Option<TriangleCurrents>, ParseError> {
        if let Block::Reading(rows) = &mut self.block {
            if !line.is_blank() {
                rows.push(line.current_sample()?);
            }
        }

        // Triangle geometry: lead-in of 8 lines, then per triangle three
        // corner lines (phases 3, 2, 1) and an area line (phase 0)
        if line.is_blank() && self.areas_seen {
            self.geometry = TableCursor::Idle;
        } else {
            match self.geometry.advance() {
                Some(0) => {
                    let area = line.float(3)?;
                    self.areas_seen = true;
                    match std::mem::take(&mut self.corners) {
                        [Some(a), Some(b), Some(c)] => self.triangles.push(Triangle {
                            vertices: [a, b, c],
                            area,
                        }),
                        _ => warn!(line = line.number, "triangle area without three corners"),
                    }
                }
                Some(phase @ 1..=3) if !line.is_blank() => {
                    self.corners[(3 - phase) as usize] = Some(line.vector(2)?);
                }
                _ => {}
            }
        }
        if line.ends_with("TRIANGLES") && line.len() == 5 {
            self.geometry = TableCursor::start(8, 4);
            self.triangles.clear();
            self.corners = [None; 3];
            self.areas_seen = false;
        }

        if line.contains("x/m") && line.len() == 13 {
            self.block = Block::Reading(Vec::new());
        } else if line.is_blank() {
            if let Some(samples) = self.block.take() {
                return Ok(Some(TriangleCurrents {
                    samples,
                    triangles: self.triangles.clone(),
                }));
            }
        }

        Ok(None)
    }
}

#[derive(Default)]
struct FarFieldScan {
    block: Block<FarField>,
}

impl Extractor for FarFieldScan {
    type Record = FarField;

    fn feed(&mut self, line: &Line<'_>) -> Result<Option<FarField>, ParseError> {
        if let Block::Reading(field) = &mut self.block {
            if !line.is_blank() {
                // theta phi |E_theta| arg(E_theta) |E_phi| arg(E_phi), angles in degrees
                field.push(
                    line.float(0)?.to_radians(),
                    line.float(1)?.to_radians(),
                    line.phasor(2)?,
                    line.phasor(4)?,
                );
            }
        }

        if line.contains("THETA") && line.len() == 13 {
            self.block = Block::Reading(FarField::default());
        } else if line.is_blank() {
            return Ok(self.block.take());
        }

        Ok(None)
    }
}
