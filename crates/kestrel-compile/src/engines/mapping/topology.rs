//! Physical topologies for the routing mappers.

use serde::{Deserialize, Serialize};

/// Locations and adjacency of a device.
pub trait Topology {
    /// Number of physical locations.
    fn num_locations(&self) -> u32;

    /// Whether a two-qubit operation may act on `a` and `b` directly.
    fn are_adjacent(&self, a: u32, b: u32) -> bool;

    /// The neighbour of `from` on a shortest path to `to`.
    ///
    /// Only called with `from` and `to` distinct and not adjacent.
    fn next_hop(&self, from: u32, to: u32) -> u32;

    /// Every adjacent pair, each listed once with the smaller location
    /// first.
    fn edges(&self) -> Vec<(u32, u32)> {
        let n = self.num_locations();
        (0..n)
            .flat_map(|a| ((a + 1)..n).map(move |b| (a, b)))
            .filter(|&(a, b)| self.are_adjacent(a, b))
            .collect()
    }
}

/// A chain of locations, optionally closed into a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearTopology {
    /// Number of locations.
    pub num_qubits: u32,
    /// Whether the last location is adjacent to the first.
    pub cyclic: bool,
}

impl LinearTopology {
    /// Create a chain (or ring) of `num_qubits` locations.
    pub fn new(num_qubits: u32, cyclic: bool) -> Self {
        Self { num_qubits, cyclic }
    }

    fn wraps(&self) -> bool {
        self.cyclic && self.num_qubits > 2
    }
}

impl Topology for LinearTopology {
    fn num_locations(&self) -> u32 {
        self.num_qubits
    }

    fn are_adjacent(&self, a: u32, b: u32) -> bool {
        let (lo, hi) = (a.min(b), a.max(b));
        let wrapped = self.wraps() && lo == 0 && hi == self.num_qubits - 1;
        hi < self.num_qubits && (hi - lo == 1 || wrapped)
    }

    fn next_hop(&self, from: u32, to: u32) -> u32 {
        let n = self.num_qubits;
        if self.wraps() {
            let forward = (to + n - from) % n;
            if forward <= n - forward {
                (from + 1) % n
            } else {
                (from + n - 1) % n
            }
        } else if to > from {
            from + 1
        } else {
            from - 1
        }
    }
}

/// A rectangular grid; location `row * columns + column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTopology {
    /// Number of rows.
    pub rows: u32,
    /// Number of columns.
    pub columns: u32,
}

impl GridTopology {
    /// Create a `rows` by `columns` grid.
    pub fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// (row, column) of a location.
    pub fn position(&self, location: u32) -> (u32, u32) {
        (location / self.columns, location % self.columns)
    }

    /// Location at (row, column).
    pub fn location(&self, row: u32, column: u32) -> u32 {
        row * self.columns + column
    }
}

impl Topology for GridTopology {
    fn num_locations(&self) -> u32 {
        self.rows * self.columns
    }

    fn are_adjacent(&self, a: u32, b: u32) -> bool {
        if self.columns == 0 || a >= self.num_locations() || b >= self.num_locations() {
            return false;
        }
        let (ra, ca) = self.position(a);
        let (rb, cb) = self.position(b);
        ra.abs_diff(rb) + ca.abs_diff(cb) == 1
    }

    /// Rows first, then columns.
    fn next_hop(&self, from: u32, to: u32) -> u32 {
        let (rf, cf) = self.position(from);
        let (rt, ct) = self.position(to);
        let step = |f: u32, t: u32| if t > f { f + 1 } else { f - 1 };
        if rf != rt {
            self.location(step(rf, rt), cf)
        } else {
            self.location(rf, step(cf, ct))
        }
    }
}
