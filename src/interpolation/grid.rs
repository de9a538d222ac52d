//! Structured lon/lat grids: rows of equally spaced points.
//!
//! Each row has its own point count, so both regular and reduced grids are
//! represented. Rows are ordered monotonically in latitude (either direction).

use once_cell::sync::OnceCell;

use crate::mesh_error::MeshError;
use crate::util::earth::normalise_longitude;

/// One latitude row of a structured grid.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridRow {
    pub lat: f64,
    pub nx: usize,
    pub xmin: f64,
    pub dx: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum GridKind {
    Regular,
    Regional,
    Reduced,
}

#[derive(Debug)]
pub struct StructuredGrid {
    kind: GridKind,
    rows: Vec<GridRow>,
    offsets: Vec<usize>,
    periodic: bool,
    descending: bool,
    name: OnceCell<String>,
}

fn invalid(message: impl Into<String>) -> MeshError {
    MeshError::InvalidGrid(message.into())
}

impl StructuredGrid {
    fn from_rows(kind: GridKind, rows: Vec<GridRow>, periodic: bool) -> Result<Self, MeshError> {
        if rows.is_empty() {
            return Err(invalid("grid has no rows"));
        }
        if let Some(j) = rows.iter().position(|r| r.nx == 0) {
            return Err(invalid(format!("row {j} has no points")));
        }
        let descending = rows.len() > 1 && rows[0].lat > rows[1].lat;
        let monotone = rows.windows(2).all(|w| {
            if descending {
                w[0].lat > w[1].lat
            } else {
                w[0].lat < w[1].lat
            }
        });
        if !monotone {
            return Err(invalid("row latitudes must be strictly monotone"));
        }
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        for r in &rows {
            offsets.push(offsets[offsets.len() - 1] + r.nx);
        }
        Ok(Self {
            kind,
            rows,
            offsets,
            periodic,
            descending,
            name: OnceCell::new(),
        })
    }

    /// Global grid of `nx` longitudes and `ny` latitudes from pole to pole.
    pub fn regular_lonlat(nx: usize, ny: usize) -> Result<Self, MeshError> {
        if ny < 2 {
            return Err(invalid("a pole-to-pole grid needs at least two rows"));
        }
        let dx = 360.0 / nx as f64;
        let rows = (0..ny)
            .map(|j| GridRow {
                lat: 90.0 - 180.0 * j as f64 / (ny - 1) as f64,
                nx,
                xmin: 0.0,
                dx,
            })
            .collect();
        Self::from_rows(GridKind::Regular, rows, true)
    }

    /// Limited-area grid of `nx` by `ny` points spanning `lon` and `lat`
    /// inclusively; rows run from `lat[0]` to `lat[1]`.
    pub fn regional(nx: usize, ny: usize, lon: [f64; 2], lat: [f64; 2]) -> Result<Self, MeshError> {
        if nx < 2 || ny < 2 {
            return Err(invalid("a regional grid needs at least 2x2 points"));
        }
        let dx = (lon[1] - lon[0]) / (nx - 1) as f64;
        if dx <= 0.0 {
            return Err(invalid("longitudes must increase from west to east"));
        }
        let rows = (0..ny)
            .map(|j| GridRow {
                lat: lat[0] + (lat[1] - lat[0]) * j as f64 / (ny - 1) as f64,
                nx,
                xmin: lon[0],
                dx,
            })
            .collect();
        Self::from_rows(GridKind::Regional, rows, false)
    }

    /// Global grid with its own longitude count per latitude row.
    pub fn reduced(lats: Vec<f64>, nx: Vec<usize>) -> Result<Self, MeshError> {
        if lats.len() != nx.len() {
            return Err(MeshError::LengthMismatch {
                what: "reduced grid rows",
                expected: lats.len(),
                found: nx.len(),
            });
        }
        let rows = lats
            .into_iter()
            .zip(nx)
            .map(|(lat, nx)| GridRow {
                lat,
                nx,
                xmin: 0.0,
                dx: 360.0 / nx.max(1) as f64,
            })
            .collect();
        Self::from_rows(GridKind::Reduced, rows, true)
    }

    /// Short identifier, computed on first use.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| match self.kind {
            GridKind::Regular => format!("L{}x{}", self.rows[0].nx, self.ny()),
            GridKind::Regional => format!("regional-{}x{}", self.rows[0].nx, self.ny()),
            GridKind::Reduced => format!("reduced-{}-{}", self.ny(), self.size()),
        })
    }

    pub fn ny(&self) -> usize {
        self.rows.len()
    }

    pub fn nx(&self, j: usize) -> usize {
        self.rows[j].nx
    }

    pub fn nx_min(&self) -> usize {
        self.rows.iter().map(|r| r.nx).min().unwrap_or(0)
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn size(&self) -> usize {
        self.offsets[self.rows.len()]
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Flat index of point `i` in row `j`.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        self.offsets[j] + i
    }

    #[inline]
    pub fn x(&self, i: usize, j: usize) -> f64 {
        let r = &self.rows[j];
        r.xmin + i as f64 * r.dx
    }

    #[inline]
    pub fn y(&self, j: usize) -> f64 {
        self.rows[j].lat
    }

    pub fn lonlat(&self, i: usize, j: usize) -> [f64; 2] {
        [self.x(i, j), self.y(j)]
    }

    /// All points in flat index order.
    pub fn points(&self) -> Vec<[f64; 2]> {
        (0..self.ny())
            .flat_map(|j| (0..self.nx(j)).map(move |i| self.lonlat(i, j)))
            .collect()
    }

    pub fn west(&self) -> f64 {
        self.rows.iter().map(|r| r.xmin).fold(f64::INFINITY, f64::min)
    }

    pub fn east(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.xmin + (r.nx - 1) as f64 * r.dx)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn ymin(&self) -> f64 {
        self.rows[0].lat.min(self.rows[self.rows.len() - 1].lat)
    }

    pub fn ymax(&self) -> f64 {
        self.rows[0].lat.max(self.rows[self.rows.len() - 1].lat)
    }

    /// Map a target point into the grid's canonical window: longitudes into
    /// `[west, west + 360)`, and on regional grids further onto the nearer of
    /// the east and west edges when they fall outside the grid; latitudes
    /// clamped to the row range.
    pub fn normalise(&self, p: [f64; 2]) -> [f64; 2] {
        let west = self.west();
        let mut x = normalise_longitude(p[0], west);
        if !self.periodic {
            let east = self.east();
            if x > east {
                x = if x - east <= west + 360.0 - x { east } else { west };
            }
        }
        [x, p[1].clamp(self.ymin(), self.ymax())]
    }

    /// Lower row `j` of the row pair bracketing `y`, and the fraction `t` with
    /// `y = y(j) + t * (y(j + 1) - y(j))`.
    pub fn row_interval(&self, y: f64) -> (usize, f64) {
        let ny = self.rows.len();
        if ny < 2 {
            return (0, 0.0);
        }
        let y = y.clamp(self.ymin(), self.ymax());
        let k = if self.descending {
            self.rows.partition_point(|r| r.lat > y)
        } else {
            self.rows.partition_point(|r| r.lat < y)
        };
        let j = k.saturating_sub(1).min(ny - 2);
        let (y0, y1) = (self.rows[j].lat, self.rows[j + 1].lat);
        (j, ((y - y0) / (y1 - y0)).clamp(0.0, 1.0))
    }

    /// Continuous column coordinate of `x` in row `j`: in `[0, nx)` on
    /// periodic grids, clamped to `[0, nx - 1]` otherwise.
    pub fn column_coordinate(&self, j: usize, x: f64) -> f64 {
        let r = &self.rows[j];
        if self.periodic {
            let u = (normalise_longitude(x, r.xmin) - r.xmin) / r.dx;
            // rounding can land exactly on nx
            if u >= r.nx as f64 { 0.0 } else { u }
        } else {
            ((x - r.xmin) / r.dx).clamp(0.0, (r.nx - 1) as f64)
        }
    }

    /// Left column `i` of the interval containing `x` in row `j` and the
    /// fraction `t` towards column `i + 1`.
    pub fn column_interval(&self, j: usize, x: f64) -> (usize, f64) {
        let nx = self.rows[j].nx;
        let u = self.column_coordinate(j, x);
        let last = if self.periodic { nx - 1 } else { nx.saturating_sub(2) };
        let i = (u.floor() as usize).min(last);
        (i, u - i as f64)
    }

    /// Column index `i` (possibly outside the row) wrapped or clamped into it.
    #[inline]
    pub fn column(&self, j: usize, i: isize) -> usize {
        let nx = self.rows[j].nx as isize;
        if self.periodic {
            i.rem_euclid(nx) as usize
        } else {
            i.clamp(0, nx - 1) as usize
        }
    }
}
