//! Airspace grid renderer.
//!
//! Tiles the X/Y plane into a 25×25 mesh with 4000 ft cell edges and
//! lists the plane ids falling in each cell. North (max Y) renders at
//! the top. Altitude is not shown — the grid is a lateral traffic
//! picture.

use atc_common::consts::{AIRSPACE_X_MAX, AIRSPACE_Y_MAX};
use atc_common::wire::DisplayRecord;

/// Cells per axis.
pub const GRID_CELLS: usize = 25;

/// Cell edge length [ft].
pub const CELL_EDGE_FT: f64 = AIRSPACE_X_MAX / GRID_CELLS as f64;

/// Grid cell index for a coordinate, clamped onto the mesh so aircraft
/// sitting exactly on the far boundary still render.
#[inline]
fn cell_index(coord: f64) -> usize {
    ((coord / CELL_EDGE_FT) as usize).min(GRID_CELLS - 1)
}

/// Render a multi-aircraft record as the console grid.
pub fn render_grid(record: &DisplayRecord) -> String {
    // Cell contents: comma-joined ids, empty rendered as '.'.
    let mut cells: Vec<Vec<i32>> = vec![Vec::new(); GRID_CELLS * GRID_CELLS];
    for i in 0..record.len() {
        let [x, y, _z] = record.positions[i];
        if !(0.0..=AIRSPACE_X_MAX).contains(&x) || !(0.0..=AIRSPACE_Y_MAX).contains(&y) {
            continue;
        }
        cells[cell_index(y) * GRID_CELLS + cell_index(x)].push(record.ids[i]);
    }

    let mut out = String::with_capacity(GRID_CELLS * GRID_CELLS * 2 + 64);
    out.push_str(&format!("airspace grid ({} aircraft)\n", record.len()));
    for row in (0..GRID_CELLS).rev() {
        for col in 0..GRID_CELLS {
            let cell = &cells[row * GRID_CELLS + col];
            if cell.is_empty() {
                out.push('.');
            } else {
                let ids: Vec<String> = cell.iter().map(|id| id.to_string()).collect();
                out.push_str(&ids.join(","));
            }
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// Render a fleet table: one line per aircraft.
pub fn render_table(record: &DisplayRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} aircraft tracked\n", record.len()));
    for i in 0..record.len() {
        let [x, y, z] = record.positions[i];
        let [vx, vy, vz] = record.velocities[i];
        out.push_str(&format!(
            "  plane {:>3}  pos ({:>9.1}, {:>9.1}, {:>8.1})  vel ({:>7.1}, {:>7.1}, {:>6.1})\n",
            record.ids[i], x, y, z, vx, vy, vz
        ));
    }
    out
}

/// Render a single-plane info record.
pub fn render_one_plane(record: &DisplayRecord) -> String {
    if record.is_empty() {
        return "no such aircraft\n".to_string();
    }
    let [x, y, z] = record.positions[0];
    let [vx, vy, vz] = record.velocities[0];
    format!(
        "plane {}\n  position ({x:.1}, {y:.1}, {z:.1})\n  velocity ({vx:.1}, {vy:.1}, {vz:.1})\n  flight level FL{}\n",
        record.ids[0],
        (z / 100.0) as i32
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_common::geometry::Vec3;
    use atc_common::wire::{DisplayKind, FleetSnapshot};

    fn record_of(entries: &[(i32, Vec3)]) -> DisplayRecord {
        let mut snapshot = FleetSnapshot::empty();
        for &(id, p) in entries {
            snapshot.push(id, p, Vec3::new(100.0, 0.0, 0.0), 0);
        }
        DisplayRecord::from_snapshot(DisplayKind::Grid, &snapshot)
    }

    #[test]
    fn cell_indexing_covers_the_box() {
        assert_eq!(cell_index(0.0), 0);
        assert_eq!(cell_index(3999.9), 0);
        assert_eq!(cell_index(4000.0), 1);
        assert_eq!(cell_index(99_999.0), 24);
        // Exactly on the far wall still renders in the last cell.
        assert_eq!(cell_index(100_000.0), 24);
    }

    #[test]
    fn grid_places_planes_in_their_cells() {
        let record = record_of(&[
            (1, Vec3::new(0.0, 0.0, 5_000.0)),
            (2, Vec3::new(50_000.0, 50_000.0, 5_000.0)),
        ]);
        let grid = render_grid(&record);
        let rows: Vec<&str> = grid.lines().skip(1).collect();
        assert_eq!(rows.len(), GRID_CELLS);

        // Plane 1 at the origin: bottom row, first column.
        let bottom: Vec<&str> = rows[GRID_CELLS - 1].split_whitespace().collect();
        assert_eq!(bottom[0], "1");

        // Plane 2 mid-field: row index 12 from the bottom, column 12.
        let middle: Vec<&str> = rows[GRID_CELLS - 1 - 12].split_whitespace().collect();
        assert_eq!(middle[12], "2");
    }

    #[test]
    fn co_located_planes_share_a_cell() {
        let record = record_of(&[
            (1, Vec3::new(10_000.0, 10_000.0, 5_000.0)),
            (7, Vec3::new(10_500.0, 10_500.0, 9_000.0)),
        ]);
        let grid = render_grid(&record);
        assert!(grid.contains("1,7"));
    }

    #[test]
    fn empty_record_renders_empty_mesh() {
        let record = record_of(&[]);
        let grid = render_grid(&record);
        assert!(grid.contains("0 aircraft"));
        // All 625 cells empty.
        assert_eq!(grid.matches('.').count(), GRID_CELLS * GRID_CELLS);
    }

    #[test]
    fn table_lists_every_plane() {
        let record = record_of(&[
            (1, Vec3::new(1.0, 2.0, 3.0)),
            (2, Vec3::new(4.0, 5.0, 6.0)),
        ]);
        let table = render_table(&record);
        assert!(table.contains("plane   1"));
        assert!(table.contains("plane   2"));
    }

    #[test]
    fn one_plane_shows_flight_level() {
        let mut snapshot = FleetSnapshot::empty();
        snapshot.push(
            9,
            Vec3::new(1_000.0, 2_000.0, 21_000.0),
            Vec3::new(0.0, 0.0, 0.0),
            0,
        );
        let record = DisplayRecord::from_snapshot(DisplayKind::OnePlane, &snapshot);
        let text = render_one_plane(&record);
        assert!(text.contains("plane 9"));
        assert!(text.contains("FL210"));
    }
}
