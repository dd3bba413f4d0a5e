use crate::cell::{Cell, CellKey};
use shared::{GraphMode, TimeSpan, VisualizationMode};
use std::collections::BTreeMap;

/// One temporal resolution of the hierarchy, drawn as a row of cells.
#[derive(Debug, Clone)]
pub struct Level {
    index: u32,
    window_size: u32,
    overlap: u32,
    pub(crate) cells: BTreeMap<i64, Cell>,
    pub(crate) visualize: bool,
    pub(crate) is_abstract: bool,
    pub(crate) y: f64,
    pub(crate) height: f64,
    pub(crate) width: f64,
    pub(crate) collapse_ticket: u64,
}

impl Level {
    pub fn new(index: u32, window_size: u32, overlap: u32) -> Self {
        Self {
            index,
            window_size,
            overlap,
            cells: BTreeMap::new(),
            visualize: false,
            is_abstract: false,
            y: 0.0,
            height: 0.0,
            width: 0.0,
            collapse_ticket: 0,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    pub fn is_visible(&self) -> bool {
        self.visualize
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn cell(&self, position: i64) -> Option<&Cell> {
        self.cells.get(&position)
    }

    pub(crate) fn cell_mut(&mut self, position: i64) -> Option<&mut Cell> {
        self.cells.get_mut(&position)
    }

    pub fn positions(&self) -> Vec<i64> {
        self.cells.keys().copied().collect()
    }

    pub fn visible_positions(&self) -> Vec<i64> {
        self.cells
            .values()
            .filter(|cell| cell.visualize)
            .map(|cell| cell.key().position)
            .collect()
    }

    /// Creates the cell if absent. An existing cell is shown again, made
    /// concrete and switched to `mode`.
    pub(crate) fn insert_cell(
        &mut self,
        position: i64,
        mode: GraphMode,
        visualization: VisualizationMode,
    ) -> bool {
        match self.cells.get_mut(&position) {
            Some(cell) => {
                cell.visualize = true;
                cell.is_abstract = false;
                cell.set_graph_mode(mode);
                false
            }
            None => {
                let key = CellKey::new(self.index, position);
                self.cells.insert(position, Cell::new(key, mode, visualization));
                true
            }
        }
    }

    pub(crate) fn remove_cell(&mut self, position: i64) -> Option<Cell> {
        self.cells.remove(&position)
    }

    /// Every visible level shows at least one snapshot.
    pub(crate) fn ensure_default_cell(&mut self, visualization: VisualizationMode) -> bool {
        if !self.visualize || !self.cells.is_empty() {
            return false;
        }
        self.insert_cell(0, GraphMode::Union, visualization)
    }

    /// Keeps the level flag equal to "every cell is abstract". Returns true when it flipped.
    pub(crate) fn sync_abstract(&mut self) -> bool {
        if self.cells.is_empty() {
            return false;
        }
        let all_abstract = self.cells.values().all(Cell::is_abstract);
        let changed = self.is_abstract != all_abstract;
        self.is_abstract = all_abstract;
        changed
    }

    pub(crate) fn set_abstract(&mut self, flag: bool) {
        self.is_abstract = flag;
        for cell in self.cells.values_mut() {
            cell.is_abstract = flag;
        }
    }

    pub(crate) fn hide_cells(&mut self) {
        for cell in self.cells.values_mut() {
            cell.is_abstract = true;
        }
    }

    fn visible_counts(&self) -> (usize, usize) {
        self.cells
            .values()
            .filter(|cell| cell.visualize)
            .fold((0, 0), |(total, abstract_count), cell| {
                (total + 1, abstract_count + usize::from(cell.is_abstract))
            })
    }

    /// Width of a concrete cell. When every cell is abstract they share the
    /// level width evenly.
    pub fn concrete_cell_width(&self, abstract_width: f64) -> f64 {
        let (total, abstract_count) = self.visible_counts();
        if total == 0 {
            return self.width;
        }
        if total == abstract_count {
            return self.width / total as f64;
        }
        (self.width - abstract_count as f64 * abstract_width) / (total - abstract_count) as f64
    }

    pub fn abstract_cell_width(&self, abstract_width: f64) -> f64 {
        let (total, abstract_count) = self.visible_counts();
        if total > 0 && total == abstract_count {
            return self.width / total as f64;
        }
        abstract_width
    }

    /// Places visible cells left to right in ascending position order.
    pub(crate) fn layout_cells(&mut self, abstract_width: f64) {
        let concrete = self.concrete_cell_width(abstract_width);
        let collapsed = self.abstract_cell_width(abstract_width);
        let height = self.height;
        let mut x = 0.0;
        for cell in self.cells.values_mut().filter(|cell| cell.visualize) {
            let width = if cell.is_abstract { collapsed } else { concrete };
            cell.geometry.x = x;
            cell.geometry.width = width;
            cell.geometry.height = height;
            x += width;
        }
    }

    pub fn visible_concrete_cells(&self) -> usize {
        self.cells
            .values()
            .filter(|cell| cell.visualize && !cell.is_abstract)
            .count()
    }

    pub(crate) fn first_visible_concrete(&self) -> Option<i64> {
        self.cells
            .values()
            .find(|cell| cell.visualize && !cell.is_abstract)
            .map(|cell| cell.key().position)
    }

    /// Time ranges of the loaded, visible cells.
    pub fn visualized_time_ranges(&self) -> Vec<TimeSpan> {
        self.cells
            .values()
            .filter(|cell| cell.visualize)
            .filter_map(Cell::span)
            .collect()
    }

    pub fn min_position(&self) -> Option<i64> {
        self.cells.keys().next().copied()
    }

    pub fn max_position(&self) -> Option<i64> {
        self.cells.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABSTRACT_WIDTH: f64 = 32.0;

    fn level_with(positions: &[i64], width: f64) -> Level {
        let mut level = Level::new(3, 4, 2);
        level.visualize = true;
        level.width = width;
        for position in positions {
            level.insert_cell(*position, GraphMode::Union, VisualizationMode::Graph);
        }
        level
    }

    #[test]
    fn one_abstract_cell_of_three() {
        let mut level = level_with(&[0, 1, 2], 600.0);
        level.cell_mut(1).unwrap().is_abstract = true;

        assert_eq!(level.concrete_cell_width(ABSTRACT_WIDTH), (600.0 - ABSTRACT_WIDTH) / 2.0);
        assert_eq!(level.abstract_cell_width(ABSTRACT_WIDTH), ABSTRACT_WIDTH);

        level.layout_cells(ABSTRACT_WIDTH);
        let xs: Vec<f64> = level.cells().map(|cell| cell.geometry().x).collect();
        assert_eq!(xs, vec![0.0, 284.0, 316.0]);
        let total: f64 = level.cells().map(|cell| cell.geometry().width).sum();
        assert!((total - 600.0).abs() < 1e-9);
    }

    #[test]
    fn all_abstract_cells_share_width_and_mark_level() {
        let mut level = level_with(&[4, 5], 500.0);
        level.hide_cells();
        assert!(level.sync_abstract());
        assert!(level.is_abstract());
        assert_eq!(level.concrete_cell_width(ABSTRACT_WIDTH), 250.0);
        assert_eq!(level.abstract_cell_width(ABSTRACT_WIDTH), 250.0);
    }

    #[test]
    fn any_concrete_cell_clears_level_flag() {
        let mut level = level_with(&[0, 1], 500.0);
        level.set_abstract(true);
        level.cell_mut(0).unwrap().is_abstract = false;
        level.sync_abstract();
        assert!(!level.is_abstract());
    }

    #[test]
    fn visible_empty_level_synthesizes_default_cell() {
        let mut level = level_with(&[], 100.0);
        assert!(level.ensure_default_cell(VisualizationMode::Graph));
        assert_eq!(level.positions(), vec![0]);
        assert_eq!(level.cell(0).unwrap().graph_mode(), GraphMode::Union);
        assert!(!level.ensure_default_cell(VisualizationMode::Graph));
    }

    #[test]
    fn reinserting_reuses_cell_with_new_mode() {
        let mut level = level_with(&[5], 100.0);
        level.hide_cells();
        assert!(!level.insert_cell(5, GraphMode::Intersection, VisualizationMode::Graph));
        let cell = level.cell(5).unwrap();
        assert!(!cell.is_abstract());
        assert_eq!(cell.graph_mode(), GraphMode::Intersection);
    }
}
