use crate::cell::CellKey;
use crate::controller::HierarchyController;
use shared::TimeSpan;

const LABEL_WIDTH: f64 = 60.0;

/// Highlightable x-range of one visible cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverMark {
    pub cell: CellKey,
    pub x: f64,
    pub width: f64,
}

/// Context bar over the whole hierarchy span.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    span: TimeSpan,
    width: f64,
    marks: Vec<HoverMark>,
    hovered: Option<CellKey>,
}

impl Timeline {
    pub fn new(span: TimeSpan, width: f64) -> Self {
        Self {
            span,
            width,
            marks: Vec::new(),
            hovered: None,
        }
    }

    pub fn start_label(&self) -> String {
        self.span.start.format("%b %Y").to_string()
    }

    pub fn end_label(&self) -> String {
        self.span.end.format("%b %Y").to_string()
    }

    /// Horizontal extent of the bar between the two labels.
    pub fn track(&self) -> (f64, f64) {
        let start = LABEL_WIDTH;
        let end = (self.width - LABEL_WIDTH).max(start);
        (start, end)
    }

    pub fn x_range(&self, range: TimeSpan) -> (f64, f64) {
        let (start, end) = self.track();
        let to_x = |time| start + self.span.fraction_of(time).clamp(0.0, 1.0) * (end - start);
        (to_x(range.start), to_x(range.end))
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    /// Recollects the marks of the visible, loaded cells. The hover survives
    /// unless the marks changed. Returns whether they did.
    pub fn rebuild(&mut self, controller: &HierarchyController) -> bool {
        let marks: Vec<HoverMark> = controller
            .levels_top_down()
            .filter(|level| level.is_visible())
            .flat_map(|level| level.cells())
            .filter(|cell| cell.is_visible() && !cell.is_abstract())
            .filter_map(|cell| {
                let (x1, x2) = self.x_range(cell.span()?);
                Some(HoverMark {
                    cell: cell.key(),
                    x: x1,
                    width: x2 - x1,
                })
            })
            .collect();
        if marks == self.marks {
            return false;
        }
        self.hovered = None;
        self.marks = marks;
        true
    }

    pub fn marks(&self) -> &[HoverMark] {
        &self.marks
    }

    pub fn hover(&mut self, cell: CellKey) {
        self.hovered = Some(cell);
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn highlighted(&self) -> Option<&HoverMark> {
        let hovered = self.hovered?;
        self.marks.iter().find(|mark| mark.cell == hovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGateway, controller, settle};
    use shared::GraphMode;

    #[test]
    fn labels_show_month_and_year() {
        let hierarchy = controller(3);
        let timeline = Timeline::new(hierarchy.span(), 800.0);
        assert_eq!(timeline.start_label(), "Jan 2018");
        assert_eq!(timeline.end_label(), "Dec 2018");
    }

    #[tokio::test]
    async fn marks_follow_visible_concrete_cells() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        settle(&mut hierarchy, &gateway).await;

        let mut timeline = Timeline::new(hierarchy.span(), 1120.0);
        assert_eq!(timeline.track(), (60.0, 1060.0));
        timeline.rebuild(&hierarchy);
        assert_eq!(timeline.marks().len(), 2);
        assert_eq!(timeline.marks()[0].x, 60.0);
        assert!((timeline.marks()[0].width - 6.0 / 364.0 * 1000.0).abs() < 1e-9);

        let second = CellKey::new(3, 1);
        timeline.hover(second);
        assert_eq!(timeline.highlighted().map(|mark| mark.cell), Some(second));

        hierarchy.set_color_metric(Some("density".to_string()));
        assert!(!timeline.rebuild(&hierarchy));
        assert_eq!(timeline.highlighted().map(|mark| mark.cell), Some(second));

        hierarchy.toggle_cell_abstract(CellKey::new(3, 0)).unwrap();
        assert!(timeline.rebuild(&hierarchy));
        assert!(timeline.highlighted().is_none());
        assert_eq!(timeline.marks().len(), 1);
        assert_eq!(timeline.marks()[0].cell, second);
    }
}
