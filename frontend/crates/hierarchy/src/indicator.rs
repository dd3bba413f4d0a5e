use crate::controller::HierarchyController;
use crate::error::ValidationError;

const BOTTOM_MARGIN: f64 = 20.0;

/// One slot of the side bar, top (level H) to bottom (level 2).
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSlot {
    pub level: u32,
    pub y: f64,
    pub height: f64,
    pub window_size: u32,
    pub overlap: u32,
    pub active: bool,
}

impl IndicatorSlot {
    pub fn tooltip(&self) -> String {
        format!(
            "Level: {}\nWindow-size: {}\nOverlap: {}",
            self.level, self.window_size, self.overlap
        )
    }
}

/// Compact bar showing which levels exist and which are expanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyIndicator {
    pub width: f64,
}

impl HierarchyIndicator {
    pub fn new(width: f64) -> Self {
        Self { width }
    }

    pub fn slots(&self, controller: &HierarchyController, available_height: f64) -> Vec<IndicatorSlot> {
        let height = controller.height();
        let slot_height = (available_height - BOTTOM_MARGIN).max(0.0) / height as f64;
        let track = (available_height - BOTTOM_MARGIN - slot_height).max(0.0);
        let active = controller.session().active_levels();
        controller
            .levels_top_down()
            .map(|level| {
                let y = if height > 2 {
                    (height - level.index()) as f64 / (height - 2) as f64 * track
                } else {
                    0.0
                };
                IndicatorSlot {
                    level: level.index(),
                    y,
                    height: slot_height,
                    window_size: level.window_size(),
                    overlap: level.overlap(),
                    active: active.contains(&level.index()),
                }
            })
            .collect()
    }

    /// Click on a slot: the level flips between expanded and hidden.
    pub fn toggle(
        &self,
        controller: &mut HierarchyController,
        level: u32,
    ) -> Result<(), ValidationError> {
        controller.toggle_level(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::controller;
    use std::collections::BTreeSet;

    #[test]
    fn slots_stack_levels_top_down() {
        let hierarchy = controller(4);
        let slots = HierarchyIndicator::new(15.0).slots(&hierarchy, 320.0);

        let placed: Vec<(u32, f64, bool)> = slots
            .iter()
            .map(|slot| (slot.level, slot.y, slot.active))
            .collect();
        assert_eq!(placed, vec![(4, 0.0, true), (3, 112.5, false), (2, 225.0, false)]);
        assert!(slots.iter().all(|slot| slot.height == 75.0));
        assert_eq!(slots[1].tooltip(), "Level: 3\nWindow-size: 8\nOverlap: 1");
    }

    #[test]
    fn clicking_a_slot_toggles_its_level() {
        let mut hierarchy = controller(4);
        let indicator = HierarchyIndicator::new(15.0);

        indicator.toggle(&mut hierarchy, 2).unwrap();
        assert_eq!(hierarchy.session().active_levels(), &BTreeSet::from([2, 4]));
        assert!(hierarchy.level(2).unwrap().is_visible());

        indicator.toggle(&mut hierarchy, 2).unwrap();
        assert!(!hierarchy.level(2).unwrap().is_visible());
        assert_eq!(
            indicator.toggle(&mut hierarchy, 5),
            Err(ValidationError::UnknownLevel(5))
        );
    }
}
